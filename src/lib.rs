//! 현장 사진 보드판 합성・업로드
//!
//! 写真にフォーム入力値の表（ボード）を重ねて合成し、
//! 端末へ保存してからサーバーへチャンク送信する。

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod persist;
pub mod render;
pub mod scanner;
pub mod schema;
pub mod store;
pub mod upload;

pub use photo_board_common as common;
