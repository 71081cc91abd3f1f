//! tracing の初期化
//!
//! 画面への案内は println! のまま、内部イベントは tracing で stderr に出す。

use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` があればそれを優先し、なければ verbose に応じて debug / warn
pub fn init(verbose: bool) {
    let default_level = if verbose { "photo_board=debug" } else { "photo_board=warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_level(true);

    // テストや二重初期化では既存の subscriber を残す
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
