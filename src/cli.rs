use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "photo-board")]
#[command(about = "현장 사진에 보드판을 합성하고 업로드하는 도구", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// フォーム定義JSON（指定時はサーバーに問い合わせない）
    #[arg(long, global = true)]
    pub form_file: Option<PathBuf>,

    /// フォームID（省略時は一覧の先頭）
    #[arg(long, global = true)]
    pub form: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 1枚を合成してファイルに書き出す
    Compose {
        /// 写真ファイル
        #[arg(required = true)]
        image: PathBuf,

        /// 入力値（"項目名=値"、複数可）
        #[arg(long = "set", value_parser = parse_key_value)]
        values: Vec<(String, String)>,

        /// 回転角（省略時は EXIF の向き）
        #[arg(long)]
        rotate: Option<i32>,

        /// 出力ファイル（デフォルト: <写真名>_board.jpg）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// プレビュー（縮小版）も書き出す
        #[arg(long)]
        preview: Option<PathBuf>,
    },

    /// 合成してサーバーへ送信
    Upload {
        /// 写真ファイルまたはフォルダ
        images: Vec<PathBuf>,

        /// each: 1枚ずつ送信 / multi: まとめて送信
        #[arg(long, value_enum, default_value_t = UploadMode::Multi)]
        mode: UploadMode,

        /// 全項目に共通の入力値（"項目名=値"）
        #[arg(long = "set", value_parser = parse_key_value)]
        values: Vec<(String, String)>,

        /// 項目ごとの入力値JSON
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },

    /// 合成画像をフォルダへ書き出す（送信しない）
    Share {
        /// 写真ファイルまたはフォルダ
        images: Vec<PathBuf>,

        #[arg(long = "set", value_parser = parse_key_value)]
        values: Vec<(String, String)>,

        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// 出力フォルダ
        #[arg(short, long, default_value = "shared")]
        output_dir: PathBuf,
    },

    /// フォーム一覧・詳細を表示
    Forms {
        /// 詳細を表示するフォームID
        #[arg(long)]
        id: Option<String>,
    },

    /// 送信履歴を表示
    History {
        /// 履歴を削除
        #[arg(long)]
        clear: bool,

        /// サムネイルをJPEGで書き出すフォルダ
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// 認証トークンを設定
        #[arg(long)]
        set_token: Option<String>,

        /// 会社IDを設定
        #[arg(long)]
        set_company: Option<String>,

        /// チームIDを設定
        #[arg(long)]
        set_team: Option<String>,

        /// APIサーバーを設定
        #[arg(long)]
        set_api_url: Option<String>,

        /// チャンクサイズを設定
        #[arg(long)]
        set_chunk_size: Option<usize>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum UploadMode {
    /// 1枚ずつ
    Each,
    /// まとめて（最大10枚）
    #[default]
    Multi,
}

/// "項目名=値" を分解（値は空でもよい）
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("'{}' は 項目名=値 の形式ではありません", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("項目名が空です: '{}'", s));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
