//! 端末ローカルへの保存
//!
//! - 原本写真: `<camera_root>/ORIGINAL_<timestamp>.<元の拡張子>`
//! - 合成画像: `<app_folder>/<formName>_<index>_<timestamp>.jpg`
//!
//! 保存先はこのモジュールからのみ追記される（上書き・削除はしない）。

use crate::error::{BoardError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait LocalPersistence: Send + Sync {
    /// 原本写真をカメラロール相当のフォルダへコピー
    async fn save_original(&self, source: &Path) -> Result<PathBuf>;

    /// 合成画像をアプリ用フォルダへ書き込む（index は1始まり）
    async fn save_composite(&self, form_name: &str, index: usize, jpeg: &[u8]) -> Result<PathBuf>;

    /// メディアインデックスの更新（端末のギャラリーに反映させる）
    async fn refresh_media_index(&self, _path: &Path) {}
}

/// ファイルシステムへの保存
#[derive(Debug, Clone)]
pub struct FsPersistence {
    camera_root: PathBuf,
    app_folder: PathBuf,
}

impl FsPersistence {
    pub fn new(camera_root: impl Into<PathBuf>, app_folder: impl Into<PathBuf>) -> Self {
        Self {
            camera_root: camera_root.into(),
            app_folder: app_folder.into(),
        }
    }
}

#[async_trait]
impl LocalPersistence for FsPersistence {
    async fn save_original(&self, source: &Path) -> Result<PathBuf> {
        ensure_dir(&self.camera_root).await?;
        let ext = original_extension(source);
        let dest = unique_path(&self.camera_root, &format!("ORIGINAL_{}", timestamp()), &ext).await;
        tokio::fs::copy(source, &dest).await.map_err(|e| {
            BoardError::Storage(format!("{} → {}: {}", source.display(), dest.display(), e))
        })?;
        self.refresh_media_index(&dest).await;
        Ok(dest)
    }

    async fn save_composite(&self, form_name: &str, index: usize, jpeg: &[u8]) -> Result<PathBuf> {
        ensure_dir(&self.app_folder).await?;
        let stem = format!("{}_{}_{}", sanitize_file_name(form_name), index, timestamp());
        let dest = unique_path(&self.app_folder, &stem, "jpg").await;
        tokio::fs::write(&dest, jpeg)
            .await
            .map_err(|e| BoardError::Storage(format!("{}: {}", dest.display(), e)))?;
        self.refresh_media_index(&dest).await;
        Ok(dest)
    }

    async fn refresh_media_index(&self, path: &Path) {
        // デスクトップにはメディアスキャナがないので記録だけ残す
        tracing::debug!(path = %path.display(), "media index refresh");
    }
}

async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| BoardError::Storage(format!("{}: {}", dir.display(), e)))
}

/// 原本の拡張子（小文字）。無ければ jpg
fn original_extension(source: &Path) -> String {
    source
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "jpg".to_string())
}

/// ミリ秒までのローカル時刻
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S%3f").to_string()
}

/// 同名ファイルがあれば連番を付ける
async fn unique_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let first = dir.join(format!("{}.{}", stem, ext));
    if !tokio::fs::try_exists(&first).await.unwrap_or(false) {
        return first;
    }
    let mut n = 1;
    loop {
        let candidate = dir.join(format!("{}_{}.{}", stem, n, ext));
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        n += 1;
    }
}

/// ファイル名に使えない文字を置き換える
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "board".to_string()
    } else {
        cleaned
    }
}
