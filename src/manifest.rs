//! 項目ごとの入力値をまとめた JSON
//!
//! ```json
//! [
//!   {"image": "a.jpg", "rotation": 90, "values": {"위치": "101-202"}},
//!   {"image": "b.jpg"}
//! ]
//! ```
//! 相対パスはマニフェストのあるフォルダ基準。

use crate::error::{BoardError, Result};
use photo_board_common::{FormValues, Rotation};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestItem {
    pub image: PathBuf,
    /// 省略時は EXIF の向き
    #[serde(default)]
    pub rotation: Option<Rotation>,
    #[serde(default)]
    pub values: FormValues,
}

pub fn load(path: &Path) -> Result<Vec<ManifestItem>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| BoardError::Config(format!("{}: {}", path.display(), e)))?;
    let mut items: Vec<ManifestItem> = serde_json::from_str(&content)?;

    let base_dir = path.parent().unwrap_or(Path::new("."));
    for item in &mut items {
        if item.image.is_relative() {
            item.image = base_dir.join(&item.image);
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("manifest.json");
        std::fs::write(
            &path,
            r#"[{"image": "a.jpg", "rotation": 450, "values": {"위치": "101-202"}}, {"image": "/abs/b.jpg"}]"#,
        )
        .unwrap();

        let items = load(&path).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].image, dir.path().join("a.jpg"));
        assert_eq!(items[0].rotation.map(|r| r.degrees()), Some(90));
        assert_eq!(items[0].values["위치"], "101-202");
        assert_eq!(items[1].image, PathBuf::from("/abs/b.jpg"));
        assert!(items[1].rotation.is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let result = load(Path::new("/nonexistent/manifest.json"));
        assert!(matches!(result, Err(BoardError::Config(_))));
    }
}
