//! フォルダからの写真選択（ギャラリー選択の代わり）

mod exif;

use crate::error::{BoardError, Result};
use photo_board_common::Rotation;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub use exif::orientation_to_rotation;

#[derive(Debug, Clone)]
pub struct PickedImage {
    pub path: PathBuf,
    pub file_name: String,
    pub date: Option<String>,
    /// EXIF の向きから決めた初期回転
    pub rotation: Rotation,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "JPG", "JPEG", "PNG"];

fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext)
}

/// 1ファイルを選択
pub fn pick_file(path: &Path) -> Result<PickedImage> {
    if !path.is_file() {
        return Err(BoardError::ImageLoad(format!("파일을 찾을 수 없습니다: {}", path.display())));
    }
    Ok(PickedImage {
        path: path.to_path_buf(),
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        date: exif::extract_date(path),
        rotation: exif::extract_rotation(path),
    })
}

/// フォルダ直下の画像をファイル名順に最大 `limit` 枚
pub fn scan_folder(folder: &Path, limit: usize) -> Result<Vec<PickedImage>> {
    if !folder.is_dir() {
        return Err(BoardError::ImageLoad(format!("폴더를 찾을 수 없습니다: {}", folder.display())));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(1) // 直下のみ
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .map(|ext| is_image_extension(&ext.to_string_lossy()))
                .unwrap_or(false)
        })
        .collect();

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    if paths.len() > limit {
        tracing::warn!(found = paths.len(), limit, "too many images, extra files ignored");
        paths.truncate(limit);
    }

    paths.iter().map(|p| pick_file(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_is_image_extension() {
        assert!(is_image_extension("jpg"));
        assert!(is_image_extension("JPG"));
        assert!(is_image_extension("png"));
        assert!(!is_image_extension("txt"));
        assert!(!is_image_extension("gif"));
    }

    #[test]
    fn test_scan_folder_not_found() {
        let result = scan_folder(Path::new("/nonexistent/folder"), 10);
        assert!(matches!(result, Err(BoardError::ImageLoad(_))));
    }

    #[test]
    fn test_scan_folder_sorted_and_filtered() {
        let dir = tempdir().expect("Failed to create temp dir");
        for name in ["c.jpg", "a.JPG", "b.png", "readme.txt"] {
            File::create(dir.path().join(name)).unwrap().write_all(b"dummy").unwrap();
        }

        let result = scan_folder(dir.path(), 10).unwrap();
        let names: Vec<&str> = result.iter().map(|i| i.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.JPG", "b.png", "c.jpg"]);
        assert!(result.iter().all(|i| i.rotation == Rotation::ZERO));
    }

    #[test]
    fn test_scan_folder_limit() {
        let dir = tempdir().expect("Failed to create temp dir");
        for i in 0..12 {
            File::create(dir.path().join(format!("{:02}.jpg", i))).unwrap();
        }
        let result = scan_folder(dir.path(), 10).unwrap();
        assert_eq!(result.len(), 10);
        assert_eq!(result[9].file_name, "09.jpg");
    }
}
