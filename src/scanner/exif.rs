use photo_board_common::Rotation;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

fn read_exif(path: &Path) -> Option<exif::Exif> {
    let file = File::open(path).ok()?;
    let mut bufreader = BufReader::new(file);
    exif::Reader::new().read_from_container(&mut bufreader).ok()
}

/// 撮影日時（DateTimeOriginal → DateTime）
pub fn extract_date(path: &Path) -> Option<String> {
    let exif = read_exif(path)?;
    [exif::Tag::DateTimeOriginal, exif::Tag::DateTime]
        .into_iter()
        .find_map(|tag| exif.get_field(tag, exif::In::PRIMARY))
        .map(|field| field.display_value().to_string())
}

/// Orientation タグから、正立させるための回転
///
/// 反転つき（2/4/5/7）は反転を無視する。
pub fn extract_rotation(path: &Path) -> Rotation {
    let orientation = read_exif(path).and_then(|exif| {
        exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
    });
    orientation_to_rotation(orientation.unwrap_or(1))
}

pub fn orientation_to_rotation(orientation: u32) -> Rotation {
    match orientation {
        3 | 4 => Rotation::from_degrees(180),
        5 | 6 => Rotation::from_degrees(90),
        7 | 8 => Rotation::from_degrees(270),
        _ => Rotation::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_mapping() {
        assert_eq!(orientation_to_rotation(1).degrees(), 0);
        assert_eq!(orientation_to_rotation(3).degrees(), 180);
        assert_eq!(orientation_to_rotation(6).degrees(), 90);
        assert_eq!(orientation_to_rotation(8).degrees(), 270);
        assert_eq!(orientation_to_rotation(0).degrees(), 0);
    }

    #[test]
    fn test_no_exif_is_upright() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("plain.jpg");
        std::fs::write(&path, b"dummy").unwrap();
        assert_eq!(extract_rotation(&path), Rotation::ZERO);
        assert!(extract_date(&path).is_none());
    }
}
