//! 送信済みサムネイルの履歴
//!
//! 最大10件の FIFO。サムネイルは JPEG の data URL として保持し、
//! バージョンつきの JSON ファイルに保存する。

use crate::error::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use photo_board_common::FormValues;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// 履歴の上限
pub const HISTORY_CAPACITY: usize = 10;

/// 履歴1件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub form_name: String,
    /// `data:image/jpeg;base64,...`
    pub thumbnail: String,
    pub snapshot: FormValues,
    /// RFC 3339
    pub uploaded_at: String,
}

impl HistoryEntry {
    pub fn new(form_name: &str, thumbnail_jpeg: &[u8], snapshot: FormValues) -> Self {
        Self {
            form_name: form_name.to_string(),
            thumbnail: to_data_url(thumbnail_jpeg),
            snapshot,
            uploaded_at: chrono::Local::now().to_rfc3339(),
        }
    }

    /// サムネイルの JPEG バイト列
    pub fn thumbnail_bytes(&self) -> Option<Vec<u8>> {
        let encoded = self.thumbnail.strip_prefix(DATA_URL_PREFIX)?;
        STANDARD.decode(encoded).ok()
    }
}

const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

pub fn to_data_url(jpeg: &[u8]) -> String {
    format!("{}{}", DATA_URL_PREFIX, STANDARD.encode(jpeg))
}

/// サムネイル履歴（古いものから押し出す）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailHistory {
    version: u32,
    entries: VecDeque<HistoryEntry>,
}

impl ThumbnailHistory {
    const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: VecDeque::new(),
        }
    }

    /// 履歴ファイルを読み込む。無い・壊れている・版が違う場合は空
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::new();
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "history unreadable");
                return Self::new();
            }
        };

        match serde_json::from_reader::<_, ThumbnailHistory>(BufReader::new(file)) {
            Ok(mut history) if history.version == Self::CURRENT_VERSION => {
                history.truncate();
                history
            }
            Ok(history) => {
                tracing::warn!(found = history.version, "history version mismatch, starting fresh");
                Self::new()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "history corrupt, starting fresh");
                Self::new()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// 末尾に追加し、上限を超えた分を先頭から捨てる
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);
        self.truncate();
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = HistoryEntry>) {
        for entry in entries {
            self.push(entry);
        }
    }

    fn truncate(&mut self) {
        while self.entries.len() > HISTORY_CAPACITY {
            self.entries.pop_front();
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(n: usize) -> HistoryEntry {
        let snapshot = FormValues::from([("번호".to_string(), n.to_string())]);
        HistoryEntry::new("점검", &[0xFF, 0xD8, n as u8], snapshot)
    }

    #[test]
    fn test_fifo_evicts_oldest() {
        let mut history = ThumbnailHistory::new();
        history.extend((0..12).map(entry));
        assert_eq!(history.len(), HISTORY_CAPACITY);
        let first = history.entries().next().unwrap();
        assert_eq!(first.snapshot["번호"], "2");
        let last = history.entries().last().unwrap();
        assert_eq!(last.snapshot["번호"], "11");
    }

    #[test]
    fn test_data_url_roundtrip() {
        let e = entry(7);
        assert!(e.thumbnail.starts_with("data:image/jpeg;base64,"));
        assert_eq!(e.thumbnail_bytes().unwrap(), vec![0xFF, 0xD8, 7]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("nested").join("history.json");

        let mut history = ThumbnailHistory::new();
        history.push(entry(1));
        history.save(&path).unwrap();

        let loaded = ThumbnailHistory::load(&path);
        assert_eq!(loaded, history);
    }

    #[test]
    fn test_load_missing_or_corrupt_is_empty() {
        let dir = tempdir().expect("Failed to create temp dir");
        assert!(ThumbnailHistory::load(&dir.path().join("none.json")).is_empty());

        let corrupt = dir.path().join("bad.json");
        std::fs::write(&corrupt, "not json").unwrap();
        assert!(ThumbnailHistory::load(&corrupt).is_empty());

        let old = dir.path().join("old.json");
        std::fs::write(&old, r#"{"version": 0, "entries": []}"#).unwrap();
        assert!(ThumbnailHistory::load(&old).is_empty());
    }
}
