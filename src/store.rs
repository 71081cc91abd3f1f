//! キャプチャ項目ストア
//!
//! 撮影・選択した写真（回転＋入力値スナップショット）を順序つきで保持する。
//! 入力中の値（live values）はストアが持ち、「アクティブ項目」を切り替えるときに
//! 直前の項目のスナップショットへ書き戻してから次の項目の値を読み込む。
//!
//! 変更はオーケストレーターの制御フローからのみ行う前提（`&mut self` のみ、ロックなし）。

use crate::error::{BoardError, Result};
use photo_board_common::values::normalize_value;
use photo_board_common::{FormValues, Rotation};
use serde::Serialize;
use std::path::PathBuf;

/// 複数枚モードの上限
pub const MAX_ITEMS: usize = 10;

/// 項目ID（ストアの生存期間中は一意で不変）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(u64);

impl ItemId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// キャプチャ項目
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureItem {
    pub id: ItemId,
    pub image_path: PathBuf,
    pub rotation: Rotation,
    pub snapshot: FormValues,
}

/// 保持モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueMode {
    /// 最新の1枚だけ（撮影ごとに保存＋送信）
    #[default]
    Single,
    /// 最大 MAX_ITEMS 枚（まとめて送信）
    Multi,
}

/// スナップショット同期方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotSync {
    /// 切り替え時にだけ書き戻す
    #[default]
    OnDeselect,
    /// 入力のたびにアクティブ項目へ書き込む
    Continuous,
}

#[derive(Debug, Default)]
pub struct ItemStore {
    mode: QueueMode,
    sync: SnapshotSync,
    items: Vec<CaptureItem>,
    active: Option<ItemId>,
    live: FormValues,
    next_id: u64,
}

impl ItemStore {
    pub fn new(mode: QueueMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn with_sync(mut self, sync: SnapshotSync) -> Self {
        self.sync = sync;
        self
    }

    pub fn mode(&self) -> QueueMode {
        self.mode
    }

    pub fn capacity(&self) -> usize {
        match self.mode {
            QueueMode::Single => 1,
            QueueMode::Multi => MAX_ITEMS,
        }
    }

    /// 項目を追加してアクティブにする
    ///
    /// Single モードでは既存の項目を置き換える。Multi モードで上限に達していれば拒否し、
    /// キューは変更しない。
    pub fn add(&mut self, image_path: PathBuf, rotation: Rotation, snapshot: FormValues) -> Result<ItemId> {
        match self.mode {
            QueueMode::Multi if self.items.len() >= MAX_ITEMS => {
                return Err(BoardError::QueueFull(MAX_ITEMS));
            }
            QueueMode::Single => {
                self.items.clear();
                self.active = None;
            }
            QueueMode::Multi => self.commit_active(),
        }

        self.next_id += 1;
        let id = ItemId(self.next_id);
        self.live = snapshot.clone();
        self.items.push(CaptureItem {
            id,
            image_path,
            rotation,
            snapshot,
        });
        self.active = Some(id);
        tracing::debug!(%id, count = self.items.len(), "item added");
        Ok(id)
    }

    /// アクティブ項目を切り替える
    ///
    /// 現在の入力値をアクティブ項目のスナップショットへ保存してから、
    /// `id` のスナップショットを入力値として読み込む。
    pub fn select(&mut self, id: ItemId) -> Result<()> {
        let next = self
            .items
            .iter()
            .find(|i| i.id == id)
            .map(|i| i.snapshot.clone())
            .ok_or(BoardError::ItemNotFound(id.0))?;

        if self.active == Some(id) {
            return Ok(());
        }

        self.commit_active();
        self.active = Some(id);
        self.live = next;
        Ok(())
    }

    /// 入力値を丸ごと置き換え、アクティブ項目にも反映する
    pub fn update_active_snapshot(&mut self, values: FormValues) {
        self.live = values;
        self.commit_active();
    }

    /// 1項目を編集する（「101-202」→「101동-202호」の展開つき）
    pub fn set_field(&mut self, name: &str, value: &str) {
        let normalized = normalize_value(name, value);
        self.live.insert(name.to_string(), normalized);
        if self.sync == SnapshotSync::Continuous {
            self.commit_active();
        }
    }

    /// 入力値をアクティブ項目のスナップショットへ保存
    pub fn commit_active(&mut self) {
        let Some(active) = self.active else {
            return;
        };
        if let Some(item) = self.items.iter_mut().find(|i| i.id == active) {
            item.snapshot = self.live.clone();
        }
    }

    /// アクティブ項目を時計回りに 90 度回転
    pub fn rotate_active(&mut self) -> Option<Rotation> {
        let active = self.active?;
        let item = self.items.iter_mut().find(|i| i.id == active)?;
        item.rotation = item.rotation.rotate_cw();
        Some(item.rotation)
    }

    /// 項目を削除する
    ///
    /// アクティブ項目だった場合は次の項目（なければ末尾、空ならなし）をアクティブにする。
    pub fn remove(&mut self, id: ItemId) -> Result<CaptureItem> {
        let index = self
            .items
            .iter()
            .position(|i| i.id == id)
            .ok_or(BoardError::ItemNotFound(id.0))?;
        let removed = self.items.remove(index);

        if self.active == Some(id) {
            let next = self.items.get(index).or_else(|| self.items.last());
            match next {
                Some(item) => {
                    self.active = Some(item.id);
                    self.live = item.snapshot.clone();
                }
                None => {
                    self.active = None;
                    self.live.clear();
                }
            }
        }
        Ok(removed)
    }

    /// すべて破棄（フォント変更時など）
    pub fn clear(&mut self) {
        self.items.clear();
        self.active = None;
        self.live.clear();
    }

    pub fn items(&self) -> &[CaptureItem] {
        &self.items
    }

    pub fn get(&self, id: ItemId) -> Option<&CaptureItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn active_id(&self) -> Option<ItemId> {
        self.active
    }

    pub fn active_item(&self) -> Option<&CaptureItem> {
        self.active.and_then(|id| self.get(id))
    }

    /// 現在の入力値
    pub fn live_values(&self) -> &FormValues {
        &self.live
    }

    /// 項目なしで入力値だけ設定する（フォーム選択直後の初期値）
    pub fn set_live_values(&mut self, values: FormValues) {
        self.live = values;
        if self.sync == SnapshotSync::Continuous {
            self.commit_active();
        }
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|i| i.id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(name: &str) -> FormValues {
        FormValues::from([("이름".to_string(), name.to_string())])
    }

    fn path(n: usize) -> PathBuf {
        PathBuf::from(format!("photo_{}.jpg", n))
    }

    #[test]
    fn test_ids_are_unique() {
        let mut store = ItemStore::new(QueueMode::Multi);
        let a = store.add(path(1), Rotation::ZERO, values("a")).unwrap();
        let b = store.add(path(2), Rotation::ZERO, values("b")).unwrap();
        store.remove(a).unwrap();
        let c = store.add(path(3), Rotation::ZERO, values("c")).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_add_activates_new_item() {
        let mut store = ItemStore::new(QueueMode::Multi);
        let a = store.add(path(1), Rotation::ZERO, values("a")).unwrap();
        assert_eq!(store.active_id(), Some(a));
        assert_eq!(store.live_values(), &values("a"));
    }

    #[test]
    fn test_select_persists_live_values_before_switch() {
        let mut store = ItemStore::new(QueueMode::Multi);
        let a = store.add(path(1), Rotation::ZERO, values("a")).unwrap();
        let b = store.add(path(2), Rotation::ZERO, values("b")).unwrap();

        store.select(a).unwrap();
        store.set_field("이름", "a-edited");
        store.select(b).unwrap();

        assert_eq!(store.live_values(), &values("b"));
        assert_eq!(store.get(a).unwrap().snapshot, values("a-edited"));
        assert_eq!(store.get(b).unwrap().snapshot, values("b"));

        store.select(a).unwrap();
        assert_eq!(store.live_values(), &values("a-edited"));
    }

    #[test]
    fn test_add_persists_previous_active() {
        let mut store = ItemStore::new(QueueMode::Multi);
        let a = store.add(path(1), Rotation::ZERO, values("a")).unwrap();
        store.set_field("이름", "changed");
        store.add(path(2), Rotation::ZERO, values("b")).unwrap();
        assert_eq!(store.get(a).unwrap().snapshot, values("changed"));
    }

    #[test]
    fn test_on_deselect_does_not_write_through() {
        let mut store = ItemStore::new(QueueMode::Multi);
        let a = store.add(path(1), Rotation::ZERO, values("a")).unwrap();
        store.set_field("이름", "typing");
        assert_eq!(store.get(a).unwrap().snapshot, values("a"));
    }

    #[test]
    fn test_continuous_sync_writes_through() {
        let mut store = ItemStore::new(QueueMode::Multi).with_sync(SnapshotSync::Continuous);
        let a = store.add(path(1), Rotation::ZERO, values("a")).unwrap();
        store.set_field("이름", "typing");
        assert_eq!(store.get(a).unwrap().snapshot, values("typing"));
    }

    #[test]
    fn test_set_field_normalizes_dong_ho() {
        let mut store = ItemStore::new(QueueMode::Multi);
        store.add(path(1), Rotation::ZERO, FormValues::new()).unwrap();
        store.set_field("동", "101-202");
        assert_eq!(store.live_values()["동"], "101동-202호");
    }

    #[test]
    fn test_select_unknown_id() {
        let mut store = ItemStore::new(QueueMode::Multi);
        store.add(path(1), Rotation::ZERO, values("a")).unwrap();
        assert!(matches!(store.select(ItemId(99)), Err(BoardError::ItemNotFound(99))));
    }

    #[test]
    fn test_rotate_four_times() {
        let mut store = ItemStore::new(QueueMode::Multi);
        let a = store.add(path(1), Rotation::from_degrees(90), values("a")).unwrap();
        for _ in 0..4 {
            store.rotate_active();
        }
        assert_eq!(store.get(a).unwrap().rotation, Rotation::from_degrees(90));
    }

    #[test]
    fn test_rotation_isolated_per_item() {
        let mut store = ItemStore::new(QueueMode::Multi);
        let a = store.add(path(1), Rotation::ZERO, values("a")).unwrap();
        let b = store.add(path(2), Rotation::ZERO, values("b")).unwrap();
        store.rotate_active();
        store.select(a).unwrap();
        assert_eq!(store.active_item().unwrap().rotation, Rotation::ZERO);
        assert_eq!(store.get(b).unwrap().rotation, Rotation::from_degrees(90));
    }

    #[test]
    fn test_remove_active_activates_next() {
        let mut store = ItemStore::new(QueueMode::Multi);
        let a = store.add(path(1), Rotation::ZERO, values("a")).unwrap();
        let b = store.add(path(2), Rotation::ZERO, values("b")).unwrap();
        let c = store.add(path(3), Rotation::ZERO, values("c")).unwrap();

        store.select(b).unwrap();
        store.remove(b).unwrap();
        assert_eq!(store.active_id(), Some(c));
        assert_eq!(store.live_values(), &values("c"));

        store.remove(c).unwrap();
        assert_eq!(store.active_id(), Some(a));

        store.remove(a).unwrap();
        assert_eq!(store.active_id(), None);
        assert!(store.live_values().is_empty());
    }

    #[test]
    fn test_remove_inactive_keeps_active() {
        let mut store = ItemStore::new(QueueMode::Multi);
        let a = store.add(path(1), Rotation::ZERO, values("a")).unwrap();
        let b = store.add(path(2), Rotation::ZERO, values("b")).unwrap();
        store.remove(a).unwrap();
        assert_eq!(store.active_id(), Some(b));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_multi_cap() {
        let mut store = ItemStore::new(QueueMode::Multi);
        for i in 0..MAX_ITEMS {
            store.add(path(i), Rotation::ZERO, values("x")).unwrap();
        }
        let result = store.add(path(99), Rotation::ZERO, values("y"));
        assert!(matches!(result, Err(BoardError::QueueFull(10))));
        assert_eq!(store.len(), MAX_ITEMS);
    }

    #[test]
    fn test_single_mode_keeps_latest() {
        let mut store = ItemStore::new(QueueMode::Single);
        store.add(path(1), Rotation::ZERO, values("a")).unwrap();
        let b = store.add(path(2), Rotation::ZERO, values("b")).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.items()[0].id, b);
        assert_eq!(store.capacity(), 1);
    }

    #[test]
    fn test_clear() {
        let mut store = ItemStore::new(QueueMode::Multi);
        store.add(path(1), Rotation::ZERO, values("a")).unwrap();
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.active_id(), None);
    }

    #[test]
    fn test_update_active_snapshot_writes_through() {
        let mut store = ItemStore::new(QueueMode::Multi);
        let a = store.add(path(1), Rotation::ZERO, values("a")).unwrap();
        store.update_active_snapshot(values("a2"));
        assert_eq!(store.get(a).unwrap().snapshot, values("a2"));
        assert_eq!(store.live_values(), &values("a2"));
    }
}
