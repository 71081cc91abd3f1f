//! アップロード処理
//!
//! キュー内の各項目をキャプチャ面に描画・キャプチャし、端末へ保存、
//! 縮小とサムネイル作成をしてからチャンク単位で送信する。
//!
//! - 送信前の検証（トークン・空キュー・必須項目）は I/O より前
//! - キャプチャは1面を直列に使う
//! - チャンクは順番に送り、失敗したら以降は送らない（受理済みはそのまま）
//! - 履歴への追加は全チャンク成功時のみ
//! - 成功時は送信済みの項目だけをキューから外す（スキップ分は残る）

pub mod api;
pub mod history;
pub mod progress;

use crate::error::{BoardError, MissingFields, Result};
use crate::persist::{sanitize_file_name, timestamp, LocalPersistence};
use crate::render::{encode_jpeg, load_source, BoardRenderer, CaptureSurface, RenderRequest};
use crate::store::{ItemId, ItemStore};
use api::{RemoteApi, StagedItem, UploadChunk};
use history::{HistoryEntry, ThumbnailHistory};
use image::imageops::FilterType;
use photo_board_common::values::missing_fields;
use photo_board_common::{FieldDefinition, FormDefinition, Rotation, StyleConfig};
use progress::{capture_percent, transmit_percent, ProgressSink, ProgressTracker, UploadStage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// 調整可能な値
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// 1リクエストあたりの枚数
    pub chunk_size: usize,
    pub chunk_timeout: Duration,
    /// 描画確認からキャプチャまでの待ち
    pub settle_delay: Duration,
    /// 送信用の最大幅
    pub upload_max_width: u32,
    pub upload_jpeg_quality: u8,
    /// サムネイルの外接サイズ
    pub thumbnail_size: (u32, u32),
    pub thumbnail_jpeg_quality: u8,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            chunk_size: 3,
            chunk_timeout: Duration::from_secs(60),
            settle_delay: Duration::ZERO,
            upload_max_width: 1024,
            upload_jpeg_quality: 92,
            thumbnail_size: (200, 150),
            thumbnail_jpeg_quality: 80,
        }
    }
}

/// 送信結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadReport {
    /// 送信した枚数
    pub uploaded: usize,
    /// 描画・縮小に失敗して外した項目
    pub skipped: Vec<ItemId>,
    pub chunks: usize,
    /// 端末に保存した合成画像
    pub saved: Vec<PathBuf>,
}

/// キャプチャ1件の成果
struct Staged {
    id: ItemId,
    item: StagedItem,
}

pub struct UploadOrchestrator {
    renderer: Arc<BoardRenderer>,
    persistence: Arc<dyn LocalPersistence>,
    api: Arc<dyn RemoteApi>,
    history: ThumbnailHistory,
    history_path: Option<PathBuf>,
    options: UploadOptions,
}

impl UploadOrchestrator {
    pub fn new(
        renderer: Arc<BoardRenderer>,
        persistence: Arc<dyn LocalPersistence>,
        api: Arc<dyn RemoteApi>,
        options: UploadOptions,
    ) -> Self {
        Self {
            renderer,
            persistence,
            api,
            history: ThumbnailHistory::new(),
            history_path: None,
            options,
        }
    }

    /// 履歴をファイルから読み込み、成功時に書き戻す
    pub fn with_history_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.history = ThumbnailHistory::load(&path);
        self.history_path = Some(path);
        self
    }

    pub fn history(&self) -> &ThumbnailHistory {
        &self.history
    }

    /// キュー全体を送信する
    pub async fn run(
        &mut self,
        store: &mut ItemStore,
        form: &FormDefinition,
        token: &str,
        progress: &mut dyn ProgressSink,
    ) -> Result<UploadReport> {
        // 編集中の値を確定してから検証
        store.commit_active();
        preflight(store, &form.fields, token)?;

        let previous = store.active_id();
        let mut tracker = ProgressTracker::new(progress);
        let result = self.run_pipeline(store, form, token, &mut tracker).await;

        match result {
            Ok((report, uploaded_ids)) => {
                // 送信済みだけを外し、スキップした項目は再送できるよう残す
                for id in uploaded_ids {
                    store.remove(id)?;
                }
                restore_selection(store, previous);
                tracker.set(UploadStage::Done, 100);
                tracing::info!(uploaded = report.uploaded, chunks = report.chunks, "upload finished");
                Ok(report)
            }
            Err(e) => {
                restore_selection(store, previous);
                tracker.fail();
                tracing::warn!(error = %e, "upload failed");
                Err(e)
            }
        }
    }

    /// 単一モード: 現在の入力値で1枚追加して送信
    pub async fn capture_and_upload(
        &mut self,
        store: &mut ItemStore,
        image_path: PathBuf,
        rotation: Rotation,
        form: &FormDefinition,
        token: &str,
        progress: &mut dyn ProgressSink,
    ) -> Result<UploadReport> {
        check_token(token)?;
        let missing = missing_fields(&form.fields, store.live_values());
        if !missing.is_empty() {
            return Err(BoardError::Validation(vec![MissingFields {
                item_index: None,
                fields: missing,
            }]));
        }

        let snapshot = store.live_values().clone();
        store.add(image_path, rotation, snapshot)?;
        self.run(store, form, token, progress).await
    }

    /// 全項目の合成画像を `out_dir` に書き出す（送信はしない）
    pub async fn share(
        &mut self,
        store: &mut ItemStore,
        form: &FormDefinition,
        out_dir: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<PathBuf>> {
        store.commit_active();
        if store.is_empty() {
            return Err(BoardError::EmptyQueue);
        }
        tokio::fs::create_dir_all(out_dir)
            .await
            .map_err(|e| BoardError::Storage(format!("{}: {}", out_dir.display(), e)))?;

        let previous = store.active_id();
        let style = Arc::new(StyleConfig::from_form(form));
        let fields = Arc::new(form.fields.clone());
        let mut surface = CaptureSurface::new(Arc::clone(&self.renderer), style.capture);
        let mut tracker = ProgressTracker::new(progress);
        let total = store.len();
        let mut written = Vec::new();

        for (i, id) in store.ids().into_iter().enumerate() {
            match self.capture_item(store, id, &mut surface, &fields, &style).await {
                Ok(bytes) => {
                    let name = format!("{}_{}_{}.jpg", sanitize_file_name(&form.form_name), i + 1, timestamp());
                    let path = out_dir.join(name);
                    tokio::fs::write(&path, &bytes)
                        .await
                        .map_err(|e| BoardError::Storage(format!("{}: {}", path.display(), e)))?;
                    written.push(path);
                }
                Err(e) => tracing::warn!(%id, error = %e, "share capture skipped"),
            }
            tracker.set(UploadStage::Capturing, capture_percent(i + 1, total));
        }
        restore_selection(store, previous);

        if written.is_empty() {
            tracker.fail();
            return Err(BoardError::Render("공유할 이미지를 만들지 못했습니다".into()));
        }
        tracker.set(UploadStage::Done, 100);
        Ok(written)
    }

    async fn run_pipeline(
        &mut self,
        store: &mut ItemStore,
        form: &FormDefinition,
        token: &str,
        tracker: &mut ProgressTracker<'_>,
    ) -> Result<(UploadReport, Vec<ItemId>)> {
        let style = Arc::new(StyleConfig::from_form(form));
        let fields = Arc::new(form.fields.clone());
        let mut surface = CaptureSurface::new(Arc::clone(&self.renderer), style.capture);

        let ids = store.ids();
        let total = ids.len();
        let mut report = UploadReport::default();
        let mut staged: Vec<Staged> = Vec::with_capacity(total);

        tracker.set(UploadStage::Capturing, 0);
        tracing::info!(total, form = %form.form_name, "capturing");

        for (i, id) in ids.iter().copied().enumerate() {
            let captured = self.capture_item(store, id, &mut surface, &fields, &style).await;
            let composite = match captured {
                Ok(bytes) => bytes,
                Err(e) if total == 1 => return Err(e),
                Err(e) => {
                    tracing::warn!(%id, error = %e, "capture failed, item skipped");
                    report.skipped.push(id);
                    tracker.set(UploadStage::Capturing, capture_percent(i + 1, total));
                    continue;
                }
            };

            let (image_path, snapshot) = match store.get(id) {
                Some(item) => (item.image_path.clone(), item.snapshot.clone()),
                None => return Err(BoardError::ItemNotFound(id.value())),
            };

            // 原本の保存失敗は送信を止めない
            if let Err(e) = self.persistence.save_original(&image_path).await {
                tracing::warn!(%id, error = %e, "original copy not saved");
            }
            let saved = self
                .persistence
                .save_composite(&form.form_name, i + 1, &composite)
                .await?;
            let file_name = match saved.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => format!("{}_{}.jpg", sanitize_file_name(&form.form_name), i + 1),
            };
            report.saved.push(saved);

            let sized = shrink_for_upload(composite, &self.options).await;
            let (jpeg, thumbnail) = match sized {
                Ok(pair) => pair,
                Err(e) if total == 1 => return Err(e),
                Err(e) => {
                    tracing::warn!(%id, error = %e, "resize failed, item skipped");
                    report.skipped.push(id);
                    tracker.set(UploadStage::Capturing, capture_percent(i + 1, total));
                    continue;
                }
            };

            staged.push(Staged {
                id,
                item: StagedItem {
                    index: i,
                    file_name,
                    jpeg,
                    thumbnail,
                    snapshot,
                },
            });
            tracker.set(UploadStage::Capturing, capture_percent(i + 1, total));
        }

        if staged.is_empty() {
            return Err(BoardError::Render("업로드할 이미지를 만들지 못했습니다".into()));
        }

        let uploaded_ids: Vec<ItemId> = staged.iter().map(|s| s.id).collect();
        let items: Vec<StagedItem> = staged.into_iter().map(|s| s.item).collect();
        let entries: Vec<HistoryEntry> = items
            .iter()
            .map(|s| HistoryEntry::new(&form.form_name, &s.thumbnail, s.snapshot.clone()))
            .collect();

        report.chunks = self.transmit(form, items, token, tracker).await?;
        report.uploaded = uploaded_ids.len();

        self.history.extend(entries);
        if let Some(path) = &self.history_path {
            if let Err(e) = self.history.save(path) {
                tracing::warn!(path = %path.display(), error = %e, "history not saved");
            }
        }
        Ok((report, uploaded_ids))
    }

    /// 1項目を選択し、描画確認を待ってからキャプチャする
    async fn capture_item(
        &self,
        store: &mut ItemStore,
        id: ItemId,
        surface: &mut CaptureSurface,
        fields: &Arc<Vec<FieldDefinition>>,
        style: &Arc<StyleConfig>,
    ) -> Result<Vec<u8>> {
        store.select(id)?;
        let (image_path, rotation) = match store.get(id) {
            Some(item) => (item.image_path.clone(), item.rotation),
            None => return Err(BoardError::ItemNotFound(id.value())),
        };

        let source = load_source(&image_path).await?;
        let request = RenderRequest {
            source: Arc::new(source),
            rotation,
            fields: Arc::clone(fields),
            values: store.live_values().clone(),
            style: Arc::clone(style),
        };

        let ack = surface.present(request).await?;
        if !self.options.settle_delay.is_zero() {
            tokio::time::sleep(self.options.settle_delay).await;
        }
        surface.capture(&ack).await
    }

    /// チャンクに分けて順番に送る。受理されたチャンク数を返す
    async fn transmit(
        &self,
        form: &FormDefinition,
        items: Vec<StagedItem>,
        token: &str,
        tracker: &mut ProgressTracker<'_>,
    ) -> Result<usize> {
        let chunk_size = self.options.chunk_size.max(1);
        let total_count = items.len();
        let representative = items.first().map(|i| i.snapshot.clone()).unwrap_or_default();
        let chunk_count = total_count.div_ceil(chunk_size);

        tracker.set(UploadStage::Transmitting, transmit_percent(0, chunk_count));
        tracing::info!(total_count, chunk_count, "transmitting");

        let mut remaining = items.into_iter();
        for chunk_index in 0..chunk_count {
            let chunk = UploadChunk {
                form_id: form.id.clone(),
                form_name: form.form_name.clone(),
                total_count,
                chunk_index,
                representative: representative.clone(),
                items: remaining.by_ref().take(chunk_size).collect(),
            };

            let positions = chunk.queue_positions();
            tracing::debug!(chunk_index, ?positions, "sending chunk");

            match tokio::time::timeout(self.options.chunk_timeout, self.api.send_chunk(chunk, token)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(chunk_index, ?positions, acknowledged = chunk_index, "chunk rejected");
                    return Err(e);
                }
                Err(_) => {
                    return Err(BoardError::Network(format!(
                        "시간 초과: {}번째 묶음 ({}초)",
                        chunk_index + 1,
                        self.options.chunk_timeout.as_secs()
                    )));
                }
            }
            tracker.set(UploadStage::Transmitting, transmit_percent(chunk_index + 1, chunk_count));
        }
        Ok(chunk_count)
    }
}

fn check_token(token: &str) -> Result<()> {
    if token.trim().is_empty() {
        return Err(BoardError::Auth("토큰이 없습니다".into()));
    }
    Ok(())
}

/// I/O 前の検証
fn preflight(store: &ItemStore, fields: &[FieldDefinition], token: &str) -> Result<()> {
    check_token(token)?;
    if store.is_empty() {
        return Err(BoardError::EmptyQueue);
    }

    let missing: Vec<MissingFields> = store
        .items()
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let fields = missing_fields(fields, &item.snapshot);
            (!fields.is_empty()).then_some(MissingFields {
                item_index: Some(i),
                fields,
            })
        })
        .collect();
    if !missing.is_empty() {
        return Err(BoardError::Validation(missing));
    }
    Ok(())
}

fn restore_selection(store: &mut ItemStore, previous: Option<ItemId>) {
    if let Some(id) = previous {
        if store.get(id).is_some() {
            let _ = store.select(id);
        }
    }
}

/// 送信用の縮小画像とサムネイル
async fn shrink_for_upload(composite: Vec<u8>, options: &UploadOptions) -> Result<(Vec<u8>, Vec<u8>)> {
    let max_width = options.upload_max_width.max(1);
    let quality = options.upload_jpeg_quality;
    let (thumb_w, thumb_h) = options.thumbnail_size;
    let thumb_quality = options.thumbnail_jpeg_quality;

    tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, Vec<u8>)> {
        let img = image::load_from_memory(&composite)?;
        let resized = if img.width() > max_width {
            let height = ((img.height() as f64 * max_width as f64 / img.width() as f64).round() as u32).max(1);
            img.resize_exact(max_width, height, FilterType::Triangle)
        } else {
            img
        };
        let upload = encode_jpeg(&resized.to_rgba8(), quality)?;
        let thumb = resized.thumbnail(thumb_w, thumb_h);
        let thumbnail = encode_jpeg(&thumb.to_rgba8(), thumb_quality)?;
        Ok((upload, thumbnail))
    })
    .await
    .map_err(|e| BoardError::Render(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::QueueMode;
    use image::RgbaImage;

    #[tokio::test]
    async fn test_shrink_limits_width_and_thumbnail() {
        let big = RgbaImage::from_pixel(2048, 1536, image::Rgba([10, 20, 30, 255]));
        let bytes = encode_jpeg(&big, 90).unwrap();
        let (upload, thumb) = shrink_for_upload(bytes, &UploadOptions::default()).await.unwrap();

        let upload = image::load_from_memory(&upload).unwrap();
        assert_eq!((upload.width(), upload.height()), (1024, 768));
        let thumb = image::load_from_memory(&thumb).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (200, 150));
    }

    #[tokio::test]
    async fn test_shrink_keeps_small_image() {
        let small = RgbaImage::new(640, 480);
        let bytes = encode_jpeg(&small, 90).unwrap();
        let (upload, _) = shrink_for_upload(bytes, &UploadOptions::default()).await.unwrap();
        assert_eq!(image::load_from_memory(&upload).unwrap().width(), 640);
    }

    #[test]
    fn test_preflight_order() {
        let store = ItemStore::new(QueueMode::Multi);
        assert!(preflight(&store, &[], " ").unwrap_err().is_auth());
        assert!(preflight(&store, &[], "tok").unwrap_err().is_validation());
    }
}
