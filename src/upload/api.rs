//! 送信先 API
//!
//! 1チャンク = 1回の multipart POST（`/api/uploadPhoto`）。

use crate::error::{BoardError, Result};
use async_trait::async_trait;
use photo_board_common::FormValues;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

/// 送信準備ができた1枚
#[derive(Debug, Clone)]
pub struct StagedItem {
    /// キュー内の位置（0始まり）
    pub index: usize,
    pub file_name: String,
    /// 送信用に縮小した合成画像
    pub jpeg: Vec<u8>,
    pub thumbnail: Vec<u8>,
    pub snapshot: FormValues,
}

/// 1回のリクエストで送る単位
#[derive(Debug, Clone)]
pub struct UploadChunk {
    pub form_id: String,
    pub form_name: String,
    /// 今回の送信全体の枚数
    pub total_count: usize,
    /// 0始まりのチャンク番号
    pub chunk_index: usize,
    /// 先頭項目の入力値
    pub representative: FormValues,
    pub items: Vec<StagedItem>,
}

impl UploadChunk {
    pub fn batch_size(&self) -> usize {
        self.items.len()
    }

    /// 含まれる項目のキュー内位置
    pub fn queue_positions(&self) -> Vec<usize> {
        self.items.iter().map(|item| item.index).collect()
    }

    /// multipart 本体。項目ごとのキーはチャンク内の位置（0始まり）
    pub fn to_multipart(&self) -> Result<Form> {
        let mut form = Form::new()
            .text("formId", self.form_id.clone())
            .text("formName", self.form_name.clone())
            .text("totalCount", self.total_count.to_string())
            .text("batchSize", self.batch_size().to_string())
            .text("chunkIndex", self.chunk_index.to_string())
            .text("representativeData", serde_json::to_string(&self.representative)?);

        for (i, item) in self.items.iter().enumerate() {
            let file = Part::bytes(item.jpeg.clone())
                .file_name(item.file_name.clone())
                .mime_str("image/jpeg")?;
            let thumb = Part::bytes(item.thumbnail.clone())
                .file_name(format!("thumb_{}", item.file_name))
                .mime_str("image/jpeg")?;
            form = form
                .part(format!("file_{}", i), file)
                .part(format!("thumbnail_{}", i), thumb)
                .text(format!("fieldData_{}", i), serde_json::to_string(&item.snapshot)?);
        }
        Ok(form)
    }
}

/// 送信先
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// 1チャンク送信。サーバーが受理したら Ok
    async fn send_chunk(&self, chunk: UploadChunk, token: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    error: Option<String>,
}

/// HTTP 実装
pub struct HttpRemoteApi {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRemoteApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/uploadPhoto", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn send_chunk(&self, chunk: UploadChunk, token: &str) -> Result<()> {
        let chunk_index = chunk.chunk_index;
        let form = chunk.to_multipart()?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(BoardError::Auth(format!("HTTP {}", status.as_u16())));
        }

        let body = response.text().await?;
        let parsed: Option<UploadResponse> = serde_json::from_str(&body).ok();
        match parsed {
            Some(r) if status.is_success() && r.success => {
                tracing::debug!(chunk_index, "chunk accepted");
                Ok(())
            }
            Some(r) => Err(BoardError::Network(
                r.error.unwrap_or_else(|| format!("서버 응답 오류 (HTTP {})", status.as_u16())),
            )),
            None => Err(BoardError::Network(format!(
                "응답을 해석할 수 없습니다 (HTTP {})",
                status.as_u16()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let api = HttpRemoteApi::new("https://example.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(api.endpoint(), "https://example.com/api/uploadPhoto");
    }

    #[test]
    fn test_chunk_multipart_builds() {
        let chunk = UploadChunk {
            form_id: "f1".into(),
            form_name: "점검".into(),
            total_count: 4,
            chunk_index: 1,
            representative: FormValues::new(),
            items: vec![StagedItem {
                index: 3,
                file_name: "점검_4_1.jpg".into(),
                jpeg: vec![1, 2, 3],
                thumbnail: vec![4],
                snapshot: FormValues::new(),
            }],
        };
        assert_eq!(chunk.batch_size(), 1);
        assert_eq!(chunk.queue_positions(), vec![3]);
        assert!(chunk.to_multipart().is_ok());
    }
}
