//! フォーム定義の取得
//!
//! サーバー（`/api/companies/{company}/teams/{team}/forms`）または
//! 同じ形式のJSONファイルからフォーム定義を読む。

use crate::error::{BoardError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use photo_board_common::FormDefinition;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// フォーム定義の取得元
#[async_trait]
pub trait FormSchemaProvider: Send + Sync {
    /// 有効なフォームの一覧
    async fn list_forms(&self) -> Result<Vec<FormDefinition>>;

    /// フォーム1件の詳細
    async fn form_detail(&self, form_id: &str) -> Result<FormDefinition>;
}

#[derive(Debug, Deserialize)]
struct FormListResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    forms: Vec<FormDefinition>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FormDetailResponse {
    #[serde(default)]
    success: bool,
    form: Option<FormDefinition>,
    error: Option<String>,
}

fn active_only(forms: Vec<FormDefinition>) -> Vec<FormDefinition> {
    forms.into_iter().filter(|f| f.is_active).collect()
}

fn server_message(error: Option<String>) -> String {
    error.unwrap_or_else(|| "서버가 실패를 반환했습니다".to_string())
}

/// HTTP 経由の取得
pub struct HttpFormProvider {
    client: reqwest::Client,
    base_url: String,
    company_id: String,
    team_id: String,
    token: String,
}

impl HttpFormProvider {
    pub fn new(
        base_url: impl Into<String>,
        company_id: impl Into<String>,
        team_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            company_id: company_id.into(),
            team_id: team_id.into(),
            token: token.into(),
        })
    }

    fn forms_url(&self) -> String {
        format!(
            "{}/api/companies/{}/teams/{}/forms",
            self.base_url, self.company_id, self.team_id
        )
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        tracing::debug!(url, "GET");
        let response = self.client.get(url).bearer_auth(&self.token).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(BoardError::Auth(format!("HTTP {}", status.as_u16())));
        }
        if !status.is_success() {
            return Err(BoardError::Network(format!("HTTP {}: {}", status.as_u16(), url)));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl FormSchemaProvider for HttpFormProvider {
    async fn list_forms(&self) -> Result<Vec<FormDefinition>> {
        let response: FormListResponse = self.get_json(&self.forms_url()).await?;
        if !response.success {
            return Err(BoardError::Network(server_message(response.error)));
        }
        Ok(active_only(response.forms))
    }

    async fn form_detail(&self, form_id: &str) -> Result<FormDefinition> {
        let url = format!("{}/{}", self.forms_url(), form_id);
        let response: FormDetailResponse = self.get_json(&url).await?;
        if !response.success {
            return Err(BoardError::Network(server_message(response.error)));
        }
        response
            .form
            .ok_or_else(|| BoardError::Network(format!("폼 정보가 없습니다: {}", form_id)))
    }
}

/// JSONファイルからの取得（オフライン・テスト用）
///
/// 一覧レスポンス `{success, forms}`・詳細レスポンス `{success, form}`・
/// フォーム配列・フォーム単体のいずれも受け付ける。
pub struct FileFormProvider {
    path: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FormFile {
    List { forms: Vec<FormDefinition> },
    Detail { form: FormDefinition },
    Array(Vec<FormDefinition>),
    Single(FormDefinition),
}

impl FileFormProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_all(&self) -> Result<Vec<FormDefinition>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| BoardError::Config(format!("{}: {}", self.path.display(), e)))?;
        let parsed: FormFile = serde_json::from_str(&content)?;
        Ok(match parsed {
            FormFile::List { forms } | FormFile::Array(forms) => forms,
            FormFile::Detail { form } | FormFile::Single(form) => vec![form],
        })
    }
}

#[async_trait]
impl FormSchemaProvider for FileFormProvider {
    async fn list_forms(&self) -> Result<Vec<FormDefinition>> {
        Ok(active_only(self.read_all().await?))
    }

    async fn form_detail(&self, form_id: &str) -> Result<FormDefinition> {
        let forms = self.read_all().await?;
        // ID指定なしならファイル先頭のフォーム
        if form_id.is_empty() {
            return forms
                .into_iter()
                .next()
                .ok_or_else(|| BoardError::Config(format!("폼이 없습니다: {}", self.path.display())));
        }
        forms
            .into_iter()
            .find(|f| f.id == form_id)
            .ok_or_else(|| BoardError::Config(format!("폼을 찾을 수 없습니다: {}", form_id)))
    }
}

/// 韓国標準時の今日
pub fn today_kst() -> NaiveDate {
    (Utc::now().naive_utc() + chrono::Duration::hours(9)).date()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const LIST_JSON: &str = r#"{
        "success": true,
        "forms": [
            {"_id": "f1", "formName": "현장점검", "fields": ["위치", {"name": "일자", "type": "date"}], "isActive": true},
            {"_id": "f2", "formName": "폐기", "fields": [], "isActive": false}
        ]
    }"#;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_file_provider_filters_inactive() {
        let file = write_temp(LIST_JSON);
        let provider = FileFormProvider::new(file.path());
        let forms = provider.list_forms().await.unwrap();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].form_name, "현장점검");
        assert_eq!(forms[0].fields.len(), 2);
    }

    #[tokio::test]
    async fn test_file_provider_detail() {
        let file = write_temp(LIST_JSON);
        let provider = FileFormProvider::new(file.path());
        assert_eq!(provider.form_detail("f2").await.unwrap().form_name, "폐기");
        assert_eq!(provider.form_detail("").await.unwrap().id, "f1");
        assert!(matches!(provider.form_detail("zz").await, Err(BoardError::Config(_))));
    }

    #[tokio::test]
    async fn test_file_provider_single_form() {
        let file = write_temp(r#"{"success": true, "form": {"id": "x", "formName": "단일", "fields": null}}"#);
        let provider = FileFormProvider::new(file.path());
        let form = provider.form_detail("x").await.unwrap();
        assert_eq!(form.form_name, "단일");
        assert!(form.fields.is_empty());
    }

    #[test]
    fn test_forms_url() {
        let provider = HttpFormProvider::new("https://example.com/", "c1", "t1", "tok").unwrap();
        assert_eq!(provider.forms_url(), "https://example.com/api/companies/c1/teams/t1/forms");
    }
}
