use crate::error::{BoardError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// トークンを上書きする環境変数
pub const TOKEN_ENV: &str = "PHOTO_BOARD_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub token: Option<String>,
    pub company_id: Option<String>,
    pub team_id: Option<String>,
    /// 原本写真の保存先（カメラロール相当）
    pub camera_root: PathBuf,
    /// 合成画像の保存先
    pub app_folder: PathBuf,
    /// 1リクエストに載せる枚数
    pub chunk_size: usize,
    /// チャンクごとの送信期限（秒）
    pub chunk_timeout_secs: u64,
    /// 描画完了後、キャプチャ前に待つ時間（ミリ秒）
    pub settle_delay_ms: u64,
    /// 送信用に縮小する最大幅（px）
    pub upload_max_width: u32,
    /// プレビュー面の幅（px）
    pub preview_width: u32,
    pub history_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let pictures = dirs::picture_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join("Pictures")))
            .unwrap_or_else(|| PathBuf::from("."));
        let data = dirs::data_dir()
            .map(|d| d.join("photo-board"))
            .unwrap_or_else(|| PathBuf::from(".photo-board"));

        Self {
            api_base_url: "https://dalgaebi-server.vercel.app".into(),
            token: None,
            company_id: None,
            team_id: None,
            camera_root: pictures.join("Camera"),
            app_folder: pictures.join("달개비현장"),
            chunk_size: 3,
            chunk_timeout_secs: 60,
            settle_delay_ms: 0,
            upload_max_width: 1024,
            preview_width: 288,
            history_path: data.join("history.json"),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| BoardError::Config("홈 디렉터리를 찾을 수 없습니다".into()))?;
        Ok(home.join(".config").join("photo-board").join("config.json"))
    }

    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(BoardError::Config("chunk_size는 1 이상이어야 합니다".into()));
        }
        if self.upload_max_width == 0 || self.preview_width == 0 {
            return Err(BoardError::Config("이미지 폭은 1 이상이어야 합니다".into()));
        }
        Ok(())
    }

    /// 認証トークン（環境変数を優先）
    pub fn get_token(&self) -> Result<String> {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                return Ok(token);
            }
        }

        self.token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| BoardError::Auth("토큰이 설정되지 않았습니다".into()))
    }

    /// 会社・チーム ID
    pub fn team_scope(&self) -> Result<(String, String)> {
        match (&self.company_id, &self.team_id) {
            (Some(c), Some(t)) if !c.is_empty() && !t.is_empty() => Ok((c.clone(), t.clone())),
            _ => Err(BoardError::Auth("회사/팀 정보가 없습니다".into())),
        }
    }

    pub fn upload_options(&self) -> crate::upload::UploadOptions {
        crate::upload::UploadOptions {
            chunk_size: self.chunk_size,
            chunk_timeout: std::time::Duration::from_secs(self.chunk_timeout_secs),
            settle_delay: std::time::Duration::from_millis(self.settle_delay_ms),
            upload_max_width: self.upload_max_width,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.chunk_size, 3);
        assert_eq!(config.upload_max_width, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"chunk_size": 5}"#).unwrap();
        assert_eq!(config.chunk_size, 5);
        assert_eq!(config.chunk_timeout_secs, 60);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let config = Config {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(BoardError::Config(_))));
    }

    #[test]
    fn test_team_scope_requires_both() {
        let config = Config {
            company_id: Some("c1".into()),
            ..Default::default()
        };
        assert!(config.team_scope().unwrap_err().is_auth());
    }
}
