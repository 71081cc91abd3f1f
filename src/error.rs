use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("설정 오류: {0}")]
    Config(String),

    /// 必須項目の未入力（I/Oより前に検出）
    #[error("입력 오류: {}", format_missing(.0))]
    Validation(Vec<MissingFields>),

    #[error("업로드할 사진이 없습니다")]
    EmptyQueue,

    #[error("사진은 최대 {0}장까지 추가할 수 있습니다")]
    QueueFull(usize),

    #[error("항목을 찾을 수 없습니다: {0}")]
    ItemNotFound(u64),

    #[error("이미지 읽기 오류: {0}")]
    ImageLoad(String),

    #[error("캡처 오류: {0}")]
    Render(String),

    #[error("저장 오류: {0}")]
    Storage(String),

    #[error("네트워크 오류: {0}")]
    Network(String),

    #[error("로그인이 필요합니다: {0}")]
    Auth(String),

    #[error("JSON 해석 오류: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO 오류: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] photo_board_common::Error),
}

/// 未入力項目（キュー内の位置ごと）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFields {
    /// 0始まりの位置。現在の入力値を検証した場合は None
    pub item_index: Option<usize>,
    pub fields: Vec<String>,
}

fn format_missing(missing: &[MissingFields]) -> String {
    missing
        .iter()
        .map(|m| match m.item_index {
            Some(i) => format!("#{} [{}]", i + 1, m.fields.join(", ")),
            None => format!("[{}]", m.fields.join(", ")),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl BoardError {
    /// 再ログインが必要なエラーか
    pub fn is_auth(&self) -> bool {
        matches!(self, BoardError::Auth(_))
    }

    /// 入力側の問題（送信前に検出され、I/Oは発生していない）
    pub fn is_validation(&self) -> bool {
        matches!(self, BoardError::Validation(_) | BoardError::EmptyQueue)
    }
}

impl From<reqwest::Error> for BoardError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BoardError::Network(format!("시간 초과: {}", e))
        } else {
            BoardError::Network(e.to_string())
        }
    }
}

impl From<image::ImageError> for BoardError {
    fn from(e: image::ImageError) -> Self {
        BoardError::ImageLoad(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BoardError>;
