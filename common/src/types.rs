//! フォーム・キャンバスの型定義
//!
//! 共有される型:
//! - FieldDefinition: フォームの1項目（名前・型・選択肢）
//! - FormDefinition: フォーム本体（項目一覧＋ボード表示設定）
//! - Rotation: 90度単位に正規化された回転角
//! - CanvasDimensions: 描画先1つ分のピクセルサイズ

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// 項目名 → 入力値
///
/// キー順が安定するよう BTreeMap を使う（fieldData の JSON が毎回同じになる）
pub type FormValues = BTreeMap<String, String>;

/// 値を取り出す（未入力は空文字扱い）
pub fn value_of<'a>(values: &'a FormValues, name: &str) -> &'a str {
    values.get(name).map(String::as_str).unwrap_or("")
}

/// 項目の入力型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    #[default]
    Text,
    Date,
    Number,
    Select,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Date => "date",
            FieldType::Number => "number",
            FieldType::Select => "select",
        }
    }
}

impl From<String> for FieldType {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "date" => FieldType::Date,
            "number" => FieldType::Number,
            "select" => FieldType::Select,
            // 未知の型はテキストとして扱う
            _ => FieldType::Text,
        }
    }
}

impl From<FieldType> for String {
    fn from(t: FieldType) -> Self {
        t.as_str().to_string()
    }
}

/// フォーム項目定義
///
/// サーバーは項目を文字列だけで返すこともあるため、
/// デシリアライズ時に `RawField` を経由して1つの型へ統一する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawField")]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub options: Vec<String>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            options: Vec::new(),
        }
    }

    pub fn select(name: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Select,
            options,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawField {
    Name(String),
    Full {
        #[serde(default)]
        name: String,
        #[serde(default, rename = "type")]
        field_type: Option<FieldType>,
        #[serde(default, deserialize_with = "null_as_default")]
        options: Vec<String>,
    },
}

impl From<RawField> for FieldDefinition {
    fn from(raw: RawField) -> Self {
        match raw {
            RawField::Name(name) => FieldDefinition::new(name, FieldType::Text),
            RawField::Full { name, field_type, options } => FieldDefinition {
                name,
                field_type: field_type.unwrap_or_default(),
                options,
            },
        }
    }
}

/// null を Default として読む
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_true() -> bool {
    true
}

/// フォーム定義（フォーム照会APIの1件）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDefinition {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,

    #[serde(default)]
    pub form_name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Vec<FieldDefinition>,

    /// キャプチャ解像度（"medium" / "1600x1200" など）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,

    /// ボード配色プリセット
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_background: Option<String>,

    /// ボードのフォントファミリー
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_font: Option<String>,

    /// ボード配置（topLeft / topRight / bottomLeft / bottomRight）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_position: Option<String>,

    /// ボードサイズ（small / medium / large）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_size: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// 回転角（0/90/180/270 のいずれか）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub struct Rotation(u16);

impl Rotation {
    pub const ZERO: Rotation = Rotation(0);

    /// 任意の角度を 360 で剰余し、最も近い 90 度単位へ丸める
    pub fn from_degrees(degrees: i32) -> Self {
        let normalized = degrees.rem_euclid(360);
        let quarter = ((normalized + 45) / 90) % 4;
        Rotation((quarter * 90) as u16)
    }

    pub fn degrees(self) -> u16 {
        self.0
    }

    /// 時計回りに 90 度
    pub fn rotate_cw(self) -> Self {
        Self::from_degrees(self.0 as i32 + 90)
    }

    /// 縦横が入れ替わる角度か
    pub fn swaps_axes(self) -> bool {
        matches!(self.0, 90 | 270)
    }
}

impl From<i32> for Rotation {
    fn from(degrees: i32) -> Self {
        Rotation::from_degrees(degrees)
    }
}

impl From<Rotation> for i32 {
    fn from(r: Rotation) -> Self {
        r.0 as i32
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// 描画先のピクセルサイズ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanvasDimensions {
    pub width: u32,
    pub height: u32,
}

impl CanvasDimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn swapped(self) -> Self {
        Self { width: self.height, height: self.width }
    }

    /// 回転前の画像配置サイズ（90/270 のときだけ縦横を入れ替える）
    pub fn placement_for(self, rotation: Rotation) -> Self {
        if rotation.swaps_axes() {
            self.swapped()
        } else {
            self
        }
    }

    /// 縦横比を保ったまま幅を合わせる（プレビュー面用）
    pub fn scaled_to_width(self, width: u32) -> Self {
        if self.width == 0 {
            return Self { width, height: 0 };
        }
        let height = (self.height as u64 * width as u64 / self.width as u64) as u32;
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for CanvasDimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
