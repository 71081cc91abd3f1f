//! Photo Board Common Library
//!
//! プレビュー／キャプチャ双方で共有される型とレイアウト計算
//! （I/Oを持たない純粋なモジュールのみ）

pub mod types;
pub mod style;
pub mod metrics;
pub mod layout;
pub mod values;
pub mod error;

pub use types::{
    CanvasDimensions, FieldDefinition, FieldType, FormDefinition, FormValues, Rotation,
};
pub use style::{BoardPosition, BoardSize, Color, Palette, StyleConfig, StylePreset};
pub use metrics::{EstimatedMetrics, TextMeasure};
pub use layout::{compute_layout, TableLayout, ROW_HEIGHT_FACTOR};
pub use values::{initial_values, missing_fields, normalize_value};
pub use error::{Error, Result};
