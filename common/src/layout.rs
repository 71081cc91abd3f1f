//! ボード（表オーバーレイ）のレイアウト計算
//!
//! プレビュー面とキャプチャ面の両方から同じ関数を呼ぶ。
//! すべての寸法は `StyleConfig::reference_width` に対する描画先幅の比で拡縮されるため、
//! 絶対サイズが違っても2つの面の見た目は比例する。
//!
//! ## 計算ルール
//! - フォント: `max(min_font_px, floor(base_font_px × size係数 × 幅/基準幅))`
//! - 列1: `max(4文字分×1.1, 最長の項目名 + 左右パディング)`
//! - 列2: `max(9文字分×1.1, 最長の値 + 左右パディング)`
//! - 表幅: 列1+列2（キャンバス幅の95%で頭打ち）
//! - 行高: `round(フォント × ROW_HEIGHT_FACTOR)`、表高: 項目数 × 行高

use crate::metrics::TextMeasure;
use crate::style::{BoardPosition, Color, Palette, StyleConfig};
use crate::types::{value_of, CanvasDimensions, FieldDefinition, FormValues};

/// 行高 = フォントサイズ × この値
pub const ROW_HEIGHT_FACTOR: f32 = 2.0;

/// 列の最小幅（文字数）
pub const MIN_COL1_CHARS: f32 = 4.0;
pub const MIN_COL2_CHARS: f32 = 9.0;
const CHAR_SLACK: f32 = 1.1;

/// 表幅の上限（キャンバス幅に対する比）
pub const MAX_TABLE_RATIO: f32 = 0.95;

/// 計算済みの表レイアウト（ピクセル）
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub col1_width: u32,
    pub col2_width: u32,
    pub table_width: u32,
    pub table_height: u32,
    pub row_height: u32,
    pub font_size: u32,
    pub cell_padding_x: u32,
    pub cell_padding_y: u32,
    pub background_color: Color,
    pub text_color: Color,
    pub border_color: Color,
    pub border_width: u32,
    pub font_family: String,
    pub position: BoardPosition,
    /// 表の左上（キャンバス座標）
    pub left: u32,
    pub top: u32,
}

impl TableLayout {
    pub fn row_count(&self) -> u32 {
        if self.row_height == 0 {
            0
        } else {
            self.table_height / self.row_height
        }
    }

    /// 表の右端・下端
    pub fn right(&self) -> u32 {
        self.left + self.table_width
    }

    pub fn bottom(&self) -> u32 {
        self.top + self.table_height
    }
}

/// レイアウトを計算
pub fn compute_layout<M: TextMeasure + ?Sized>(
    fields: &[FieldDefinition],
    values: &FormValues,
    target: CanvasDimensions,
    style: &StyleConfig,
    measure: &M,
) -> TableLayout {
    let scale = target.width as f32 / style.reference_width.max(1) as f32;

    let font_size = ((style.base_font_px * style.size.factor() * scale).floor() as u32)
        .max(style.min_font_px);
    let font_px = font_size as f32;

    let cell_padding_x = (style.cell_padding_x * scale).round() as u32;
    let cell_padding_y = (style.cell_padding_y * scale).round() as u32;
    let margin = (style.margin * scale).round() as u32;
    let border_width = if style.border_width > 0.0 {
        ((style.border_width * scale).round() as u32).max(1)
    } else {
        0
    };

    let longest_name = fields
        .iter()
        .map(|f| measure.text_width(&f.name, font_px))
        .fold(0.0_f32, f32::max);
    let longest_value = fields
        .iter()
        .map(|f| measure.text_width(value_of(values, &f.name), font_px))
        .fold(0.0_f32, f32::max);

    let padding = 2.0 * cell_padding_x as f32;
    let min_col1 = font_px * MIN_COL1_CHARS * CHAR_SLACK;
    let min_col2 = font_px * MIN_COL2_CHARS * CHAR_SLACK;
    let mut col1_width = min_col1.max(longest_name + padding).ceil() as u32;
    let mut col2_width = min_col2.max(longest_value + padding).ceil() as u32;

    let max_width = (target.width as f32 * MAX_TABLE_RATIO).floor() as u32;
    if col1_width + col2_width > max_width {
        col1_width = col1_width.min(max_width / 2);
        col2_width = max_width - col1_width;
    }
    let table_width = col1_width + col2_width;

    let row_height = (font_px * ROW_HEIGHT_FACTOR).round() as u32;
    let table_height = fields.len() as u32 * row_height;

    let palette = if fields.is_empty() {
        Palette::default()
    } else {
        style.palette
    };

    let (left, top) = anchor_offset(style.position, target, table_width, table_height, margin);

    TableLayout {
        col1_width,
        col2_width,
        table_width,
        table_height,
        row_height,
        font_size,
        cell_padding_x,
        cell_padding_y,
        background_color: palette.background,
        text_color: palette.text,
        border_color: palette.border,
        border_width,
        font_family: style.font_family.clone(),
        position: style.position,
        left,
        top,
    }
}

/// 角とマージンから表の左上座標を求める（はみ出す場合は 0 に張り付く）
pub fn anchor_offset(
    position: BoardPosition,
    canvas: CanvasDimensions,
    table_width: u32,
    table_height: u32,
    margin: u32,
) -> (u32, u32) {
    let far_x = canvas.width.saturating_sub(table_width).saturating_sub(margin);
    let far_y = canvas.height.saturating_sub(table_height).saturating_sub(margin);
    let near_x = margin.min(canvas.width.saturating_sub(table_width));
    let near_y = margin.min(canvas.height.saturating_sub(table_height));

    match position {
        BoardPosition::TopLeft => (near_x, near_y),
        BoardPosition::TopRight => (far_x, near_y),
        BoardPosition::BottomLeft => (near_x, far_y),
        BoardPosition::BottomRight => (far_x, far_y),
    }
}
