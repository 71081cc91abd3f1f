//! オーバーレイ描画モジュール
//!
//! 写真（回転つき）とボードを1枚のラスタに合成する。
//! プレビュー面・キャプチャ面とも `BoardRenderer::render` だけを使い、
//! 違いはキャンバスサイズのみ。
//!
//! キャプチャ面は「描画完了の確認」を明示的に返す:
//! `CaptureSurface::present` は要求した内容のラスタ化が終わってから `RenderAck` を返し、
//! `capture` はその `RenderAck` と同じ世代のラスタだけをエンコードする。

pub mod draw;
pub mod text;

use crate::error::{BoardError, Result};
use draw::{fill_rect, stroke_rect};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use photo_board_common::types::value_of;
use photo_board_common::{
    compute_layout, CanvasDimensions, EstimatedMetrics, FieldDefinition, FormValues, Rotation,
    StyleConfig, TableLayout, TextMeasure,
};
use rusttype::Font;
use std::path::Path;
use std::sync::Arc;
use text::{draw_text, FontMetrics};

/// キャプチャのJPEG品質（再圧縮による劣化を避ける）
pub const CAPTURE_JPEG_QUALITY: u8 = 100;

/// 描画器（フォントを1つ保持する）
pub struct BoardRenderer {
    font: Option<Font<'static>>,
}

impl BoardRenderer {
    /// ファミリー名でフォントを解決する。見つからなければ文字なしで描画する
    pub fn new(font_family: &str) -> Self {
        let font = text::load_font(font_family);
        if font.is_none() {
            tracing::warn!(font_family, "no usable system font, board text will not be drawn");
        }
        Self { font }
    }

    pub fn without_font() -> Self {
        Self { font: None }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// このキャンバス用のレイアウト
    pub fn layout(
        &self,
        fields: &[FieldDefinition],
        values: &FormValues,
        canvas: CanvasDimensions,
        style: &StyleConfig,
    ) -> TableLayout {
        compute_layout(fields, values, canvas, style, self)
    }

    /// 背景写真とボードを描画
    pub fn render(
        &self,
        source: &DynamicImage,
        rotation: Rotation,
        fields: &[FieldDefinition],
        values: &FormValues,
        layout: &TableLayout,
        canvas: CanvasDimensions,
    ) -> RgbaImage {
        let mut target = RgbaImage::from_pixel(canvas.width, canvas.height, Rgba([255, 255, 255, 255]));
        if canvas.is_empty() {
            return target;
        }

        let background = fit_background(source, rotation, canvas);
        imageops::overlay(&mut target, &background, 0, 0);

        self.draw_table(&mut target, fields, values, layout);
        target
    }

    fn draw_table(&self, img: &mut RgbaImage, fields: &[FieldDefinition], values: &FormValues, layout: &TableLayout) {
        if layout.table_width == 0 || layout.table_height == 0 {
            return;
        }

        fill_rect(img, layout.left, layout.top, layout.table_width, layout.table_height, layout.background_color);

        let bw = layout.border_width;
        let last = fields.len().saturating_sub(1);
        for (i, field) in fields.iter().enumerate() {
            let row_top = layout.top + i as u32 * layout.row_height;

            // 列1の右罫線
            fill_rect(img, layout.left + layout.col1_width.saturating_sub(bw), row_top, bw, layout.row_height, layout.border_color);
            // 最終行以外は下罫線
            if i < last {
                fill_rect(img, layout.left, row_top + layout.row_height.saturating_sub(bw), layout.table_width, bw, layout.border_color);
            }

            if let Some(font) = &self.font {
                let inner_h = layout.row_height.saturating_sub(2 * layout.cell_padding_y);
                let text_y = row_top + layout.cell_padding_y;
                let font_px = layout.font_size as f32;
                draw_text(
                    img,
                    font,
                    &field.name,
                    font_px,
                    layout.left + layout.cell_padding_x,
                    text_y,
                    layout.col1_width.saturating_sub(2 * layout.cell_padding_x + bw),
                    inner_h,
                    layout.text_color,
                );
                draw_text(
                    img,
                    font,
                    value_of(values, &field.name),
                    font_px,
                    layout.left + layout.col1_width + layout.cell_padding_x,
                    text_y,
                    layout.col2_width.saturating_sub(2 * layout.cell_padding_x),
                    inner_h,
                    layout.text_color,
                );
            }
        }

        stroke_rect(img, layout.left, layout.top, layout.table_width, layout.table_height, bw, layout.border_color);
    }
}

impl TextMeasure for BoardRenderer {
    fn text_width(&self, text: &str, font_px: f32) -> f32 {
        match &self.font {
            Some(font) => FontMetrics::new(font).text_width(text, font_px),
            None => EstimatedMetrics.text_width(text, font_px),
        }
    }
}

/// 写真をキャンバスいっぱいに引き伸ばしてから回転する
///
/// 90/270 度のときは回転前の配置サイズの縦横を入れ替えておくので、
/// 回転後はちょうどキャンバスを覆う。
pub fn fit_background(source: &DynamicImage, rotation: Rotation, canvas: CanvasDimensions) -> RgbaImage {
    let placement = canvas.placement_for(rotation);
    let stretched = imageops::resize(&source.to_rgba8(), placement.width, placement.height, FilterType::Triangle);
    match rotation.degrees() {
        90 => imageops::rotate90(&stretched),
        180 => imageops::rotate180(&stretched),
        270 => imageops::rotate270(&stretched),
        _ => stretched,
    }
}

/// 写真ファイルを読み込む（ブロッキングI/Oは別スレッド）
pub async fn load_source(path: &Path) -> Result<DynamicImage> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        image::open(&path).map_err(|e| BoardError::ImageLoad(format!("{}: {}", path.display(), e)))
    })
    .await
    .map_err(|e| BoardError::Render(e.to_string()))?
}

/// JPEGにエンコード
pub fn encode_jpeg(img: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(&rgb)
        .map_err(|e| BoardError::Render(e.to_string()))?;
    Ok(out)
}

/// 1回の描画要求
#[derive(Clone)]
pub struct RenderRequest {
    pub source: Arc<DynamicImage>,
    pub rotation: Rotation,
    pub fields: Arc<Vec<FieldDefinition>>,
    pub values: FormValues,
    pub style: Arc<StyleConfig>,
}

/// プレビュー面（表示用の縮小キャンバス）
pub struct PreviewSurface {
    renderer: Arc<BoardRenderer>,
    dims: CanvasDimensions,
}

impl PreviewSurface {
    pub fn new(renderer: Arc<BoardRenderer>, dims: CanvasDimensions) -> Self {
        Self { renderer, dims }
    }

    pub fn dims(&self) -> CanvasDimensions {
        self.dims
    }

    pub fn render(&self, request: &RenderRequest) -> (TableLayout, RgbaImage) {
        let layout = self.renderer.layout(&request.fields, &request.values, self.dims, &request.style);
        let raster = self.renderer.render(
            &request.source,
            request.rotation,
            &request.fields,
            &request.values,
            &layout,
            self.dims,
        );
        (layout, raster)
    }
}

/// 描画完了の確認
#[derive(Debug, Clone, PartialEq)]
pub struct RenderAck {
    generation: u64,
    pub layout: TableLayout,
}

impl RenderAck {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// キャプチャ面（フル解像度・非表示）
///
/// 全項目でこの1面を共有するため、`&mut self` で描画とキャプチャを直列化する。
pub struct CaptureSurface {
    renderer: Arc<BoardRenderer>,
    dims: CanvasDimensions,
    generation: u64,
    painted: Option<Arc<RgbaImage>>,
}

impl CaptureSurface {
    pub fn new(renderer: Arc<BoardRenderer>, dims: CanvasDimensions) -> Self {
        Self {
            renderer,
            dims,
            generation: 0,
            painted: None,
        }
    }

    pub fn dims(&self) -> CanvasDimensions {
        self.dims
    }

    /// 描画し、ラスタ化が終わった時点で確認を返す
    pub async fn present(&mut self, request: RenderRequest) -> Result<RenderAck> {
        // 描画中は前のラスタを無効にする
        self.painted = None;
        self.generation += 1;

        let renderer = Arc::clone(&self.renderer);
        let dims = self.dims;
        let (layout, raster) = tokio::task::spawn_blocking(move || {
            let layout = renderer.layout(&request.fields, &request.values, dims, &request.style);
            let raster = renderer.render(
                &request.source,
                request.rotation,
                &request.fields,
                &request.values,
                &layout,
                dims,
            );
            (layout, raster)
        })
        .await
        .map_err(|e| BoardError::Render(format!("render task failed: {}", e)))?;

        if raster.width() != dims.width || raster.height() != dims.height {
            return Err(BoardError::Render(format!(
                "painted {}x{}, expected {}",
                raster.width(),
                raster.height(),
                dims
            )));
        }

        tracing::debug!(
            generation = self.generation,
            font = layout.font_size,
            width = layout.table_width,
            height = layout.table_height,
            "capture surface painted"
        );
        self.painted = Some(Arc::new(raster));
        Ok(RenderAck {
            generation: self.generation,
            layout,
        })
    }

    /// 確認済みのラスタをJPEGにする
    pub async fn capture(&self, ack: &RenderAck) -> Result<Vec<u8>> {
        if ack.generation != self.generation {
            return Err(BoardError::Render(format!(
                "stale render acknowledgement (ack {}, surface {})",
                ack.generation, self.generation
            )));
        }
        let raster = self
            .painted
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| BoardError::Render("capture surface has no painted frame".into()))?;

        let bytes = tokio::task::spawn_blocking(move || encode_jpeg(&raster, CAPTURE_JPEG_QUALITY))
            .await
            .map_err(|e| BoardError::Render(e.to_string()))??;
        if bytes.is_empty() {
            return Err(BoardError::Render("capture produced no output".into()));
        }
        Ok(bytes)
    }
}
