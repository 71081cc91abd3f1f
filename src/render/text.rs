//! システムフォントの解決と文字描画

use super::draw::blend_pixel;
use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use image::RgbaImage;
use photo_board_common::{Color, TextMeasure};
use rusttype::{point, Font, Scale};
use std::sync::OnceLock;

/// ハングルを含むフォントの候補（指定ファミリーの次に試す）
const HANGUL_FALLBACKS: &[&str] = &[
    "Noto Sans CJK KR",
    "Noto Sans KR",
    "NanumGothic",
    "Malgun Gothic",
    "Apple SD Gothic Neo",
];

fn db() -> &'static Database {
    static DB: OnceLock<Database> = OnceLock::new();
    DB.get_or_init(|| {
        let mut db = Database::new();
        db.load_system_fonts();
        db
    })
}

/// ファミリー名からフォントを読み込む
///
/// 指定名 → ハングル対応フォント → sans-serif の順に探す。
pub fn load_font(family: &str) -> Option<Font<'static>> {
    let requested = match family.trim() {
        "" | "sans-serif" | "system" => None,
        other => Some(other),
    };

    let mut candidates: Vec<Family<'_>> = Vec::new();
    if let Some(name) = requested {
        candidates.push(Family::Name(name));
    }
    candidates.extend(HANGUL_FALLBACKS.iter().map(|n| Family::Name(n)));
    candidates.push(Family::SansSerif);

    candidates.into_iter().find_map(|f| query_font(f))
}

fn query_font(family: Family<'_>) -> Option<Font<'static>> {
    let families = [family];
    let query = Query {
        families: &families,
        weight: Weight::BOLD,
        stretch: Stretch::Normal,
        style: Style::Normal,
    };

    let id = db().query(&query)?;
    let face = db().face(id)?;
    let index = face.index;

    let bytes = match &face.source {
        fontdb::Source::File(path) => std::fs::read(path).ok()?,
        fontdb::Source::SharedFile(path, _) => std::fs::read(path).ok()?,
        fontdb::Source::Binary(bytes) => bytes.as_ref().as_ref().to_vec(),
    };
    Font::try_from_vec_and_index(bytes, index)
}

/// rusttype フォントによる文字幅計測
pub struct FontMetrics<'a> {
    font: &'a Font<'static>,
}

impl<'a> FontMetrics<'a> {
    pub fn new(font: &'a Font<'static>) -> Self {
        Self { font }
    }
}

impl TextMeasure for FontMetrics<'_> {
    fn text_width(&self, text: &str, font_px: f32) -> f32 {
        let scale = Scale::uniform(font_px);
        self.font
            .layout(text, scale, point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
    }
}

/// セル内に1行描画する（縦中央揃え、セル右端で切る）
#[allow(clippy::too_many_arguments)]
pub fn draw_text(
    img: &mut RgbaImage,
    font: &Font<'static>,
    text: &str,
    font_px: f32,
    x: u32,
    y: u32,
    max_width: u32,
    box_height: u32,
    color: Color,
) {
    if text.is_empty() || max_width == 0 {
        return;
    }

    let scale = Scale::uniform(font_px);
    let v = font.v_metrics(scale);
    let text_height = v.ascent - v.descent;
    let baseline = y as f32 + (box_height as f32 - text_height) / 2.0 + v.ascent;

    let clip_right = x.saturating_add(max_width).min(img.width()) as i32;
    let clip_bottom = y.saturating_add(box_height).min(img.height()) as i32;

    for glyph in font.layout(text, scale, point(x as f32, baseline)) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, coverage| {
            let px = bb.min.x + gx as i32;
            let py = bb.min.y + gy as i32;
            if px < x as i32 || px >= clip_right || py < y as i32 || py >= clip_bottom {
                return;
            }
            blend_pixel(img.get_pixel_mut(px as u32, py as u32), color, coverage);
        });
    }
}
