//! ボードの表示スタイル
//!
//! フォームの boardBackground / boardFont / boardPosition / boardSize / resolution を
//! 解決済みの StyleConfig に変換する。

use crate::error::{Error, Result};
use crate::types::{CanvasDimensions, FormDefinition};

/// 基準キャプチャ幅（px）。フォントの基本サイズはこの幅に対する値
pub const REFERENCE_WIDTH: u32 = 1024;

/// 既定のキャプチャキャンバス（4:3）
pub const DEFAULT_CAPTURE: CanvasDimensions = CanvasDimensions::new(1024, 768);

/// RGBA色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// 明るさの最大端（白）か
    pub fn is_light_extreme(&self) -> bool {
        self.r == 255 && self.g == 255 && self.b == 255
    }

    /// 知覚輝度（0〜255）
    pub fn luminance(&self) -> f32 {
        0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32
    }

    /// CSS風の色文字列を解析
    ///
    /// `#rgb` `#rrggbb` `#rrggbbaa` `rgb(r,g,b)` `rgba(r,g,b,a)` と一部の色名に対応
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        let invalid = || Error::InvalidColor(s.clone());

        match s.as_str() {
            "white" => return Ok(Color::WHITE),
            "black" => return Ok(Color::BLACK),
            "yellow" => return Ok(Color::rgb(255, 235, 59)),
            "transparent" => return Ok(Color::TRANSPARENT),
            _ => {}
        }

        if let Some(hex) = s.strip_prefix('#') {
            let digits: Vec<u8> = hex
                .chars()
                .map(|c| c.to_digit(16).map(|d| d as u8))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(invalid)?;
            return match digits.len() {
                3 => Ok(Color::rgb(digits[0] * 17, digits[1] * 17, digits[2] * 17)),
                6 | 8 => {
                    let byte = |i: usize| digits[i] * 16 + digits[i + 1];
                    let a = if digits.len() == 8 { byte(6) } else { 255 };
                    Ok(Color::rgba(byte(0), byte(2), byte(4), a))
                }
                _ => Err(invalid()),
            };
        }

        let inner = s
            .strip_prefix("rgba(")
            .or_else(|| s.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(invalid)?;
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        if parts.len() != 3 && parts.len() != 4 {
            return Err(invalid());
        }
        let channel = |p: &str| p.parse::<u8>().map_err(|_| invalid());
        let alpha = match parts.get(3) {
            Some(p) => {
                let a: f32 = p.parse().map_err(|_| invalid())?;
                (a.clamp(0.0, 1.0) * 255.0).round() as u8
            }
            None => 255,
        };
        Ok(Color::rgba(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, alpha))
    }
}

/// 配色プリセット
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StylePreset {
    #[default]
    Light,
    Dark,
    Yellow,
    Green,
}

impl StylePreset {
    /// 未知の名前は既定（Light）
    pub fn from_name(name: &str) -> Self {
        Self::lookup(name).unwrap_or_default()
    }

    pub fn lookup(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "light" | "white" => Some(StylePreset::Light),
            "dark" | "black" => Some(StylePreset::Dark),
            "yellow" => Some(StylePreset::Yellow),
            "green" | "blackboard" => Some(StylePreset::Green),
            _ => None,
        }
    }

    pub fn palette(&self) -> Palette {
        let palette = match self {
            StylePreset::Light => Palette {
                background: Color::WHITE,
                text: Color::BLACK,
                border: Color::rgba(0, 0, 0, 77),
            },
            StylePreset::Dark => Palette {
                background: Color::rgba(17, 17, 17, 230),
                text: Color::WHITE,
                border: Color::rgba(255, 255, 255, 77),
            },
            StylePreset::Yellow => Palette {
                background: Color::rgb(255, 235, 59),
                text: Color::BLACK,
                border: Color::BLACK,
            },
            StylePreset::Green => Palette {
                background: Color::rgb(30, 77, 43),
                text: Color::WHITE,
                border: Color::rgba(255, 255, 255, 128),
            },
        };
        palette.with_contrast_rule()
    }
}

/// 背景・文字・罫線の色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Palette {
    pub background: Color,
    pub text: Color,
    pub border: Color,
}

impl Palette {
    /// 任意の背景色から、読める文字色を選んだ配色を作る
    pub fn from_background(background: Color) -> Self {
        let text = if background.luminance() < 128.0 {
            Color::WHITE
        } else {
            Color::BLACK
        };
        Palette {
            background,
            text,
            border: Color::rgba(text.r, text.g, text.b, 77),
        }
        .with_contrast_rule()
    }

    /// 文字色が白のときは罫線も白にそろえる
    pub fn with_contrast_rule(mut self) -> Self {
        if self.text.is_light_extreme() {
            self.border = self.text;
        }
        self
    }
}

impl Default for Palette {
    fn default() -> Self {
        StylePreset::Light.palette()
    }
}

/// ボードを置くキャンバスの角
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BoardPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

impl BoardPosition {
    pub fn from_name(name: &str) -> Self {
        let key: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "topleft" => BoardPosition::TopLeft,
            "topright" => BoardPosition::TopRight,
            "bottomleft" => BoardPosition::BottomLeft,
            _ => BoardPosition::BottomRight,
        }
    }
}

/// ボードの大きさ（基本フォントへの倍率）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BoardSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl BoardSize {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "small" | "s" => BoardSize::Small,
            "large" | "l" => BoardSize::Large,
            _ => BoardSize::Medium,
        }
    }

    pub fn factor(&self) -> f32 {
        match self {
            BoardSize::Small => 0.8,
            BoardSize::Medium => 1.0,
            BoardSize::Large => 1.25,
        }
    }
}

/// 解決済みのボードスタイル
///
/// プレビュー／キャプチャの両方で同じ値を使う。ピクセル値はすべて
/// `reference_width` 幅のキャンバスに対するもので、描画先の幅に比例して拡縮される。
#[derive(Debug, Clone, PartialEq)]
pub struct StyleConfig {
    pub preset: StylePreset,
    pub palette: Palette,
    pub font_family: String,
    pub position: BoardPosition,
    pub size: BoardSize,
    pub base_font_px: f32,
    pub min_font_px: u32,
    pub cell_padding_x: f32,
    pub cell_padding_y: f32,
    pub border_width: f32,
    pub margin: f32,
    pub reference_width: u32,
    /// キャプチャ面のサイズ
    pub capture: CanvasDimensions,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            preset: StylePreset::Light,
            palette: Palette::default(),
            font_family: "sans-serif".to_string(),
            position: BoardPosition::BottomRight,
            size: BoardSize::Medium,
            base_font_px: 16.0,
            min_font_px: 10,
            cell_padding_x: 2.0,
            cell_padding_y: 0.0,
            border_width: 1.0,
            margin: 0.0,
            reference_width: REFERENCE_WIDTH,
            capture: DEFAULT_CAPTURE,
        }
    }
}

impl StyleConfig {
    /// フォーム設定からスタイルを解決
    ///
    /// 解像度の指定が不正な場合は既定のキャプチャサイズにフォールバックする。
    pub fn from_form(form: &FormDefinition) -> Self {
        let mut style = StyleConfig::default();

        // プリセット名 → 色指定 → 既定 の順
        if let Some(bg) = form.board_background.as_deref() {
            match (StylePreset::lookup(bg), Color::parse(bg)) {
                (Some(preset), _) => {
                    style.preset = preset;
                    style.palette = preset.palette();
                }
                (None, Ok(color)) => style = style.with_palette(Palette::from_background(color)),
                (None, Err(_)) => {}
            }
        }
        if let Some(font) = form.board_font.as_deref().filter(|f| !f.trim().is_empty()) {
            style.font_family = font.trim().to_string();
        }
        if let Some(pos) = form.board_position.as_deref() {
            style.position = BoardPosition::from_name(pos);
        }
        if let Some(size) = form.board_size.as_deref() {
            style.size = BoardSize::from_name(size);
        }
        if let Some(res) = form.resolution.as_deref() {
            if let Ok(dims) = parse_resolution(res) {
                style.capture = dims;
                style.reference_width = dims.width;
            }
        }

        style
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette.with_contrast_rule();
        self
    }
}

/// 解像度指定を解析（プリセット名 or "WxH"）
pub fn parse_resolution(s: &str) -> Result<CanvasDimensions> {
    let key = s.trim().to_lowercase();
    match key.as_str() {
        "low" => return Ok(CanvasDimensions::new(800, 600)),
        "medium" | "" => return Ok(DEFAULT_CAPTURE),
        "high" => return Ok(CanvasDimensions::new(1600, 1200)),
        _ => {}
    }

    let (w, h) = key
        .split_once(['x', '*'])
        .ok_or_else(|| Error::InvalidResolution(s.to_string()))?;
    let width: u32 = w.trim().parse().map_err(|_| Error::InvalidResolution(s.to_string()))?;
    let height: u32 = h.trim().parse().map_err(|_| Error::InvalidResolution(s.to_string()))?;
    if width == 0 || height == 0 {
        return Err(Error::InvalidResolution(s.to_string()));
    }
    Ok(CanvasDimensions::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_colors() {
        assert_eq!(Color::parse("#fff").unwrap(), Color::WHITE);
        assert_eq!(Color::parse("#000000").unwrap(), Color::BLACK);
        assert_eq!(Color::parse("#11223380").unwrap(), Color::rgba(0x11, 0x22, 0x33, 0x80));
        assert!(Color::parse("#12").is_err());
        assert!(Color::parse("#zzz").is_err());
    }

    #[test]
    fn test_parse_rgba() {
        assert_eq!(Color::parse("rgba(0,0,0,0.3)").unwrap(), Color::rgba(0, 0, 0, 77));
        assert_eq!(Color::parse("rgb(10, 20, 30)").unwrap(), Color::rgb(10, 20, 30));
        assert!(Color::parse("rgba(1,2)").is_err());
    }

    #[test]
    fn test_unknown_preset_falls_back_to_light() {
        assert_eq!(StylePreset::from_name("neon"), StylePreset::Light);
        assert_eq!(StylePreset::from_name("neon").palette(), Palette::default());
    }

    #[test]
    fn test_white_text_forces_border() {
        let dark = StylePreset::Dark.palette();
        assert_eq!(dark.text, Color::WHITE);
        assert_eq!(dark.border, Color::WHITE);

        let custom = Palette {
            background: Color::BLACK,
            text: Color::WHITE,
            border: Color::rgb(1, 2, 3),
        }
        .with_contrast_rule();
        assert_eq!(custom.border, Color::WHITE);
    }

    #[test]
    fn test_custom_background_color() {
        let form = FormDefinition {
            board_background: Some("#1e4d2b".into()),
            ..Default::default()
        };
        let style = StyleConfig::from_form(&form);
        assert_eq!(style.palette.background, Color::rgb(0x1e, 0x4d, 0x2b));
        assert_eq!(style.palette.text, Color::WHITE);
        assert_eq!(style.palette.border, Color::WHITE);

        let light = Palette::from_background(Color::rgb(250, 250, 210));
        assert_eq!(light.text, Color::BLACK);
        assert_eq!(light.border, Color::rgba(0, 0, 0, 77));
    }

    #[test]
    fn test_board_position_names() {
        assert_eq!(BoardPosition::from_name("topLeft"), BoardPosition::TopLeft);
        assert_eq!(BoardPosition::from_name("top_right"), BoardPosition::TopRight);
        assert_eq!(BoardPosition::from_name("bottom-left"), BoardPosition::BottomLeft);
        assert_eq!(BoardPosition::from_name("center"), BoardPosition::BottomRight);
    }

    #[test]
    fn test_parse_resolution() {
        assert_eq!(parse_resolution("high").unwrap(), CanvasDimensions::new(1600, 1200));
        assert_eq!(parse_resolution("1280x960").unwrap(), CanvasDimensions::new(1280, 960));
        assert!(parse_resolution("0x10").is_err());
        assert!(parse_resolution("big").is_err());
    }

    #[test]
    fn test_style_from_form() {
        let form = FormDefinition {
            board_background: Some("dark".into()),
            board_font: Some("Noto Sans KR".into()),
            board_position: Some("topRight".into()),
            board_size: Some("large".into()),
            resolution: Some("1600x1200".into()),
            ..Default::default()
        };
        let style = StyleConfig::from_form(&form);
        assert_eq!(style.preset, StylePreset::Dark);
        assert_eq!(style.font_family, "Noto Sans KR");
        assert_eq!(style.position, BoardPosition::TopRight);
        assert_eq!(style.size, BoardSize::Large);
        assert_eq!(style.capture, CanvasDimensions::new(1600, 1200));
        assert_eq!(style.reference_width, 1600);
    }

    #[test]
    fn test_style_from_form_bad_resolution_keeps_default() {
        let form = FormDefinition {
            resolution: Some("huge".into()),
            ..Default::default()
        };
        let style = StyleConfig::from_form(&form);
        assert_eq!(style.capture, DEFAULT_CAPTURE);
    }
}
