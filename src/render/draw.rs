//! ラスタへの塗り・罫線

use image::{Rgba, RgbaImage};
use photo_board_common::Color;

/// 1ピクセルにアルファ合成（キャンバスは常に不透明）
pub fn blend_pixel(px: &mut Rgba<u8>, color: Color, coverage: f32) {
    let alpha = (color.a as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let src = [color.r, color.g, color.b];
    for (channel, &s) in px.0.iter_mut().take(3).zip(src.iter()) {
        let blended = s as f32 * alpha + *channel as f32 * (1.0 - alpha);
        *channel = blended.round().clamp(0.0, 255.0) as u8;
    }
    px.0[3] = 255;
}

/// 矩形を塗る（キャンバス外は切り捨て）
pub fn fill_rect(img: &mut RgbaImage, x: u32, y: u32, width: u32, height: u32, color: Color) {
    if color.a == 0 {
        return;
    }
    let x_end = x.saturating_add(width).min(img.width());
    let y_end = y.saturating_add(height).min(img.height());
    for py in y..y_end {
        for px in x..x_end {
            blend_pixel(img.get_pixel_mut(px, py), color, 1.0);
        }
    }
}

/// 矩形の内側に枠線を引く
pub fn stroke_rect(img: &mut RgbaImage, x: u32, y: u32, width: u32, height: u32, thickness: u32, color: Color) {
    if thickness == 0 || width == 0 || height == 0 {
        return;
    }
    let t = thickness.min(width).min(height);
    fill_rect(img, x, y, width, t, color);
    fill_rect(img, x, y + height - t, width, t, color);
    // 上下の辺と重ねて塗らない（半透明の罫線が濃くならないように）
    let inner_h = height.saturating_sub(2 * t);
    fill_rect(img, x, y + t, t, inner_h, color);
    fill_rect(img, x + width - t, y + t, t, inner_h, color);
}
