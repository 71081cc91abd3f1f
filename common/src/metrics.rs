//! 文字列幅の計測

/// 文字列のピクセル幅を返す
///
/// プレビューとキャプチャで同じ実装を使うこと（列幅が比例しなくなる）。
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_px: f32) -> f32;
}

/// フォントなしで使う概算計測
///
/// 全角（ハングル・CJK・全角記号）は 1.0em、それ以外は 0.6em として数える。
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatedMetrics;

impl EstimatedMetrics {
    pub const NARROW_EM: f32 = 0.6;
    pub const WIDE_EM: f32 = 1.0;
}

impl TextMeasure for EstimatedMetrics {
    fn text_width(&self, text: &str, font_px: f32) -> f32 {
        let ems: f32 = text
            .chars()
            .map(|c| if is_wide(c) { Self::WIDE_EM } else { Self::NARROW_EM })
            .sum();
        ems * font_px
    }
}

/// 全角幅で描画される文字か
pub fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F      // Hangul Jamo
        | 0x2E80..=0x303E    // CJK部首・記号
        | 0x3041..=0x33FF    // かな・CJK互換
        | 0x3400..=0x4DBF    // CJK拡張A
        | 0x4E00..=0x9FFF    // CJK統合漢字
        | 0xAC00..=0xD7A3    // Hangul Syllables
        | 0xF900..=0xFAFF    // CJK互換漢字
        | 0xFF00..=0xFF60    // 全角英数
        | 0xFFE0..=0xFFE6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_is_narrow() {
        let w = EstimatedMetrics.text_width("2024-01-01", 10.0);
        assert!((w - 60.0).abs() < 0.001);
    }

    #[test]
    fn test_hangul_is_wide() {
        let w = EstimatedMetrics.text_width("김철수", 10.0);
        assert!((w - 30.0).abs() < 0.001);
    }

    #[test]
    fn test_mixed() {
        // 半角7文字（ハイフン含む）＋全角2文字
        let w = EstimatedMetrics.text_width("101동-202호", 10.0);
        assert!((w - (7.0 * 6.0 + 20.0)).abs() < 0.001);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(EstimatedMetrics.text_width("", 16.0), 0.0);
    }
}
