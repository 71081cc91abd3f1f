//! アップロード進捗
//!
//! `Idle → Capturing(0–90) → Transmitting(90–100) → Done | Failed`
//! 百分率は単調増加（戻らない）。

use serde::Serialize;

/// キャプチャ段階の上限
pub const CAPTURE_SHARE: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStage {
    Idle,
    Capturing,
    Transmitting,
    Done,
    Failed,
}

impl UploadStage {
    pub fn label(&self) -> &'static str {
        match self {
            UploadStage::Idle => "대기",
            UploadStage::Capturing => "캡처 중",
            UploadStage::Transmitting => "전송 중",
            UploadStage::Done => "완료",
            UploadStage::Failed => "실패",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub stage: UploadStage,
    pub percent: u8,
}

/// キャプチャ i/n 件目の進捗 `round(90 × i / n)`
pub fn capture_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let done = done.min(total) as f64;
    (CAPTURE_SHARE as f64 * done / total as f64).round() as u8
}

/// チャンク k/chunks 件目の進捗 `90 + round(10 × k / chunks)`
pub fn transmit_percent(acked: usize, chunks: usize) -> u8 {
    if chunks == 0 {
        return 100;
    }
    let acked = acked.min(chunks) as f64;
    CAPTURE_SHARE + (10.0 * acked / chunks as f64).round() as u8
}

/// 進捗の通知先
pub trait ProgressSink: Send {
    fn report(&mut self, progress: Progress);
}

impl<F: FnMut(Progress) + Send> ProgressSink for F {
    fn report(&mut self, progress: Progress) {
        self(progress)
    }
}

/// 単調性を保証して通知先へ流す
pub struct ProgressTracker<'a> {
    current: Progress,
    sink: &'a mut dyn ProgressSink,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: &'a mut dyn ProgressSink) -> Self {
        Self {
            current: Progress {
                stage: UploadStage::Idle,
                percent: 0,
            },
            sink,
        }
    }

    pub fn current(&self) -> Progress {
        self.current
    }

    /// 同じ段階・同じ値なら通知しない。百分率は下げない
    pub fn set(&mut self, stage: UploadStage, percent: u8) {
        let next = Progress {
            stage,
            percent: percent.min(100).max(self.current.percent),
        };
        if next != self.current {
            self.current = next;
            self.sink.report(next);
        }
    }

    /// 失敗（百分率はそのまま）
    pub fn fail(&mut self) {
        let percent = self.current.percent;
        self.set(UploadStage::Failed, percent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_percent() {
        assert_eq!(capture_percent(0, 4), 0);
        assert_eq!(capture_percent(1, 4), 23); // 22.5 → 23
        assert_eq!(capture_percent(4, 4), 90);
        assert_eq!(capture_percent(1, 3), 30);
        assert_eq!(capture_percent(0, 0), 0);
    }

    #[test]
    fn test_transmit_percent() {
        assert_eq!(transmit_percent(0, 3), 90);
        assert_eq!(transmit_percent(1, 3), 93);
        assert_eq!(transmit_percent(3, 3), 100);
        assert_eq!(transmit_percent(0, 0), 100);
    }

    #[test]
    fn test_tracker_is_monotonic() {
        let mut seen = Vec::new();
        let mut sink = |p: Progress| seen.push(p);
        {
            let mut tracker = ProgressTracker::new(&mut sink);
            tracker.set(UploadStage::Capturing, 30);
            tracker.set(UploadStage::Capturing, 30);
            tracker.set(UploadStage::Capturing, 10);
            tracker.set(UploadStage::Transmitting, 95);
            tracker.fail();
            assert_eq!(tracker.current().percent, 95);
        }
        let percents: Vec<u8> = seen.iter().map(|p| p.percent).collect();
        assert_eq!(percents, vec![30, 95, 95]);
        assert_eq!(seen.last().unwrap().stage, UploadStage::Failed);
    }
}
