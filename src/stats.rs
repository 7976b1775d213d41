//! 전송 통계

use std::time::{Duration, Instant};

/// 진행률 콜백: `(완료 블록 수, 총 블록 수)`
pub type ProgressFn<'a> = Box<dyn FnMut(usize, usize) + Send + 'a>;

/// 세션 단위 전송 통계
#[derive(Debug, Clone)]
pub struct TransferStats {
    /// 시작 시간
    pub start_time: Instant,

    /// 협상된 총 블록 수
    pub total_blocks: usize,

    /// 확인 완료된 블록 수
    pub completed_blocks: usize,

    /// 확인 완료된 페이로드 바이트
    pub total_bytes: u64,

    /// 같은 블록 재전송 횟수 (송신측)
    pub resent_blocks: u64,

    /// 재전송 요청 횟수 (수신측)
    pub resend_requests: u64,

    /// 손상/형식 오류 패킷 수
    pub corrupt_packets: u64,

    /// 타임아웃 수
    pub timeouts: u64,
}

impl TransferStats {
    pub fn new(total_blocks: usize) -> Self {
        Self {
            start_time: Instant::now(),
            total_blocks,
            completed_blocks: 0,
            total_bytes: 0,
            resent_blocks: 0,
            resend_requests: 0,
            corrupt_packets: 0,
            timeouts: 0,
        }
    }

    /// 블록 확인 기록
    pub fn record_block(&mut self, size: usize) {
        self.completed_blocks += 1;
        self.total_bytes += size as u64;
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 진행률 (0.0 ~ 1.0), 빈 파일은 1.0
    pub fn progress(&self) -> f64 {
        if self.total_blocks == 0 {
            return 1.0;
        }
        self.completed_blocks as f64 / self.total_blocks as f64
    }

    /// 처리율 (bytes/sec)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }
        self.total_bytes as f64 / elapsed
    }

    /// 모든 블록 완료 여부
    pub fn is_complete(&self) -> bool {
        self.completed_blocks >= self.total_blocks
    }

    /// `every` 블록마다, 그리고 마지막 블록에서 진행률 로그
    pub fn should_report(&self, every: usize) -> bool {
        self.is_complete() || (every > 0 && self.completed_blocks % every == 0)
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "Elapsed: {:.2}s | Blocks: {}/{} | Bytes: {} | Throughput: {:.2} KB/s | Resent: {} | Corrupt: {} | Timeouts: {}",
            self.elapsed().as_secs_f64(),
            self.completed_blocks,
            self.total_blocks,
            self.total_bytes,
            self.throughput() / 1_000.0,
            self.resent_blocks + self.resend_requests,
            self.corrupt_packets,
            self.timeouts,
        )
    }
}

impl Default for TransferStats {
    fn default() -> Self {
        Self::new(0)
    }
}
