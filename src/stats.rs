//! 전송 통계

use std::time::{Duration, Instant};

/// 한 세션의 전송 통계
#[derive(Debug, Clone)]
pub struct TransferStats {
    /// 전송(또는 수신)된 총 바이트
    pub bytes_transferred: u64,

    /// 교환된 데이터 블록 수
    pub blocks: u64,

    /// 재전송된 패킷 수
    pub retransmissions: u64,

    /// 타임아웃 발생 수
    pub timeouts: u64,

    /// 버려진 foreign TID 패킷 수
    pub foreign_packets: u64,

    /// 잘못된 블록 번호/opcode로 버려진 패킷 수
    pub rejected_packets: u64,

    /// 세션 시작 시간
    pub started_at: Instant,
}

impl Default for TransferStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferStats {
    pub fn new() -> Self {
        Self {
            bytes_transferred: 0,
            blocks: 0,
            retransmissions: 0,
            timeouts: 0,
            foreign_packets: 0,
            rejected_packets: 0,
            started_at: Instant::now(),
        }
    }

    /// 블록 전송 기록
    pub fn record_block(&mut self, payload_len: usize) {
        self.blocks += 1;
        self.bytes_transferred += payload_len as u64;
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// 바이트 처리율 계산 (bytes/sec)
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.bytes_transferred as f64 / secs
    }
}
