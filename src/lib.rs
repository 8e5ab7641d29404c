//! # tftpc
//!
//! UDP 기반 lock-step 파일 전송 프로토콜 (TFTP, RFC 1350) 클라이언트
//!
//! ## 핵심 특징
//! - **Lock-step ACK**: 블록 하나에 ACK 하나, 미확인 블록은 항상 1개 이하
//! - **TID 고정**: 핸드쉐이크 응답의 (주소, 포트)를 세션 내내 검증
//! - **타임아웃 재전송**: 응답 없으면 마지막 패킷을 그대로 재전송
//! - **Short final block**: 512바이트 미만 블록이 EOF 신호
//! - **Octet 모드**: 바이트 스트림 그대로, 변환 없음

pub mod config;
pub mod error;
pub mod packet;
pub mod retry;
pub mod session;
pub mod stats;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result};
pub use packet::{Packet, TransferOp};
pub use retry::RetransmissionController;
pub use session::{SessionState, TransferSession};
pub use stats::TransferStats;
pub use transport::{Incoming, TransportChannel};

/// 데이터 블록 최대 크기 (바이트)
pub const BLOCK_SIZE: usize = 512;

/// 데이터그램 최대 크기 (4바이트 헤더 + 512바이트 데이터)
pub const MAX_DATAGRAM_SIZE: usize = 516;

/// TFTP well-known 서버 포트
pub const DEFAULT_SERVER_PORT: u16 = 69;

/// 기본 응답 대기 타임아웃 (밀리초)
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// 유일하게 지원하는 전송 모드
pub const TRANSFER_MODE: &str = "octet";
