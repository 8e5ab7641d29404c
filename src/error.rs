//! 에러 타입 정의

use thiserror::Error;

/// TFTP 클라이언트 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("잘못된 패킷: {reason}")]
    Malformed { reason: &'static str },

    #[error("페이로드 초과: {len}바이트 (최대 512)")]
    PayloadTooLarge { len: usize },

    #[error("응답 타임아웃: {attempts}회 시도 후 포기")]
    Timeout { attempts: u32 },

    #[error("서버 에러 (code {code}): {message}")]
    Peer { code: u16, message: String },

    #[error("전송이 이미 종료됨")]
    SessionFinished,

    #[error("유효하지 않은 주소: {0}")]
    InvalidAddress(String),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
