//! 프로토콜 설정

use std::net::{IpAddr, SocketAddr};

use crate::{Error, Result, DEFAULT_SERVER_PORT, DEFAULT_TIMEOUT_MS};

/// TFTP 클라이언트 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 서버 well-known 포트
    pub server_port: u16,

    /// 응답 대기 타임아웃 (밀리초)
    pub timeout_ms: u64,

    /// 스텝당 최대 재전송 횟수
    ///
    /// `None`이면 무제한 — 관찰된 원 동작과 동일하며 기본값.
    /// 제한이 필요하면 명시적으로 설정할 것
    pub max_retries: Option<u32>,

    /// 같은 TID에서 온 해석 불가 패킷 허용 횟수 (초과 시 실패)
    pub max_decode_failures: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_SERVER_PORT,
            timeout_ms: DEFAULT_TIMEOUT_MS, // 2초
            max_retries: None,              // 무제한 (기본)
            max_decode_failures: 8,
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 손실 많은 네트워크용 설정
    pub fn lossy_network() -> Self {
        Self {
            server_port: DEFAULT_SERVER_PORT,
            timeout_ms: 5000,            // 5초
            max_retries: Some(16),
            max_decode_failures: 16,
        }
    }

    /// 로컬/저지연 환경용 설정
    pub fn fast_local() -> Self {
        Self {
            server_port: DEFAULT_SERVER_PORT,
            timeout_ms: 500,
            max_retries: Some(4),
            max_decode_failures: 4,
        }
    }

    /// 서버 주소 해석: 포트가 없으면 `server_port`를 붙임
    pub fn resolve_server_addr(&self, host: &str) -> Result<SocketAddr> {
        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(addr);
        }
        match host.parse::<IpAddr>() {
            Ok(ip) => Ok(SocketAddr::new(ip, self.server_port)),
            Err(_) => Err(Error::InvalidAddress(host.to_string())),
        }
    }
}
