//! 전송 채널
//!
//! 바인딩된 UDP 소켓 추상화
//! - send: fire-and-forget 데이터그램 송신 (전달 보장 없음)
//! - recv: 타임아웃 한정 수신, 출처 주소 포함
//!
//! foreign TID 필터링은 채널이 아니라 재전송 계층의 책임

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;

use crate::{Result, MAX_DATAGRAM_SIZE};

/// 수신 결과
#[derive(Debug)]
pub enum Incoming {
    /// 데이터그램 도착
    Datagram { bytes: Bytes, source: SocketAddr },

    /// 타임아웃 경과
    TimedOut,
}

/// UDP 전송 채널
///
/// 세션 하나가 수명 내내 단독 소유함
pub struct TransportChannel {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl TransportChannel {
    /// 소켓 바인딩 (포트 0이면 임시 포트 자동 할당)
    pub async fn bind(bind_addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(bind_addr).await?;
        Ok(Self {
            socket,
            buf: vec![0u8; MAX_DATAGRAM_SIZE],
        })
    }

    /// 로컬 바인드 주소
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// 데이터그램 송신
    pub async fn send(&self, dest: SocketAddr, bytes: &[u8]) -> Result<()> {
        self.socket.send_to(bytes, dest).await?;
        Ok(())
    }

    /// 타임아웃 한정 수신
    pub async fn recv(&mut self, window: Duration) -> Result<Incoming> {
        match tokio::time::timeout(window, self.socket.recv_from(&mut self.buf)).await {
            Ok(Ok((len, source))) => Ok(Incoming::Datagram {
                bytes: Bytes::copy_from_slice(&self.buf[..len]),
                source,
            }),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Ok(Incoming::TimedOut),
        }
    }
}
