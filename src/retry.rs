//! 재전송 컨트롤러
//!
//! "패킷 P 송신 후 조건에 맞는 응답 대기" 한 스텝을 감쌈
//! - 타임아웃: P 재전송 (기본 무제한, `Config::max_retries`로 제한 가능)
//! - foreign TID: 버리고 계속 대기 (재전송 없음, 재시도 소모 없음)
//! - 해석 불가 패킷: 버리되 횟수 제한 초과 시 실패
//! - ERROR 패킷: 즉시 상위로 전달 (스텝 종료)
//! - 조건 불일치 패킷 (중복/순서 어긋남): P 재전송

use std::net::SocketAddr;
use std::time::Duration;

use tracing::{debug, warn};

use crate::packet::Packet;
use crate::stats::TransferStats;
use crate::transport::{Incoming, TransportChannel};
use crate::{Config, Error, Result};

/// 한 스텝의 송신-대기-재전송 정책
#[derive(Debug, Clone)]
pub struct RetransmissionController {
    /// 응답 대기 윈도우
    timeout: Duration,

    /// 스텝당 재전송 한도 (`None` = 무제한)
    max_retries: Option<u32>,

    /// 해석 불가 패킷 허용 횟수
    max_decode_failures: u32,
}

impl RetransmissionController {
    pub fn new(timeout: Duration, max_retries: Option<u32>, max_decode_failures: u32) -> Self {
        Self {
            timeout,
            max_retries,
            max_decode_failures,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_millis(config.timeout_ms),
            config.max_retries,
            config.max_decode_failures,
        )
    }

    /// 패킷을 보내고 조건에 맞는 응답이 올 때까지 재전송 반복
    ///
    /// `expected_tid`가 설정되면 다른 출처의 데이터그램은 무시함.
    /// 반환값은 수락된 패킷과 그 출처 (핸드쉐이크에서 TID 고정용)
    pub async fn exchange(
        &self,
        channel: &mut TransportChannel,
        packet: &[u8],
        dest: SocketAddr,
        expected_tid: Option<SocketAddr>,
        stats: &mut TransferStats,
        mut accept: impl FnMut(&Packet) -> bool,
    ) -> Result<(Packet, SocketAddr)> {
        channel.send(dest, packet).await?;

        let mut attempts: u32 = 0;
        let mut decode_failures: u32 = 0;

        loop {
            match channel.recv(self.timeout).await? {
                Incoming::TimedOut => {
                    stats.timeouts += 1;
                    attempts += 1;
                    if let Some(max) = self.max_retries {
                        if attempts > max {
                            return Err(Error::Timeout { attempts });
                        }
                    }
                    warn!("타임아웃, 패킷 재전송 (시도 {})", attempts);
                    channel.send(dest, packet).await?;
                    stats.retransmissions += 1;
                }
                Incoming::Datagram { bytes, source } => {
                    // TID 검증을 opcode보다 먼저 수행
                    if let Some(tid) = expected_tid {
                        if source != tid {
                            stats.foreign_packets += 1;
                            warn!("foreign TID {} 패킷 무시 (기대: {})", source, tid);
                            continue;
                        }
                    }

                    let decoded = match Packet::decode(&bytes) {
                        Ok(p) => p,
                        Err(e) => {
                            decode_failures += 1;
                            if decode_failures > self.max_decode_failures {
                                return Err(e);
                            }
                            warn!("해석 불가 패킷 무시 ({}회): {}", decode_failures, e);
                            continue;
                        }
                    };

                    // 서버 에러는 재시도 대상이 아님
                    if let Packet::Error { code, message } = &decoded {
                        return Err(Error::Peer {
                            code: *code,
                            message: message.clone(),
                        });
                    }

                    if accept(&decoded) {
                        return Ok((decoded, source));
                    }

                    // 중복/순서 어긋남: 마지막 패킷 그대로 재전송
                    stats.rejected_packets += 1;
                    attempts += 1;
                    if let Some(max) = self.max_retries {
                        if attempts > max {
                            return Err(Error::Timeout { attempts });
                        }
                    }
                    debug!("조건 불일치 패킷 무시, 재전송 (opcode {})", decoded.opcode());
                    channel.send(dest, packet).await?;
                    stats.retransmissions += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UdpSocket;

    fn controller() -> RetransmissionController {
        RetransmissionController::new(Duration::from_millis(100), Some(3), 4)
    }

    #[tokio::test]
    async fn test_timeout_retries_exhausted() {
        // 응답 없는 피어: 한도만큼 재전송 후 실패
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let dest = peer.local_addr().unwrap();

        let mut channel = TransportChannel::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let mut stats = TransferStats::new();

        let bytes = Packet::Ack { block: 1 }.encode().unwrap();
        let result = controller()
            .exchange(&mut channel, &bytes, dest, None, &mut stats, |_| true)
            .await;

        assert!(matches!(result, Err(Error::Timeout { attempts: 4 })));
        assert_eq!(stats.timeouts, 4);
        assert_eq!(stats.retransmissions, 3);
    }

    #[tokio::test]
    async fn test_retransmit_then_accept() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let dest = peer.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            // 첫 수신은 무시하고 재전송된 두 번째에만 응답
            let _ = peer.recv_from(&mut buf).await.unwrap();
            let (_, from) = peer.recv_from(&mut buf).await.unwrap();
            let reply = Packet::Ack { block: 7 }.encode().unwrap();
            peer.send_to(&reply, from).await.unwrap();
        });

        let mut channel = TransportChannel::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let mut stats = TransferStats::new();

        let bytes = Packet::Ack { block: 0 }.encode().unwrap();
        let (packet, source) = controller()
            .exchange(&mut channel, &bytes, dest, Some(dest), &mut stats, |p| {
                matches!(p, Packet::Ack { block: 7 })
            })
            .await
            .unwrap();

        assert_eq!(packet, Packet::Ack { block: 7 });
        assert_eq!(source, dest);
        assert!(stats.retransmissions >= 1);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_peer_error_surfaced() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let dest = peer.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (_, from) = peer.recv_from(&mut buf).await.unwrap();
            let reply = Packet::Error {
                code: 2,
                message: "Access violation".to_string(),
            }
            .encode()
            .unwrap();
            peer.send_to(&reply, from).await.unwrap();
        });

        let mut channel = TransportChannel::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let mut stats = TransferStats::new();

        let bytes = Packet::Ack { block: 0 }.encode().unwrap();
        let result = controller()
            .exchange(&mut channel, &bytes, dest, None, &mut stats, |_| true)
            .await;

        match result {
            Err(Error::Peer { code, message }) => {
                assert_eq!(code, 2);
                assert_eq!(message, "Access violation");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_foreign_source_discarded_without_resend() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let dest = peer.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (_, from) = peer.recv_from(&mut buf).await.unwrap();

            // 다른 소켓(foreign TID)에서 끼어드는 패킷
            let intruder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            let fake = Packet::Ack { block: 9 }.encode().unwrap();
            intruder.send_to(&fake, from).await.unwrap();

            tokio::time::sleep(Duration::from_millis(30)).await;
            let reply = Packet::Ack { block: 9 }.encode().unwrap();
            peer.send_to(&reply, from).await.unwrap();

            // foreign 패킷은 재전송을 유발하지 않아야 함
            let extra =
                tokio::time::timeout(Duration::from_millis(100), peer.recv_from(&mut buf)).await;
            assert!(extra.is_err(), "unexpected retransmission");
        });

        let mut channel = TransportChannel::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let mut stats = TransferStats::new();

        let bytes = Packet::Ack { block: 0 }.encode().unwrap();
        let (packet, _) = controller()
            .exchange(&mut channel, &bytes, dest, Some(dest), &mut stats, |p| {
                matches!(p, Packet::Ack { block: 9 })
            })
            .await
            .unwrap();

        assert_eq!(packet, Packet::Ack { block: 9 });
        assert_eq!(stats.foreign_packets, 1);
        assert_eq!(stats.retransmissions, 0);
        handle.await.unwrap();
    }
}
