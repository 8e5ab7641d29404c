//! 전송 세션 (프로토콜 상태 머신)
//!
//! 호출 한 번에 세션 하나. 핸드쉐이크로 TID를 고정한 뒤
//! lock-step으로 블록을 주고받으며 Complete 또는 Failed로 종료함
//!
//! - 읽기: RRQ → DATA(1)로 TID 고정 → ACK(n)/DATA(n+1) 반복,
//!   512바이트 미만 DATA 수신 시 종료 (마지막 블록에는 ACK 없음)
//! - 쓰기: WRQ → ACK(0)으로 TID 고정 → DATA(n)/ACK(n) 반복,
//!   512바이트 미만 DATA의 ACK까지 받고 종료

use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::packet::{Packet, TransferOp};
use crate::retry::RetransmissionController;
use crate::stats::TransferStats;
use crate::transport::TransportChannel;
use crate::{Config, Error, Result, BLOCK_SIZE};

/// 세션 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingHandshake,
    Transferring,
    Complete,
    Failed,
}

/// 전송 세션
///
/// 소켓과 바이트 스트림을 전송 기간 동안 단독 소유함
pub struct TransferSession {
    channel: TransportChannel,
    server_addr: SocketAddr,
    retry: RetransmissionController,
    /// 핸드쉐이크에서 고정되는 TID (주소, 포트)
    peer: Option<SocketAddr>,
    state: SessionState,
    stats: TransferStats,
}

impl TransferSession {
    /// 소켓을 바인딩하고 세션 생성
    pub async fn connect(
        config: Config,
        bind_addr: SocketAddr,
        server_addr: SocketAddr,
    ) -> Result<Self> {
        let channel = TransportChannel::bind(bind_addr).await?;
        debug!("소켓 바인딩: {}", channel.local_addr()?);

        Ok(Self {
            channel,
            server_addr,
            retry: RetransmissionController::from_config(&config),
            peer: None,
            state: SessionState::Idle,
            stats: TransferStats::new(),
        })
    }

    /// 현재 상태
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 고정된 TID (핸드쉐이크 전이면 `None`)
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// 로컬 바인드 주소
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.channel.local_addr()
    }

    /// 파일 읽기 (RRQ): 서버의 블록을 순서대로 `sink`에 기록
    pub async fn get<W>(&mut self, filename: &str, sink: &mut W) -> Result<TransferStats>
    where
        W: AsyncWrite + Unpin,
    {
        let result = self.run_get(filename, sink).await;
        self.finish(result)
    }

    /// 파일 쓰기 (WRQ): `source`의 바이트를 블록으로 나눠 서버에 전송
    pub async fn put<R>(&mut self, filename: &str, source: &mut R) -> Result<TransferStats>
    where
        R: AsyncRead + Unpin,
    {
        let result = self.run_put(filename, source).await;
        self.finish(result)
    }

    /// 종료 상태 반영: 성공이면 Complete + 통계, 실패면 Failed + 원인
    fn finish(&mut self, result: Result<()>) -> Result<TransferStats> {
        match result {
            Ok(()) => {
                self.state = SessionState::Complete;
                Ok(self.stats.clone())
            }
            Err(e) => {
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    fn begin(&mut self) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(Error::SessionFinished);
        }
        self.state = SessionState::AwaitingHandshake;
        // 통계는 connect가 아니라 전송 시작부터 측정
        self.stats.started_at = Instant::now();
        Ok(())
    }

    async fn run_get<W>(&mut self, filename: &str, sink: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        self.begin()?;

        let request = Packet::request(TransferOp::Read, filename).encode()?;
        info!("RRQ '{}' → {}", filename, self.server_addr);

        // 핸드쉐이크: 블록 1 DATA만 수락, 그 출처가 TID가 됨
        let (first, tid) = self
            .retry
            .exchange(
                &mut self.channel,
                &request,
                self.server_addr,
                None,
                &mut self.stats,
                |p| matches!(p, Packet::Data { block: 1, .. }),
            )
            .await?;

        self.peer = Some(tid);
        self.state = SessionState::Transferring;
        debug!("TID 고정: {}", tid);

        let mut expected: u16 = 1;
        let mut current = first;

        loop {
            let payload = match current {
                Packet::Data { payload, .. } => payload,
                _ => {
                    return Err(Error::Malformed {
                        reason: "DATA가 아닌 패킷 수락됨",
                    })
                }
            };

            sink.write_all(&payload).await?;
            self.stats.record_block(payload.len());
            debug!("DATA {} 수신: {}바이트", expected, payload.len());

            // short final block: 소비만 하고 더 이상 ACK하지 않음
            if payload.len() < BLOCK_SIZE {
                sink.flush().await?;
                info!(
                    "수신 완료: {} 블록, {} 바이트",
                    self.stats.blocks, self.stats.bytes_transferred
                );
                return Ok(());
            }

            let ack = Packet::Ack { block: expected }.encode()?;
            let next = next_block(expected);

            let (packet, _) = self
                .retry
                .exchange(
                    &mut self.channel,
                    &ack,
                    tid,
                    Some(tid),
                    &mut self.stats,
                    |p| matches!(p, Packet::Data { block, .. } if *block == next),
                )
                .await?;

            expected = next;
            current = packet;
        }
    }

    async fn run_put<R>(&mut self, filename: &str, source: &mut R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        self.begin()?;

        let request = Packet::request(TransferOp::Write, filename).encode()?;
        info!("WRQ '{}' → {}", filename, self.server_addr);

        // 핸드쉐이크: 블록 0 ACK만 수락
        let (_, tid) = self
            .retry
            .exchange(
                &mut self.channel,
                &request,
                self.server_addr,
                None,
                &mut self.stats,
                |p| matches!(p, Packet::Ack { block: 0 }),
            )
            .await?;

        self.peer = Some(tid);
        self.state = SessionState::Transferring;
        debug!("TID 고정: {}", tid);

        let mut block: u16 = 1;
        let mut chunk = vec![0u8; BLOCK_SIZE];

        loop {
            let len = fill_chunk(source, &mut chunk).await?;
            let data = Packet::Data {
                block,
                payload: Bytes::copy_from_slice(&chunk[..len]),
            }
            .encode()?;

            let expect = block;
            self.retry
                .exchange(
                    &mut self.channel,
                    &data,
                    tid,
                    Some(tid),
                    &mut self.stats,
                    |p| matches!(p, Packet::Ack { block } if *block == expect),
                )
                .await?;

            self.stats.record_block(len);
            debug!("DATA {} 확인: {}바이트", block, len);

            // short final block 전송 + ACK 수신으로 종료
            // (512의 배수 파일은 빈 블록을 한 번 더 보냄)
            if len < BLOCK_SIZE {
                info!(
                    "송신 완료: {} 블록, {} 바이트",
                    self.stats.blocks, self.stats.bytes_transferred
                );
                return Ok(());
            }

            block = next_block(block);
        }
    }
}

/// 다음 블록 번호 (65535 다음은 0으로 wrap)
fn next_block(block: u16) -> u16 {
    block.wrapping_add(1)
}

/// 스트림에서 최대 512바이트 채우기
///
/// short read를 반복해서 블록을 가득 채우거나 EOF에서 멈춤
async fn fill_chunk<R: AsyncRead + Unpin>(source: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
