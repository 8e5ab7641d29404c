//! 프로토콜 패킷 정의와 직렬화
//!
//! 모든 패킷은 2바이트 big-endian opcode로 시작함 (RFC 1350)
//! - RRQ=1, WRQ=2, DATA=3, ACK=4, ERROR=5

use bytes::Bytes;

use crate::{Error, Result, BLOCK_SIZE, TRANSFER_MODE};

/// 표준 에러 코드 (RFC 1350 부록)
pub mod error_code {
    pub const NOT_DEFINED: u16 = 0;
    pub const FILE_NOT_FOUND: u16 = 1;
    pub const ACCESS_VIOLATION: u16 = 2;
    pub const DISK_FULL: u16 = 3;
    pub const ILLEGAL_OPERATION: u16 = 4;
    pub const UNKNOWN_TID: u16 = 5;
    pub const FILE_EXISTS: u16 = 6;
    pub const NO_SUCH_USER: u16 = 7;
}

/// 요청 종류 (읽기/쓰기)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOp {
    /// RRQ: 서버에서 파일 받기
    Read,

    /// WRQ: 서버로 파일 보내기
    Write,
}

impl TransferOp {
    /// 대응하는 opcode 값
    pub fn opcode(self) -> u16 {
        match self {
            TransferOp::Read => 1,
            TransferOp::Write => 2,
        }
    }
}

/// 프로토콜 패킷
///
/// opcode를 직접 비교하는 대신 enum으로 모든 소비 지점에서
/// exhaustive match를 강제함
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// 전송 요청 (RRQ/WRQ)
    Request {
        op: TransferOp,
        filename: String,
        mode: String,
    },

    /// 데이터 블록 (페이로드 0..512바이트, 512 미만이면 마지막 블록)
    Data { block: u16, payload: Bytes },

    /// 블록 확인 응답
    Ack { block: u16 },

    /// 서버 에러 통지
    Error { code: u16, message: String },
}

impl Packet {
    /// octet 모드 요청 패킷 생성
    pub fn request(op: TransferOp, filename: impl Into<String>) -> Self {
        Packet::Request {
            op,
            filename: filename.into(),
            mode: TRANSFER_MODE.to_string(),
        }
    }

    /// opcode 값 반환
    pub fn opcode(&self) -> u16 {
        match self {
            Packet::Request { op, .. } => op.opcode(),
            Packet::Data { .. } => 3,
            Packet::Ack { .. } => 4,
            Packet::Error { .. } => 5,
        }
    }

    /// 패킷을 바이트로 직렬화
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Packet::Request { op, filename, mode } => {
                let mut buf = Vec::with_capacity(4 + filename.len() + mode.len());
                buf.extend_from_slice(&op.opcode().to_be_bytes());
                buf.extend_from_slice(filename.as_bytes());
                buf.push(0);
                buf.extend_from_slice(mode.as_bytes());
                buf.push(0);
                Ok(buf)
            }
            Packet::Data { block, payload } => {
                if payload.len() > BLOCK_SIZE {
                    return Err(Error::PayloadTooLarge { len: payload.len() });
                }
                let mut buf = Vec::with_capacity(4 + payload.len());
                buf.extend_from_slice(&3u16.to_be_bytes());
                buf.extend_from_slice(&block.to_be_bytes());
                buf.extend_from_slice(payload);
                Ok(buf)
            }
            Packet::Ack { block } => {
                let mut buf = Vec::with_capacity(4);
                buf.extend_from_slice(&4u16.to_be_bytes());
                buf.extend_from_slice(&block.to_be_bytes());
                Ok(buf)
            }
            Packet::Error { code, message } => {
                let mut buf = Vec::with_capacity(5 + message.len());
                buf.extend_from_slice(&5u16.to_be_bytes());
                buf.extend_from_slice(&code.to_be_bytes());
                buf.extend_from_slice(message.as_bytes());
                buf.push(0);
                Ok(buf)
            }
        }
    }

    /// 바이트에서 패킷 역직렬화
    ///
    /// 입력을 변경하지 않으며 반환 구조체 외에는 할당하지 않음
    pub fn decode(bytes: &[u8]) -> Result<Packet> {
        if bytes.len() < 2 {
            return Err(Error::Malformed {
                reason: "opcode 없음 (2바이트 미만)",
            });
        }

        let opcode = u16::from_be_bytes([bytes[0], bytes[1]]);
        match opcode {
            1 | 2 => {
                let op = if opcode == 1 {
                    TransferOp::Read
                } else {
                    TransferOp::Write
                };
                let (filename, rest) = read_cstr(&bytes[2..]);
                let (mode, _) = read_cstr(rest);
                Ok(Packet::Request { op, filename, mode })
            }
            3 => {
                if bytes.len() < 4 {
                    return Err(Error::Malformed {
                        reason: "DATA 블록 번호 없음",
                    });
                }
                Ok(Packet::Data {
                    block: u16::from_be_bytes([bytes[2], bytes[3]]),
                    payload: Bytes::copy_from_slice(&bytes[4..]),
                })
            }
            4 => {
                if bytes.len() < 4 {
                    return Err(Error::Malformed {
                        reason: "ACK 블록 번호 없음",
                    });
                }
                Ok(Packet::Ack {
                    block: u16::from_be_bytes([bytes[2], bytes[3]]),
                })
            }
            5 => {
                if bytes.len() < 4 {
                    return Err(Error::Malformed {
                        reason: "ERROR 코드 없음",
                    });
                }
                let (message, _) = read_cstr(&bytes[4..]);
                Ok(Packet::Error {
                    code: u16::from_be_bytes([bytes[2], bytes[3]]),
                    message,
                })
            }
            _ => Err(Error::Malformed {
                reason: "알 수 없는 opcode",
            }),
        }
    }
}

/// null 종료 문자열 읽기
///
/// 종료자가 없으면 버퍼 끝까지를 필드로 취급함 (관용적 fallback,
/// 프로토콜 보장 아님)
fn read_cstr(buf: &[u8]) -> (String, &[u8]) {
    match buf.iter().position(|&b| b == 0) {
        Some(pos) => (
            String::from_utf8_lossy(&buf[..pos]).into_owned(),
            &buf[pos + 1..],
        ),
        None => (String::from_utf8_lossy(buf).into_owned(), &[]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_roundtrip() {
        for op in [TransferOp::Read, TransferOp::Write] {
            let packet = Packet::request(op, "foo.bin");
            let bytes = packet.encode().unwrap();
            let restored = Packet::decode(&bytes).unwrap();
            assert_eq!(packet, restored);
        }
    }

    #[test]
    fn test_request_wire_layout() {
        let bytes = Packet::request(TransferOp::Read, "foo").encode().unwrap();
        assert_eq!(
            bytes,
            [0, 1, b'f', b'o', b'o', 0, b'o', b'c', b't', b'e', b't', 0]
        );
    }

    #[test]
    fn test_data_roundtrip() {
        for len in [0usize, 1, 511, 512] {
            let packet = Packet::Data {
                block: 42,
                payload: Bytes::from(vec![7u8; len]),
            };
            let bytes = packet.encode().unwrap();
            assert_eq!(bytes.len(), 4 + len);
            assert_eq!(Packet::decode(&bytes).unwrap(), packet);
        }
    }

    #[test]
    fn test_data_payload_too_large() {
        let packet = Packet::Data {
            block: 1,
            payload: Bytes::from(vec![0u8; 513]),
        };
        assert!(matches!(
            packet.encode(),
            Err(Error::PayloadTooLarge { len: 513 })
        ));
    }

    #[test]
    fn test_ack_roundtrip() {
        for block in [0u16, 1, 255, 65535] {
            let packet = Packet::Ack { block };
            let bytes = packet.encode().unwrap();
            assert_eq!(bytes.len(), 4);
            assert_eq!(Packet::decode(&bytes).unwrap(), packet);
        }
    }

    #[test]
    fn test_error_roundtrip() {
        let packet = Packet::Error {
            code: error_code::FILE_NOT_FOUND,
            message: "File not found".to_string(),
        };
        let bytes = packet.encode().unwrap();
        assert_eq!(Packet::decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_decode_too_short() {
        assert!(matches!(
            Packet::decode(&[]),
            Err(Error::Malformed { .. })
        ));
        assert!(matches!(
            Packet::decode(&[0]),
            Err(Error::Malformed { .. })
        ));
        // DATA/ACK/ERROR는 블록 번호/코드 2바이트 필요
        for opcode in [3u8, 4, 5] {
            assert!(matches!(
                Packet::decode(&[0, opcode, 0]),
                Err(Error::Malformed { .. })
            ));
        }
    }

    #[test]
    fn test_decode_unknown_opcode() {
        assert!(matches!(
            Packet::decode(&[0, 6, 0, 0]),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn test_error_message_without_terminator() {
        // 종료자 없는 메시지는 버퍼 끝까지 읽는 fallback
        let bytes = [0u8, 5, 0, 1, b'o', b'o', b'p', b's'];
        match Packet::decode(&bytes).unwrap() {
            Packet::Error { code, message } => {
                assert_eq!(code, 1);
                assert_eq!(message, "oops");
            }
            other => panic!("unexpected packet: {:?}", other),
        }
    }

    #[test]
    fn test_request_without_mode_terminator() {
        let bytes = [0u8, 1, b'a', 0, b'o', b'c', b't', b'e', b't'];
        match Packet::decode(&bytes).unwrap() {
            Packet::Request { filename, mode, .. } => {
                assert_eq!(filename, "a");
                assert_eq!(mode, "octet");
            }
            other => panic!("unexpected packet: {:?}", other),
        }
    }
}
