//! tftpc 클라이언트 - lock-step TFTP 전송
//!
//! 블록 하나에 ACK 하나, 타임아웃 재전송 기반 파일 송수신 클라이언트
//!
//! 사용법:
//!   cargo run --release --bin tftpc -- [OPTIONS]
//!
//! 예시:
//!   # 서버에서 파일 받기
//!   cargo run --release --bin tftpc -- --server 127.0.0.1:69 --get remote.bin -o local.bin
//!
//!   # 서버로 파일 보내기
//!   cargo run --release --bin tftpc -- -s 127.0.0.1:69 --put local.bin

use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::fs::File;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tftpc::{Config, TransferSession};

/// 클라이언트 설정
struct ClientArgs {
    server: String,
    bind_addr: SocketAddr,
    get: Option<String>,
    put: Option<String>,
    local_path: Option<PathBuf>,
    config: Config,
}

impl Default for ClientArgs {
    fn default() -> Self {
        Self {
            server: "127.0.0.1".to_string(),
            bind_addr: "0.0.0.0:0".parse().unwrap(),
            get: None,
            put: None,
            local_path: None,
            config: Config::default(),
        }
    }
}

fn parse_args() -> ClientArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = ClientArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--server" | "-s" => {
                if i + 1 < args.len() {
                    parsed.server = args[i + 1].clone();
                    i += 1;
                }
            }
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    parsed.bind_addr = args[i + 1].parse().expect("유효한 주소 필요");
                    i += 1;
                }
            }
            "--get" | "-g" => {
                if i + 1 < args.len() {
                    parsed.get = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--put" | "-p" => {
                if i + 1 < args.len() {
                    parsed.put = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--output" | "-o" => {
                if i + 1 < args.len() {
                    parsed.local_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--timeout" => {
                if i + 1 < args.len() {
                    parsed.config.timeout_ms = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--retries" => {
                if i + 1 < args.len() {
                    parsed.config.max_retries =
                        Some(args[i + 1].parse().expect("유효한 숫자 필요"));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!(
                    r#"tftpc - lock-step TFTP 클라이언트

블록 단위 ACK과 타임아웃 재전송으로 파일을 주고받는 UDP 클라이언트

사용법:
  cargo run --release --bin tftpc -- [OPTIONS]

옵션:
  -s, --server <ADDR>    서버 주소, 포트 생략 시 69 (기본: 127.0.0.1)
  -b, --bind <ADDR>      로컬 바인드 주소 (기본: 0.0.0.0:0 = 자동 할당)
  -g, --get <NAME>       서버에서 파일 받기 (원격 파일명)
  -p, --put <NAME>       서버로 파일 보내기 (원격 파일명)
  -o, --output <PATH>    로컬 파일 경로 (기본: 원격 파일명 그대로)
  --timeout <MS>         응답 대기 타임아웃 (기본: 2000)
  --retries <N>          스텝당 재전송 한도 (기본: 무제한)
  -h, --help             이 도움말 출력

예시:
  # 파일 받기
  cargo run --release --bin tftpc -- -s 192.168.1.10:69 --get data.bin -o data.bin

  # 파일 보내기 (재전송 한도 8회)
  cargo run --release --bin tftpc -- -s 192.168.1.10:69 --put data.bin --retries 8
"#
                );
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    parsed
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = parse_args();

    let (remote_name, is_get) = match (&args.get, &args.put) {
        (Some(name), None) => (name.clone(), true),
        (None, Some(name)) => (name.clone(), false),
        _ => {
            eprintln!("--get 또는 --put 중 하나를 지정하세요 (--help 참고)");
            std::process::exit(1);
        }
    };
    let local_path = args
        .local_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(&remote_name));

    // 포트 없는 주소는 설정의 server_port로 보완됨
    let server_addr = args.config.resolve_server_addr(&args.server)?;

    info!("tftpc starting...");
    info!("Server address: {}", server_addr);

    let mut session = TransferSession::connect(args.config, args.bind_addr, server_addr).await?;
    info!("Bound to local address: {}", session.local_addr()?);

    let stats = if is_get {
        let mut sink = File::create(&local_path).await?;
        session.get(&remote_name, &mut sink).await?
    } else {
        let mut source = File::open(&local_path).await?;
        session.put(&remote_name, &mut source).await?
    };

    info!("Transfer complete!");
    info!("  Time: {:.2}s", stats.elapsed().as_secs_f64());
    info!("  Blocks: {}", stats.blocks);
    info!("  Total bytes: {}", stats.bytes_transferred);
    info!("  Retransmissions: {}", stats.retransmissions);
    info!("  Throughput: {:.2} KB/s", stats.throughput() / 1000.0);
    if is_get {
        info!("Data saved to {:?}", local_path);
    }

    Ok(())
}
