//! SWFT 서버 - Stop-and-Wait File Transfer
//!
//! 서버 디렉터리의 파일 목록/다운로드/업로드 명령 처리
//! - 한 번에 한 세션만 처리 (stop-and-wait)
//! - Ctrl-C로 종료
//!
//! 사용법:
//!   cargo run --release --bin swft-server -- [OPTIONS]
//!
//! 예시:
//!   # 기본 포트(10001)로 ./server_files 제공
//!   cargo run --release --bin swft-server
//!
//!   # 손실 많은 네트워크, 디버그 로그
//!   cargo run --release --bin swft-server -- --bind 0.0.0.0:10001 --dir shared --lossy -v

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use swft::{Config, Server};

#[derive(Parser, Debug)]
#[command(name = "swft-server", about = "Stop-and-wait UDP file server")]
struct Args {
    /// 바인드 주소
    #[arg(short, long, default_value = "0.0.0.0:10001")]
    bind: SocketAddr,

    /// 제공할 디렉터리
    #[arg(short, long, default_value = "server_files")]
    dir: PathBuf,

    /// 블록 크기 (바이트)
    #[arg(long)]
    block_size: Option<usize>,

    /// 수신 타임아웃 (밀리초)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// 연속 타임아웃 허용 횟수
    #[arg(long)]
    max_timeouts: Option<u32>,

    /// 손실 많은 네트워크용 설정 사용
    #[arg(long)]
    lossy: bool,

    /// 디버그 로그
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> Config {
        let mut config = if self.lossy {
            Config::lossy_network()
        } else {
            Config::default()
        };

        config.server_addr = self.bind;
        config.server_dir = self.dir.clone();
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
            config.buffer_size = config.buffer_size.max(swft::Packet::envelope_len(block_size));
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(max_timeouts) = self.max_timeouts {
            config.max_timeouts = max_timeouts;
        }
        config
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 로깅 설정 (RUST_LOG 우선)
    let default_level = if args.verbose { "debug" } else { "info" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = args.config();
    config.validate()?;

    info!("SWFT Server starting...");
    info!("Bind address: {}", config.server_addr);
    info!("Block size: {} bytes", config.block_size);
    info!("Timeout: {:?} x {}", config.timeout(), config.max_timeouts);

    let mut server = Server::bind(config).await?;

    tokio::select! {
        result = server.serve() => {
            if let Err(e) = result {
                error!("서버 종료: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}
