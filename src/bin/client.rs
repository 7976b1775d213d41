//! SWFT 클라이언트 - Stop-and-Wait File Transfer
//!
//! 서버에 list/download/upload 명령 전송
//! - 서브커맨드 없이 실행하면 표준 입력에서 명령을 한 줄씩 읽음
//!
//! 사용법:
//!   cargo run --release --bin swft-client -- [OPTIONS] [COMMAND]
//!
//! 예시:
//!   # 서버 파일 목록
//!   cargo run --release --bin swft-client -- --server 127.0.0.1:10001 list
//!
//!   # 다운로드 (./client_files 에 저장)
//!   cargo run --release --bin swft-client -- download report.pdf
//!
//!   # 대화형
//!   cargo run --release --bin swft-client
//!   > upload ./notes.txt

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use swft::{Client, Config};

#[derive(Parser, Debug)]
#[command(name = "swft-client", about = "Stop-and-wait UDP file client")]
struct Args {
    /// 서버 주소
    #[arg(short, long, default_value = "127.0.0.1:10001")]
    server: SocketAddr,

    /// 다운로드 디렉터리
    #[arg(short, long, default_value = "client_files")]
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

    #[command(subcommand)]
    command: Option<Action>,
}

#[derive(Subcommand, Debug, Clone)]
enum Action {
    /// 서버 파일 목록
    List,

    /// 서버 파일 다운로드
    Download { name: String },

    /// 로컬 파일 업로드
    Upload { path: PathBuf },
}

impl Action {
    /// 대화형 입력 한 줄 해석
    fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.trim().splitn(2, char::is_whitespace);
        let command = parts.next()?;
        let arg = parts.next().map(str::trim).filter(|arg| !arg.is_empty());

        match (command, arg) {
            ("list", None) => Some(Action::List),
            ("download", Some(name)) => Some(Action::Download { name: name.to_owned() }),
            ("upload", Some(path)) => Some(Action::Upload { path: PathBuf::from(path) }),
            _ => None,
        }
    }
}

impl Args {
    fn config(&self) -> Config {
        let mut config = if self.lossy {
            Config::lossy_network()
        } else {
            Config::default()
        };

        config.server_addr = self.server;
        config.client_dir = self.dir.clone();
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

async fn run(client: &mut Client, action: Action) -> swft::Result<()> {
    match action {
        Action::List => {
            let files = client.list_files().await?;
            if files.is_empty() {
                println!("(no files)");
            }
            for name in files {
                println!("{}", name);
            }
        }
        Action::Download { name } => {
            let (path, stats) = client.download(&name).await?;
            println!("Saved {} ({})", path.display(), stats.summary());
        }
        Action::Upload { path } => {
            let stats = client.upload(&path).await?;
            println!("Uploaded {} ({})", path.display(), stats.summary());
        }
    }
    Ok(())
}

/// `shutdown`이 먼저 끝나면 작업을 드롭하고 `None`
///
/// 드롭된 전송은 파일 핸들을 닫음
async fn until_shutdown<F: Future>(work: F, shutdown: impl Future) -> Option<F::Output> {
    tokio::select! {
        output = work => Some(output),
        _ = shutdown => None,
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

    let mut client = Client::connect(config).await?;

    if let Some(action) = args.command {
        if let Err(e) = run(&mut client, action).await {
            error!("명령 실패: {}", e);
            return Err(e.into());
        }
        return Ok(());
    }

    info!("Commands: list | download <name> | upload <path>  (Ctrl-D to quit)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let Some(line) = until_shutdown(lines.next_line(), tokio::signal::ctrl_c()).await else {
            break;
        };
        let Some(line) = line? else { break };

        if line.trim().is_empty() {
            continue;
        }

        let Some(action) = Action::parse_line(&line) else {
            warn!("알 수 없는 명령: {:?}", line.trim());
            continue;
        };

        match until_shutdown(run(&mut client, action), tokio::signal::ctrl_c()).await {
            Some(Ok(())) => {}
            Some(Err(e)) => warn!("명령 실패: {}", e),
            None => {
                info!("전송 중단");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_drops_running_work() {
        let handle = Arc::new(());
        let held = handle.clone();
        let work = async move {
            let _held = held;
            tokio::time::sleep(Duration::from_secs(30)).await;
        };

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tx.send(()).unwrap();

        assert!(until_shutdown(work, rx).await.is_none());
        assert_eq!(Arc::strong_count(&handle), 1);
    }

    #[tokio::test]
    async fn test_work_finishes_before_shutdown() {
        let output = until_shutdown(async { 7 }, std::future::pending::<()>()).await;
        assert_eq!(output, Some(7));
    }

    #[test]
    fn test_parse_line() {
        assert!(matches!(Action::parse_line("list"), Some(Action::List)));
        assert!(matches!(
            Action::parse_line(" download  a b.txt "),
            Some(Action::Download { name }) if name == "a b.txt"
        ));
        assert!(Action::parse_line("download").is_none());
        assert!(Action::parse_line("delete x").is_none());
    }
}
