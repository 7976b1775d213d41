//! 서버측 명령 디스패처
//!
//! 명령 토큰 수신 → ACK → 핸들러 실행. 핸들러 실패는 로그만 남기고 루프 유지

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::message::{Command, Control};
use crate::packet::Packet;
use crate::receiver::Receiver;
use crate::sender::Sender;
use crate::transmitter::PacketTransmitter;
use crate::{Config, Error, Result};

/// 네트워크에서 받은 파일 이름을 마지막 경로 요소로 축소
///
/// `..`, `/`, 빈 문자열처럼 쓸 수 있는 요소가 없으면 `None`
pub fn sanitize_file_name(name: &str) -> Option<PathBuf> {
    Path::new(name.trim()).file_name().map(PathBuf::from)
}

/// 파일 서버
pub struct Server {
    transmitter: PacketTransmitter,
    config: Config,
}

impl Server {
    /// 서버 디렉터리를 만들고 `server_addr`에 바인드
    pub async fn bind(config: Config) -> Result<Self> {
        tokio::fs::create_dir_all(&config.server_dir).await?;
        let transmitter = PacketTransmitter::bind(config.server_addr, &config).await?;
        Ok(Self { transmitter, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.transmitter.local_addr()
    }

    /// 명령 루프
    pub async fn serve(&mut self) -> Result<()> {
        info!(
            "Serving {:?} on {}",
            self.config.server_dir,
            self.transmitter.local_addr()?
        );

        loop {
            let Some(command) = self.next_command().await? else {
                continue;
            };

            if let Err(e) = self.dispatch(command).await {
                warn!("{:?} 처리 실패: {}", command, e);
            }
        }
    }

    /// 명령 토큰 하나 대기
    ///
    /// 타임아웃, 손상, 어휘에 없는 토큰은 `None`
    pub async fn next_command(&mut self) -> Result<Option<Command>> {
        let packet = match self.transmitter.receive().await {
            Ok(packet) => packet,
            Err(e) if e.is_timeout() => return Ok(None),
            Err(e) if e.is_corruption() => {
                warn!("명령 패킷 손상: {}", e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let token = packet.as_text();
        match Command::parse(&token, &self.config.commands) {
            Some(command) => {
                info!("Command {:?} from {:?}", command, self.transmitter.peer());
                self.transmitter.send_control(Control::Ack).await?;
                Ok(Some(command))
            }
            None => {
                debug!("알 수 없는 명령 무시: {:?}", token);
                Ok(None)
            }
        }
    }

    /// 명령 실행
    pub async fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::List => self.list_files().await,
            Command::Download => self.send_requested_file().await,
            Command::Upload => self.receive_uploaded_file().await,
        }
    }

    /// 서버 디렉터리의 일반 파일 이름 목록 전송 (줄 단위)
    async fn list_files(&mut self) -> Result<()> {
        let names = list_dir(&self.config.server_dir).await?;
        let max_len = (self.config.buffer_size - Packet::envelope_len(0)) / 2;
        let listing = fit_listing(&names, max_len);

        debug!("파일 {}개 목록 전송", names.len());
        self.transmitter.send_text(&listing).await?;
        Ok(())
    }

    /// 클라이언트 다운로드 요청: 이 쪽이 송신
    async fn send_requested_file(&mut self) -> Result<()> {
        let name = self.receive_file_name().await?;
        self.transmitter.send_control(Control::Ack).await?;

        let Some(file_name) = sanitize_file_name(&name) else {
            self.transmitter.send_control(Control::Missing).await?;
            return Err(Error::FileNotFound(PathBuf::from(name)));
        };

        let path = self.config.server_dir.join(file_name);
        let stats = Sender::open(&mut self.transmitter, &path, &self.config)
            .await?
            .send_file()
            .await?;

        info!("Sent {:?} ({} bytes)", path, stats.total_bytes);
        Ok(())
    }

    /// 클라이언트 업로드 요청: 이 쪽이 수신
    async fn receive_uploaded_file(&mut self) -> Result<()> {
        let name = self.receive_file_name().await?;

        let Some(file_name) = sanitize_file_name(&name) else {
            return Err(Error::ProtocolError(format!("사용할 수 없는 파일 이름: {:?}", name)));
        };
        self.transmitter.send_control(Control::Ack).await?;

        let path = self.config.server_dir.join(file_name);
        let stats = Receiver::open(&mut self.transmitter, &path, &self.config)
            .await?
            .receive_file()
            .await?;

        info!("Received {:?} ({} bytes)", path, stats.total_bytes);
        Ok(())
    }

    async fn receive_file_name(&mut self) -> Result<String> {
        let options = self.transmitter.options().waiting_for("file name");
        self.transmitter
            .receive_text(&options)
            .await?
            .ok_or(Error::Timeout(self.config.timeout()))
    }
}

/// 디렉터리의 일반 파일 이름 (정렬)
async fn list_dir(dir: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    names.sort();
    Ok(names)
}

/// 데이터그램 하나에 들어가는 만큼만 줄 단위로 연결
fn fit_listing(names: &[String], max_len: usize) -> String {
    let mut listing = String::new();

    for (i, name) in names.iter().enumerate() {
        let extra = name.len() + usize::from(!listing.is_empty());
        if listing.len() + extra > max_len {
            warn!("파일 목록이 잘림: {}/{}개만 전송", i, names.len());
            break;
        }
        if !listing.is_empty() {
            listing.push('\n');
        }
        listing.push_str(name);
    }

    listing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;

    use tokio::net::UdpSocket;

    fn test_config(server_dir: &Path, client_dir: &Path) -> Config {
        Config {
            server_addr: "127.0.0.1:0".parse().unwrap(),
            timeout_ms: 200,
            max_timeouts: 10,
            block_size: 64,
            buffer_size: 1024,
            server_dir: server_dir.to_path_buf(),
            client_dir: client_dir.to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("a.txt"), Some(PathBuf::from("a.txt")));
        assert_eq!(sanitize_file_name("../../etc/passwd"), Some(PathBuf::from("passwd")));
        assert_eq!(sanitize_file_name(" notes.md\n"), Some(PathBuf::from("notes.md")));
        assert_eq!(sanitize_file_name(".."), None);
        assert_eq!(sanitize_file_name("/"), None);
        assert_eq!(sanitize_file_name(""), None);
    }

    #[test]
    fn test_fit_listing() {
        let names: Vec<String> = ["alpha", "beta", "gamma"].iter().map(|s| s.to_string()).collect();

        assert_eq!(fit_listing(&names, 100), "alpha\nbeta\ngamma");
        assert_eq!(fit_listing(&names, 10), "alpha\nbeta");
        assert_eq!(fit_listing(&names, 3), "");
        assert_eq!(fit_listing(&[], 10), "");
    }

    #[tokio::test]
    async fn test_client_server_commands() {
        let server_dir = tempfile::tempdir().unwrap();
        let client_dir = tempfile::tempdir().unwrap();
        let upload_dir = tempfile::tempdir().unwrap();

        let hello = b"HELLOWORLD".repeat(50);
        std::fs::write(server_dir.path().join("hello.txt"), &hello).unwrap();
        std::fs::write(server_dir.path().join("empty.bin"), b"").unwrap();
        std::fs::create_dir(server_dir.path().join("subdir")).unwrap();

        let config = test_config(server_dir.path(), client_dir.path());
        let mut server = Server::bind(config.clone()).await.unwrap();
        let server_addr = server.local_addr().unwrap();
        let handle = tokio::spawn(async move { server.serve().await });

        let mut client = Client::connect(Config {
            server_addr,
            ..config.clone()
        })
        .await
        .unwrap();

        // 어휘에 없는 명령은 무시되고 루프는 계속
        let raw = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        raw.send_to(&Packet::text("delete").to_bytes(), server_addr)
            .await
            .unwrap();

        let files = client.list_files().await.unwrap();
        assert_eq!(files, vec!["empty.bin".to_string(), "hello.txt".to_string()]);

        let (path, stats) = client.download("hello.txt").await.unwrap();
        assert_eq!(path, client_dir.path().join("hello.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), hello);
        assert_eq!(stats.total_blocks, 8);

        let (path, _) = client.download("empty.bin").await.unwrap();
        assert!(std::fs::read(path).unwrap().is_empty());

        let err = client.download("missing.txt").await.unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
        assert!(!client_dir.path().join("missing.txt").exists());

        let local = upload_dir.path().join("up.dat");
        let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        std::fs::write(&local, &payload).unwrap();
        client.upload(&local).await.unwrap();
        assert_eq!(std::fs::read(server_dir.path().join("up.dat")).unwrap(), payload);

        let err = client.upload(upload_dir.path().join("ghost.dat")).await.unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));

        let files = client.list_files().await.unwrap();
        assert_eq!(files.len(), 3);
        assert!(!server_dir.path().join("ghost.dat").exists());

        handle.abort();
    }
}
