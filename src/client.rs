//! 클라이언트측 명령 디스패처

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::message::{Command, Control};
use crate::receiver::Receiver;
use crate::sender::Sender;
use crate::server::sanitize_file_name;
use crate::stats::TransferStats;
use crate::transmitter::PacketTransmitter;
use crate::{Config, Error, Result};

/// 파일 서버 클라이언트
pub struct Client {
    transmitter: PacketTransmitter,
    config: Config,
}

impl Client {
    /// 임시 포트에 바인드하고 `server_addr`를 피어로 설정
    pub async fn connect(config: Config) -> Result<Self> {
        let local: SocketAddr = if config.server_addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let transmitter = PacketTransmitter::connect(local, config.server_addr, &config).await?;
        info!("Client ready, server {}", config.server_addr);

        Ok(Self { transmitter, config })
    }

    /// 명령 토큰 전송 후 ACK 대기
    pub async fn request(&mut self, command: Command) -> Result<()> {
        let token = command.token(&self.config.commands).to_owned();
        self.transmitter.send_text(&token).await?;
        self.transmitter.expect(Control::Ack).await
    }

    /// 서버 파일 목록
    pub async fn list_files(&mut self) -> Result<Vec<String>> {
        self.request(Command::List).await?;

        let options = self.transmitter.options().waiting_for("file list");
        let listing = self
            .transmitter
            .receive_text(&options)
            .await?
            .ok_or(Error::Timeout(self.config.timeout()))?;

        Ok(listing
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect())
    }

    /// 서버 파일을 `client_dir`로 다운로드, 저장 경로와 통계 반환
    pub async fn download(&mut self, name: &str) -> Result<(PathBuf, TransferStats)> {
        let file_name = sanitize_file_name(name)
            .ok_or_else(|| Error::ProtocolError(format!("사용할 수 없는 파일 이름: {:?}", name)))?;

        tokio::fs::create_dir_all(&self.config.client_dir).await?;
        let path = self.config.client_dir.join(&file_name);

        self.request(Command::Download).await?;
        self.send_file_name(&file_name).await?;

        let stats = Receiver::open(&mut self.transmitter, &path, &self.config)
            .await?
            .receive_file()
            .await?;

        Ok((path, stats))
    }

    /// 로컬 파일 업로드 (서버에는 파일 이름만 전달)
    pub async fn upload(&mut self, path: impl AsRef<Path>) -> Result<TransferStats> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))?;

        self.request(Command::Upload).await?;
        self.send_file_name(&file_name).await?;

        Sender::open(&mut self.transmitter, path, &self.config)
            .await?
            .send_file()
            .await
    }

    async fn send_file_name(&mut self, file_name: &Path) -> Result<()> {
        self.transmitter
            .send_text(&file_name.to_string_lossy())
            .await?;
        self.transmitter.expect(Control::Ack).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(server_addr: SocketAddr) -> Config {
        Config {
            server_addr,
            timeout_ms: 100,
            max_timeouts: 2,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_request_times_out_without_server() {
        // 바인드만 하고 응답하지 않는 소켓
        let silent = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut client = Client::connect(test_config(silent.local_addr().unwrap()))
            .await
            .unwrap();

        let err = client.request(Command::List).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_download_rejects_unusable_name() {
        let silent = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut client = Client::connect(test_config(silent.local_addr().unwrap()))
            .await
            .unwrap();

        let err = client.download("..").await.unwrap_err();
        assert!(matches!(err, Error::ProtocolError(_)));
    }
}
