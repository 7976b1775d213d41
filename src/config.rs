//! 프로토콜 설정

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::packet::Packet;
use crate::{
    Error, Result, DEFAULT_BLOCK_SIZE, DEFAULT_BUFFER_SIZE, DEFAULT_LARGE_FILE_THRESHOLD,
    DEFAULT_MAX_TIMEOUTS, DEFAULT_PORT, DEFAULT_TIMEOUT_MS, MAX_DATAGRAM_SIZE,
};

/// 명령 토큰 이름
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandNames {
    pub list: String,
    pub download: String,
    pub upload: String,
}

impl Default for CommandNames {
    fn default() -> Self {
        Self {
            list: "list".into(),
            download: "download".into(),
            upload: "upload".into(),
        }
    }
}

/// SWFT 설정
///
/// 생성자에 명시적으로 전달되며 세션 중 변경되지 않음
#[derive(Debug, Clone)]
pub struct Config {
    /// 서버 주소 (서버는 바인드, 클라이언트는 접속 대상)
    pub server_addr: SocketAddr,

    /// 데이터그램 수신 타임아웃 (밀리초)
    pub timeout_ms: u64,

    /// 단순 교환(명령, ACK, 블록 수)에서 허용하는 연속 타임아웃 횟수
    /// 수신측 블록 루프에도 적용, 송신측 블록 루프는 무제한
    pub max_timeouts: u32,

    /// 블록 크기 (바이트)
    pub block_size: usize,

    /// 수신 버퍼 크기 (바이트), 블록 봉투 전체를 담을 수 있어야 함
    pub buffer_size: usize,

    /// 이 크기를 넘는 파일은 스트리밍(lazy) 모드로 분할
    pub large_file_threshold: u64,

    /// 진행률 로그 간격 (블록 수)
    pub progress_every: usize,

    /// 서버 파일 디렉터리
    pub server_dir: PathBuf,

    /// 클라이언트 다운로드 디렉터리
    pub client_dir: PathBuf,

    /// 명령 토큰
    pub commands: CommandNames,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            timeout_ms: DEFAULT_TIMEOUT_MS,      // 2초
            max_timeouts: DEFAULT_MAX_TIMEOUTS,  // 3회
            block_size: DEFAULT_BLOCK_SIZE,      // 4KB
            buffer_size: DEFAULT_BUFFER_SIZE,    // 16KB
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD, // 16MB
            progress_every: 256,
            server_dir: PathBuf::from("server_files"),
            client_dir: PathBuf::from("client_files"),
            commands: CommandNames::default(),
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 수신 타임아웃
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// 블록 하나를 담은 봉투 크기
    pub fn block_envelope_len(&self) -> usize {
        Packet::envelope_len(self.block_size)
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::InvalidConfig("block_size는 0보다 커야 함".into()));
        }

        if self.timeout_ms == 0 {
            return Err(Error::InvalidConfig("timeout_ms는 0보다 커야 함".into()));
        }

        let envelope = self.block_envelope_len();
        if envelope > MAX_DATAGRAM_SIZE {
            return Err(Error::InvalidConfig(format!(
                "block_size {} 의 봉투({} bytes)가 UDP 최대 크기 {} 초과",
                self.block_size, envelope, MAX_DATAGRAM_SIZE
            )));
        }

        if envelope > self.buffer_size {
            return Err(Error::InvalidConfig(format!(
                "buffer_size {} 가 블록 봉투 {} bytes보다 작음",
                self.buffer_size, envelope
            )));
        }

        Ok(())
    }

    /// 손실이 많은 네트워크용 설정
    pub fn lossy_network() -> Self {
        Self {
            timeout_ms: 500,    // 빠른 재요청
            max_timeouts: 20,
            block_size: 1024,   // 작은 블록
            buffer_size: 4096,
            ..Self::default()
        }
    }

    /// 저메모리 기기용 설정
    pub fn low_memory() -> Self {
        Self {
            large_file_threshold: 256 * 1024, // 256KB 초과면 스트리밍
            ..Self::default()
        }
    }
}
