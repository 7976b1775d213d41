//! 에러 타입 정의

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// SWFT 프로토콜 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("수신 타임아웃: {0:?} 동안 데이터그램 없음")]
    Timeout(Duration),

    #[error("손상된 패킷: expected {expected}, got {got}")]
    CorruptPacket { expected: String, got: String },

    #[error("잘못된 패킷 형식: {0}")]
    MalformedEnvelope(String),

    #[error("파일 없음: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("프로토콜 에러: {0}")]
    ProtocolError(String),

    #[error("피어 주소를 아직 모름")]
    NoPeer,

    #[error("패킷 크기 초과: {size} bytes (최대 {max} bytes)")]
    PacketTooLarge { size: usize, max: usize },

    #[error("유효하지 않은 설정: {0}")]
    InvalidConfig(String),

    #[error("이미 소비된 블록 시퀀스는 재사용할 수 없음")]
    SequenceExhausted,
}

impl Error {
    /// 재전송 요청으로 복구 가능한 손상 여부
    ///
    /// 형식 오류와 해시 불일치는 복구 관점에서 동일하게 취급
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::CorruptPacket { .. } | Error::MalformedEnvelope(_))
    }

    /// 타임아웃 여부
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
