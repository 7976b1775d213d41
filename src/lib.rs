//! # SWFT (Stop-and-Wait File Transfer)
//!
//! UDP 위의 stop-and-wait 파일 전송 프로토콜
//!
//! ## 핵심 특징
//! - **JSON 봉투**: 페이로드는 hex, MD5 해시로 손상 검출
//! - **블록 단위 확인**: 블록마다 `next` / `re-send` 응답
//! - **피어 주소 학습**: 마지막 유효 패킷의 출발지로 응답
//! - **제한된 재시도**: 단순 교환은 설정된 타임아웃 횟수 후 포기
//! - **스트리밍 분할**: 큰 파일은 전송 시점에 블록을 읽음

pub mod block;
pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod server;
pub mod stats;
pub mod transmitter;

pub use block::BlockSequence;
pub use client::Client;
pub use config::{CommandNames, Config};
pub use error::{Error, Result};
pub use message::{Command, Control};
pub use packet::{Packet, ACK};
pub use receiver::Receiver;
pub use sender::Sender;
pub use server::Server;
pub use stats::TransferStats;
pub use transmitter::{OnCorrupt, PacketTransmitter, ReceiveOptions};

/// 기본 서버 포트
pub const DEFAULT_PORT: u16 = 10001;

/// 기본 블록 크기 (바이트)
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// 기본 수신 버퍼 크기 (바이트)
pub const DEFAULT_BUFFER_SIZE: usize = 16384;

/// 기본 수신 타임아웃 (밀리초)
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// 기본 연속 타임아웃 허용 횟수
pub const DEFAULT_MAX_TIMEOUTS: u32 = 3;

/// 기본 스트리밍 분할 기준 (바이트)
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 16 * 1024 * 1024; // 16MB

/// UDP 페이로드 최대 크기 (IPv4)
pub const MAX_DATAGRAM_SIZE: usize = 65507;
