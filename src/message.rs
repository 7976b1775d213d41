//! 프로토콜 메시지 정의
//!
//! 모든 제어 값은 패킷의 `data` 필드에 UTF-8 텍스트로 실림
//! - 제어 토큰: 세션 진행 신호 (ACK, 존재 여부, next, re-send)
//! - 명령 토큰: 클라이언트가 서버에 보내는 요청 (list/download/upload)

use crate::config::CommandNames;
use crate::packet::Packet;

/// 제어 토큰
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// 명령/파일 이름/협상 값 수신 확인
    Ack,

    /// 송신측 파일 존재
    Exists,

    /// 송신측 파일 없음
    Missing,

    /// 현재 블록 수신 완료, 다음 블록 요청
    Next,

    /// 현재 블록 재전송 요청
    Resend,
}

impl Control {
    /// 와이어 리터럴
    pub const fn as_str(&self) -> &'static str {
        match self {
            Control::Ack => "ACK",
            Control::Exists => "exists",
            Control::Missing => "does not exist",
            Control::Next => "next",
            Control::Resend => "re-send",
        }
    }

    /// 리터럴에서 토큰 해석 (정확히 일치할 때만)
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "ACK" => Some(Control::Ack),
            "exists" => Some(Control::Exists),
            "does not exist" => Some(Control::Missing),
            "next" => Some(Control::Next),
            "re-send" => Some(Control::Resend),
            _ => None,
        }
    }

    /// 토큰을 담은 새 패킷
    pub fn packet(self) -> Packet {
        Packet::text(self.as_str())
    }

    /// 존재 여부 센티널
    pub fn sentinel(exists: bool) -> Self {
        if exists {
            Control::Exists
        } else {
            Control::Missing
        }
    }
}

/// 명령 (고정된 닫힌 어휘)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// 서버 디렉터리 파일 목록
    List,

    /// 서버 → 클라이언트 파일 전송
    Download,

    /// 클라이언트 → 서버 파일 전송
    Upload,
}

impl Command {
    /// 설정된 명령 이름으로 토큰 해석
    ///
    /// 어휘에 없는 토큰은 `None` (호출측에서 무시)
    pub fn parse(token: &str, names: &CommandNames) -> Option<Self> {
        let token = token.trim();
        if token == names.list {
            Some(Command::List)
        } else if token == names.download {
            Some(Command::Download)
        } else if token == names.upload {
            Some(Command::Upload)
        } else {
            None
        }
    }

    /// 와이어에 실을 명령 이름
    pub fn token<'a>(&self, names: &'a CommandNames) -> &'a str {
        match self {
            Command::List => &names.list,
            Command::Download => &names.download,
            Command::Upload => &names.upload,
        }
    }
}
