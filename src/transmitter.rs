//! 패킷 송수신기
//!
//! - UDP 소켓 하나를 단독 소유
//! - 유효 패킷의 출발지가 바뀌면 피어 주소를 갱신 (피어 주소 학습)
//! - 제한된 재시도 수신 헬퍼

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::message::Control;
use crate::packet::{Packet, ACK};
use crate::{Config, Error, Result};

/// 손상/형식 오류 패킷 처리 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnCorrupt {
    /// 로그만 남기고 다시 대기
    Log,

    /// 피어에게 제어 토큰으로 응답 후 다시 대기
    Reply(Control),
}

/// 재시도 수신 옵션
#[derive(Debug, Clone)]
pub struct ReceiveOptions {
    /// 허용하는 연속 타임아웃 횟수
    pub max_timeouts: u32,

    /// 손상 패킷 처리
    pub on_corrupt: OnCorrupt,

    /// 타임아웃 로그 문구
    pub waiting_for: &'static str,
}

impl ReceiveOptions {
    /// 타임아웃 횟수 제한
    pub fn bounded(max_timeouts: u32) -> Self {
        Self {
            max_timeouts: max_timeouts.max(1),
            on_corrupt: OnCorrupt::Log,
            waiting_for: "packet",
        }
    }

    pub fn on_corrupt(mut self, on_corrupt: OnCorrupt) -> Self {
        self.on_corrupt = on_corrupt;
        self
    }

    pub fn waiting_for(mut self, what: &'static str) -> Self {
        self.waiting_for = what;
        self
    }
}

/// 링크 카운터
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub packets_received: u64,
    pub timeouts: u64,
    pub corrupt_packets: u64,
    pub peer_changes: u64,
}

/// 패킷 송수신기
pub struct PacketTransmitter {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
    timeout: Duration,
    max_timeouts: u32,
    buf: Vec<u8>,
    stats: LinkStats,
}

impl PacketTransmitter {
    /// 피어 없이 바인드 (서버: 첫 접촉에서 피어 학습)
    pub async fn bind(addr: SocketAddr, config: &Config) -> Result<Self> {
        config.validate()?;
        let socket = UdpSocket::bind(addr).await?;
        info!("UDP socket bound on {}", socket.local_addr()?);

        Ok(Self {
            socket,
            peer: None,
            timeout: config.timeout(),
            max_timeouts: config.max_timeouts,
            buf: vec![0u8; config.buffer_size],
            stats: LinkStats::default(),
        })
    }

    /// 피어를 알고 있는 상태로 바인드 (클라이언트)
    pub async fn connect(addr: SocketAddr, peer: SocketAddr, config: &Config) -> Result<Self> {
        let mut transmitter = Self::bind(addr, config).await?;
        transmitter.peer = Some(peer);
        Ok(transmitter)
    }

    /// 로컬 주소
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// 현재 피어 주소
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn set_peer(&mut self, peer: SocketAddr) {
        self.peer = Some(peer);
    }

    /// 링크 통계
    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// 설정된 타임아웃 허용 횟수로 만든 기본 옵션
    pub fn options(&self) -> ReceiveOptions {
        ReceiveOptions::bounded(self.max_timeouts)
    }

    /// 패킷 전송
    pub async fn send(&mut self, packet: &Packet) -> Result<usize> {
        let peer = self.peer.ok_or(Error::NoPeer)?;
        let bytes = packet.to_bytes();

        if bytes.len() > self.buf.len() {
            return Err(Error::PacketTooLarge {
                size: bytes.len(),
                max: self.buf.len(),
            });
        }

        let sent = self.socket.send_to(&bytes, peer).await?;
        self.stats.packets_sent += 1;
        self.stats.bytes_sent += sent as u64;
        Ok(sent)
    }

    /// 제어 토큰 전송
    pub async fn send_control(&mut self, control: Control) -> Result<usize> {
        match control {
            Control::Ack => self.send(&ACK).await,
            other => self.send(&other.packet()).await,
        }
    }

    /// 텍스트 전송
    pub async fn send_text(&mut self, text: &str) -> Result<usize> {
        self.send(&Packet::text(text)).await
    }

    /// 데이터그램 하나 수신
    ///
    /// 타임아웃, 손상, 형식 오류는 그대로 반환 (재시도는 호출측 결정)
    pub async fn receive(&mut self) -> Result<Packet> {
        let (len, addr) =
            match tokio::time::timeout(self.timeout, self.socket.recv_from(&mut self.buf)).await {
                Ok(result) => result?,
                Err(_) => {
                    self.stats.timeouts += 1;
                    return Err(Error::Timeout(self.timeout));
                }
            };

        let packet = match Packet::from_bytes(&self.buf[..len]) {
            Ok(packet) => packet,
            Err(e) => {
                self.stats.corrupt_packets += 1;
                return Err(e);
            }
        };

        self.stats.packets_received += 1;
        self.learn_peer(addr);
        Ok(packet)
    }

    /// 제한된 재시도 수신
    ///
    /// 타임아웃 허용 횟수를 모두 쓰면 `Ok(None)`, 호출측은 이를 작업 실패로 취급해야 함
    pub async fn receive_with(&mut self, options: &ReceiveOptions) -> Result<Option<Packet>> {
        let mut timeouts = 0u32;

        loop {
            match self.receive().await {
                Ok(packet) => return Ok(Some(packet)),
                Err(Error::Timeout(after)) => {
                    timeouts += 1;
                    warn!(
                        "Timeout waiting for {} ({:?}, {}/{})",
                        options.waiting_for, after, timeouts, options.max_timeouts
                    );

                    if timeouts >= options.max_timeouts {
                        return Ok(None);
                    }
                }
                Err(e) if e.is_corruption() => {
                    warn!("{} 수신 중 손상 패킷: {}", options.waiting_for, e);
                    if let OnCorrupt::Reply(control) = options.on_corrupt {
                        self.send_control(control).await?;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 제한된 재시도 수신 후 텍스트로 해석
    pub async fn receive_text(&mut self, options: &ReceiveOptions) -> Result<Option<String>> {
        Ok(self
            .receive_with(options)
            .await?
            .map(|packet| packet.as_text().into_owned()))
    }

    /// 특정 제어 토큰 대기
    ///
    /// 재시도 소진은 `Timeout`, 다른 토큰은 `ProtocolError`
    pub async fn expect(&mut self, control: Control) -> Result<()> {
        let options = self.options().waiting_for(control.as_str());

        match self.receive_with(&options).await? {
            Some(packet) if packet.is(control) => Ok(()),
            Some(packet) => Err(Error::ProtocolError(format!(
                "expected {:?}, got {:?}",
                control.as_str(),
                packet.as_text()
            ))),
            None => Err(Error::Timeout(self.timeout)),
        }
    }

    fn learn_peer(&mut self, addr: SocketAddr) {
        if self.peer != Some(addr) {
            match self.peer {
                Some(old) => debug!("피어 주소 변경: {} -> {}", old, addr),
                None => debug!("피어 주소 학습: {}", addr),
            }
            self.peer = Some(addr);
            self.stats.peer_changes += 1;
        }
    }
}
