//! 수신자
//!
//! - 존재 센티널 대기 → 블록 수 수신 → 블록별 수신/기록/`next`
//! - 손상 블록은 `re-send` 요청, 진행하지 않음
//! - 블록 대기 타임아웃은 기록만 하고 계속 대기, 허용 횟수 초과 시 중단
//! - 타임아웃에는 아무 토큰도 보내지 않음 (잃어버린 `next`와 잃어버린 블록은 구분 불가)

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::message::Control;
use crate::packet::Packet;
use crate::stats::{ProgressFn, TransferStats};
use crate::transmitter::{OnCorrupt, PacketTransmitter, ReceiveOptions};
use crate::{Config, Error, Result};

/// 파일 수신자
///
/// 세션 동안 송수신기를 독점하며 출력 파일 핸들을 소유
pub struct Receiver<'a> {
    transmitter: &'a mut PacketTransmitter,
    path: PathBuf,
    file: File,
    timeout: Duration,
    max_timeouts: u32,
    progress_every: usize,
    on_progress: Option<ProgressFn<'a>>,
}

impl<'a> Receiver<'a> {
    /// 존재 센티널을 기다린 뒤 출력 파일 생성
    ///
    /// 송신측에 파일이 없으면 출력 파일을 만들지 않고 `FileNotFound`
    pub async fn open(
        transmitter: &'a mut PacketTransmitter,
        out_path: impl AsRef<Path>,
        config: &Config,
    ) -> Result<Self> {
        let path = out_path.as_ref().to_path_buf();
        let options = transmitter.options().waiting_for("existence sentinel");

        let sentinel = transmitter
            .receive_text(&options)
            .await?
            .ok_or(Error::Timeout(config.timeout()))?;

        match Control::parse(&sentinel) {
            Some(Control::Exists) => {}
            Some(Control::Missing) => {
                warn!("송신측에 파일 없음: {:?}", path);
                return Err(Error::FileNotFound(path));
            }
            _ => {
                return Err(Error::ProtocolError(format!(
                    "expected existence sentinel, got {:?}",
                    sentinel
                )))
            }
        }

        // 출력 파일은 ACK 이후에만 생성
        transmitter.send_control(Control::Ack).await?;
        let file = File::create(&path).await?;

        Ok(Self {
            transmitter,
            path,
            file,
            timeout: config.timeout(),
            max_timeouts: config.max_timeouts.max(1),
            progress_every: config.progress_every.max(1),
            on_progress: None,
        })
    }

    /// 블록 기록마다 `(완료 블록 수, 총 블록 수)`로 호출될 콜백 등록
    pub fn with_progress(mut self, on_progress: impl FnMut(usize, usize) + Send + 'a) -> Self {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    /// 블록 수 협상 후 모든 블록 수신
    ///
    /// 중단되면 부분 출력 파일을 삭제
    pub async fn receive_file(mut self) -> Result<TransferStats> {
        match self.receive_blocks().await {
            Ok(stats) => {
                info!("Receive complete {:?}: {}", self.path, stats.summary());
                Ok(stats)
            }
            Err(e) => {
                warn!("수신 중단 {:?}: {}", self.path, e);
                drop(self.file);
                discard(&self.path).await;
                Err(e)
            }
        }
    }

    async fn receive_blocks(&mut self) -> Result<TransferStats> {
        let options = self.transmitter.options().waiting_for("block count");
        let text = self
            .transmitter
            .receive_text(&options)
            .await?
            .ok_or(Error::Timeout(self.timeout))?;

        let total: usize = text
            .trim()
            .parse()
            .map_err(|_| Error::ProtocolError(format!("블록 수 해석 실패: {:?}", text)))?;
        self.transmitter.send_control(Control::Ack).await?;

        info!("Receiving {:?}: {} blocks", self.path, total);
        let mut stats = TransferStats::new(total);

        for index in 0..total {
            let block = self.receive_block(index, &mut stats).await?;

            // 기록이 끝난 뒤에만 next
            self.file.write_all(block.data()).await?;
            self.file.flush().await?;
            self.transmitter.send_control(Control::Next).await?;

            stats.record_block(block.data().len());
            self.report(&stats);
        }

        self.file.sync_all().await?;
        Ok(stats)
    }

    /// 유효한 블록 하나가 올 때까지 수신
    ///
    /// 손상 블록마다 `re-send`, 연속 타임아웃이 허용 횟수에 이르면 `Timeout`
    async fn receive_block(&mut self, index: usize, stats: &mut TransferStats) -> Result<Packet> {
        let options = ReceiveOptions::bounded(self.max_timeouts)
            .on_corrupt(OnCorrupt::Reply(Control::Resend))
            .waiting_for("block");
        let before = self.transmitter.stats().clone();

        let block = self.transmitter.receive_with(&options).await?;

        let link = self.transmitter.stats();
        let corrupt = link.corrupt_packets - before.corrupt_packets;
        stats.corrupt_packets += corrupt;
        stats.resend_requests += corrupt;
        stats.timeouts += link.timeouts - before.timeouts;

        block.ok_or_else(|| {
            warn!("블록 {} 대기 중 타임아웃 {}회, 수신 중단", index, self.max_timeouts);
            Error::Timeout(self.timeout)
        })
    }

    fn report(&mut self, stats: &TransferStats) {
        if let Some(on_progress) = self.on_progress.as_mut() {
            on_progress(stats.completed_blocks, stats.total_blocks);
        }

        if stats.should_report(self.progress_every) {
            info!(
                "Progress: block {}/{} ({:.1}%)",
                stats.completed_blocks,
                stats.total_blocks,
                stats.progress() * 100.0
            );
        }
    }
}

/// 중단된 수신의 부분 출력 파일 삭제
async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!("부분 파일 삭제 실패 {:?}: {}", path, e);
    }
}
