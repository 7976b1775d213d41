//! 송신자
//!
//! - 존재 센티널 → 블록 수 협상 → 블록별 stop-and-wait
//! - `next` 이외의 모든 토큰은 같은 블록 재전송
//! - 손상된 응답은 토큰으로 보지 않고 계속 대기
//! - 블록 확인 대기 타임아웃은 무제한 재시도 (파일 중간에 포기하지 않음)

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::block::BlockSequence;
use crate::message::Control;
use crate::packet::Packet;
use crate::stats::{ProgressFn, TransferStats};
use crate::transmitter::PacketTransmitter;
use crate::{Config, Error, Result};

/// 파일 송신자
///
/// 세션 동안 송수신기를 독점하며 블록 시퀀스를 소유
pub struct Sender<'a> {
    transmitter: &'a mut PacketTransmitter,
    path: PathBuf,
    blocks: BlockSequence,
    progress_every: usize,
    on_progress: Option<ProgressFn<'a>>,
}

impl<'a> Sender<'a> {
    /// 파일을 열고 존재 센티널 교환
    ///
    /// 파일이 없으면 `does not exist`를 보내고 `FileNotFound`로 실패
    pub async fn open(
        transmitter: &'a mut PacketTransmitter,
        path: impl AsRef<Path>,
        config: &Config,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let blocks =
            match BlockSequence::open(&path, config.block_size, config.large_file_threshold).await {
                Ok(blocks) => blocks,
                Err(e) => {
                    warn!("파일 열기 실패 {:?}: {}", path, e);
                    transmitter.send_control(Control::Missing).await?;
                    return Err(e);
                }
            };

        transmitter.send_control(Control::Exists).await?;
        transmitter.expect(Control::Ack).await?;

        Ok(Self {
            transmitter,
            path,
            blocks,
            progress_every: config.progress_every.max(1),
            on_progress: None,
        })
    }

    /// 블록 확인마다 `(완료 블록 수, 총 블록 수)`로 호출될 콜백 등록
    pub fn with_progress(mut self, on_progress: impl FnMut(usize, usize) + Send + 'a) -> Self {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    /// 총 블록 수
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// 블록 수 협상 후 모든 블록 전송
    pub async fn send_file(mut self) -> Result<TransferStats> {
        let total = self.blocks.len();
        let mut stats = TransferStats::new(total);

        info!(
            "Sending {:?}: {} blocks ({})",
            self.path,
            total,
            if self.blocks.is_lazy() { "streaming" } else { "in-memory" }
        );

        self.transmitter.send_text(&total.to_string()).await?;
        self.transmitter.expect(Control::Ack).await?;

        for index in 0..total {
            let block = self.blocks.next_block().await?.ok_or_else(|| {
                Error::ProtocolError(format!("블록 {}/{} 읽기 실패: 파일이 줄어듦", index + 1, total))
            })?;

            self.send_block(index, &block, &mut stats).await?;
            stats.record_block(block.data().len());
            self.report(&stats);
        }

        self.blocks.close();
        info!("Send complete {:?}: {}", self.path, stats.summary());
        Ok(stats)
    }

    /// 블록 하나를 `next`가 올 때까지 전송
    async fn send_block(
        &mut self,
        index: usize,
        block: &Packet,
        stats: &mut TransferStats,
    ) -> Result<()> {
        'send: loop {
            self.transmitter.send(block).await?;

            loop {
                match self.transmitter.receive().await {
                    Ok(token) if token.is(Control::Next) => return Ok(()),
                    Ok(token) => {
                        debug!("블록 {} 재전송 (응답: {:?})", index, token.as_text());
                        stats.resent_blocks += 1;
                        continue 'send;
                    }
                    Err(Error::Timeout(after)) => {
                        stats.timeouts += 1;
                        warn!("블록 {} 확인 대기 중 타임아웃 ({:?}), 계속 대기", index, after);
                    }
                    Err(e) if e.is_corruption() => {
                        warn!("블록 {} 응답 손상: {}, 계속 대기", index, e);
                        stats.corrupt_packets += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
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
