//! 블록 분할
//!
//! - Eager: 작은 파일은 시작 전에 전부 읽어 패킷 목록으로 보관 (재시작 가능)
//! - Lazy: 큰 파일은 열린 핸들에서 블록을 하나씩 읽음 (단일 패스)

use std::path::Path;

use bytes::{Bytes, BytesMut};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::packet::Packet;
use crate::{Error, Result};

/// 파일 크기와 블록 크기로 블록 수 계산 (올림 나눗셈)
pub fn block_count(file_size: u64, block_size: usize) -> usize {
    let block_size = block_size as u64;
    ((file_size + block_size - 1) / block_size) as usize
}

/// 메모리에 모두 올린 블록 목록
#[derive(Debug)]
pub struct EagerBlocks {
    blocks: Vec<Packet>,
    cursor: usize,
}

/// 파일 핸들에서 한 블록씩 읽는 단일 패스 시퀀스
#[derive(Debug)]
pub struct LazyBlocks {
    /// 소진되면 `None` (핸들 닫힘)
    file: Option<File>,
    block_size: usize,
    total: usize,
    emitted: usize,
}

/// 블록 시퀀스
///
/// 두 모드 모두 첫 블록을 소비하기 전에 `len()`을 알 수 있음
#[derive(Debug)]
pub enum BlockSequence {
    Eager(EagerBlocks),
    Lazy(LazyBlocks),
}

impl BlockSequence {
    /// 파일 크기에 따라 모드 선택
    ///
    /// `threshold`를 초과하는 파일은 lazy, 나머지는 eager
    pub async fn open(path: impl AsRef<Path>, block_size: usize, threshold: u64) -> Result<Self> {
        let path = path.as_ref();
        let size = file_size(path).await?;

        if size > threshold {
            debug!("{} bytes > {} bytes: 스트리밍 모드", size, threshold);
            Self::lazy(path, block_size).await
        } else {
            Self::eager(path, block_size).await
        }
    }

    /// 파일 전체를 읽어 블록 목록 생성
    pub async fn eager(path: impl AsRef<Path>, block_size: usize) -> Result<Self> {
        check_block_size(block_size)?;
        let path = path.as_ref();
        file_size(path).await?;

        let data = Bytes::from(tokio::fs::read(path).await?);
        let blocks = (0..data.len())
            .step_by(block_size)
            .map(|offset| {
                let end = (offset + block_size).min(data.len());
                Packet::new(data.slice(offset..end))
            })
            .collect();

        Ok(BlockSequence::Eager(EagerBlocks { blocks, cursor: 0 }))
    }

    /// 파일을 열어 스트리밍 시퀀스 생성 (선행 읽기 없음)
    pub async fn lazy(path: impl AsRef<Path>, block_size: usize) -> Result<Self> {
        check_block_size(block_size)?;
        let path = path.as_ref();
        let size = file_size(path).await?;
        let file = File::open(path).await?;

        Ok(BlockSequence::Lazy(LazyBlocks {
            file: Some(file),
            block_size,
            total: block_count(size, block_size),
            emitted: 0,
        }))
    }

    /// 총 블록 수
    pub fn len(&self) -> usize {
        match self {
            BlockSequence::Eager(eager) => eager.blocks.len(),
            BlockSequence::Lazy(lazy) => lazy.total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 스트리밍 모드 여부
    pub fn is_lazy(&self) -> bool {
        matches!(self, BlockSequence::Lazy(_))
    }

    /// 다음 블록
    pub async fn next_block(&mut self) -> Result<Option<Packet>> {
        match self {
            BlockSequence::Eager(eager) => {
                let block = eager.blocks.get(eager.cursor).cloned();
                if block.is_some() {
                    eager.cursor += 1;
                }
                Ok(block)
            }
            BlockSequence::Lazy(lazy) => lazy.next_block().await,
        }
    }

    /// 처음으로 되감기 (eager 전용)
    pub fn rewind(&mut self) -> Result<()> {
        match self {
            BlockSequence::Eager(eager) => {
                eager.cursor = 0;
                Ok(())
            }
            BlockSequence::Lazy(_) => Err(Error::SequenceExhausted),
        }
    }

    /// 열린 핸들 해제
    pub fn close(&mut self) {
        if let BlockSequence::Lazy(lazy) = self {
            lazy.file = None;
        }
    }
}

impl LazyBlocks {
    async fn next_block(&mut self) -> Result<Option<Packet>> {
        if self.emitted >= self.total {
            self.file = None;
            return Ok(None);
        }

        let Some(file) = self.file.as_mut() else {
            return Ok(None);
        };

        // 짧은 읽기가 중간 블록을 자르지 않도록 블록을 끝까지 채움
        let mut buf = BytesMut::zeroed(self.block_size);
        let mut filled = 0;
        while filled < self.block_size {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            self.file = None;
            return Ok(None);
        }

        buf.truncate(filled);
        self.emitted += 1;
        if self.emitted == self.total {
            self.file = None;
        }

        Ok(Some(Packet::new(buf.freeze())))
    }
}

fn check_block_size(block_size: usize) -> Result<()> {
    if block_size == 0 {
        return Err(Error::InvalidConfig("block_size는 0보다 커야 함".into()));
    }
    Ok(())
}

/// 일반 파일 크기, 없거나 디렉터리면 `FileNotFound`
async fn file_size(path: &Path) -> Result<u64> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        Ok(_) => Err(Error::FileNotFound(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::FileNotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}
