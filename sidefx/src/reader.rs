// ABOUTME: reads blank-line separated blocks lazily from an async byte stream.
// ABOUTME: a read error ends the run; it is never reported per block.

use sidefx_common::BlockAccumulator;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::errors::FatalError;

pub struct BlockReader<R> {
    lines: Lines<R>,
    acc: BlockAccumulator,
    finished: bool,
}

impl<R: AsyncBufRead + Unpin> BlockReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            acc: BlockAccumulator::new(),
            finished: false,
        }
    }

    /// Next non-empty block, or `None` once the stream is exhausted.
    pub async fn next_block(&mut self) -> Result<Option<String>, FatalError> {
        if self.finished {
            return Ok(None);
        }
        while let Some(line) = self.lines.next_line().await.map_err(FatalError::Read)? {
            if let Some(block) = self.acc.push_line(&line) {
                return Ok(Some(block));
            }
        }
        self.finished = true;
        Ok(self.acc.finish())
    }
}
