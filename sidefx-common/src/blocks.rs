// ABOUTME: splits script text into blocks separated by blank lines.
// ABOUTME: lines of a block are joined without a separator before decoding.

/// Accumulates lines into blocks. A zero-length line ends the current block.
#[derive(Debug, Default)]
pub struct BlockAccumulator {
    buf: String,
}

impl BlockAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line (without its terminator). Returns a completed block when
    /// the line is blank and something has been accumulated.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.finish();
        }
        self.buf.push_str(line);
        None
    }

    /// Returns the pending block at end of input, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}

/// Iterator over the blocks of an in-memory script.
pub struct Blocks<'a> {
    lines: std::str::Lines<'a>,
    acc: BlockAccumulator,
    done: bool,
}

impl Iterator for Blocks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        for line in self.lines.by_ref() {
            if let Some(block) = self.acc.push_line(line) {
                return Some(block);
            }
        }
        self.done = true;
        self.acc.finish()
    }
}

pub fn blocks(input: &str) -> Blocks<'_> {
    Blocks {
        lines: input.lines(),
        acc: BlockAccumulator::new(),
        done: false,
    }
}
