//! Terminal writer collaborator.
//!
//! The orchestrator talks to the terminal exclusively through the
//! [`TermWriter`] trait: buffered row writes, a flush that repaints over the
//! previous frame, and a size query. [`CursorWriter`] is the production
//! implementation; tests substitute an in-memory capture.

use std::io::{self, Write};

use terminal_size::{terminal_size, Height, Width};

use crate::error::Result;

/// Destination for rendered frames.
pub trait TermWriter {
    /// Buffers row bytes for the frame being composed.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Emits the buffered frame, rewinding the cursor over the previous one.
    fn flush(&mut self) -> Result<()>;

    /// Current terminal size as `(columns, rows)`, if known.
    fn term_size(&self) -> Option<(u16, u16)>;
}

/// ANSI terminal writer. Buffers a whole frame, and on flush moves the
/// cursor up over the previously written block and erases it before
/// emitting the new frame.
pub struct CursorWriter<W: Write> {
    out: W,
    buf: Vec<u8>,
    lines: usize,
}

impl CursorWriter<io::Stderr> {
    /// The default destination: standard error.
    pub fn stderr() -> Self {
        CursorWriter::new(io::stderr())
    }
}

impl<W: Write> CursorWriter<W> {
    pub fn new(out: W) -> Self {
        CursorWriter {
            out,
            buf: Vec::with_capacity(512),
            lines: 0,
        }
    }
}

impl<W: Write> TermWriter for CursorWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        if self.lines > 0 {
            write!(self.out, "\x1b[{}A\x1b[J", self.lines)?;
        }
        self.out.write_all(&self.buf)?;
        self.lines = self.buf.iter().filter(|&&b| b == b'\n').count();
        self.buf.clear();
        self.out.flush()?;
        Ok(())
    }

    fn term_size(&self) -> Option<(u16, u16)> {
        terminal_size().map(|(Width(cols), Height(rows))| (cols, rows))
    }
}
