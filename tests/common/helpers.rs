use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use multibar::{Progress, TermWriter};

/// Refresh period used by the tests; fast enough that every scenario sees
/// several frames without slowing the suite down.
pub const TEST_REFRESH: Duration = Duration::from_millis(10);

/// In-memory terminal: appends every frame to a shared buffer and reports a
/// fixed size. Clones share the buffer, so tests can keep one handle while
/// the orchestrator owns the other.
#[derive(Clone)]
pub struct CaptureWriter {
    buf: Arc<Mutex<Vec<u8>>>,
    size: (u16, u16),
}

impl CaptureWriter {
    pub fn new(cols: u16, rows: u16) -> Self {
        CaptureWriter {
            buf: Arc::new(Mutex::new(Vec::new())),
            size: (cols, rows),
        }
    }

    /// Everything written so far, frames concatenated.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.buf.lock().unwrap().len()
    }
}

impl TermWriter for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> multibar::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> multibar::Result<()> {
        Ok(())
    }

    fn term_size(&self) -> Option<(u16, u16)> {
        Some(self.size)
    }
}

/// Creates a fast-ticking progress instance rendering into a capture
/// writer, returning both.
pub fn capture_progress(cols: u16, rows: u16) -> (Progress, CaptureWriter) {
    let writer = CaptureWriter::new(cols, rows);
    let progress = Progress::builder()
        .writer(writer.clone())
        .refresh_rate(TEST_REFRESH)
        .build();
    (progress, writer)
}

/// Polls `cond` every few milliseconds until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}
