//! Read adapter that reports consumed bytes to a bar.

use std::io::{self, Read};

use super::Bar;

/// Wraps a reader so that every successful `read` advances the bar by the
/// number of bytes returned. Works with `io::copy` and friends.
///
/// Created by [`Bar::proxy_reader`].
pub struct ProxyReader<R> {
    inner: R,
    bar: Bar,
}

impl<R> ProxyReader<R> {
    pub(crate) fn new(inner: R, bar: Bar) -> Self {
        ProxyReader { inner, bar }
    }

    /// Unwraps the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for ProxyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bar.incr(n as i64);
        Ok(n)
    }
}
