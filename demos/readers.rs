//! Proxy-reader demo: bars driven by `io::copy` over throttled readers.
//!
//! Run with `cargo run --example readers`.

use std::io::{self, Read};
use std::thread;
use std::time::Duration;

use rand::Rng;

use multibar::decor::Units;
use multibar::{BarOpts, Progress, WaitGroup};

/// Serves zeroes in small chunks with a delay, like a slow network peer.
struct ThrottledReader {
    remaining: usize,
    chunk: usize,
    delay: Duration,
}

impl Read for ThrottledReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        thread::sleep(self.delay);
        let n = self.chunk.min(self.remaining).min(buf.len());
        buf[..n].iter_mut().for_each(|b| *b = 0);
        self.remaining -= n;
        Ok(n)
    }
}

fn main() {
    let wg = WaitGroup::new();
    let progress = Progress::builder().wait_group(wg.clone()).build();

    let mut rng = rand::thread_rng();
    for i in 0..4 {
        let size = rng.gen_range(256 * 1024..2 * 1024 * 1024usize);
        let bar = progress.add_bar_def(size as i64, format!("peer{i}: "), Units::KiB, BarOpts::new());
        let wg = wg.clone();
        thread::spawn(move || {
            let source = ThrottledReader {
                remaining: size,
                chunk: 32 * 1024,
                delay: Duration::from_millis(40),
            };
            let mut reader = bar.proxy_reader(source);
            io::copy(&mut reader, &mut io::sink()).ok();
            drop(wg);
        });
    }

    drop(wg);
    progress.stop();
}
