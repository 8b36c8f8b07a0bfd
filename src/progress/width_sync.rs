//! Per-frame column-width rendezvous.
//!
//! For every decorator column, one collector gathers the rendered widths of
//! all participating bars and answers each with the maximum, so the column
//! lines up across the whole frame. The collector is bounded by the frame
//! deadline: a stalled bar can delay a column, never the frame.

use std::thread;
use std::time::Instant;

use crossbeam_channel::{at, bounded, select, Receiver, Sender};

/// One frame's rendezvous for a set of decorator columns.
///
/// Cloning is cheap and shares the same per-column channels.
#[derive(Clone)]
pub(crate) struct WidthSync {
    listen: Vec<Sender<usize>>,
    result: Vec<Receiver<usize>>,
}

impl WidthSync {
    /// Spawns one collector per column, each expecting up to `num_bars`
    /// widths before `deadline`.
    pub fn start(deadline: Instant, num_bars: usize, num_columns: usize) -> Self {
        let mut listen = Vec::with_capacity(num_columns);
        let mut result = Vec::with_capacity(num_columns);
        for _ in 0..num_columns {
            let (listen_tx, listen_rx) = bounded(num_bars);
            let (result_tx, result_rx) = bounded(num_bars);
            thread::spawn(move || collect(listen_rx, result_tx, deadline, num_bars));
            listen.push(listen_tx);
            result.push(result_rx);
        }
        WidthSync { listen, result }
    }

    pub fn columns(&self) -> usize {
        self.listen.len()
    }

    pub fn listen(&self, column: usize) -> &Sender<usize> {
        &self.listen[column]
    }

    pub fn result(&self, column: usize) -> &Receiver<usize> {
        &self.result[column]
    }
}

/// Collects widths until the round is full or the deadline fires, then
/// publishes the max once per collected width. A round that gathered
/// nothing publishes nothing; late readers observe the closed channel and
/// fall back to their own width.
fn collect(listen: Receiver<usize>, result: Sender<usize>, deadline: Instant, num_bars: usize) {
    let timeout = at(deadline);
    let mut widths: Vec<usize> = Vec::with_capacity(num_bars);
    loop {
        let full = select! {
            recv(listen) -> width => match width {
                Ok(width) => {
                    widths.push(width);
                    widths.len() == num_bars
                }
                Err(_) => true,
            },
            recv(timeout) -> _ => true,
        };
        if full {
            break;
        }
    }
    let Some(max) = widths.iter().copied().max() else {
        return;
    };
    for _ in 0..widths.len() {
        if result.send(max).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn deadline(ms: u64) -> Instant {
        Instant::now() + Duration::from_millis(ms)
    }

    #[test]
    fn full_round_publishes_max_to_every_bar() {
        let ws = WidthSync::start(deadline(500), 2, 1);
        let a = {
            let ws = ws.clone();
            thread::spawn(move || {
                ws.listen(0).send(3).unwrap();
                ws.result(0).recv().unwrap()
            })
        };
        let b = {
            let ws = ws.clone();
            thread::spawn(move || {
                ws.listen(0).send(7).unwrap();
                ws.result(0).recv().unwrap()
            })
        };
        assert_eq!(a.join().unwrap(), 7);
        assert_eq!(b.join().unwrap(), 7);
    }

    #[test]
    fn partial_round_resolves_at_deadline() {
        let ws = WidthSync::start(deadline(30), 2, 1);
        ws.listen(0).send(5).unwrap();
        // Only one of two widths arrives; the deadline publishes its max.
        assert_eq!(ws.result(0).recv().unwrap(), 5);
    }

    #[test]
    fn empty_round_publishes_nothing() {
        let ws = WidthSync::start(deadline(20), 2, 1);
        // No widths arrive; the collector exits and the channel closes.
        assert!(ws.result(0).recv().is_err());
    }

    #[test]
    fn columns_are_independent() {
        let ws = WidthSync::start(deadline(500), 1, 2);
        ws.listen(1).send(9).unwrap();
        assert_eq!(ws.result(1).recv().unwrap(), 9);
        ws.listen(0).send(2).unwrap();
        assert_eq!(ws.result(0).recv().unwrap(), 2);
    }
}
