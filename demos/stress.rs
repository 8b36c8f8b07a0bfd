//! Stress demo: many short-lived bars plus two aggregate bars.
//!
//! Run with `cargo run --example stress`.

use std::thread;
use std::time::Duration;

use rand::Rng;

use multibar::decor::Units;
use multibar::{BarOpts, Progress, WaitGroup};

const TOTAL_BARS: usize = 128;
const LIVE_BARS: usize = 32;
const MAX_BLOCK_SIZE: u64 = 8;

fn main() {
    let wg = WaitGroup::new();
    let progress = Progress::builder().wait_group(wg.clone()).build();

    let mut rng = rand::thread_rng();
    let totals: Vec<i64> = (0..TOTAL_BARS)
        .map(|i| rng.gen_range(0..10 + i as i64 * 3) + 10)
        .collect();
    let total_data: i64 = totals.iter().sum();

    let bars_bar = progress.add_bar_def(TOTAL_BARS as i64, "Bars: ", Units::K, BarOpts::new().id(2));
    let data_bar = progress.add_bar_def(total_data, "Data: ", Units::K, BarOpts::new().id(3));

    // Keep at most LIVE_BARS workers running at once.
    let (slot_tx, slot_rx) = crossbeam_channel::bounded::<()>(LIVE_BARS);
    for _ in 0..LIVE_BARS {
        slot_tx.send(()).unwrap();
    }

    for (i, &total) in totals.iter().enumerate() {
        slot_rx.recv().unwrap();

        let bar = progress.add_bar_def(total, format!("Bar#{i:02}: "), Units::K, BarOpts::new());
        let bars_bar = bars_bar.clone();
        let data_bar = data_bar.clone();
        let slot_tx = slot_tx.clone();
        let wg = wg.clone();
        thread::spawn(move || {
            let mut rng = rand::thread_rng();
            for _ in 0..total {
                let block = rng.gen_range(1..=MAX_BLOCK_SIZE);
                thread::sleep(Duration::from_millis(block * 50 + rng.gen_range(0..5)));
                bar.increment();
                data_bar.increment();
            }
            bars_bar.increment();
            slot_tx.send(()).ok();
            drop(wg);
        });
    }

    drop(wg);
    progress.stop();
    println!("stop");
}
