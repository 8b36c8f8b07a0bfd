//! Decorators: the textual segments rendered before and after bar glyphs.
//!
//! A decorator is a pure function from a [`Statistics`] snapshot to a string
//! segment. Decorators run once per bar per frame, on the render path, and
//! may opt into the per-frame column-width rendezvous so that the same
//! column lines up across every bar (see [`WIDTH_SYNC`]).
//!
//! # Examples
//!
//! ```
//! use multibar::{decor, BarOpts, Progress};
//! use multibar::decor::Units;
//!
//! let progress = Progress::builder().build();
//! let bar = progress.add_bar(
//!     100,
//!     BarOpts::new()
//!         .prepend(decor::static_name("queue: ", 0, decor::SYNC_SPACE))
//!         .append(decor::percentage(4, 0)),
//! );
//! bar.increment();
//! progress.stop();
//! ```

mod format;

pub use format::{format_count, format_rate, Units};

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use unicode_width::UnicodeWidthStr;

/// Left-justify (pad on the right) instead of the default right-justify.
pub const IDENT_RIGHT: u8 = 1 << 0;
/// Participate in the per-frame column-width rendezvous.
pub const WIDTH_SYNC: u8 = 1 << 1;
/// Add one column on top of the synced width. Meaningful with [`WIDTH_SYNC`].
pub const EXTRA_SPACE: u8 = 1 << 2;
/// Shortcut for `WIDTH_SYNC | EXTRA_SPACE`.
pub const SYNC_SPACE: u8 = WIDTH_SYNC | EXTRA_SPACE;

/// Immutable view of a bar's state handed to decorators.
#[derive(Clone, Copy, Debug)]
pub struct Statistics {
    /// User-provided sort/priority key.
    pub id: i32,
    /// Whether the bar has reached its target or was explicitly completed.
    pub completed: bool,
    /// Whether the bar was aborted by a cancel signal.
    pub aborted: bool,
    /// Target count; zero or negative means indeterminate.
    pub total: i64,
    /// Progress so far.
    pub current: i64,
    /// Instant of the first positive increment.
    pub start_time: Instant,
    /// Time elapsed since `start_time`, as of the snapshot.
    pub time_elapsed: Duration,
    /// Start of the rolling throughput window.
    pub roll_start_time: Instant,
    /// Amount recorded within the rolling window.
    pub roll_current: i64,
}

impl Statistics {
    /// Estimated time to completion from the rolling-window rate.
    ///
    /// Saturates to [`Duration::MAX`] when no rate is available.
    pub fn eta(&self) -> Duration {
        let elapsed = self.roll_start_time.elapsed().as_secs_f64();
        if elapsed <= 0.0 || self.roll_current <= 0 {
            return Duration::MAX;
        }
        let rate = self.roll_current as f64 / elapsed;
        let secs = (self.total - self.current).max(0) as f64 / rate;
        if secs.is_finite() && secs < Duration::MAX.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            Duration::MAX
        }
    }
}

/// A decorator function.
///
/// The two channel endpoints belong to the frame's width rendezvous for this
/// decorator's column. A decorator that does not set [`WIDTH_SYNC`] ignores
/// both; one that does sends exactly one width and receives exactly one max
/// per frame.
pub type DecoratorFn =
    Arc<dyn Fn(&Statistics, &Sender<usize>, &Receiver<usize>) -> String + Send + Sync>;

/// Wraps a plain snapshot formatter into a decorator handling justification
/// and width sync.
fn padded<F>(min_width: usize, flags: u8, body: F) -> DecoratorFn
where
    F: Fn(&Statistics) -> String + Send + Sync + 'static,
{
    Arc::new(move |stats, my_width, max_width| {
        let text = body(stats);
        let width = if flags & WIDTH_SYNC != 0 {
            let _ = my_width.send(text.width());
            let mut max = max_width.recv().unwrap_or(0);
            if flags & EXTRA_SPACE != 0 {
                max += 1;
            }
            max
        } else {
            min_width
        };
        align(&text, width, flags & IDENT_RIGHT != 0)
    })
}

/// Pads `text` to `width` display cells.
fn align(text: &str, width: usize, left_justify: bool) -> String {
    let w = text.width();
    if w >= width {
        return text.to_string();
    }
    let pad = " ".repeat(width - w);
    if left_justify {
        format!("{text}{pad}")
    } else {
        format!("{pad}{text}")
    }
}

/// Substitutes up to two `{}` placeholders.
fn fill_pair(pair_format: &str, first: &str, second: &str) -> String {
    let out = pair_format.replacen("{}", first, 1);
    out.replacen("{}", second, 1)
}

/// A fixed name segment.
pub fn static_name(name: impl Into<String>, min_width: usize, flags: u8) -> DecoratorFn {
    let name = name.into();
    dynamic_name(move |_| name.clone(), min_width, flags)
}

/// A name segment recomputed every frame.
pub fn dynamic_name<F>(name_fn: F, min_width: usize, flags: u8) -> DecoratorFn
where
    F: Fn(&Statistics) -> String + Send + Sync + 'static,
{
    padded(min_width, flags, name_fn)
}

/// Renders `current`/`total` through a pair format such as `"{} / {}"`.
pub fn counters_string(stats: &Statistics, pair_format: &str, unit: Units) -> String {
    let current = format_count(stats.current, unit);
    let total = format_count(stats.total, unit);
    fill_pair(pair_format, &current, &total)
}

/// Counter decorator, e.g. `1.2MiB / 3.0MiB`.
pub fn counters(
    pair_format: impl Into<String>,
    unit: Units,
    min_width: usize,
    flags: u8,
) -> DecoratorFn {
    let pair_format = pair_format.into();
    padded(min_width, flags, move |s| {
        counters_string(s, &pair_format, unit)
    })
}

/// Renders the rolling-window rate through a format such as `"{}/s"`.
pub fn nsec_string(stats: &Statistics, rate_format: &str, unit: Units) -> String {
    let mut rate = 0.0;
    if stats.current > 0 {
        let elapsed = stats.roll_start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            rate = stats.roll_current as f64 / elapsed;
        }
    }
    rate_format.replacen("{}", &format_rate(rate, unit), 1)
}

/// Throughput decorator based on the rolling window.
pub fn nsec(
    rate_format: impl Into<String>,
    unit: Units,
    min_width: usize,
    flags: u8,
) -> DecoratorFn {
    let rate_format = rate_format.into();
    padded(min_width, flags, move |s| nsec_string(s, &rate_format, unit))
}

/// Renders the estimated time to completion, switching to the elapsed time
/// once the bar is done.
pub fn eta_string(stats: &Statistics) -> String {
    let done = stats.completed || (stats.total > 0 && stats.current == stats.total);
    if done {
        return format::small_duration_string(stats.time_elapsed);
    }
    if stats.roll_current == 0 || stats.total <= 0 {
        return "∞:??".to_string();
    }
    let dur = stats.eta();
    let secs = dur.as_secs();
    if dur.as_secs_f64() / 3600.0 > 999.0 * 24.0 {
        "∞".to_string()
    } else if dur.as_secs_f64() / 3600.0 > 36.0 {
        let days = format::round_duration(dur, Duration::from_secs(24 * 3600)).as_secs() / (24 * 3600);
        format!("~{days}d")
    } else if dur.as_secs_f64() / 60.0 > 59.0 {
        let hours = format::round_duration(dur, Duration::from_secs(3600)).as_secs() / 3600;
        format!("~{hours}h")
    } else if dur.as_secs_f64() < 3.0 {
        "~2s".to_string()
    } else {
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}

/// ETA decorator.
pub fn eta(min_width: usize, flags: u8) -> DecoratorFn {
    padded(min_width, flags, eta_string)
}

/// Renders the elapsed time truncated to whole seconds.
pub fn elapsed_string(stats: &Statistics) -> String {
    format::duration_string(Duration::from_secs(stats.time_elapsed.as_secs()))
}

/// Elapsed-time decorator.
pub fn elapsed(min_width: usize, flags: u8) -> DecoratorFn {
    padded(min_width, flags, elapsed_string)
}

/// Renders the completion percentage, blank outside `0 < current < total`.
/// Uses floor division so a bar never reads 100% before it is done.
pub fn percentage_string(stats: &Statistics) -> String {
    if stats.current > 0 && stats.current < stats.total {
        format!("{:2}%", 100 * stats.current / stats.total)
    } else {
        "   ".to_string()
    }
}

/// Percentage decorator.
pub fn percentage(min_width: usize, flags: u8) -> DecoratorFn {
    padded(min_width, flags, percentage_string)
}

/// The default pre-bar data block: rate, current counter and percentage.
pub fn def_data_pre_bar(unit: Units) -> DecoratorFn {
    Arc::new(move |stats, _my_width, _max_width| {
        let mut out = nsec_string(stats, "{}/s ", unit);
        out.push_str(&counters_string(stats, "{}", unit));
        out.push(' ');
        out.push_str(&percentage_string(stats));
        out
    })
}

/// Splits `width` cells proportionally to `current/total`, returning the
/// number of completed cells and, when `fill_levels > 0`, the index of the
/// partial-cell glyph for the remainder.
pub(crate) fn calc_fill(
    total: i64,
    current: i64,
    width: usize,
    fill_levels: usize,
) -> (usize, usize) {
    if total == 0 || current > total {
        return (0, 0);
    }
    let num = width as f64 * current as f64 / total as f64;
    if fill_levels > 0 {
        let rem = num - num.floor();
        (num as usize, (rem * fill_levels as f64) as usize)
    } else {
        (format::round_unit(num, 1.0) as usize, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> Statistics {
        let now = Instant::now();
        Statistics {
            id: 0,
            completed: false,
            aborted: false,
            total: 100,
            current: 0,
            start_time: now,
            time_elapsed: Duration::ZERO,
            roll_start_time: now,
            roll_current: 0,
        }
    }

    fn rolling(total: i64, current: i64, roll_current: i64, since: Duration) -> Statistics {
        Statistics {
            total,
            current,
            roll_current,
            roll_start_time: Instant::now() - since,
            ..stats()
        }
    }

    #[test]
    fn percentage_blank_at_rest_and_done() {
        assert_eq!(percentage_string(&stats()), "   ");
        assert_eq!(
            percentage_string(&Statistics { current: 100, ..stats() }),
            "   "
        );
        assert_eq!(
            percentage_string(&Statistics { current: 50, ..stats() }),
            "50%"
        );
        assert_eq!(
            percentage_string(&Statistics { current: 5, ..stats() }),
            " 5%"
        );
        // Floor division: 99.9% reads as 99%.
        assert_eq!(
            percentage_string(&Statistics { total: 1000, current: 999, ..stats() }),
            "99%"
        );
    }

    #[test]
    fn counters_pair() {
        let s = Statistics { total: 2048, current: 1024, ..stats() };
        assert_eq!(counters_string(&s, "{} / {}", Units::KiB), "1.0KiB / 2.0KiB");
        assert_eq!(counters_string(&s, "{}", Units::KiB), "1.0KiB");
    }

    #[test]
    fn eta_stalled_window_shows_unknown() {
        let s = rolling(1000, 100, 0, Duration::from_secs(10));
        assert_eq!(eta_string(&s), "∞:??");
    }

    #[test]
    fn eta_indeterminate_shows_unknown() {
        let s = rolling(0, 42, 42, Duration::from_secs(10));
        assert_eq!(eta_string(&s), "∞:??");
    }

    #[test]
    fn eta_minutes_seconds() {
        // 100 units in ~10s, 600 remaining: one minute to go.
        let s = rolling(700, 100, 100, Duration::from_secs(10));
        assert_eq!(eta_string(&s), "1:00");
    }

    #[test]
    fn eta_imminent() {
        let s = rolling(110, 100, 100, Duration::from_secs(10));
        assert_eq!(eta_string(&s), "~2s");
    }

    #[test]
    fn eta_hours_and_days() {
        let s = rolling(100 + 72_000, 100, 100, Duration::from_secs(10));
        assert_eq!(eta_string(&s), "~2h");
        let s = rolling(100 + 1_728_000, 100, 100, Duration::from_secs(10));
        assert_eq!(eta_string(&s), "~2d");
    }

    #[test]
    fn eta_far_future_collapses() {
        let s = rolling(100 + 900_000_000 * 10, 100, 100, Duration::from_secs(10));
        assert_eq!(eta_string(&s), "∞");
    }

    #[test]
    fn eta_completed_shows_elapsed() {
        let s = Statistics {
            completed: true,
            time_elapsed: Duration::from_secs(5),
            ..stats()
        };
        assert_eq!(eta_string(&s), "5s");
        let s = Statistics {
            current: 100,
            time_elapsed: Duration::from_secs(90),
            ..stats()
        };
        assert_eq!(eta_string(&s), "1m30s");
    }

    #[test]
    fn elapsed_truncates_to_whole_seconds() {
        let s = Statistics {
            time_elapsed: Duration::from_millis(65_400),
            ..stats()
        };
        assert_eq!(elapsed_string(&s), "1m5s");
        let s = Statistics {
            time_elapsed: Duration::from_millis(900),
            ..stats()
        };
        assert_eq!(elapsed_string(&s), "0s");
    }

    #[test]
    fn align_pads_display_cells() {
        assert_eq!(align("ab", 4, false), "  ab");
        assert_eq!(align("ab", 4, true), "ab  ");
        assert_eq!(align("abcde", 4, false), "abcde");
        // A fullwidth rune counts as two cells.
        assert_eq!(align("ｘ", 4, false), "  ｘ");
    }

    #[test]
    fn calc_fill_levels() {
        assert_eq!(calc_fill(10, 5, 10, 0), (5, 0));
        // 3/8 of 8 cells lands exactly on a cell boundary: no partial glyph.
        assert_eq!(calc_fill(8, 3, 8, 8), (3, 0));
        // Halfway through a cell with 8 levels picks the middle glyph.
        assert_eq!(calc_fill(16, 9, 8, 8), (4, 4));
        assert_eq!(calc_fill(0, 0, 10, 0), (0, 0));
        assert_eq!(calc_fill(10, 11, 10, 0), (0, 0));
    }

    #[test]
    fn non_syncing_decorator_ignores_channels() {
        let (tx, _rx) = crossbeam_channel::bounded(1);
        let (_tx2, rx2) = crossbeam_channel::bounded(1);
        let name = static_name("dl: ", 6, 0);
        assert_eq!(name(&stats(), &tx, &rx2), "  dl: ");
        let name = static_name("dl: ", 6, IDENT_RIGHT);
        assert_eq!(name(&stats(), &tx, &rx2), "dl:   ");
    }

    #[test]
    fn syncing_decorator_exchanges_widths() {
        let (my_tx, my_rx) = crossbeam_channel::bounded(1);
        let (max_tx, max_rx) = crossbeam_channel::bounded(1);
        max_tx.send(8).unwrap();
        let name = static_name("abc", 0, SYNC_SPACE);
        let out = name(&stats(), &my_tx, &max_rx);
        assert_eq!(my_rx.recv().unwrap(), 3);
        assert_eq!(out, "      abc"); // synced 8 + 1 extra space
    }

    #[test]
    fn def_data_pre_bar_composes() {
        let s = rolling(200, 100, 100, Duration::from_secs(10));
        let dec = def_data_pre_bar(Units::K);
        let (tx, _keep) = crossbeam_channel::bounded(1);
        let (_keep2, rx) = crossbeam_channel::bounded(1);
        let out = dec(&s, &tx, &rx);
        assert!(out.ends_with(" 50%"), "{out:?}");
        assert!(out.contains("/s "), "{out:?}");
    }
}
