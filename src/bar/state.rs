//! Bar state and row composition.
//!
//! `BarState` is owned exclusively by one bar actor; everything here runs
//! either inside that actor or against an immutable snapshot of it.

use std::time::{Duration, Instant};

use unicode_width::UnicodeWidthStr;

use crate::decor::{self, DecoratorFn, Statistics};
use crate::error::{Error, Result};
use crate::progress::width_sync::WidthSync;

pub(crate) const LEFT: usize = 0;
pub(crate) const FILL: usize = 1;
pub(crate) const TIP: usize = 2;
pub(crate) const EMPTY: usize = 3;
pub(crate) const RIGHT: usize = 4;
pub(crate) const FORMAT_LEN: usize = 5;

const ROLL_SLOTS: usize = 8;
const ROLL_SLOT_SPAN: Duration = Duration::from_secs(2);

const SPINNER_FRAMES: [char; 4] = ['-', '\\', '|', '/'];

/// Secondary fill region, drawn over the first cells of the bar to mark a
/// distinct range such as resumed bytes.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Refill {
    pub glyph: char,
    pub upto: i64,
}

/// Indeterminate-mode glyph generator; advanced once per rendered frame.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Spinner {
    index: usize,
}

impl Spinner {
    pub fn new() -> Self {
        Spinner {
            index: SPINNER_FRAMES.len() - 1,
        }
    }

    pub fn advance(&mut self) {
        self.index = (self.index + 1) % SPINNER_FRAMES.len();
    }

    pub fn glyph(&self) -> char {
        SPINNER_FRAMES[self.index]
    }
}

#[derive(Clone)]
pub(crate) struct BarState {
    pub id: i32,
    pub width: usize,
    pub format: [char; FORMAT_LEN],
    pub fill_levels: Vec<char>,
    pub total: i64,
    pub current: i64,
    pub trim_left_space: bool,
    pub trim_right_space: bool,
    pub started: bool,
    pub completed: bool,
    pub aborted: bool,
    pub start_time: Instant,
    roll_start: [Instant; ROLL_SLOTS],
    roll_total: [i64; ROLL_SLOTS],
    roll_off: usize,
    pub prepend: Vec<DecoratorFn>,
    pub append: Vec<DecoratorFn>,
    pub spinner: Option<Spinner>,
    pub refill: Option<Refill>,
}

impl BarState {
    pub fn new(total: i64) -> Self {
        let now = Instant::now();
        BarState {
            id: 0,
            width: 0,
            format: ['[', '=', '>', ' ', ']'],
            fill_levels: Vec::new(),
            total,
            current: 0,
            trim_left_space: false,
            trim_right_space: false,
            started: false,
            completed: false,
            aborted: false,
            start_time: now,
            roll_start: [now; ROLL_SLOTS],
            roll_total: [0; ROLL_SLOTS],
            roll_off: 0,
            prepend: Vec::new(),
            append: Vec::new(),
            spinner: (total <= 0).then(Spinner::new),
            refill: None,
        }
    }

    /// Replaces the five format glyphs, and the partial-fill glyph table when
    /// one is supplied. A non-empty table's last glyph becomes the fill
    /// glyph; an empty table switches the bar to tip-replacement mode.
    pub fn set_format(&mut self, format: &str, fill_levels: &[char]) -> Result<()> {
        let runes: Vec<char> = format.chars().collect();
        if runes.len() != FORMAT_LEN {
            return Err(Error::InvalidFormat(format.to_string()));
        }
        self.format.copy_from_slice(&runes);
        self.fill_levels = fill_levels.to_vec();
        if let Some(&last) = self.fill_levels.last() {
            self.format[FILL] = last;
        }
        Ok(())
    }

    /// Applies an increment: starts the clock on the first positive amount,
    /// records into the rolling window, then advances `current`, clamping at
    /// `total` and marking completion.
    pub fn advance(&mut self, amount: i64) {
        if amount > 0 && self.current == 0 && !self.started {
            self.start_time = Instant::now();
            self.roll_start[0] = self.start_time;
            self.started = true;
        }
        let sum = self.current + amount;
        self.record(amount);
        if self.total > 0 && sum >= self.total {
            self.current = self.total;
            self.completed = true;
            return;
        }
        self.current = sum;
    }

    fn record(&mut self, amount: i64) {
        if amount == 0 {
            return;
        }
        if self.roll_start[self.roll_off].elapsed() > ROLL_SLOT_SPAN {
            self.roll_off = (self.roll_off + 1) % ROLL_SLOTS;
            self.roll_start[self.roll_off] = Instant::now();
            self.roll_total[self.roll_off] = 0;
        }
        self.roll_total[self.roll_off] += amount;
    }

    /// Start instant and amount of the rolling window: the oldest slot's
    /// start and the sum of all slots. Before the ring has rolled over the
    /// oldest slot is empty, in which case the whole-life figures stand in.
    fn rolling(&self) -> (Instant, i64) {
        let mut off = (self.roll_off + 1) % ROLL_SLOTS;
        let begin = self.roll_start[off];
        let mut sum = self.roll_total[off];
        if sum == 0 {
            return (self.start_time, self.current);
        }
        for _ in 1..ROLL_SLOTS {
            off = (off + 1) % ROLL_SLOTS;
            sum += self.roll_total[off];
        }
        (begin, sum)
    }

    pub fn statistics(&self) -> Statistics {
        let (roll_start_time, roll_current) = self.rolling();
        Statistics {
            id: self.id,
            completed: self.completed,
            aborted: self.aborted,
            total: self.total,
            current: self.current,
            start_time: self.start_time,
            time_elapsed: self.start_time.elapsed(),
            roll_start_time,
            roll_current,
        }
    }
}

/// Composes one bar row: prepend block, optional pads, bar glyphs, append
/// block. Returns an empty row when the decorator lists do not match the
/// frame's rendezvous columns (the bar was added mid-frame).
pub(crate) fn draw(
    s: &BarState,
    term_width: usize,
    prepend_ws: &WidthSync,
    append_ws: &WidthSync,
) -> Vec<u8> {
    if s.prepend.len() != prepend_ws.columns() || s.append.len() != append_ws.columns() {
        return Vec::new();
    }
    let term_width = if term_width == 0 { s.width } else { term_width };

    let stats = s.statistics();

    let mut prepend_block = String::new();
    for (i, decorator) in s.prepend.iter().enumerate() {
        prepend_block.push_str(&decorator(&stats, prepend_ws.listen(i), prepend_ws.result(i)));
    }
    let mut append_block = String::new();
    for (i, decorator) in s.append.iter().enumerate() {
        append_block.push_str(&decorator(&stats, append_ws.listen(i), append_ws.result(i)));
    }

    let mut prepend_count = prepend_block.width();
    let mut append_count = append_block.width();

    let mut left_space = "";
    if !s.trim_left_space {
        prepend_count += 1;
        left_space = " ";
    }
    let mut right_space = "";
    if !s.trim_right_space {
        append_count += 1;
        right_space = " ";
    }

    let bar_block = if let Some(spinner) = &s.spinner {
        let mut block = String::with_capacity(3);
        block.push(s.format[LEFT]);
        block.push(spinner.glyph());
        block.push(s.format[RIGHT]);
        block
    } else {
        let mut block = fill_bar(s.total, s.current, s.width, &s.format, &s.fill_levels, s.refill);
        if prepend_count + block.width() + append_count > term_width {
            let shrink_width = term_width.saturating_sub(prepend_count + append_count);
            block = fill_bar(s.total, s.current, shrink_width, &s.format, &s.fill_levels, s.refill);
        }
        block
    };

    let mut row = String::with_capacity(
        prepend_block.len() + bar_block.len() + append_block.len() + 2,
    );
    row.push_str(&prepend_block);
    row.push_str(left_space);
    row.push_str(&bar_block);
    row.push_str(right_space);
    row.push_str(&append_block);
    row.into_bytes()
}

/// Renders the bar glyphs for a determinate bar at the given width.
pub(crate) fn fill_bar(
    total: i64,
    current: i64,
    width: usize,
    format: &[char; FORMAT_LEN],
    fill_levels: &[char],
    refill: Option<Refill>,
) -> String {
    if width < 2 || total <= 0 {
        return String::new();
    }
    let bar_width = width - 2;

    // Finished rows render as bare empty cells: no delimiters left behind.
    if current >= total {
        return std::iter::repeat(format[EMPTY]).take(width).collect();
    }

    let levels = fill_levels.len();
    let (mut completed, level_off) = decor::calc_fill(total, current, bar_width, levels);

    let mut buf = String::with_capacity(width * 4);
    buf.push(format[LEFT]);

    if let Some(rf) = refill {
        let (till, _) = decor::calc_fill(total, rf.upto, bar_width, 0);
        let till = till.min(completed);
        for _ in 0..till {
            buf.push(rf.glyph);
        }
        for _ in till..completed {
            buf.push(format[FILL]);
        }
    } else {
        for _ in 0..completed {
            buf.push(format[FILL]);
        }
    }

    if levels >= 1 {
        if level_off >= 1 {
            buf.push(fill_levels[level_off - 1]);
            completed += 1;
        }
    } else if completed > 0 && completed < bar_width {
        buf.pop();
        buf.push(format[TIP]);
    }

    for _ in completed..bar_width {
        buf.push(format[EMPTY]);
    }
    buf.push(format[RIGHT]);
    buf
}
