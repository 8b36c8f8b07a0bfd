//! The render orchestrator.
//!
//! One [`Progress`] owns the bar list, the tick loop and the terminal
//! writer. Each tick it sorts the bars, builds the frame's width-sync
//! rendezvous, fans in every bar's rendered row in display order, runs the
//! interceptors and flushes the writer, which repaints the block in place.
//!
//! The orchestrator is itself an actor: configuration is owned by its
//! server thread and reached only through an inbox of closures, mirroring
//! the per-bar discipline.

pub(crate) mod width_sync;

mod builder;

pub use builder::ProgressBuilder;

use std::sync::Mutex;
use std::thread;
use std::time::Instant;

use crossbeam_channel::{bounded, never, select, tick, Receiver, Sender};
use crossbeam_utils::sync::WaitGroup;
use tracing::{debug, warn};

use crate::bar::{Bar, BarOpts};
use crate::bar::state::BarState;
use crate::decor::{self, Units};
use crate::signal::{self, Trigger, Watch};
use crate::writer::TermWriter;
use builder::DEFAULT_REFRESH;
use width_sync::WidthSync;

/// Callback invoked with the bar list before each frame, typically to sort.
pub type BeforeRender = Box<dyn FnMut(&mut [Bar]) + Send>;

/// Callback that may write extra lines after the bar block in each frame.
pub type Interceptor = Box<dyn FnMut(&mut dyn TermWriter) + Send>;

pub(crate) type ConfOp = Box<dyn FnOnce(&mut Conf) + Send + 'static>;

/// Orchestrator configuration, owned by the server thread.
pub(crate) struct Conf {
    pub bars: Vec<Bar>,
    pub width: usize,
    pub format: String,
    pub fill_levels: Vec<char>,
    pub refresh: std::time::Duration,
    pub writer: Box<dyn TermWriter + Send>,
    pub before_render: BeforeRender,
    pub interceptors: Vec<Interceptor>,
    pub cancel: Option<Watch>,
    pub shutdown_notifier: Option<Trigger>,
}

/// Renders and coordinates a set of progress bars.
pub struct Progress {
    ops: Sender<ConfOp>,
    quit: Trigger,
    quit_watch: Watch,
    done: Watch,
    render_wg: Mutex<Option<WaitGroup>>,
    external_wg: Mutex<Option<WaitGroup>>,
}

impl Progress {
    /// Starts building an orchestrator.
    pub fn builder() -> ProgressBuilder {
        ProgressBuilder::new()
    }

    /// An orchestrator with default settings, rendering to standard error.
    pub fn new() -> Progress {
        ProgressBuilder::new().build()
    }

    pub(crate) fn start(conf: Conf, external_wg: Option<WaitGroup>) -> Progress {
        let (ops_tx, ops_rx) = bounded(0);
        let (quit, quit_watch) = signal::pair();
        let (done_trigger, done) = signal::pair();
        let server_quit = quit_watch.clone();
        thread::spawn(move || server(conf, ops_rx, server_quit, done_trigger));
        Progress {
            ops: ops_tx,
            quit,
            quit_watch,
            done,
            render_wg: Mutex::new(Some(WaitGroup::new())),
            external_wg: Mutex::new(external_wg),
        }
    }

    /// Adds a bar with the orchestrator defaults overridden by `opts` and
    /// spawns its actor. After [`stop`](Progress::stop) this returns an
    /// inert bar whose methods are all safe no-ops.
    pub fn add_bar(&self, total: i64, opts: BarOpts) -> Bar {
        let render_wg = match self.render_wg.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(wg) => wg.clone(),
                None => return Bar::noop(),
            },
            Err(_) => return Bar::noop(),
        };
        let (reply_tx, reply_rx) = bounded(1);
        let op: ConfOp = Box::new(move |conf| {
            let mut state = BarState::new(total);
            state.width = conf.width;
            if let Err(err) = state.set_format(&conf.format, &conf.fill_levels) {
                warn!("ignoring default bar format: {err}");
            }
            opts.apply(&mut state);
            let bar = Bar::spawn(state, Some(render_wg), conf.cancel.clone());
            conf.bars.push(bar.clone());
            let _ = reply_tx.send(bar);
        });
        let quit = self.quit_watch.receiver();
        select! {
            send(self.ops, op) -> res => {
                if res.is_ok() {
                    if let Ok(bar) = reply_rx.recv() {
                        return bar;
                    }
                }
                Bar::noop()
            }
            recv(quit) -> _ => Bar::noop(),
        }
    }

    /// Adds a bar with the stock decorator set: a name and a
    /// rate/counter/percentage block in front, a width-synced ETA behind.
    pub fn add_bar_def(
        &self,
        total: i64,
        name: impl Into<String>,
        unit: Units,
        opts: BarOpts,
    ) -> Bar {
        let defaults = BarOpts::new()
            .prepend(decor::static_name(name, 0, 0))
            .prepend(decor::def_data_pre_bar(unit))
            .append(decor::eta(4, decor::WIDTH_SYNC));
        self.add_bar(total, defaults.merge(opts))
    }

    /// Removes a bar from the display, completing it. Returns whether the
    /// bar was present.
    pub fn remove_bar(&self, bar: &Bar) -> bool {
        let target = bar.clone();
        let (reply_tx, reply_rx) = bounded(1);
        let op: ConfOp = Box::new(move |conf| {
            let removed = match conf.bars.iter().position(|b| *b == target) {
                Some(index) => {
                    conf.bars[index].complete();
                    conf.bars.remove(index);
                    true
                }
                None => false,
            };
            let _ = reply_tx.send(removed);
        });
        let quit = self.quit_watch.receiver();
        select! {
            send(self.ops, op) -> res => {
                res.is_ok() && reply_rx.recv().unwrap_or(false)
            }
            recv(quit) -> _ => false,
        }
    }

    /// Number of bars currently displayed.
    pub fn bar_count(&self) -> usize {
        let (reply_tx, reply_rx) = bounded(1);
        let op: ConfOp = Box::new(move |conf| {
            let _ = reply_tx.send(conf.bars.len());
        });
        let quit = self.quit_watch.receiver();
        select! {
            send(self.ops, op) -> res => {
                if res.is_ok() { reply_rx.recv().unwrap_or(0) } else { 0 }
            }
            recv(quit) -> _ => 0,
        }
    }

    /// Gracefully shuts down rendering: waits on the external wait group if
    /// one was provided, completes indeterminate bars, waits for every bar
    /// actor to retire, then stops the server thread.
    ///
    /// This is not cancellation; attach a cancel signal for aborting work.
    pub fn stop(&self) {
        let external = self.external_wg.lock().ok().and_then(|mut g| g.take());
        if let Some(wg) = external {
            wg.wait();
        }
        if self.quit_watch.fired() {
            return;
        }
        let op: ConfOp = Box::new(|conf| {
            for bar in &conf.bars {
                bar.force_complete(DEFAULT_REFRESH);
            }
        });
        let _ = self.ops.send(op);
        let render = self.render_wg.lock().ok().and_then(|mut g| g.take());
        if let Some(wg) = render {
            wg.wait();
        }
        self.quit.fire();
        self.done.wait();
    }
}

impl Default for Progress {
    fn default() -> Self {
        Progress::new()
    }
}

/// Default pre-render sort: ascending id, finished bars before unfinished
/// ones of the same id, so completed lines drift up and off the top.
pub(crate) fn default_sort(bars: &mut [Bar]) {
    bars.sort_by_cached_key(|bar| (bar.id(), bar.total() != bar.current()));
}

fn server(mut conf: Conf, ops: Receiver<ConfOp>, quit: Watch, done: Trigger) {
    enum Event {
        Op(Option<ConfOp>),
        Tick,
        Cancel,
        Quit,
    }

    let mut ticker = tick(conf.refresh);
    let mut cancel_rx = match &conf.cancel {
        Some(watch) => watch.receiver().clone(),
        None => never(),
    };
    let quit_rx = quit.receiver().clone();
    loop {
        let event = select! {
            recv(ops) -> op => Event::Op(op.ok()),
            recv(ticker) -> _ => Event::Tick,
            recv(cancel_rx) -> _ => Event::Cancel,
            recv(quit_rx) -> _ => Event::Quit,
        };
        match event {
            Event::Op(Some(op)) => op(&mut conf),
            Event::Tick => {
                if !conf.bars.is_empty() {
                    render_frame(&mut conf);
                }
            }
            Event::Cancel => {
                ticker = never();
                cancel_rx = never();
            }
            Event::Op(None) | Event::Quit => break,
        }
    }
    if let Some(notifier) = conf.shutdown_notifier.take() {
        notifier.fire();
    }
    done.fire();
}

fn render_frame(conf: &mut Conf) {
    (conf.before_render)(&mut conf.bars);

    let deadline = Instant::now() + conf.refresh;

    let (mut cols, mut rows) = match conf.writer.term_size() {
        Some(size) => size,
        None => {
            debug!("terminal size unavailable, assuming 80x24");
            (80, 24)
        }
    };
    // One line of context and a blank at the bottom need to survive.
    if rows < 4 {
        rows = 24;
    }
    if cols < 20 {
        cols = 80;
    }

    // When there are more bars than rows, keep the tail: the most recently
    // active bars sort last and matter most.
    let num_bars = conf.bars.len();
    let visible_rows = rows as usize - 3;
    let mut skip = num_bars.saturating_sub(visible_rows);

    let prepend_ws = WidthSync::start(deadline, num_bars, conf.bars[0].num_of_prependers());
    let append_ws = WidthSync::start(deadline, num_bars, conf.bars[0].num_of_appenders());

    let (flushed, flushed_watch) = signal::pair();
    let rows_rx: Vec<Receiver<Vec<u8>>> = conf
        .bars
        .iter()
        .map(|bar| {
            bar.update();
            bar.render(
                cols as usize,
                flushed_watch.clone(),
                prepend_ws.clone(),
                append_ws.clone(),
            )
        })
        .collect();

    for row_rx in rows_rx {
        let Ok(row) = row_rx.recv() else { continue };
        if skip > 0 {
            skip -= 1;
            continue;
        }
        if let Err(err) = conf.writer.write(&row) {
            warn!("terminal write failed: {err}");
        }
    }

    for interceptor in conf.interceptors.iter_mut() {
        interceptor(&mut *conf.writer);
    }

    if let Err(err) = conf.writer.flush() {
        warn!("terminal flush failed: {err}");
    }
    flushed.fire();
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullWriter;

    impl TermWriter for NullWriter {
        fn write(&mut self, buf: &[u8]) -> crate::Result<usize> {
            Ok(buf.len())
        }
        fn flush(&mut self) -> crate::Result<()> {
            Ok(())
        }
        fn term_size(&self) -> Option<(u16, u16)> {
            Some((80, 24))
        }
    }

    #[test]
    fn default_sort_orders_by_id_finished_first() {
        let p = Progress::builder().writer(NullWriter).build();
        let slow = p.add_bar(10, BarOpts::new().id(1));
        let done = p.add_bar(5, BarOpts::new().id(1));
        let early = p.add_bar(10, BarOpts::new().id(0));
        done.incr(5);
        slow.incr(1);

        let mut bars = vec![slow.clone(), done.clone(), early.clone()];
        default_sort(&mut bars);
        assert!(bars[0] == early);
        assert!(bars[1] == done);
        assert!(bars[2] == slow);
        p.stop();
    }
}
