//! Progress bars and their state actors.
//!
//! Every [`Bar`] handle fronts an actor thread that owns the bar's mutable
//! state. All mutations and reads travel through a single inbox of closures,
//! so producer threads never contend on locks and never observe a torn
//! state. Sends are multiplexed with the bar's quit gate, which makes every
//! operation safe against a bar that has already finished: the operation is
//! silently dropped, reads fall back to the final cached state.
//!
//! # Examples
//!
//! ```
//! use multibar::{BarOpts, Progress};
//!
//! let progress = Progress::builder().build();
//! let bar = progress.add_bar(3, BarOpts::new());
//! for _ in 0..3 {
//!     bar.increment();
//! }
//! progress.stop();
//! assert_eq!(bar.current(), 3);
//! ```

mod options;
mod reader;
pub(crate) mod state;

pub use options::BarOpts;
pub use reader::ProxyReader;

use std::any::Any;
use std::io::Read;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, never, select, Receiver, Sender};
use crossbeam_utils::sync::WaitGroup;

use crate::progress::width_sync::WidthSync;
use crate::signal::{self, Trigger, Watch};
use state::{BarState, Refill};

pub(crate) type BarOp = Box<dyn FnOnce(&mut BarState) + Send + 'static>;

/// Handle to one progress bar. Cheap to clone; all clones address the same
/// underlying actor.
#[derive(Clone)]
pub struct Bar {
    ops: Sender<BarOp>,
    quit: Trigger,
    quit_watch: Watch,
    done: Watch,
    cache: Arc<OnceLock<BarState>>,
}

impl PartialEq for Bar {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cache, &other.cache)
    }
}

impl Bar {
    /// Spawns the actor owning `state`. The `render_wg` token is released
    /// when the actor exits; `cancel` aborts the bar when fired.
    pub(crate) fn spawn(
        state: BarState,
        render_wg: Option<WaitGroup>,
        cancel: Option<Watch>,
    ) -> Bar {
        let (ops_tx, ops_rx) = bounded(0);
        let (quit, quit_watch) = signal::pair();
        let (done_trigger, done) = signal::pair();
        let cache = Arc::new(OnceLock::new());

        let bar = Bar {
            ops: ops_tx,
            quit: quit.clone(),
            quit_watch: quit_watch.clone(),
            done,
            cache: Arc::clone(&cache),
        };
        thread::spawn(move || {
            actor(state, ops_rx, quit_watch, quit, cancel, cache, done_trigger, render_wg)
        });
        bar
    }

    /// A bar whose actor never existed: every operation is a safe no-op.
    /// Returned by the orchestrator once it has been stopped.
    pub(crate) fn noop() -> Bar {
        let (ops_tx, _) = bounded(0);
        let (quit, quit_watch) = signal::pair();
        let (done_trigger, done) = signal::pair();
        let cache = Arc::new(OnceLock::new());
        let _ = cache.set(BarState::new(0));
        quit.fire();
        done_trigger.fire();
        Bar {
            ops: ops_tx,
            quit,
            quit_watch,
            done,
            cache,
        }
    }

    fn send_op(&self, op: BarOp) {
        let quit = self.quit_watch.receiver();
        select! {
            send(self.ops, op) -> _ => {}
            recv(quit) -> _ => {}
        }
    }

    /// Snapshot read served by the actor, or from the cached final state
    /// once the actor has exited.
    fn read<T>(&self, field: fn(&BarState) -> T, fallback: T) -> T
    where
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = bounded(1);
        let op: BarOp = Box::new(move |s| {
            let _ = reply_tx.send(field(s));
        });
        let done = self.done.receiver();
        select! {
            send(self.ops, op) -> res => {
                if res.is_ok() {
                    if let Ok(value) = reply_rx.recv() {
                        return value;
                    }
                }
            }
            recv(done) -> _ => {}
        }
        self.cache.get().map(field).unwrap_or(fallback)
    }

    /// Advances the bar by `amount`. Negative amounts are ignored.
    pub fn incr(&self, amount: i64) {
        if amount < 0 {
            return;
        }
        self.send_op(Box::new(move |s| s.advance(amount)));
    }

    /// Shorthand for `incr(1)`.
    pub fn increment(&self) {
        self.incr(1);
    }

    /// Refreshes time-dependent decorators without moving progress.
    pub fn update(&self) {
        self.incr(0);
    }

    /// Signals that the bar's work is finished. Idempotent. Call this for
    /// indeterminate bars; determinate bars complete on reaching their
    /// total, and `stop()` completes any stragglers.
    pub fn complete(&self) {
        self.quit.fire();
    }

    /// Marks the first `upto` progress units to be drawn with `glyph`,
    /// e.g. to distinguish resumed bytes from downloaded ones.
    pub fn resume_fill(&self, glyph: char, upto: i64) {
        if upto < 1 {
            return;
        }
        self.send_op(Box::new(move |s| s.refill = Some(Refill { glyph, upto })));
    }

    /// Wraps `reader` so reads advance this bar by the bytes read.
    pub fn proxy_reader<R: Read>(&self, reader: R) -> ProxyReader<R> {
        ProxyReader::new(reader, self.clone())
    }

    /// The bar's sort/priority key.
    pub fn id(&self) -> i32 {
        self.read(|s| s.id, 0)
    }

    /// Progress so far.
    pub fn current(&self) -> i64 {
        self.read(|s| s.current, 0)
    }

    /// Target count; zero or negative for indeterminate bars.
    pub fn total(&self) -> i64 {
        self.read(|s| s.total, 0)
    }

    pub fn num_of_prependers(&self) -> usize {
        self.read(|s| s.prepend.len(), 0)
    }

    pub fn num_of_appenders(&self) -> usize {
        self.read(|s| s.append.len(), 0)
    }

    /// True while the bar has not been completed or aborted. Non-blocking.
    pub fn in_progress(&self) -> bool {
        !self.quit_watch.fired()
    }

    /// Drops all prepend decorators.
    pub fn remove_all_prependers(&self) {
        self.send_op(Box::new(|s| s.prepend.clear()));
    }

    /// Drops all append decorators.
    pub fn remove_all_appenders(&self) {
        self.send_op(Box::new(|s| s.append.clear()));
    }

    /// Completes the bar unless it already reached its total (in which case
    /// the render path retires it after the final frame). Gives up after
    /// `patience` rather than block shutdown on a wedged actor.
    pub(crate) fn force_complete(&self, patience: Duration) {
        let quit = self.quit.clone();
        let op: BarOp = Box::new(move |s| {
            if !s.completed {
                quit.fire();
            }
        });
        select! {
            send(self.ops, op) -> _ => {}
            default(patience) => {}
        }
    }

    /// Renders this bar's row for one frame. Returns a one-shot channel
    /// carrying the row bytes (newline included). The snapshot is taken
    /// through the actor; a bar whose snapshot says `completed` waits for
    /// the frame's `flushed` gate and then retires itself, so a finished
    /// bar is painted exactly once in its final state.
    pub(crate) fn render(
        &self,
        term_width: usize,
        flushed: Watch,
        prepend_ws: WidthSync,
        append_ws: WidthSync,
    ) -> Receiver<Vec<u8>> {
        let (row_tx, row_rx) = bounded(1);
        let bar = self.clone();
        thread::spawn(move || {
            let (state_tx, state_rx) = bounded::<BarState>(1);
            let quit = bar.quit.clone();
            let op: BarOp = Box::new(move |s| {
                if let Some(spinner) = s.spinner.as_mut() {
                    spinner.advance();
                }
                let _ = state_tx.send(s.clone());
                if s.completed {
                    flushed.wait();
                    quit.fire();
                }
            });
            let done = bar.done.receiver();
            let snapshot = select! {
                send(bar.ops, op) -> res => {
                    if res.is_ok() { state_rx.recv().ok() } else { None }
                }
                recv(done) -> _ => None,
            };

            let drawn = catch_unwind(AssertUnwindSafe(|| match &snapshot {
                Some(s) => state::draw(s, term_width, &prepend_ws, &append_ws),
                None => match bar.cache.get() {
                    Some(s) => state::draw(s, term_width, &prepend_ws, &append_ws),
                    None => Vec::new(),
                },
            }));
            let mut row = match drawn {
                Ok(row) => row,
                Err(panic) => panic_message(&*panic).into_bytes(),
            };
            row.push(b'\n');
            let _ = row_tx.send(row);
        });
        row_rx
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "decorator panicked".to_string()
    }
}

#[allow(clippy::too_many_arguments)]
fn actor(
    mut state: BarState,
    ops: Receiver<BarOp>,
    quit_watch: Watch,
    quit: Trigger,
    cancel: Option<Watch>,
    cache: Arc<OnceLock<BarState>>,
    done: Trigger,
    render_wg: Option<WaitGroup>,
) {
    enum Event {
        Op(Option<BarOp>),
        Quit,
        Cancel,
    }

    let mut cancel_rx = match &cancel {
        Some(watch) => watch.receiver().clone(),
        None => never(),
    };
    let quit_rx = quit_watch.receiver().clone();
    loop {
        let event = select! {
            recv(ops) -> op => Event::Op(op.ok()),
            recv(quit_rx) -> _ => Event::Quit,
            recv(cancel_rx) -> _ => Event::Cancel,
        };
        match event {
            Event::Op(Some(op)) => op(&mut state),
            // A closed inbox means every handle is gone; nothing can observe
            // this bar again except through the cache.
            Event::Op(None) | Event::Quit => {
                state.completed = true;
                break;
            }
            Event::Cancel => {
                state.aborted = true;
                cancel_rx = never();
                quit.fire();
            }
        }
    }
    let _ = cache.set(state);
    done.fire();
    drop(render_wg);
}
