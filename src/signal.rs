//! Broadcast close gates used for lifecycle signaling.
//!
//! A gate is a pair of [`Trigger`] and [`Watch`] halves created by [`pair`].
//! Firing the trigger is idempotent and observable by every watch clone at
//! once, which is exactly the shape the library needs for quit gates, frame
//! flush barriers, cancellation and shutdown notification.
//!
//! # Examples
//!
//! ```
//! use multibar::signal;
//!
//! let (cancel, watch) = signal::pair();
//! assert!(!watch.fired());
//! cancel.fire();
//! assert!(watch.fired());
//! watch.wait(); // returns immediately once fired
//! ```

use std::sync::{Arc, Mutex};

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

/// Uninhabited message type; the channel only ever signals by disconnecting.
pub(crate) enum Never {}

/// Creates a connected trigger/watch pair.
pub fn pair() -> (Trigger, Watch) {
    let (tx, rx) = bounded::<Never>(0);
    (
        Trigger {
            inner: Arc::new(Mutex::new(Some(tx))),
        },
        Watch { rx },
    )
}

/// The firing half of a gate.
///
/// All clones share the same gate; firing any of them (or dropping the last
/// clone) releases every [`Watch`].
#[derive(Clone)]
pub struct Trigger {
    inner: Arc<Mutex<Option<Sender<Never>>>>,
}

impl Trigger {
    /// Fires the gate. Subsequent calls are no-ops.
    pub fn fire(&self) {
        if let Ok(mut sender) = self.inner.lock() {
            sender.take();
        }
    }
}

/// The waiting half of a gate. Cheap to clone.
#[derive(Clone)]
pub struct Watch {
    rx: Receiver<Never>,
}

impl Watch {
    /// Blocks until the gate fires. Returns immediately if it already has.
    pub fn wait(&self) {
        let _ = self.rx.recv();
    }

    /// Non-blocking check.
    pub fn fired(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    pub(crate) fn receiver(&self) -> &Receiver<Never> {
        &self.rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn fire_is_idempotent_and_broadcast() {
        let (trigger, watch) = pair();
        let watch2 = watch.clone();
        assert!(!watch.fired());

        trigger.fire();
        trigger.fire();

        assert!(watch.fired());
        assert!(watch2.fired());
    }

    #[test]
    fn wait_unblocks_on_fire() {
        let (trigger, watch) = pair();
        let handle = thread::spawn(move || watch.wait());
        thread::sleep(Duration::from_millis(20));
        trigger.fire();
        handle.join().unwrap();
    }

    #[test]
    fn dropping_all_triggers_fires() {
        let (trigger, watch) = pair();
        let clone = trigger.clone();
        drop(trigger);
        assert!(!watch.fired());
        drop(clone);
        assert!(watch.fired());
    }
}
