//! crates/gramatica_core/src/transition.rs
//!
//! Sequences user-visible state changes around an exit/enter boundary.
//!
//! A dispatch is a two-phase commit over a timer: the outgoing view is told to
//! exit, the coordinator waits for the settle delay, and only then is the event
//! applied and the incoming view told to enter. While one dispatch is pending,
//! every other user-originated transition is refused with [`TransitionError::Busy`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::session::{Effect, SessionError, SessionEvent, SessionMachine};

/// Time between the exit signal and the mutation.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Phase signalled to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPhase {
    Exiting,
    Entering,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Another transition is still in progress")]
    Busy,
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Hooks run by the coordinator at each step of a transition.
///
/// They are called with the machine locked, so they must not try to lock it again.
pub trait TransitionObserver: Send + Sync {
    /// The outgoing view is about to leave; stop anything tied to it.
    fn on_exit(&self, machine: &SessionMachine);
    /// The event has been applied.
    fn on_commit(&self, machine: &SessionMachine);
    /// The incoming view may start entering.
    fn on_enter(&self, machine: &SessionMachine);
}

/// Serializes view transitions and debounces overlapping requests.
#[derive(Debug)]
pub struct TransitionCoordinator {
    settle: Duration,
    pending: AtomicBool,
}

impl Default for TransitionCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_DELAY)
    }
}

impl TransitionCoordinator {
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            pending: AtomicBool::new(false),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Runs `event` as an animated transition: exit, settle, apply, enter.
    ///
    /// Guards are checked before the exit signal, so a rejected event never
    /// animates. The returned effects belong to the new state and must be
    /// executed by the caller after this returns.
    pub async fn dispatch<O>(
        &self,
        machine: &Mutex<SessionMachine>,
        event: SessionEvent,
        observer: &O,
    ) -> Result<Vec<Effect>, TransitionError>
    where
        O: TransitionObserver + ?Sized,
    {
        let _pending = {
            let current = machine.lock().await;
            let guard = PendingGuard::claim(&self.pending).ok_or(TransitionError::Busy)?;
            current.accepts(&event)?;
            debug!(event = event.name(), "Transition exiting.");
            observer.on_exit(&current);
            guard
        };

        tokio::time::sleep(self.settle).await;

        let mut current = machine.lock().await;
        let effects = match current.apply(event) {
            Ok(effects) => effects,
            Err(e) => {
                // The exit already went out; bring the unchanged view back in.
                observer.on_enter(&current);
                return Err(e.into());
            }
        };
        observer.on_commit(&current);
        observer.on_enter(&current);
        debug!(status = %current.status(), "Transition entered.");
        Ok(effects)
    }

    /// Applies a user event that has no exit/enter animation (the hint).
    /// Refused while a transition is pending.
    pub async fn apply_now<O>(
        &self,
        machine: &Mutex<SessionMachine>,
        event: SessionEvent,
        observer: &O,
    ) -> Result<Vec<Effect>, TransitionError>
    where
        O: TransitionObserver + ?Sized,
    {
        let mut current = machine.lock().await;
        if self.is_pending() {
            return Err(TransitionError::Busy);
        }
        let effects = current.apply(event)?;
        observer.on_commit(&current);
        Ok(effects)
    }

    /// Applies the result of a content request. Provider results are only valid
    /// while content is awaited, a status no animated transition starts from, so
    /// they are never debounced.
    pub async fn apply_external<O>(
        &self,
        machine: &Mutex<SessionMachine>,
        event: SessionEvent,
        observer: &O,
    ) -> Result<Vec<Effect>, TransitionError>
    where
        O: TransitionObserver + ?Sized,
    {
        let mut current = machine.lock().await;
        let effects = current.apply(event)?;
        observer.on_commit(&current);
        Ok(effects)
    }
}

/// Holds the pending flag for the lifetime of a dispatch, including one that is
/// dropped mid-way.
struct PendingGuard<'a>(&'a AtomicBool);

impl<'a> PendingGuard<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
