//! Watches GROWI's SPA page transitions and fires a handler once per
//! distinct (page, mode, revision) state.
//!
//! The browser's Navigation API (`window.navigation`) only reports *future*
//! transitions, so `start()` also evaluates the current location. Browsers
//! without the API (Firefox at the time of writing) get an inert watcher:
//! `start()` returns without registering anything and nothing ever fires.
//!
//! The handler may return a pending future. The watcher never awaits it; it
//! hands it to the [`Spawn`] implementation wrapped in a task that logs
//! failures, so overlapping executions are possible. Handler errors are
//! logged and never reach navigation. Panics in the synchronous part are
//! caught only where unwinding exists (native builds); on
//! `wasm32-unknown-unknown` a panic aborts and is reported by the panic hook.

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use futures_util::future::LocalBoxFuture;

use crate::page_context::PageContext;
use crate::spawn::Spawn;

// ---------------------------------------------------------------------------
// Environment seam
// ---------------------------------------------------------------------------

/// Listener invoked with the destination URL of every navigation.
pub type NavigateListener = Rc<dyn Fn(&str)>;

/// The host environment's navigation signal.
pub trait NavigationSource {
    /// Whether the environment exposes a navigation signal at all.
    fn is_supported(&self) -> bool;

    /// Started flag stored on the shared navigation object, so that two
    /// watchers on the same page cannot both register.
    fn is_listening(&self) -> bool;
    fn set_listening(&self, listening: bool);

    /// Register `listener` for this handle. Each handle owns at most one.
    fn add_listener(&self, listener: NavigateListener) -> Result<(), String>;
    /// Remove the listener this handle registered, if any.
    fn remove_listener(&self);

    /// Absolute URL of the document right now.
    fn current_url(&self) -> Option<String>;
}

// ---------------------------------------------------------------------------
// Handler contract
// ---------------------------------------------------------------------------

/// A page transition as delivered to the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub context: PageContext,
    /// Monotonic per watcher, assigned when the transition passes dedup.
    pub sequence: u64,
}

/// What a handler returns: a finished result or work still in flight.
pub enum HandlerOutcome {
    Ready(anyhow::Result<()>),
    Pending(LocalBoxFuture<'static, anyhow::Result<()>>),
}

impl HandlerOutcome {
    pub fn done() -> Self {
        HandlerOutcome::Ready(Ok(()))
    }
}

pub type TransitionHandler = Rc<dyn Fn(Transition) -> HandlerOutcome>;

/// Strategy selected once, from the capability probe at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStrategy {
    Active,
    Inert,
}

// ---------------------------------------------------------------------------
// Watcher
// ---------------------------------------------------------------------------

struct WatcherState<N> {
    source: N,
    handler: TransitionHandler,
    spawner: Rc<dyn Spawn>,
    last_fired_key: RefCell<Option<String>>,
    /// Whether this watcher owns the registered listener and the started flag.
    registered: Cell<bool>,
    /// Sequence number handed to the last fired transition (0 = none yet).
    last_sequence: Cell<u64>,
}

impl<N: NavigationSource> WatcherState<N> {
    fn on_navigate(&self, href: &str) {
        let Some(context) = PageContext::from_href(href) else {
            return;
        };
        self.try_fire(context);
    }

    fn try_fire(&self, context: PageContext) {
        let key = context.dedup_key();
        {
            let mut last = self.last_fired_key.borrow_mut();
            if last.as_deref() == Some(key.as_str()) {
                tracing::trace!(%key, "duplicate transition skipped");
                return;
            }
            *last = Some(key);
        }

        let sequence = self.last_sequence.get() + 1;
        self.last_sequence.set(sequence);

        tracing::debug!(
            page_id = %context.page_id,
            mode = context.mode.as_str(),
            revision_id = context.revision_id.as_deref().unwrap_or(""),
            sequence,
            "page transition"
        );

        self.dispatch(Transition { context, sequence });
    }

    fn dispatch(&self, transition: Transition) {
        let sequence = transition.sequence;
        let handler = Rc::clone(&self.handler);

        // Only effective where panics unwind; wasm32 aborts instead
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| handler(transition))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                tracing::error!(sequence, panic = panic_message(payload.as_ref()), "transition handler panicked");
                return;
            }
        };

        match outcome {
            HandlerOutcome::Ready(Ok(())) => {}
            HandlerOutcome::Ready(Err(e)) => {
                tracing::error!(sequence, error = %format!("{e:#}"), "transition handler failed");
            }
            HandlerOutcome::Pending(work) => {
                self.spawner.spawn_local(Box::pin(async move {
                    if let Err(e) = work.await {
                        tracing::error!(sequence, error = %format!("{e:#}"), "transition handler failed");
                    }
                }));
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Fires a handler once per distinct page transition.
pub struct NavigationWatcher<N: NavigationSource + 'static> {
    state: Rc<WatcherState<N>>,
    strategy: WatchStrategy,
}

impl<N: NavigationSource + 'static> NavigationWatcher<N> {
    pub fn new(source: N, handler: TransitionHandler, spawner: Rc<dyn Spawn>) -> Self {
        let strategy = if source.is_supported() {
            WatchStrategy::Active
        } else {
            tracing::info!("navigation API unavailable; front matter panel disabled");
            WatchStrategy::Inert
        };

        Self {
            state: Rc::new(WatcherState {
                source,
                handler,
                spawner,
                last_fired_key: RefCell::new(None),
                registered: Cell::new(false),
                last_sequence: Cell::new(0),
            }),
            strategy,
        }
    }

    pub fn strategy(&self) -> WatchStrategy {
        self.strategy
    }

    /// Begin watching. Calling this while this or another watcher is
    /// already listening does nothing.
    pub fn start(&self) {
        if self.strategy == WatchStrategy::Inert || self.state.registered.get() {
            return;
        }
        let source = &self.state.source;
        if source.is_listening() {
            tracing::debug!("navigation already watched by another instance");
            return;
        }
        source.set_listening(true);

        let weak: Weak<WatcherState<N>> = Rc::downgrade(&self.state);
        let registered = source.add_listener(Rc::new(move |href: &str| {
            if let Some(state) = weak.upgrade() {
                state.on_navigate(href);
            }
        }));
        if let Err(e) = registered {
            // Leave the flag clear so a later start() can retry
            source.set_listening(false);
            tracing::error!(error = %e, "failed to listen for navigation");
            return;
        }
        self.state.registered.set(true);

        // The navigate signal does not fire for the initial load
        if let Some(href) = source.current_url() {
            self.state.on_navigate(&href);
        }
    }

    /// Stop watching and forget the last fired state, so the next `start()`
    /// always fires for the current location. A watcher that never registered
    /// leaves the shared flag and other watchers' listeners alone.
    pub fn stop(&self) {
        if !self.state.registered.replace(false) {
            return;
        }
        let source = &self.state.source;
        source.remove_listener();
        source.set_listening(false);
        self.state.last_fired_key.replace(None);
    }

    /// Whether this watcher currently owns the navigation listener.
    pub fn is_registered(&self) -> bool {
        self.state.registered.get()
    }

    /// Sequence number of the most recently fired transition (0 if none).
    pub fn last_sequence(&self) -> u64 {
        self.state.last_sequence.get()
    }

    /// Key of the most recently fired transition, `None` if never fired or stopped.
    pub fn last_fired_key(&self) -> Option<String> {
        self.state.last_fired_key.borrow().clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
