//! Fire-and-forget execution of local (non-`Send`) futures.
//!
//! The browser has a single event loop; on wasm this is backed by
//! `wasm_bindgen_futures::spawn_local`. Tests use a queue they drain by hand,
//! which lets them complete futures in any order.

use futures_util::future::LocalBoxFuture;

/// Schedules a future on the current thread's event loop.
pub trait Spawn {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>);
}
