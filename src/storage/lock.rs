//! Named advisory locks.
//!
//! A lock is identified only by its name, so every `Repository` in the
//! process shares the same "commit" lock. Acquisition blocks with no
//! timeout. The registry does not coordinate with other processes.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

/// Lock name for the streaming commit session.
pub const COMMIT_LOCK: &str = "commit";

static NAMED_LOCKS: Lazy<Mutex<HashMap<&'static str, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn named(name: &'static str) -> Arc<Mutex<()>> {
    let mut locks = NAMED_LOCKS.lock();
    locks.entry(name).or_default().clone()
}

/// Run `f` while holding the lock called `name`.
pub fn synchronize<T>(name: &'static str, f: impl FnOnce() -> T) -> T {
    let lock = named(name);
    let _guard = lock.lock();
    f()
}
