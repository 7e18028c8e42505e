//! Request ledger.
//!
//! [`RequestLedger`] is the append-only usage log behind the analytics
//! operations. Every mediator call appends its invocation time to the
//! global sequence; calls that carry a query key (page fetch, search) also
//! append the same instant to that key's history. Both appends happen
//! under one lock, so no reader ever sees one without the other.
//!
//! Keys keep their first-seen order, which the rankings in [`analytics`]
//! use to break ties.
//!
//! The ledger is an ordinary value owned by the caller. Seed it from a
//! [`store::LedgerStore`] at startup with [`RequestLedger::from_snapshot`]
//! and hand a [`RequestLedger::snapshot`] back to the store at shutdown.

pub mod analytics;
pub mod store;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::clock::{Clock, Millis, SystemClock};

/// Timestamps recorded for one query key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyHistory {
    pub key: String,
    pub timestamps: Vec<Millis>,
}

/// Point-in-time copy of the ledger contents.
///
/// `keys` is in first-seen order. Also the persisted form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub all_timestamps: Vec<Millis>,
    pub keys: Vec<KeyHistory>,
}

impl LedgerSnapshot {
    /// Check that every per-key timestamp also appears in the global
    /// sequence (with multiplicity).
    pub fn is_consistent(&self) -> bool {
        let mut available: HashMap<Millis, usize> = HashMap::new();
        for t in &self.all_timestamps {
            *available.entry(*t).or_default() += 1;
        }
        for history in &self.keys {
            for t in &history.timestamps {
                match available.get_mut(t) {
                    Some(n) if *n > 0 => *n -= 1,
                    _ => return false,
                }
            }
        }
        true
    }

    /// Number of recorded invocations of any kind.
    pub fn total(&self) -> usize {
        self.all_timestamps.len()
    }
}

#[derive(Default)]
struct LedgerState {
    snapshot: LedgerSnapshot,
    index: HashMap<String, usize>,
}

impl LedgerState {
    fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let mut state = LedgerState {
            snapshot: LedgerSnapshot {
                all_timestamps: snapshot.all_timestamps,
                keys: Vec::with_capacity(snapshot.keys.len()),
            },
            index: HashMap::new(),
        };
        // Duplicate keys in a hand-edited file collapse into one history.
        for history in snapshot.keys {
            match state.index.get(&history.key) {
                Some(&slot) => state.snapshot.keys[slot]
                    .timestamps
                    .extend(history.timestamps),
                None => {
                    state
                        .index
                        .insert(history.key.clone(), state.snapshot.keys.len());
                    state.snapshot.keys.push(history);
                }
            }
        }
        state
    }
}

/// Thread-safe append-only invocation log. See module docs.
pub struct RequestLedger {
    clock: Arc<dyn Clock>,
    state: Mutex<LedgerState>,
}

impl RequestLedger {
    /// Create an empty ledger on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    /// Create an empty ledger reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Create a ledger pre-populated from a persisted snapshot.
    pub fn from_snapshot(snapshot: LedgerSnapshot, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(LedgerState::from_snapshot(snapshot)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one invocation at the current time and return that time.
    ///
    /// With a `key`, the same instant is also appended to the key's history.
    pub fn record(&self, key: Option<&str>) -> Millis {
        let mut guard = self.lock();
        let state = &mut *guard;
        // Read the clock under the lock so the global sequence stays sorted.
        let now = self.clock.now_millis();
        state.snapshot.all_timestamps.push(now);
        if let Some(key) = key {
            match state.index.get(key) {
                Some(&slot) => state.snapshot.keys[slot].timestamps.push(now),
                None => {
                    let slot = state.snapshot.keys.len();
                    state.index.insert(key.to_owned(), slot);
                    state.snapshot.keys.push(KeyHistory {
                        key: key.to_owned(),
                        timestamps: vec![now],
                    });
                }
            }
        }
        now
    }

    /// Run `f` against the current contents without copying them.
    ///
    /// Appends from other threads wait until `f` returns, so keep it short.
    pub fn inspect<R>(&self, f: impl FnOnce(&LedgerSnapshot) -> R) -> R {
        f(&self.lock().snapshot)
    }

    /// Copy the current contents.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.inspect(LedgerSnapshot::clone)
    }

    /// Current time on this ledger's clock.
    pub fn now_millis(&self) -> Millis {
        self.clock.now_millis()
    }

    pub fn len(&self) -> usize {
        self.inspect(LedgerSnapshot::total)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RequestLedger {
    fn default() -> Self {
        Self::new()
    }
}
