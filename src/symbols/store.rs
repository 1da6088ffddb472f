//! # Symbol Store
//!
//! The shared, mutable heart of the cache: merged symbols and per-module
//! load state.
//!
//! Ownership is deliberately narrow. The store is one structure behind one
//! lock; the load coordinator is the only writer of symbols and load-state
//! transitions, and every other component reads through it. The lock is
//! never held across an `.await` — all waiting happens on the `watch`
//! channel a loading slot carries.
//!
//! ## Load states
//!
//! A module base is `NotLoaded` (no slot), `Loading` (slot holds a receiver
//! for the in-flight load's completion broadcast), or `Loaded` (terminal
//! until [`SymbolStore::clear`]). A failed load still transitions to
//! `Loaded`: retrying on every lookup would hammer a dead agent, and an
//! explicit cache clear is the recovery path.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::watch;

use crate::types::Symbol;

/// Per-module load state, as observable by readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState
{
    /// No load has ever been requested for this module.
    NotLoaded,
    /// A load is in flight.
    Loading,
    /// A load completed (successfully or not).
    Loaded,
}

enum Slot
{
    Loading
    {
        done: watch::Receiver<bool>,
    },
    Loaded,
}

/// Outcome of a [`SymbolStore::begin_load`] claim.
pub enum BeginLoad
{
    /// The module is already loaded; here are its symbols.
    AlreadyLoaded(Vec<Symbol>),
    /// Another load is in flight; await the receiver, then re-read the store.
    InFlight(watch::Receiver<bool>),
    /// The caller claimed the load and must run it to completion.
    Claimed(LoadClaim),
}

/// Exclusive claim on loading one module.
///
/// Held by the coordinator for the duration of a fetch+merge; handing it to
/// [`SymbolStore::complete_load`] publishes completion to every waiter. If a
/// claim is dropped without completing (a loader task aborted), the channel
/// closes and the next `begin_load` for that base reclaims the slot.
pub struct LoadClaim
{
    base: u64,
    done: watch::Sender<bool>,
}

#[derive(Default)]
struct StoreInner
{
    symbols: HashMap<u64, Vec<Symbol>>,
    slots: HashMap<u64, Slot>,
}

/// Merged symbols plus per-module load state, behind a single lock.
#[derive(Default)]
pub struct SymbolStore
{
    inner: Mutex<StoreInner>,
}

impl SymbolStore
{
    /// Create an empty store.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Whether a load for this module base has completed.
    pub fn is_loaded(&self, module_base: u64) -> bool
    {
        matches!(self.lock().slots.get(&module_base), Some(Slot::Loaded))
    }

    /// Current load state for this module base.
    pub fn load_state(&self, module_base: u64) -> LoadState
    {
        match self.lock().slots.get(&module_base) {
            None => LoadState::NotLoaded,
            Some(Slot::Loading { .. }) => LoadState::Loading,
            Some(Slot::Loaded) => LoadState::Loaded,
        }
    }

    /// Cached symbols for a module base (empty if none).
    pub fn symbols_for(&self, module_base: u64) -> Vec<Symbol>
    {
        self.lock().symbols.get(&module_base).cloned().unwrap_or_default()
    }

    /// Append symbols, grouped by their owning module base.
    ///
    /// No deduplication happens here; the merger already resolved conflicts
    /// for one load, and repeated loads never happen while a module is
    /// `Loaded`.
    pub fn insert(&self, symbols: Vec<Symbol>)
    {
        let mut inner = self.lock();
        for symbol in symbols {
            inner.symbols.entry(symbol.module_base()).or_default().push(symbol);
        }
    }

    /// Claim the load for a module base, or report why the caller should not run one.
    pub fn begin_load(&self, module_base: u64) -> BeginLoad
    {
        let mut inner = self.lock();
        match inner.slots.get(&module_base) {
            Some(Slot::Loaded) => {
                return BeginLoad::AlreadyLoaded(inner.symbols.get(&module_base).cloned().unwrap_or_default());
            }
            // A closed channel that never published means the previous
            // claimant vanished without completing; fall through and reclaim.
            Some(Slot::Loading { done }) if done.has_changed().is_ok() => {
                return BeginLoad::InFlight(done.clone());
            }
            Some(Slot::Loading { .. }) | None => {}
        }

        let (tx, rx) = watch::channel(false);
        inner.slots.insert(module_base, Slot::Loading { done: rx });
        BeginLoad::Claimed(LoadClaim {
            base: module_base,
            done: tx,
        })
    }

    /// Mark a claimed load complete and wake every waiter.
    pub fn complete_load(&self, claim: LoadClaim)
    {
        self.lock().slots.insert(claim.base, Slot::Loaded);
        // Waiters registered their receivers before we took the lock above,
        // and watch retains the value, so late awaiters still observe it.
        let _ = claim.done.send(true);
    }

    /// Drop every symbol and reset every module to `NotLoaded`.
    ///
    /// A load in flight at clear time continues to completion and will
    /// re-mark its module loaded with the fetched symbols; the store is
    /// process-wide, so letting it land still benefits later callers.
    pub fn clear(&self)
    {
        let mut inner = self.lock();
        inner.symbols.clear();
        inner.slots.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner>
    {
        // A poisoned store lock just means a panic mid-update elsewhere;
        // symbol data is append-only so the contents stay usable.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
