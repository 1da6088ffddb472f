//! # Load Coordinator
//!
//! Serializes symbol loads per module: for any module base, the live agent
//! is asked to enumerate at most once until the cache is cleared, no matter
//! how many callers race for it. Independent modules load concurrently.
//!
//! The first caller claims the load through the store's
//! [`crate::symbols::store::BeginLoad`] API and holds the completion
//! broadcast; every concurrent caller for the same base awaits the broadcast
//! and then reads the store. There is no polling and no latency ceiling —
//! waiters wake the moment the claimant publishes, and the claimant *always*
//! publishes because source failures degrade to empty results rather than
//! abandoning the claim.
//!
//! There is also no cancellation: a load whose originating caller is torn
//! down runs to completion and still populates the store. The store is
//! process-wide, so the work is not wasted — the next caller gets a cache
//! hit.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::sources::{LiveSymbolSource, StaticFunction, StaticSymbolStore};
use crate::symbols::display::DisplayNames;
use crate::symbols::merge::merge_module_symbols;
use crate::symbols::store::{BeginLoad, SymbolStore};
use crate::types::{Module, ServerInfo, Symbol};

/// Single-flight loader writing into the shared [`SymbolStore`].
///
/// Cheap to clone; clones share the store, the sources, and the display-name
/// queue, which is what lets lookups hand a clone to a background task.
#[derive(Clone)]
pub struct LoadCoordinator
{
    store: Arc<SymbolStore>,
    live: Arc<dyn LiveSymbolSource>,
    statics: Arc<dyn StaticSymbolStore>,
    names: Arc<DisplayNames>,
}

impl LoadCoordinator
{
    /// Create a coordinator over the shared store and the two symbol sources.
    pub fn new(
        store: Arc<SymbolStore>,
        live: Arc<dyn LiveSymbolSource>,
        statics: Arc<dyn StaticSymbolStore>,
        names: Arc<DisplayNames>,
    ) -> Self
    {
        Self {
            store,
            live,
            statics,
            names,
        }
    }

    /// Return the module's symbols, loading them if nobody has yet.
    ///
    /// - Already loaded: returns the stored symbols, no external call.
    /// - Load in flight elsewhere: awaits its completion broadcast, then
    ///   returns whatever the store holds.
    /// - Otherwise: claims the load, fetches both sources, merges, inserts,
    ///   marks the module loaded, and returns the merged set. Source errors
    ///   are logged and degrade to empty results — a module never stays
    ///   `Loading` forever.
    pub async fn ensure_loaded(&self, module: &Module, server: &ServerInfo) -> Vec<Symbol>
    {
        match self.store.begin_load(module.base) {
            BeginLoad::AlreadyLoaded(symbols) => symbols,
            BeginLoad::InFlight(mut done) => {
                if done.wait_for(|finished| *finished).await.is_err() {
                    // Claimant vanished without publishing; fall back to
                    // whatever the store holds (possibly nothing).
                    debug!("load broadcast for module base 0x{:x} closed without completing", module.base);
                }
                self.store.symbols_for(module.base)
            }
            BeginLoad::Claimed(claim) => {
                debug!("loading symbols for {} (base 0x{:x})", module.short_name(), module.base);
                let merged = self.fetch_and_merge(module, server).await;
                for symbol in &merged {
                    self.names.queue(symbol.name());
                }
                self.store.insert(merged.clone());
                self.store.complete_load(claim);
                debug!("loaded {} symbols for {}", merged.len(), module.short_name());
                merged
            }
        }
    }

    async fn fetch_and_merge(&self, module: &Module, server: &ServerInfo) -> Vec<Symbol>
    {
        let live = match self.live.enumerate(module).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!("live symbol enumeration failed for {}: {err}", module.short_name());
                Vec::new()
            }
        };
        let statics = self.lookup_static(module, server).await;
        merge_module_symbols(live, statics, module)
    }

    /// Query the static-analysis store, retrying under `"unknown"` when the
    /// target OS has no entry for this module.
    async fn lookup_static(&self, module: &Module, server: &ServerInfo) -> Vec<StaticFunction>
    {
        let name = module.short_name();
        match self.statics.lookup(&server.target_os, name).await {
            Ok(Some(entries)) => return entries,
            Ok(None) => {}
            Err(err) => {
                warn!("static-analysis lookup failed for {name}: {err}");
                return Vec::new();
            }
        }
        if server.target_os == "unknown" {
            return Vec::new();
        }
        match self.statics.lookup("unknown", name).await {
            Ok(Some(entries)) => entries,
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("static-analysis fallback lookup failed for {name}: {err}");
                Vec::new()
            }
        }
    }
}
