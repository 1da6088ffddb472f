//! # Symbol Cache
//!
//! The service object UI callers hold: forward lookup, reverse lookup,
//! display formatting, and cache lifecycle, over lazily loaded per-module
//! symbol tables.
//!
//! The cache is an explicit object passed by handle (`Arc<SymbolCache>`),
//! not ambient global state; everything mutable sits behind it. Construct it
//! once per debug session with the three collaborators and share it freely —
//! every method takes `&self`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use symcache::sources::NativeDemangler;
//! use symcache::symbols::{CacheConfig, FormatMode, SymbolCache};
//! use symcache::types::{Module, ServerInfo};
//!
//! # async fn example(agent: Arc<dyn symcache::sources::LiveSymbolSource>,
//! #                  db: Arc<dyn symcache::sources::StaticSymbolStore>) {
//! let cache = SymbolCache::new(agent, db, Arc::new(NativeDemangler), CacheConfig::default());
//! let modules = vec![Module::new(0x7000_0000, 0x10000, "/usr/lib/libfoo.so")];
//!
//! cache.update_server_info(ServerInfo::default());
//! cache.ensure_module_symbols_loaded(0x7000_0020, &modules, &ServerInfo::default()).await;
//!
//! if let Some(text) = cache.format_address_with_symbol(0x7000_0020, &modules, FormatMode::Function) {
//!     println!("{text}");
//! }
//! # }
//! ```

use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

use crate::sources::{Demangler, LiveSymbolSource, StaticSymbolStore};
use crate::symbols::display::{DisplayNames, DEMANGLE_BATCH_LIMIT};
use crate::symbols::loader::LoadCoordinator;
use crate::symbols::resolve::{find_in_symbols, module_containing, module_matches, names_match, AddressResolution};
use crate::symbols::store::SymbolStore;
use crate::types::{Module, RegisterContext, ResolvedSymbol, ServerInfo, Symbol};

/// Tuning knobs for a [`SymbolCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig
{
    /// Whether display names are demangled at all. When false,
    /// [`SymbolCache::display_name`] is a pass-through.
    pub demangle: bool,
    /// Upper bound on unique names per demangle batch.
    pub demangle_batch: usize,
}

impl Default for CacheConfig
{
    fn default() -> Self
    {
        Self {
            demangle: true,
            demangle_batch: DEMANGLE_BATCH_LIMIT,
        }
    }
}

/// How [`SymbolCache::format_address_with_symbol`] renders an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMode
{
    /// `"module + 0xOFF"`. Never triggers a load.
    Library,
    /// `"module@symbol"` / `"module@symbol+0xOFF"` once loaded; falls back
    /// to the library rendering (and triggers a background load) until then.
    Function,
}

/// Lazily loading symbol-resolution cache for one debug session.
pub struct SymbolCache
{
    store: Arc<SymbolStore>,
    coordinator: LoadCoordinator,
    names: Arc<DisplayNames>,
    demangler: Arc<dyn Demangler>,
    server: Mutex<ServerInfo>,
}

impl SymbolCache
{
    /// Create a cache over the three collaborators.
    pub fn new(
        live: Arc<dyn LiveSymbolSource>,
        statics: Arc<dyn StaticSymbolStore>,
        demangler: Arc<dyn Demangler>,
        config: CacheConfig,
    ) -> Self
    {
        let store = Arc::new(SymbolStore::new());
        let names = Arc::new(DisplayNames::new(config.demangle, config.demangle_batch));
        let coordinator = LoadCoordinator::new(store.clone(), live, statics, names.clone());
        Self {
            store,
            coordinator,
            names,
            demangler,
            server: Mutex::new(ServerInfo::default()),
        }
    }

    /// Record the attached target's description (OS keys static lookups).
    pub fn update_server_info(&self, info: ServerInfo)
    {
        debug!("target is {} ({})", info.target_os, info.arch);
        *self.lock_server() = info;
    }

    /// Resolve an address to a symbol, a module-relative offset, or nothing.
    ///
    /// Never blocks: when the owning module's symbols are not yet cached, a
    /// background load is triggered and the result stays module-relative
    /// with `pending` set. The precise symbol becomes available once the
    /// load completes and the caller re-queries — an explicit choice to keep
    /// UI callers responsive.
    pub fn resolve_address(&self, address: u64, modules: &[Module]) -> AddressResolution
    {
        let resolution = self.lookup(address, modules);
        if let AddressResolution::ModuleOnly { pending: true, .. } = &resolution {
            if let Some(module) = module_containing(address, modules) {
                self.request_background_load(module);
            }
        }
        resolution
    }

    /// Forward lookup: the covering symbol and offset, if already cached.
    ///
    /// Triggers a background load for unloaded modules, like
    /// [`SymbolCache::resolve_address`].
    pub fn find_symbol_for_address(&self, address: u64, modules: &[Module]) -> Option<ResolvedSymbol>
    {
        match self.resolve_address(address, modules) {
            AddressResolution::Function(resolved) => Some(resolved),
            AddressResolution::NoModule | AddressResolution::ModuleOnly { .. } => None,
        }
    }

    /// Resolve the program counter of a register context.
    pub fn find_symbol_for_context(&self, context: &RegisterContext, modules: &[Module]) -> Option<ResolvedSymbol>
    {
        self.find_symbol_for_address(context.pc(), modules)
    }

    /// Reverse lookup: first cached symbol matching `symbol_name` within the
    /// module matching `module_name`, loading that module's symbols first if
    /// needed.
    ///
    /// Both matches are case-insensitive substrings (see the resolver
    /// helpers) — deliberately permissive, since callers hand us partial and
    /// decorated names alike.
    pub async fn find_address_for_symbol(&self, symbol_name: &str, module_name: &str, modules: &[Module]) -> Option<Symbol>
    {
        let module = modules.iter().find(|module| module_matches(module, module_name))?;
        let server = self.server_info();
        let symbols = self.coordinator.ensure_loaded(module, &server).await;
        symbols.into_iter().find(|symbol| names_match(symbol.name(), symbol_name))
    }

    /// Render an address as human-readable text, or `None` when no module
    /// owns it.
    ///
    /// [`FormatMode::Library`] renders `"module + 0xOFF"` and never loads.
    /// [`FormatMode::Function`] renders `"module@symbol"` (plus `+0xOFF` for
    /// a nonzero offset into the symbol) once symbols are cached; until
    /// then it returns the library rendering synchronously and lets a
    /// background load fill the cache.
    pub fn format_address_with_symbol(&self, address: u64, modules: &[Module], mode: FormatMode) -> Option<String>
    {
        let resolution = match mode {
            FormatMode::Library => self.lookup(address, modules),
            FormatMode::Function => self.resolve_address(address, modules),
        };
        match resolution {
            AddressResolution::NoModule => None,
            AddressResolution::ModuleOnly { module_name, offset, .. } => {
                Some(format!("{module_name} + 0x{offset:x}"))
            }
            AddressResolution::Function(resolved) => match mode {
                FormatMode::Library => {
                    let module = module_containing(address, modules)?;
                    Some(format!("{} + 0x{:x}", module.short_name(), address - module.base))
                }
                FormatMode::Function => {
                    let name = self.display_name(resolved.symbol.name());
                    if resolved.offset == 0 {
                        Some(format!("{}@{name}", resolved.symbol.module_name()))
                    } else {
                        Some(format!("{}@{name}+0x{:x}", resolved.symbol.module_name(), resolved.offset))
                    }
                }
            },
        }
    }

    /// Load (and wait for) the symbols of the module owning `address`.
    ///
    /// Returns false when no module contains the address; true once the
    /// owning module is marked loaded, even if both sources came back empty.
    pub async fn ensure_module_symbols_loaded(&self, address: u64, modules: &[Module], server: &ServerInfo) -> bool
    {
        let Some(module) = module_containing(address, modules) else {
            return false;
        };
        self.coordinator.ensure_loaded(module, server).await;
        true
    }

    /// Human-friendly form of a raw symbol name.
    ///
    /// Synchronous: a cache miss returns the raw name and queues it for the
    /// next [`SymbolCache::flush_pending_demangles`].
    pub fn display_name(&self, name: &str) -> String
    {
        self.names.display_name(name)
    }

    /// Whether any names await a demangle flush.
    pub fn has_pending_demangles(&self) -> bool
    {
        self.names.has_pending()
    }

    /// Drain one batch of queued names through the demangler.
    ///
    /// A failed batch (error, or a length-contract violation) falls back to
    /// raw names for every name in it, so a broken demangler degrades the
    /// display instead of wedging the queue.
    pub async fn flush_pending_demangles(&self)
    {
        let batch = self.names.take_batch();
        if batch.is_empty() {
            return;
        }
        trace!("demangling batch of {} names", batch.len());
        match self.demangler.demangle(&batch).await {
            Ok(display) if display.len() == batch.len() => {
                self.names.store_batch(batch, display);
            }
            Ok(demangled) => {
                warn!("demangler returned {} names for a batch of {}; keeping raw names", demangled.len(), batch.len());
                let raw = batch.clone();
                self.names.store_batch(batch, raw);
            }
            Err(err) => {
                warn!("batch demangling failed: {err}");
                let raw = batch.clone();
                self.names.store_batch(batch, raw);
            }
        }
    }

    /// Forget everything: symbols, load states, and display names.
    ///
    /// Afterwards the cache behaves exactly like a freshly constructed one;
    /// the next lookup per module fetches from the sources again.
    pub fn clear_cache(&self)
    {
        self.store.clear();
        self.names.clear();
        debug!("symbol cache cleared");
    }

    /// Read access to the shared store, for callers that only inspect.
    pub fn store(&self) -> &SymbolStore
    {
        &self.store
    }

    /// Pure lookup against current cache state. Never triggers a load.
    fn lookup(&self, address: u64, modules: &[Module]) -> AddressResolution
    {
        let Some(module) = module_containing(address, modules) else {
            return AddressResolution::NoModule;
        };
        let offset = address - module.base;
        if !self.store.is_loaded(module.base) {
            return AddressResolution::ModuleOnly {
                module_name: module.short_name().to_string(),
                offset,
                pending: true,
            };
        }
        match find_in_symbols(address, &self.store.symbols_for(module.base)) {
            Some(resolved) => AddressResolution::Function(resolved),
            None => AddressResolution::ModuleOnly {
                module_name: module.short_name().to_string(),
                offset,
                pending: false,
            },
        }
    }

    /// Kick off a load without waiting for it.
    ///
    /// Outside a Tokio runtime there is nowhere to run the task; the load is
    /// skipped and the caller keeps getting module-relative results until an
    /// async caller comes along.
    fn request_background_load(&self, module: &Module)
    {
        let Ok(handle) = Handle::try_current() else {
            trace!("no async runtime; skipping background load of {}", module.short_name());
            return;
        };
        let coordinator = self.coordinator.clone();
        let module = module.clone();
        let server = self.server_info();
        handle.spawn(async move {
            coordinator.ensure_loaded(&module, &server).await;
        });
    }

    fn server_info(&self) -> ServerInfo
    {
        self.lock_server().clone()
    }

    fn lock_server(&self) -> std::sync::MutexGuard<'_, ServerInfo>
    {
        self.server.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
