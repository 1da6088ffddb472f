//! # symcache
//!
//! Lazy symbol-resolution cache for live-process debuggers and memory
//! inspectors.
//!
//! This crate maps virtual addresses inside loaded modules to
//! human-readable function symbols. Symbol tables are loaded lazily, one
//! module at a time, by merging two heterogeneous sources:
//!
//! - a **remote debug agent** enumerating export/function symbols from the
//!   live target process
//! - an **offline static-analysis database** of pre-computed function
//!   boundaries, keyed by target OS and module name
//!
//! On top of the merged store it exposes forward lookup (address → symbol +
//! offset), reverse lookup (name → address), and display-name formatting
//! (demangling plus template-argument truncation for decorated C++ names).
//!
//! ## What lives where
//!
//! - [`symbols`] — the cache itself: store, merger, load coordinator,
//!   resolvers, display formatter
//! - [`sources`] — the collaborator traits (live agent, static store,
//!   demangler) implemented by the embedding application
//! - [`types`] — modules, symbols, target description, register contexts
//! - [`error`] — the error taxonomy; nothing here is fatal to a caller
//!
//! ## Concurrency
//!
//! Callers share one [`symbols::SymbolCache`] per debug session (wrap it in
//! an `Arc`). Loads are single-flight per module: any number of concurrent
//! requests for one module cost exactly one agent round-trip, and
//! independent modules load concurrently. Forward lookups never block — an
//! unloaded module yields a module-relative fallback while a background
//! task fills the cache.

pub mod error;
pub mod sources;
pub mod symbols;
pub mod types;

// Re-export the types almost every caller touches.
pub use error::{Result, SymbolCacheError};
pub use symbols::{CacheConfig, FormatMode, SymbolCache};
pub use types::{Module, ResolvedSymbol, ServerInfo, Symbol};
