//! # Symbol Resolution
//!
//! Lazy per-module symbol loading, merging, and lookup.
//!
//! The pieces, leaf-first:
//!
//! - [`store`] — the shared symbol store and per-module load state
//! - [`display`] — demangling cache and template-name simplifier
//! - [`merge`] — combines live-agent and static-analysis symbols for one
//!   module into a conflict-free set
//! - [`loader`] — the single-flight load coordinator
//! - [`resolve`] — address/name matching helpers
//! - [`cache`] — the [`SymbolCache`] service object UI callers hold
//!
//! A caller asks the cache to resolve an address or a name; if the owning
//! module's symbols are not cached, the coordinator fetches both sources
//! (once, no matter how many callers race), the merger reconciles them, and
//! the result lands in the store. Subsequent lookups read the store
//! directly.

pub mod cache;
pub mod display;
pub mod loader;
pub mod merge;
pub mod resolve;
pub mod store;

pub use cache::{CacheConfig, FormatMode, SymbolCache};
pub use display::{simplify_template_name, DisplayNames, DEMANGLE_BATCH_LIMIT};
pub use loader::LoadCoordinator;
pub use merge::merge_module_symbols;
pub use resolve::AddressResolution;
pub use store::{BeginLoad, LoadClaim, LoadState, SymbolStore};
