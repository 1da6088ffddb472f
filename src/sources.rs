//! # Symbol Sources
//!
//! Collaborator interfaces the cache depends on, and the raw record types
//! they produce.
//!
//! The cache merges two heterogeneous sources of per-module symbols:
//!
//! - [`LiveSymbolSource`] — the remote debug agent, enumerating export and
//!   function symbols from the live target process
//! - [`StaticSymbolStore`] — an offline database of pre-computed function
//!   boundaries, keyed by target OS and module name
//!
//! plus a [`Demangler`] that turns compiler-decorated names into readable
//! ones in batches.
//!
//! All three are async trait objects: every call is a suspension point for
//! the cooperative callers above us. Failures are reported through
//! [`SymbolCacheError`] and are never fatal — the cache logs them and
//! degrades (see the error taxonomy on [`crate::error`]).
//!
//! Both sources report addresses as hexadecimal *text*, because the agents
//! behind them do: the live agent reports absolute addresses, the static
//! store reports module-relative offsets. Parsing (and dropping entries that
//! fail to parse) happens in the merger.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Module;

/// Classification of a live-agent symbol entry.
///
/// Agents label entries with free-form type strings; they are parsed into
/// this closed set on arrival so the merge filter is a `match`, not string
/// comparisons scattered around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentSymbolKind
{
    /// A function body (`Function` from the in-process agent, `FUNC` from
    /// ELF-style enumerations).
    Function,
    /// A public/exported entry point (PDB-style `Public`).
    Public,
    /// An import thunk.
    Thunk,
    /// A section-relative entry (`SECT`); only resolvable when it carries a
    /// nonzero size.
    Section,
    /// Anything else (data, labels, debug records); never resolvable.
    Other,
}

impl AgentSymbolKind
{
    /// Parse an agent's type label.
    pub fn parse(label: &str) -> Self
    {
        match label {
            "Function" | "FUNC" => AgentSymbolKind::Function,
            "Public" => AgentSymbolKind::Public,
            "Thunk" => AgentSymbolKind::Thunk,
            "SECT" => AgentSymbolKind::Section,
            _ => AgentSymbolKind::Other,
        }
    }

    /// Whether an entry of this kind (with the given reported size) can be
    /// resolved to a function-like symbol.
    ///
    /// Section entries are only useful when the agent knows their extent; a
    /// zero-sized `SECT` record is a marker, not a function.
    pub fn is_function_like(self, size: u64) -> bool
    {
        match self {
            AgentSymbolKind::Function | AgentSymbolKind::Public | AgentSymbolKind::Thunk => true,
            AgentSymbolKind::Section => size > 0,
            AgentSymbolKind::Other => false,
        }
    }
}

/// One symbol entry as enumerated by the live debug agent.
#[derive(Debug, Clone)]
pub struct AgentSymbol
{
    /// Raw (possibly mangled) symbol name.
    pub name: String,
    /// Absolute address as hexadecimal text, with or without a `0x` prefix.
    pub address: String,
    /// Size in bytes; 0 when the agent does not know the extent.
    pub size: u64,
    /// Entry classification.
    pub kind: AgentSymbolKind,
}

/// One pre-computed function boundary from the static-analysis store.
#[derive(Debug, Clone)]
pub struct StaticFunction
{
    /// Function name recovered by the analysis pipeline.
    pub name: String,
    /// Module-relative offset as hexadecimal text, with or without `0x`.
    pub address: String,
    /// Size in bytes; 0 when the analysis did not establish an end.
    pub size: u64,
}

/// The remote debug agent's symbol enumeration.
#[async_trait]
pub trait LiveSymbolSource: Send + Sync
{
    /// Enumerate export/function symbols for one loaded module.
    ///
    /// ## Errors
    ///
    /// Network or agent errors. The cache treats a failure as an empty
    /// result for that call and still marks the module loaded.
    async fn enumerate(&self, module: &Module) -> Result<Vec<AgentSymbol>>;
}

/// The offline static-analysis function database.
#[async_trait]
pub trait StaticSymbolStore: Send + Sync
{
    /// Look up pre-computed function boundaries for a module.
    ///
    /// Returns `Ok(None)` when the store has never analyzed this module —
    /// absence is not an error. The cache retries a `None` under
    /// `target_os = "unknown"` before giving up.
    async fn lookup(&self, target_os: &str, module_name: &str) -> Result<Option<Vec<StaticFunction>>>;
}

/// Batch demangler for decorated symbol names.
#[async_trait]
pub trait Demangler: Send + Sync
{
    /// Demangle a batch of raw names.
    ///
    /// The result must have the same length and order as the input; names
    /// that cannot be demangled come back unchanged.
    ///
    /// ## Errors
    ///
    /// A failed batch degrades to raw names for every name in it.
    async fn demangle(&self, names: &[String]) -> Result<Vec<String>>;
}

/// In-process demangler backed by `rustc-demangle` and `cpp_demangle`.
///
/// Remote setups route demangling through the agent (the binary's tooling
/// may know more than we do); everything else uses this.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeDemangler;

impl NativeDemangler
{
    fn demangle_one(raw: &str) -> String
    {
        if let Ok(demangled) = rustc_demangle::try_demangle(raw) {
            return format!("{demangled:#}");
        }
        if let Ok(symbol) = cpp_demangle::Symbol::new(raw.as_bytes()) {
            if let Ok(demangled) = symbol.demangle(&cpp_demangle::DemangleOptions::default()) {
                return demangled;
            }
        }
        raw.to_string()
    }
}

#[async_trait]
impl Demangler for NativeDemangler
{
    async fn demangle(&self, names: &[String]) -> Result<Vec<String>>
    {
        Ok(names.iter().map(|name| Self::demangle_one(name)).collect())
    }
}
