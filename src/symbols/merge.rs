//! # Symbol Merger
//!
//! Combines one module's live-agent symbols with its static-analysis
//! functions into a single conflict-free set.
//!
//! The two sources disagree about almost everything: the agent reports
//! absolute addresses, the analysis store reports module-relative offsets;
//! the agent labels entries with type strings, the store only ever holds
//! functions. The rules, in order:
//!
//! 1. keep only function-like live entries (see
//!    [`AgentSymbolKind::is_function_like`]);
//! 2. drop anything whose address text fails to parse as hex;
//! 3. on an absolute-address collision the live symbol wins — the agent saw
//!    the running process, the database saw a file on disk.
//!
//! Every surviving entry is tagged with the module's short name and base so
//! the store can group it.

use std::collections::HashSet;

use crate::sources::{AgentSymbol, StaticFunction};
use crate::types::{Module, Symbol};

/// Parse hexadecimal address text, accepting an optional `0x`/`0X` prefix.
pub(crate) fn parse_hex(text: &str) -> Option<u64>
{
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Merge live and static symbols for one module.
///
/// Live addresses are absolute; static addresses are offsets from
/// `module.base`. Entries that fail the kind filter or the address parse are
/// dropped silently — they were never resolvable to begin with.
pub fn merge_module_symbols(live: Vec<AgentSymbol>, statics: Vec<StaticFunction>, module: &Module) -> Vec<Symbol>
{
    let module_name = module.short_name().to_string();
    let mut merged = Vec::with_capacity(live.len() + statics.len());
    let mut live_addresses = HashSet::new();

    for entry in live {
        if !entry.kind.is_function_like(entry.size) {
            continue;
        }
        let Some(address) = parse_hex(&entry.address) else {
            continue;
        };
        live_addresses.insert(address);
        merged.push(Symbol::new(address, entry.size, entry.name, module_name.clone(), module.base));
    }

    for entry in statics {
        let Some(offset) = parse_hex(&entry.address) else {
            continue;
        };
        let address = module.base.saturating_add(offset);
        // Conflict rule: the live agent's view of the running process wins.
        if live_addresses.contains(&address) {
            continue;
        }
        merged.push(Symbol::new(address, entry.size, entry.name, module_name.clone(), module.base));
    }

    merged
}
