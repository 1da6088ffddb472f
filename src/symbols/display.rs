//! # Display Names
//!
//! Demangling cache and template-name simplifier.
//!
//! [`DisplayNames::display_name`] is synchronous on purpose: UI callers ask
//! for thousands of names per frame and cannot await each one. A miss
//! returns the raw name and queues it; the embedding event loop calls
//! [`crate::symbols::SymbolCache::flush_pending_demangles`] to drain one
//! batch (capped at 1000 unique names per flush, bounding the cost of each
//! external call) and callers pick up the demangled form on their next
//! query.
//!
//! The cache is append-only between clears, and cleared together with the
//! symbol store.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Bracket content at or below this length is left alone entirely.
const SIMPLIFY_THRESHOLD: usize = 30;

/// First template arguments longer than this are elided too.
const FIRST_ARG_LIMIT: usize = 20;

/// How many unique names one demangle batch may carry.
pub const DEMANGLE_BATCH_LIMIT: usize = 1000;

#[derive(Default)]
struct NamesInner
{
    cache: HashMap<String, String>,
    pending: Vec<String>,
    queued: HashSet<String>,
}

/// Demangled-name cache with a pending batch queue.
pub struct DisplayNames
{
    enabled: bool,
    batch_limit: usize,
    inner: Mutex<NamesInner>,
}

impl DisplayNames
{
    /// Create a cache. When `enabled` is false every lookup is a pass-through.
    pub fn new(enabled: bool, batch_limit: usize) -> Self
    {
        Self {
            enabled,
            batch_limit,
            inner: Mutex::new(NamesInner::default()),
        }
    }

    /// Whether demangling is enabled at all.
    pub fn enabled(&self) -> bool
    {
        self.enabled
    }

    /// Human-friendly form of `raw`, or `raw` itself until a batch resolves it.
    pub fn display_name(&self, raw: &str) -> String
    {
        if !self.enabled {
            return raw.to_string();
        }
        let mut inner = self.lock();
        if let Some(cached) = inner.cache.get(raw) {
            return cached.clone();
        }
        if inner.queued.insert(raw.to_string()) {
            inner.pending.push(raw.to_string());
        }
        raw.to_string()
    }

    /// Queue a name for the next batch without asking for its display form.
    ///
    /// The load coordinator queues every freshly merged name so the first
    /// flush after a load warms the whole module.
    pub fn queue(&self, raw: &str)
    {
        if !self.enabled {
            return;
        }
        let mut inner = self.lock();
        if !inner.cache.contains_key(raw) && inner.queued.insert(raw.to_string()) {
            inner.pending.push(raw.to_string());
        }
    }

    /// Whether any names await demangling.
    pub fn has_pending(&self) -> bool
    {
        !self.lock().pending.is_empty()
    }

    /// Take up to one batch worth of queued names, oldest first.
    pub(crate) fn take_batch(&self) -> Vec<String>
    {
        let mut inner = self.lock();
        let take = inner.pending.len().min(self.batch_limit);
        let batch: Vec<String> = inner.pending.drain(..take).collect();
        for name in &batch {
            inner.queued.remove(name);
        }
        batch
    }

    /// Record a resolved batch, applying template simplification.
    ///
    /// `display` must be parallel to `raw`; the caller already verified the
    /// demangler's length contract (or substituted raw names on failure).
    pub(crate) fn store_batch(&self, raw: Vec<String>, display: Vec<String>)
    {
        let mut inner = self.lock();
        for (mangled, demangled) in raw.into_iter().zip(display) {
            inner.cache.insert(mangled, simplify_template_name(&demangled));
        }
    }

    /// Drop the cache and the pending queue.
    pub fn clear(&self)
    {
        let mut inner = self.lock();
        inner.cache.clear();
        inner.pending.clear();
        inner.queued.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NamesInner>
    {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Truncate oversized template argument lists in a demangled name.
///
/// Heavily templated C++ names render unusably wide; this keeps either the
/// first template argument or nothing, depending on how large it is:
///
/// - bracket content of 30 characters or fewer is left untouched;
/// - a single oversized argument collapses to `Base<...>Suffix`;
/// - a first argument of at most 20 characters keeps its seat:
///   `Base<firstArg, ...>Suffix`;
/// - anything larger collapses fully.
///
/// Names without a `<`/`>` pair pass through unchanged.
pub fn simplify_template_name(name: &str) -> String
{
    let Some(open) = name.find('<') else {
        return name.to_string();
    };
    let Some(close) = name.rfind('>') else {
        return name.to_string();
    };
    if close <= open {
        return name.to_string();
    }

    let content = &name[open + 1..close];
    if content.chars().count() <= SIMPLIFY_THRESHOLD {
        return name.to_string();
    }

    let base = &name[..open];
    let suffix = &name[close + 1..];

    // Split at the first comma that sits outside any nested angle brackets.
    let mut depth = 0usize;
    let mut first_arg_end = None;
    for (index, ch) in content.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                first_arg_end = Some(index);
                break;
            }
            _ => {}
        }
    }

    match first_arg_end {
        None => format!("{base}<...>{suffix}"),
        Some(end) => {
            let first_arg = content[..end].trim();
            if first_arg.chars().count() <= FIRST_ARG_LIMIT {
                format!("{base}<{first_arg}, ...>{suffix}")
            } else {
                format!("{base}<...>{suffix}")
            }
        }
    }
}
