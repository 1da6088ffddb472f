//! End-to-end tests for the symbol cache service, with mocked collaborators

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use symcache::error::{Result, SymbolCacheError};
use symcache::sources::{AgentSymbol, AgentSymbolKind, Demangler, LiveSymbolSource, StaticFunction, StaticSymbolStore};
use symcache::symbols::AddressResolution;
use symcache::types::{Architecture, Module, RegisterContext, ServerInfo, X8664Registers};
use symcache::{CacheConfig, FormatMode, SymbolCache};

/// Live-agent mock: counts enumeration calls, optionally stalls or fails.
struct MockAgent
{
    calls: AtomicUsize,
    symbols: Vec<AgentSymbol>,
    delay: Option<Duration>,
    fail: bool,
}

impl MockAgent
{
    fn with_symbols(symbols: Vec<AgentSymbol>) -> Arc<Self>
    {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            symbols,
            delay: None,
            fail: false,
        })
    }

    fn calls(&self) -> usize
    {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiveSymbolSource for MockAgent
{
    async fn enumerate(&self, _module: &Module) -> Result<Vec<AgentSymbol>>
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(SymbolCacheError::Agent("agent unreachable".to_string()));
        }
        Ok(self.symbols.clone())
    }
}

/// Static-store mock: answers from a `(target_os, module)` table and records
/// every OS key it was asked under.
struct MockStatics
{
    calls: AtomicUsize,
    requested_os: Mutex<Vec<String>>,
    entries: HashMap<(String, String), Vec<StaticFunction>>,
}

impl MockStatics
{
    fn empty() -> Arc<Self>
    {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            requested_os: Mutex::new(Vec::new()),
            entries: HashMap::new(),
        })
    }

    fn with_entry(target_os: &str, module_name: &str, functions: Vec<StaticFunction>) -> Arc<Self>
    {
        let mut entries = HashMap::new();
        entries.insert((target_os.to_string(), module_name.to_string()), functions);
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            requested_os: Mutex::new(Vec::new()),
            entries,
        })
    }

    fn calls(&self) -> usize
    {
        self.calls.load(Ordering::SeqCst)
    }

    fn requested_os(&self) -> Vec<String>
    {
        self.requested_os.lock().unwrap().clone()
    }
}

#[async_trait]
impl StaticSymbolStore for MockStatics
{
    async fn lookup(&self, target_os: &str, module_name: &str) -> Result<Option<Vec<StaticFunction>>>
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested_os.lock().unwrap().push(target_os.to_string());
        Ok(self.entries.get(&(target_os.to_string(), module_name.to_string())).cloned())
    }
}

/// Demangler mock backed by a fixed translation table.
struct MockDemangler
{
    table: HashMap<String, String>,
}

impl MockDemangler
{
    fn passthrough() -> Arc<Self>
    {
        Arc::new(Self { table: HashMap::new() })
    }

    fn with_mapping(pairs: &[(&str, &str)]) -> Arc<Self>
    {
        let table = pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        Arc::new(Self { table })
    }
}

#[async_trait]
impl Demangler for MockDemangler
{
    async fn demangle(&self, names: &[String]) -> Result<Vec<String>>
    {
        Ok(names.iter().map(|name| self.table.get(name).cloned().unwrap_or_else(|| name.clone())).collect())
    }
}

fn function(name: &str, address: u64, size: u64) -> AgentSymbol
{
    AgentSymbol {
        name: name.to_string(),
        address: format!("{address:x}"),
        size,
        kind: AgentSymbolKind::Function,
    }
}

fn libfoo() -> Module
{
    Module::new(0x7000, 0x1000, "/usr/lib/libfoo.so")
}

fn server() -> ServerInfo
{
    ServerInfo::new("ios", Architecture::Arm64)
}

fn cache_with(agent: Arc<MockAgent>, statics: Arc<MockStatics>) -> Arc<SymbolCache>
{
    Arc::new(SymbolCache::new(agent, statics, MockDemangler::passthrough(), CacheConfig::default()))
}

#[tokio::test]
async fn test_second_load_is_a_cache_hit()
{
    let agent = MockAgent::with_symbols(vec![function("foo", 0x7000, 0x10)]);
    let statics = MockStatics::with_entry("ios", "libfoo.so", vec![]);
    let cache = cache_with(agent.clone(), statics.clone());
    let modules = vec![libfoo()];

    assert!(cache.ensure_module_symbols_loaded(0x7005, &modules, &server()).await);
    assert!(cache.ensure_module_symbols_loaded(0x7005, &modules, &server()).await);

    assert_eq!(agent.calls(), 1);
    assert_eq!(statics.calls(), 1);
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn test_concurrent_loads_fetch_once()
{
    let agent = Arc::new(MockAgent {
        calls: AtomicUsize::new(0),
        symbols: vec![function("foo", 0x7000, 0x10)],
        delay: Some(Duration::from_millis(20)),
        fail: false,
    });
    let statics = MockStatics::empty();
    let cache = cache_with(agent.clone(), statics);
    let modules = vec![libfoo()];

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        let modules = modules.clone();
        handles.push(tokio::spawn(async move {
            cache.ensure_module_symbols_loaded(0x7005, &modules, &server()).await
        }));
    }
    for handle in handles {
        assert!(handle.await.expect("task should not panic"));
    }

    assert_eq!(agent.calls(), 1);
    let symbols = cache.store().symbols_for(0x7000);
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].name(), "foo");
}

#[tokio::test]
async fn test_find_symbol_for_address_computes_offset()
{
    let agent = MockAgent::with_symbols(vec![function("foo", 0x7000, 0x10)]);
    let cache = cache_with(agent, MockStatics::empty());
    let modules = vec![libfoo()];

    cache.ensure_module_symbols_loaded(0x7000, &modules, &server()).await;

    let resolved = cache.find_symbol_for_address(0x7005, &modules).expect("symbol should cover 0x7005");
    assert_eq!(resolved.symbol.name(), "foo");
    assert_eq!(resolved.offset, 5);

    // One past the end of foo's range is module-relative only.
    assert!(cache.find_symbol_for_address(0x7010, &modules).is_none());
}

#[tokio::test]
async fn test_address_outside_every_module_is_not_an_error()
{
    let agent = MockAgent::with_symbols(vec![]);
    let cache = cache_with(agent.clone(), MockStatics::empty());
    let modules = vec![libfoo()];

    assert_eq!(cache.resolve_address(0x100, &modules), AddressResolution::NoModule);
    assert!(cache.find_symbol_for_address(0x100, &modules).is_none());
    assert!(cache.format_address_with_symbol(0x100, &modules, FormatMode::Function).is_none());
    assert!(!cache.ensure_module_symbols_loaded(0x100, &modules, &server()).await);
    assert_eq!(agent.calls(), 0);
}

#[tokio::test]
async fn test_library_mode_never_triggers_a_load()
{
    let agent = MockAgent::with_symbols(vec![function("foo", 0x7000, 0x10)]);
    let cache = cache_with(agent.clone(), MockStatics::empty());
    let modules = vec![libfoo()];

    let text = cache.format_address_with_symbol(0x7020, &modules, FormatMode::Library);
    assert_eq!(text.as_deref(), Some("libfoo.so + 0x20"));
    assert_eq!(agent.calls(), 0);

    // Library mode stays module-relative even after symbols are cached.
    cache.ensure_module_symbols_loaded(0x7000, &modules, &server()).await;
    let text = cache.format_address_with_symbol(0x7005, &modules, FormatMode::Library);
    assert_eq!(text.as_deref(), Some("libfoo.so + 0x5"));
}

#[tokio::test]
async fn test_function_mode_falls_back_then_resolves()
{
    let agent = MockAgent::with_symbols(vec![function("foo", 0x7000, 0x10)]);
    let cache = cache_with(agent.clone(), MockStatics::empty());
    let modules = vec![libfoo()];

    // Unloaded: synchronous fallback text, background load kicked off.
    let text = cache.format_address_with_symbol(0x7005, &modules, FormatMode::Function);
    assert_eq!(text.as_deref(), Some("libfoo.so + 0x5"));

    // Make the load deterministic for the assertion below.
    cache.ensure_module_symbols_loaded(0x7005, &modules, &server()).await;

    let text = cache.format_address_with_symbol(0x7000, &modules, FormatMode::Function);
    assert_eq!(text.as_deref(), Some("libfoo.so@foo"));
    let text = cache.format_address_with_symbol(0x7005, &modules, FormatMode::Function);
    assert_eq!(text.as_deref(), Some("libfoo.so@foo+0x5"));
}

#[tokio::test]
async fn test_live_symbol_wins_over_static_at_same_address()
{
    let agent = MockAgent::with_symbols(vec![function("foo", 0x7000, 0x10)]);
    let statics = MockStatics::with_entry(
        "ios",
        "libfoo.so",
        vec![
            StaticFunction {
                name: "sub_0".to_string(),
                address: "0x0".to_string(),
                size: 0x10,
            },
            StaticFunction {
                name: "sub_100".to_string(),
                address: "0x100".to_string(),
                size: 0x10,
            },
        ],
    );
    let cache = cache_with(agent, statics);
    let modules = vec![libfoo()];

    cache.ensure_module_symbols_loaded(0x7000, &modules, &server()).await;

    let symbols = cache.store().symbols_for(0x7000);
    let at_base: Vec<_> = symbols.iter().filter(|s| s.address() == 0x7000).collect();
    assert_eq!(at_base.len(), 1);
    assert_eq!(at_base[0].name(), "foo");
    assert!(symbols.iter().any(|s| s.name() == "sub_100" && s.address() == 0x7100));
}

#[tokio::test]
async fn test_static_lookup_retries_under_unknown_os()
{
    let agent = MockAgent::with_symbols(vec![]);
    let statics = MockStatics::with_entry(
        "unknown",
        "libfoo.so",
        vec![StaticFunction {
            name: "sub_20".to_string(),
            address: "0x20".to_string(),
            size: 0x10,
        }],
    );
    let cache = cache_with(agent, statics.clone());
    let modules = vec![libfoo()];

    cache.ensure_module_symbols_loaded(0x7000, &modules, &server()).await;

    assert_eq!(statics.requested_os(), vec!["ios".to_string(), "unknown".to_string()]);
    let symbols = cache.store().symbols_for(0x7000);
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].name(), "sub_20");
}

#[test_log::test(tokio::test)]
async fn test_agent_failure_still_marks_module_loaded()
{
    let agent = Arc::new(MockAgent {
        calls: AtomicUsize::new(0),
        symbols: vec![function("foo", 0x7000, 0x10)],
        delay: None,
        fail: true,
    });
    let cache = cache_with(agent.clone(), MockStatics::empty());
    let modules = vec![libfoo()];

    assert!(cache.ensure_module_symbols_loaded(0x7000, &modules, &server()).await);
    assert!(cache.store().is_loaded(0x7000));
    assert!(cache.store().symbols_for(0x7000).is_empty());

    // No retry storm: the failed module stays loaded-empty.
    cache.ensure_module_symbols_loaded(0x7000, &modules, &server()).await;
    assert_eq!(agent.calls(), 1);
}

#[tokio::test]
async fn test_find_address_for_symbol_matches_permissively()
{
    let agent = MockAgent::with_symbols(vec![
        function("_ZN3foo9decorated17habcdef0123456789E", 0x7000, 0x10),
        function("plain_helper", 0x7020, 0x10),
    ]);
    let cache = cache_with(agent.clone(), MockStatics::empty());
    let modules = vec![libfoo(), Module::new(0x9000, 0x1000, "/usr/lib/libbar.so")];

    // Case-insensitive module match on the short name, substring symbol match.
    let symbol = cache.find_address_for_symbol("decorated", "LIBFOO.SO", &modules).await;
    assert_eq!(symbol.expect("should match the decorated symbol").address(), 0x7000);

    // The query may also be longer than the stored name.
    let symbol = cache.find_address_for_symbol("my plain_helper wrapper", "libfoo", &modules).await;
    assert_eq!(symbol.expect("bidirectional match should hit").address(), 0x7020);

    let missing = cache.find_address_for_symbol("no_such_symbol", "libfoo.so", &modules).await;
    assert!(missing.is_none());

    // Unknown module name: no load is triggered at all.
    assert!(cache.find_address_for_symbol("foo", "libqux.so", &modules).await.is_none());
    assert_eq!(agent.calls(), 1);
}

#[tokio::test]
async fn test_display_names_resolve_after_flush()
{
    let agent = MockAgent::with_symbols(vec![function("_Z3foov", 0x7000, 0x10)]);
    let demangler = MockDemangler::with_mapping(&[("_Z3foov", "foo()")]);
    let cache = Arc::new(SymbolCache::new(agent, MockStatics::empty(), demangler, CacheConfig::default()));
    let modules = vec![libfoo()];

    // Until a batch resolves, the raw name is used.
    assert_eq!(cache.display_name("_Z3foov"), "_Z3foov");
    assert!(cache.has_pending_demangles());

    cache.flush_pending_demangles().await;
    assert_eq!(cache.display_name("_Z3foov"), "foo()");
    assert!(!cache.has_pending_demangles());

    // The load queued the module's names, so formatting picks the
    // demangled form up as well.
    cache.ensure_module_symbols_loaded(0x7000, &modules, &server()).await;
    cache.flush_pending_demangles().await;
    let text = cache.format_address_with_symbol(0x7000, &modules, FormatMode::Function);
    assert_eq!(text.as_deref(), Some("libfoo.so@foo()"));
}

#[tokio::test]
async fn test_demangler_failure_degrades_to_raw_names()
{
    struct FailingDemangler;

    #[async_trait]
    impl Demangler for FailingDemangler
    {
        async fn demangle(&self, _names: &[String]) -> Result<Vec<String>>
        {
            Err(SymbolCacheError::Demangle("demangler crashed".to_string()))
        }
    }

    let agent = MockAgent::with_symbols(vec![]);
    let cache = Arc::new(SymbolCache::new(
        agent,
        MockStatics::empty(),
        Arc::new(FailingDemangler),
        CacheConfig::default(),
    ));

    assert_eq!(cache.display_name("_Z3barv"), "_Z3barv");
    cache.flush_pending_demangles().await;

    // The failed batch is cached as raw names and not re-queued.
    assert_eq!(cache.display_name("_Z3barv"), "_Z3barv");
    assert!(!cache.has_pending_demangles());
}

#[tokio::test]
async fn test_demangle_batches_are_capped()
{
    let agent = MockAgent::with_symbols(vec![]);
    let cache = Arc::new(SymbolCache::new(
        agent,
        MockStatics::empty(),
        MockDemangler::passthrough(),
        CacheConfig {
            demangle: true,
            demangle_batch: 2,
        },
    ));

    for name in ["a", "b", "c"] {
        cache.display_name(name);
    }
    cache.flush_pending_demangles().await;
    assert!(cache.has_pending_demangles());
    cache.flush_pending_demangles().await;
    assert!(!cache.has_pending_demangles());
}

#[tokio::test]
async fn test_clear_cache_behaves_like_fresh()
{
    let agent = MockAgent::with_symbols(vec![function("_Z3foov", 0x7000, 0x10)]);
    let demangler = MockDemangler::with_mapping(&[("_Z3foov", "foo()")]);
    let cache = Arc::new(SymbolCache::new(agent.clone(), MockStatics::empty(), demangler, CacheConfig::default()));
    let modules = vec![libfoo()];

    cache.ensure_module_symbols_loaded(0x7000, &modules, &server()).await;
    cache.flush_pending_demangles().await;
    assert_eq!(cache.display_name("_Z3foov"), "foo()");

    cache.clear_cache();

    assert!(!cache.store().is_loaded(0x7000));
    assert!(cache.store().symbols_for(0x7000).is_empty());
    assert!(cache.find_symbol_for_address(0x7005, &modules).is_none());
    // Demangle cache is gone too; the raw name comes back until a new flush.
    assert_eq!(cache.display_name("_Z3foov"), "_Z3foov");

    // The next lookup loads from the sources again.
    cache.ensure_module_symbols_loaded(0x7000, &modules, &server()).await;
    assert_eq!(agent.calls(), 2);
    assert!(cache.find_symbol_for_address(0x7005, &modules).is_some());
}

#[tokio::test]
async fn test_register_context_pc_resolution()
{
    let agent = MockAgent::with_symbols(vec![function("handler", 0x7000, 0x40)]);
    let cache = cache_with(agent, MockStatics::empty());
    let modules = vec![libfoo()];

    cache.ensure_module_symbols_loaded(0x7000, &modules, &server()).await;

    let mut regs = X8664Registers::default();
    regs.rip = 0x7010;
    let context = RegisterContext::X8664(regs);

    let resolved = cache.find_symbol_for_context(&context, &modules).expect("pc should resolve");
    assert_eq!(resolved.symbol.name(), "handler");
    assert_eq!(resolved.offset, 0x10);
}

#[tokio::test]
async fn test_update_server_info_drives_background_loads()
{
    let agent = MockAgent::with_symbols(vec![function("foo", 0x7000, 0x10)]);
    let statics = MockStatics::with_entry("android", "libfoo.so", vec![]);
    let cache = cache_with(agent, statics.clone());
    let modules = vec![libfoo()];

    cache.update_server_info(ServerInfo::new("android", Architecture::Arm64));

    // Trigger a background load, then wait for it via the coordinator.
    let resolution = cache.resolve_address(0x7005, &modules);
    assert!(matches!(resolution, AddressResolution::ModuleOnly { pending: true, .. }));
    cache
        .ensure_module_symbols_loaded(0x7005, &modules, &ServerInfo::new("android", Architecture::Arm64))
        .await;

    assert!(statics.requested_os().contains(&"android".to_string()));
}
