//! Filter registry.
//!
//! A [`Plugin`] contributes filter registrations and direct searchers. The
//! enabled plugins of a request form a [`PluginSet`], which lazily derives the
//! filters-by-name map, the query grammar and the ordered direct searchers.
//! [`Catalog`] memoizes plugin sets process-wide, keyed by the sorted set of
//! enabled plugin names.

pub mod clang;
pub mod core;
pub mod js;
pub mod names;

use crate::index::body::Predicate;
use crate::index::types::Domain;
use crate::query::filters::Filter;
use crate::query::parser::{Grammar, Term};
use lru::LruCache;
use rustc_hash::FxHashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, OnceLock};

/// Builds a filter for one term
pub type FilterCtor = Arc<dyn Fn(&Term) -> Arc<dyn Filter> + Send + Sync>;

/// Turns a text term into a predicate expected to match a single record
pub type Probe = Arc<dyn Fn(&Term) -> Option<Predicate> + Send + Sync>;

/// One filter kind offered by a plugin
#[derive(Clone)]
pub struct FilterRegistration {
    pub name: String,
    /// Filters without a description cannot be typed as `name:` and are not
    /// shown in menus
    pub description: Option<String>,
    /// Language the filter is specific to; `None` for language-agnostic ones
    pub lang: Option<String>,
    ctor: FilterCtor,
}

impl FilterRegistration {
    pub fn new<F>(name: &str, description: Option<&str>, ctor: F) -> Self
    where
        F: Fn(&Term) -> Arc<dyn Filter> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.map(str::to_string),
            lang: None,
            ctor: Arc::new(ctor),
        }
    }

    pub fn with_lang(mut self, lang: &str) -> Self {
        self.lang = Some(lang.to_string());
        self
    }

    pub fn build(&self, term: &Term) -> Arc<dyn Filter> {
        (self.ctor)(term)
    }
}

impl fmt::Debug for FilterRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistration")
            .field("name", &self.name)
            .field("lang", &self.lang)
            .finish_non_exhaustive()
    }
}

/// A lookup that may jump straight to a single result
#[derive(Clone)]
pub struct DirectSearcher {
    pub name: String,
    /// Lower runs first
    pub priority: i32,
    pub domain: Domain,
    probe: Probe,
}

impl DirectSearcher {
    pub fn new<F>(name: &str, priority: i32, domain: Domain, probe: F) -> Self
    where
        F: Fn(&Term) -> Option<Predicate> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            priority,
            domain,
            probe: Arc::new(probe),
        }
    }

    pub fn probe(&self, term: &Term) -> Option<Predicate> {
        (self.probe)(term)
    }
}

impl fmt::Debug for DirectSearcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectSearcher")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// A named bundle of filters and direct searchers
#[derive(Debug, Clone, Default)]
pub struct Plugin {
    pub name: String,
    pub filters: Vec<FilterRegistration>,
    pub direct_searchers: Vec<DirectSearcher>,
}

impl Plugin {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

/// A direct searcher together with the plugin that registered it
#[derive(Debug, Clone)]
pub struct RankedSearcher {
    pub plugin: String,
    pub searcher: DirectSearcher,
}

/// The plugins enabled for a request, in registry order
pub struct PluginSet {
    plugins: Vec<Arc<Plugin>>,
    filters_by_name: OnceLock<FxHashMap<String, Vec<FilterRegistration>>>,
    grammar: OnceLock<Grammar>,
    direct_searchers: OnceLock<Vec<RankedSearcher>>,
}

impl PluginSet {
    pub fn new(plugins: Vec<Arc<Plugin>>) -> Self {
        Self {
            plugins,
            filters_by_name: OnceLock::new(),
            grammar: OnceLock::new(),
            direct_searchers: OnceLock::new(),
        }
    }

    pub fn plugins(&self) -> &[Arc<Plugin>] {
        &self.plugins
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name.as_str()).collect()
    }

    /// Every registration of every name, in registry order, described or not
    pub fn filters_by_name(&self) -> &FxHashMap<String, Vec<FilterRegistration>> {
        self.filters_by_name.get_or_init(|| {
            let mut map: FxHashMap<String, Vec<FilterRegistration>> = FxHashMap::default();
            for registration in self.plugins.iter().flat_map(|p| &p.filters) {
                map.entry(registration.name.clone())
                    .or_default()
                    .push(registration.clone());
            }
            map
        })
    }

    /// Registrations for `name`; empty for unknown names
    pub fn filters_named(&self, name: &str) -> &[FilterRegistration] {
        self.filters_by_name()
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Grammar accepting the names whose first registration is described
    pub fn grammar(&self) -> &Grammar {
        self.grammar.get_or_init(|| {
            Grammar::new(
                self.filters_by_name()
                    .iter()
                    .filter(|(_, regs)| regs.first().is_some_and(|r| r.description.is_some()))
                    .map(|(name, _)| name.clone()),
            )
        })
    }

    /// Direct searchers ordered by priority, then plugin name, then searcher name
    pub fn direct_searchers(&self) -> &[RankedSearcher] {
        self.direct_searchers.get_or_init(|| {
            let mut searchers: Vec<RankedSearcher> = self
                .plugins
                .iter()
                .flat_map(|plugin| {
                    plugin.direct_searchers.iter().map(|searcher| RankedSearcher {
                        plugin: plugin.name.clone(),
                        searcher: searcher.clone(),
                    })
                })
                .collect();
            searchers.sort_by(|a, b| {
                a.searcher
                    .priority
                    .cmp(&b.searcher.priority)
                    .then_with(|| a.plugin.cmp(&b.plugin))
                    .then_with(|| a.searcher.name.cmp(&b.searcher.name))
            });
            searchers
        })
    }
}

impl fmt::Debug for PluginSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginSet")
            .field("plugins", &self.plugin_names())
            .finish()
    }
}

/// Menu entry for a described filter
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MenuItem {
    pub name: String,
    pub description: String,
}

/// Described filters, language-agnostic ones first, then alphabetical.
///
/// The first registration of a name supplies its description.
pub fn filter_menu_items(plugins: &PluginSet) -> Vec<MenuItem> {
    let mut items: Vec<(bool, MenuItem)> = plugins
        .filters_by_name()
        .iter()
        .filter_map(|(name, regs)| {
            let first = regs.first()?;
            let description = first.description.clone()?;
            Some((
                first.lang.is_some(),
                MenuItem {
                    name: name.clone(),
                    description,
                },
            ))
        })
        .collect();
    items.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.name.cmp(&b.1.name)));
    items.into_iter().map(|(_, item)| item).collect()
}

/// Plugins shipped with the crate, in registry order
pub fn builtin_plugins() -> Vec<Arc<Plugin>> {
    vec![
        Arc::new(core::plugin()),
        Arc::new(clang::plugin()),
        Arc::new(js::plugin()),
    ]
}

/// Process-wide cache of plugin sets keyed by enabled plugin names
pub struct Catalog {
    registry: Vec<Arc<Plugin>>,
    cache: Mutex<LruCache<Vec<String>, Arc<PluginSet>>>,
}

impl Catalog {
    pub fn new(registry: Vec<Arc<Plugin>>, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            registry,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Catalog over [`builtin_plugins`]
    pub fn builtin(cache_size: usize) -> Self {
        Self::new(builtin_plugins(), cache_size)
    }

    pub fn available(&self) -> Vec<&str> {
        self.registry.iter().map(|p| p.name.as_str()).collect()
    }

    /// The plugin set for `enabled`, built on first use.
    ///
    /// Names are matched regardless of order or repetition; unknown names are
    /// skipped.
    pub fn plugin_set<S: AsRef<str>>(&self, enabled: &[S]) -> Arc<PluginSet> {
        let mut key: Vec<String> = enabled.iter().map(|s| s.as_ref().to_string()).collect();
        key.sort();
        key.dedup();

        if let Ok(mut cache) = self.cache.lock()
            && let Some(set) = cache.get(&key)
        {
            return Arc::clone(set);
        }

        for name in &key {
            if !self.registry.iter().any(|p| &p.name == name) {
                tracing::warn!(plugin = %name, "unknown plugin ignored");
            }
        }
        let plugins = self
            .registry
            .iter()
            .filter(|p| key.binary_search(&p.name).is_ok())
            .cloned()
            .collect();
        let set = Arc::new(PluginSet::new(plugins));

        if let Ok(mut cache) = self.cache.lock() {
            // Another caller may have raced us; keep whichever is cached
            let cached = cache.get_or_insert(key, || Arc::clone(&set));
            return Arc::clone(cached);
        }
        set
    }
}
