use crate::catalog::CatalogRegistry;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One way of recognising and parsing a family of links.
///
/// `handles` must be pure: the registry may call it from several threads
/// and re-check a cached strategy before scanning.
pub trait UrlHandlerStrategy: Send + Sync {
    type Output;

    /// Short name for logging.
    fn name(&self) -> &'static str;

    fn handles(&self, url: &str) -> bool;

    /// `None` means the link is not of this kind, not that it is malformed.
    fn parse(&self, url: &str, catalogs: &CatalogRegistry) -> Option<Self::Output>;
}

pub type SharedStrategy<T> = Arc<dyn UrlHandlerStrategy<Output = T>>;

/// Ordered fallback list of strategies with a single-slot cache of the last
/// strategy that matched.
///
/// Strategy predicates are expected to be disjoint; under that condition the
/// cache never changes which strategy a URL selects.
pub struct Registry<T> {
    strategies: Vec<SharedStrategy<T>>,
    // index + 1 of the cached strategy, 0 when empty
    last_match: AtomicUsize,
}

impl<T> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("Registry")
            .field("strategies", &names)
            .field("last_match", &self.last_match.load(Ordering::Relaxed))
            .finish()
    }
}

impl<T> Registry<T> {
    pub fn new(strategies: Vec<SharedStrategy<T>>) -> Self {
        Self {
            strategies,
            last_match: AtomicUsize::new(0),
        }
    }

    pub fn strategies(&self) -> &[SharedStrategy<T>] {
        &self.strategies
    }

    /// The first strategy, in declared order, that handles `url`. The most
    /// recent winner is tried before the list is scanned.
    pub fn select_url_handler(&self, url: &str) -> Option<&SharedStrategy<T>> {
        let cached = self.last_match.load(Ordering::Acquire);
        if let Some(strategy) = cached
            .checked_sub(1)
            .and_then(|index| self.strategies.get(index))
        {
            if strategy.handles(url) {
                return Some(strategy);
            }
        }

        for (index, strategy) in self.strategies.iter().enumerate() {
            if index + 1 == cached {
                continue;
            }
            if strategy.handles(url) {
                // losing the race just means another caller cached its own winner
                let _ = self.last_match.compare_exchange(
                    cached,
                    index + 1,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
                tracing::trace!(strategy = strategy.name(), "selected url handler");
                return Some(strategy);
            }
        }
        None
    }

    /// Selects a strategy for `url` and parses it.
    pub fn parse(&self, url: &str, catalogs: &CatalogRegistry) -> Option<T> {
        self.select_url_handler(url)?.parse(url, catalogs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Prefix {
        prefix: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl UrlHandlerStrategy for Prefix {
        type Output = &'static str;

        fn name(&self) -> &'static str {
            self.prefix
        }

        fn handles(&self, url: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            url.starts_with(self.prefix)
        }

        fn parse(&self, _url: &str, _catalogs: &CatalogRegistry) -> Option<Self::Output> {
            Some(self.prefix)
        }
    }

    fn registry() -> (Registry<&'static str>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let http_calls = Arc::new(AtomicUsize::new(0));
        let mpc_calls = Arc::new(AtomicUsize::new(0));
        let registry = Registry::new(vec![
            Arc::new(Prefix {
                prefix: "http",
                calls: Arc::clone(&http_calls),
            }) as SharedStrategy<_>,
            Arc::new(Prefix {
                prefix: "eclipse+mpc",
                calls: Arc::clone(&mpc_calls),
            }),
        ]);
        (registry, http_calls, mpc_calls)
    }

    #[test]
    fn repeated_urls_hit_the_cache() {
        let (registry, http_calls, mpc_calls) = registry();
        let url = "eclipse+mpc://example.org/install/1";

        assert_eq!(registry.select_url_handler(url).expect("match").name(), "eclipse+mpc");
        assert_eq!(http_calls.load(Ordering::SeqCst), 1);
        assert_eq!(mpc_calls.load(Ordering::SeqCst), 1);

        for _ in 0..3 {
            assert_eq!(registry.select_url_handler(url).expect("match").name(), "eclipse+mpc");
        }
        assert_eq!(http_calls.load(Ordering::SeqCst), 1, "no re-scan");
        assert_eq!(mpc_calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn selection_is_stable_across_cache_states() {
        let (registry, _, _) = registry();
        let urls = [
            "https://example.org/?mpc_install=1",
            "eclipse+mpc://example.org/install/1",
            "https://example.org/?mpc_install=2",
            "https://example.org/?mpc_install=2",
            "eclipse+mpc://example.org/favorites/x",
        ];
        let expected = ["http", "eclipse+mpc", "http", "http", "eclipse+mpc"];
        for (url, expected) in urls.iter().zip(expected) {
            let fresh = self::registry().0;
            assert_eq!(fresh.select_url_handler(url).expect("fresh").name(), expected);
            assert_eq!(registry.select_url_handler(url).expect("warm").name(), expected);
        }
    }

    #[test]
    fn unknown_urls_select_nothing() {
        let (registry, _, _) = registry();
        assert!(registry.select_url_handler("ftp://example.org").is_none());
        assert!(registry
            .parse("ftp://example.org", &CatalogRegistry::default())
            .is_none());
    }
}
