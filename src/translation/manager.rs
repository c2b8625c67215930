//! Fallback-chain translator with a result cache
//!
//! Backends are tried in rotation starting from the last one that succeeded.
//! A backend that fails is skipped for the current call only; it is retried on
//! the next uncached text. Successful results are cached per
//! `(text, target language)` until the cache is cleared.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, info, warn};

use super::TranslatorBackend;

/// Cache key kept as a pair so texts containing any delimiter cannot collide
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    text: String,
    target_lang: String,
}

impl CacheKey {
    fn new(text: &str, target_lang: &str) -> Self {
        Self {
            text: text.to_string(),
            target_lang: target_lang.to_string(),
        }
    }
}

/// Owns the backend chain, the rotation index and the translation cache.
///
/// `translate` takes `&self`: the cache and rotation index are internally
/// synchronized, so the manager can be shared behind an `Arc`. When two
/// concurrent calls succeed on different backends the last store to the
/// rotation index wins.
pub struct TranslatorManager {
    backends: Vec<Box<dyn TranslatorBackend>>,
    current_index: AtomicUsize,
    cache: RwLock<HashMap<CacheKey, String>>,
    cache_enabled: AtomicBool,
}

impl Default for TranslatorManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslatorManager {
    /// Create a manager with no backends and caching enabled
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
            current_index: AtomicUsize::new(0),
            cache: RwLock::new(HashMap::new()),
            cache_enabled: AtomicBool::new(true),
        }
    }

    /// Append a backend; order defines fallback priority
    pub fn add_backend(&mut self, backend: Box<dyn TranslatorBackend>) {
        info!("Added translation backend: {}", backend.name());
        self.backends.push(backend);
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Index of the backend tried first on the next uncached call
    pub fn current_index(&self) -> usize {
        self.current_index.load(Ordering::Acquire)
    }

    /// Toggle caching. Disabling keeps existing entries but stops using them.
    pub fn set_cache_enabled(&self, enabled: bool) {
        self.cache_enabled.store(enabled, Ordering::Release);
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.cache_enabled.load(Ordering::Acquire)
    }

    /// Drop every cached translation
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.read().len()
    }

    /// Translate one text.
    ///
    /// Returns `None` for blank text, when no backend succeeds, or when there
    /// are no backends. Backend failures (including panics) are logged and
    /// never propagated.
    pub fn translate(&self, text: &str, target_lang: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }

        let key = CacheKey::new(text, target_lang);
        if self.is_cache_enabled() {
            if let Some(cached) = self.cache.read().get(&key) {
                debug!("Cache hit for {:?}", text);
                return Some(cached.clone());
            }
        }

        let count = self.backends.len();
        if count == 0 {
            debug!("No translation backends configured");
            return None;
        }

        let start = self.current_index() % count;
        for offset in 0..count {
            let index = (start + offset) % count;
            let backend = self.backends[index].as_ref();

            match call_backend(backend, text, target_lang) {
                Some(result) if !result.is_empty() => {
                    self.current_index.store(index, Ordering::Release);
                    if self.is_cache_enabled() {
                        self.cache.write().insert(key, result.clone());
                    }
                    return Some(result);
                }
                _ => debug!("Translator {} produced no result for {:?}", backend.name(), text),
            }
        }

        None
    }

    /// Translate each text in order; the output has the same length
    pub fn translate_batch(&self, texts: &[String], target_lang: &str) -> Vec<Option<String>> {
        texts
            .iter()
            .map(|text| self.translate(text, target_lang))
            .collect()
    }
}

/// Invoke a backend, treating a panic like any other failure
fn call_backend(backend: &dyn TranslatorBackend, text: &str, target_lang: &str) -> Option<String> {
    match panic::catch_unwind(AssertUnwindSafe(|| backend.translate(text, target_lang))) {
        Ok(result) => result,
        Err(payload) => {
            warn!(
                "Translator {} failed: {}",
                backend.name(),
                crate::shared::panic_message(payload.as_ref())
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Backend with a scripted reply and a call counter
    struct ScriptedBackend {
        name: String,
        reply: Arc<Mutex<Option<String>>>,
        calls: Arc<AtomicUsize>,
        panics: bool,
    }

    struct Handle {
        reply: Arc<Mutex<Option<String>>>,
        calls: Arc<AtomicUsize>,
    }

    impl Handle {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn set_reply(&self, reply: Option<&str>) {
            *self.reply.lock() = reply.map(str::to_string);
        }
    }

    fn scripted(name: &str, reply: Option<&str>) -> (Box<dyn TranslatorBackend>, Handle) {
        let reply = Arc::new(Mutex::new(reply.map(str::to_string)));
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = ScriptedBackend {
            name: name.to_string(),
            reply: reply.clone(),
            calls: calls.clone(),
            panics: false,
        };
        (Box::new(backend), Handle { reply, calls })
    }

    impl TranslatorBackend for ScriptedBackend {
        fn name(&self) -> &str {
            &self.name
        }

        fn translate(&self, _text: &str, _target_lang: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.panics {
                panic!("backend exploded");
            }
            self.reply.lock().clone()
        }
    }

    #[test]
    fn test_cache_hit_skips_backends() {
        let mut manager = TranslatorManager::new();
        let (backend, handle) = scripted("a", Some("你好"));
        manager.add_backend(backend);

        let first = manager.translate("Hello", "zh");
        let second = manager.translate("Hello", "zh");

        assert_eq!(first.as_deref(), Some("你好"));
        assert_eq!(first, second);
        assert_eq!(handle.calls(), 1);
    }

    #[test]
    fn test_fallback_and_sticky_rotation() {
        let mut manager = TranslatorManager::new();
        let (first, first_handle) = scripted("first", None);
        let (second, second_handle) = scripted("second", None);
        let (third, third_handle) = scripted("third", Some("third says hi"));
        manager.add_backend(first);
        manager.add_backend(second);
        manager.add_backend(third);

        assert_eq!(manager.translate("Hello", "zh").as_deref(), Some("third says hi"));
        assert_eq!(manager.current_index(), 2);
        assert_eq!(first_handle.calls(), 1);
        assert_eq!(second_handle.calls(), 1);

        // Rotation now starts at the third backend
        assert!(manager.translate("World", "zh").is_some());
        assert_eq!(first_handle.calls(), 1);
        assert_eq!(second_handle.calls(), 1);
        assert_eq!(third_handle.calls(), 2);
    }

    #[test]
    fn test_rotation_wraps_and_retries_failed_backend() {
        let mut manager = TranslatorManager::new();
        let (first, first_handle) = scripted("first", None);
        let (second, second_handle) = scripted("second", Some("from second"));
        manager.add_backend(first);
        manager.add_backend(second);

        assert!(manager.translate("one", "zh").is_some());
        assert_eq!(manager.current_index(), 1);

        // Second goes down, first recovers: wrap around to index 0
        second_handle.set_reply(None);
        first_handle.set_reply(Some("from first"));
        assert_eq!(manager.translate("two", "zh").as_deref(), Some("from first"));
        assert_eq!(manager.current_index(), 0);
        assert_eq!(second_handle.calls(), 2);
    }

    #[test]
    fn test_each_backend_tried_once_per_call() {
        let mut manager = TranslatorManager::new();
        let (first, first_handle) = scripted("first", None);
        let (second, second_handle) = scripted("second", None);
        manager.add_backend(first);
        manager.add_backend(second);

        assert!(manager.translate("Hello", "zh").is_none());
        assert_eq!(first_handle.calls(), 1);
        assert_eq!(second_handle.calls(), 1);
        assert_eq!(manager.current_index(), 0);
        assert_eq!(manager.cache_len(), 0);
    }

    #[test]
    fn test_blank_text_never_reaches_backends() {
        let mut manager = TranslatorManager::new();
        let (backend, handle) = scripted("a", Some("x"));
        manager.add_backend(backend);

        assert!(manager.translate("", "zh").is_none());
        assert!(manager.translate("   ", "zh").is_none());
        assert!(manager.translate("\t\n", "zh").is_none());
        assert_eq!(handle.calls(), 0);
    }

    #[test]
    fn test_no_backends() {
        let manager = TranslatorManager::new();
        assert!(manager.translate("Hello", "zh").is_none());
        assert_eq!(manager.translate_batch(&["a".into(), "b".into()], "zh"), vec![None, None]);
    }

    #[test]
    fn test_empty_result_counts_as_failure() {
        let mut manager = TranslatorManager::new();
        let (empty, _) = scripted("empty", Some(""));
        let (good, _) = scripted("good", Some("ok"));
        manager.add_backend(empty);
        manager.add_backend(good);

        assert_eq!(manager.translate("Hello", "zh").as_deref(), Some("ok"));
        assert_eq!(manager.current_index(), 1);
    }

    #[test]
    fn test_panicking_backend_is_skipped() {
        let mut manager = TranslatorManager::new();
        manager.add_backend(Box::new(ScriptedBackend {
            name: "boom".to_string(),
            reply: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
            panics: true,
        }));
        let (good, _) = scripted("good", Some("ok"));
        manager.add_backend(good);

        assert_eq!(manager.translate("Hello", "zh").as_deref(), Some("ok"));
    }

    #[test]
    fn test_clear_cache_evicts_stale_translation() {
        let mut manager = TranslatorManager::new();
        let (backend, handle) = scripted("a", Some("R"));
        manager.add_backend(backend);

        assert_eq!(manager.translate("Hello", "zh").as_deref(), Some("R"));

        handle.set_reply(Some("R2"));
        assert_eq!(manager.translate("Hello", "zh").as_deref(), Some("R"));

        manager.clear_cache();
        assert_eq!(manager.translate("Hello", "zh").as_deref(), Some("R2"));
    }

    #[test]
    fn test_disabled_cache_is_not_populated_or_read() {
        let mut manager = TranslatorManager::new();
        let (backend, handle) = scripted("a", Some("R"));
        manager.add_backend(backend);

        assert!(manager.translate("Hello", "zh").is_some());
        assert_eq!(manager.cache_len(), 1);

        manager.set_cache_enabled(false);
        handle.set_reply(Some("R2"));
        assert_eq!(manager.translate("Hello", "zh").as_deref(), Some("R2"));
        assert_eq!(manager.translate("Other", "zh").as_deref(), Some("R2"));
        // Existing entry kept, nothing new written
        assert_eq!(manager.cache_len(), 1);
        assert_eq!(handle.calls(), 3);

        // Re-enabling makes the old entry visible again
        manager.set_cache_enabled(true);
        assert_eq!(manager.translate("Hello", "zh").as_deref(), Some("R"));
    }

    #[test]
    fn test_cache_key_includes_target_language() {
        let mut manager = TranslatorManager::new();
        let (backend, handle) = scripted("a", Some("first"));
        manager.add_backend(backend);

        manager.translate("Hello", "zh");
        handle.set_reply(Some("second"));

        assert_eq!(manager.translate("Hello", "ja").as_deref(), Some("second"));
        assert_eq!(handle.calls(), 2);
    }

    #[test]
    fn test_cache_key_has_no_delimiter_collisions() {
        let mut manager = TranslatorManager::new();
        let (backend, handle) = scripted("a", Some("first"));
        manager.add_backend(backend);

        // A joined "text_lang" key would make these two identical
        manager.translate("a_b", "c");
        handle.set_reply(Some("second"));
        assert_eq!(manager.translate("a", "b_c").as_deref(), Some("second"));
    }

    #[test]
    fn test_batch_preserves_order_and_length() {
        let mut manager = TranslatorManager::new();
        let (backend, handle) = scripted("a", Some("t"));
        manager.add_backend(backend);

        let texts = vec!["one".to_string(), "  ".to_string(), "two".to_string()];
        let results = manager.translate_batch(&texts, "zh");

        assert_eq!(results, vec![Some("t".to_string()), None, Some("t".to_string())]);
        assert_eq!(handle.calls(), 2);
    }

    #[test]
    fn test_shared_across_threads() {
        let mut manager = TranslatorManager::new();
        let (backend, _) = scripted("a", Some("t"));
        manager.add_backend(backend);
        let manager = Arc::new(manager);

        let workers: Vec<_> = (0..4)
            .map(|i| {
                let manager = manager.clone();
                std::thread::spawn(move || manager.translate(&format!("text {}", i), "zh"))
            })
            .collect();

        for worker in workers {
            assert_eq!(worker.join().unwrap().as_deref(), Some("t"));
        }
        assert_eq!(manager.cache_len(), 4);
    }
}
