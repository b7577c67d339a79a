use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{
    core::{directive::Directive, record::RecordDescriptor},
    error::{AppError, AppResult},
};

/// Descriptors for one query definition, keyed by the ordered column list.
///
/// Descriptors are built while holding the lock, so concurrent first calls
/// for the same shape always observe the same `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ShapeCache {
    inner: Arc<Mutex<HashMap<Vec<String>, Arc<RecordDescriptor>>>>,
}

impl ShapeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_descriptor(
        &self,
        name: &str,
        columns: &[String],
        directives: &HashMap<String, Directive>,
    ) -> AppResult<Arc<RecordDescriptor>> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| AppError::Internal("poisoned lock".into()))?;
        if let Some(d) = guard.get(columns) {
            return Ok(Arc::clone(d));
        }

        let d = Arc::new(RecordDescriptor::build(name, columns.to_vec(), directives)?);
        if !guard.is_empty() {
            tracing::warn!(query = name, shapes = guard.len() + 1, "result shape changed; caching an additional descriptor");
        }
        tracing::debug!(query = name, columns = columns.len(), "built record descriptor");
        guard.insert(columns.to_vec(), Arc::clone(&d));
        Ok(d)
    }

    /// Number of distinct shapes seen so far.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_same_shape_reuses_descriptor() {
        let cache = ShapeCache::new();
        let directives = HashMap::new();
        let a = cache.ensure_descriptor("Q", &cols(&["id", "name"]), &directives).unwrap();
        let b = cache.ensure_descriptor("Q", &cols(&["id", "name"]), &directives).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_new_shape_gets_its_own_descriptor() {
        let cache = ShapeCache::new();
        let directives = HashMap::new();
        let a = cache.ensure_descriptor("Q", &cols(&["id"]), &directives).unwrap();
        let b = cache.ensure_descriptor("Q", &cols(&["id", "extra"]), &directives).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_unsupported_directive_is_not_cached() {
        let cache = ShapeCache::new();
        let mut directives = HashMap::new();
        directives.insert("price".to_string(), Directive::named("money"));
        let err = cache
            .ensure_descriptor("Q", &cols(&["price"]), &directives)
            .unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_DIRECTIVE");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_first_use_builds_once() {
        let cache = ShapeCache::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || {
                    cache
                        .ensure_descriptor("Q", &cols(&["a", "b"]), &HashMap::new())
                        .unwrap()
                })
            })
            .collect();
        let descriptors: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(descriptors.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.len(), 1);
    }
}
