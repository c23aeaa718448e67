//! In-process category schema cache.
//!
//! Schema reads outnumber schema writes by orders of magnitude; the cache
//! holds compiled [`CategorySchema`] lists per project and is explicitly
//! invalidated by every schema-changing operation.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::fields::CategorySchema;

/// Invalidatable cache of compiled category schemas, keyed by project.
#[derive(Debug, Clone, Default)]
pub struct CategoryCache {
    inner: Arc<RwLock<HashMap<String, Arc<Vec<CategorySchema>>>>>,
}

impl CategoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached schemas for a project, if present.
    pub async fn get(&self, project_id: &str) -> Option<Arc<Vec<CategorySchema>>> {
        self.inner.read().await.get(project_id).cloned()
    }

    /// Store the schemas for a project.
    pub async fn insert(&self, project_id: &str, schemas: Vec<CategorySchema>) -> Arc<Vec<CategorySchema>> {
        let schemas = Arc::new(schemas);
        self.inner
            .write()
            .await
            .insert(project_id.to_string(), Arc::clone(&schemas));
        schemas
    }

    /// Drop the cached schemas of one project. Called by every
    /// schema-changing operation.
    pub async fn invalidate(&self, project_id: &str) {
        self.inner.write().await.remove(project_id);
    }

    /// Drop everything.
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_get_invalidate() {
        let cache = CategoryCache::new();
        assert!(cache.get("p1").await.is_none());

        cache.insert("p1", vec![]).await;
        assert!(cache.get("p1").await.is_some());

        cache.invalidate("p1").await;
        assert!(cache.get("p1").await.is_none());
    }

    #[tokio::test]
    async fn invalidation_is_per_project() {
        let cache = CategoryCache::new();
        cache.insert("p1", vec![]).await;
        cache.insert("p2", vec![]).await;

        cache.invalidate("p1").await;
        assert!(cache.get("p1").await.is_none());
        assert!(cache.get("p2").await.is_some());
    }
}
