//! Process-wide, read-mostly cache mapping a child template's
//! group/version/kind to its `ApiResource`, refreshed on a miss.
//!
//! Reads hold a shared lock; a refresh (on a cache miss) holds an exclusive
//! lock for the duration of the live discovery query, per the concurrency
//! model's description of discovery mappings.

use kube::{core::GroupVersionKind, discovery::ApiResource, Client};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
struct TemplateGvk {
    group: String,
    version: String,
    kind: String,
}

/// Caching resolver from a `(group, version, kind)` triple to the
/// `ApiResource` needed to build a dynamic `Api<DynamicObject>`.
#[derive(Clone)]
pub struct DiscoveryCache {
    client: Client,
    cache: Arc<RwLock<HashMap<TemplateGvk, ApiResource>>>,
}

impl DiscoveryCache {
    /// An empty cache backed by `client`.
    pub fn new(client: Client) -> Self {
        DiscoveryCache {
            client,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Resolves `group/version Kind` to an `ApiResource`, running a live
    /// discovery query on a cache miss. Returns `None` if the kind still
    /// cannot be resolved after a fresh query (the CRD may not be installed
    /// yet); callers should requeue with backoff rather than treat this as
    /// fatal.
    pub async fn resolve(&self, group: &str, version: &str, kind: &str) -> kube::Result<Option<ApiResource>> {
        let key = TemplateGvk {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        };

        if let Some(ar) = self.cache.read().await.get(&key) {
            return Ok(Some(ar.clone()));
        }

        let mut cache = self.cache.write().await;
        // Someone else may have refreshed while we waited for the write lock.
        if let Some(ar) = cache.get(&key) {
            return Ok(Some(ar.clone()));
        }

        let discovery = kube::Discovery::new(self.client.clone()).run().await?;
        let gvk = GroupVersionKind::gvk(group, version, kind);
        let Some((ar, _caps)) = discovery.resolve_gvk(&gvk) else {
            return Ok(None);
        };
        cache.insert(key, ar.clone());
        Ok(Some(ar))
    }
}
