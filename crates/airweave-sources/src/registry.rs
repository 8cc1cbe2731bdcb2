//! Short-name plug-in registry (spec §6).

use std::collections::HashMap;
use std::sync::Arc;

use crate::source::{Source, SourceMetadata};

#[derive(Default)]
pub struct SourceRegistry {
    factories: HashMap<&'static str, (SourceMetadata, Arc<dyn Source>)>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source: Arc<dyn Source>) {
        let metadata = source.metadata();
        self.factories.insert(metadata.short_name, (metadata, source));
    }

    pub fn get(&self, short_name: &str) -> Option<Arc<dyn Source>> {
        self.factories.get(short_name).map(|(_, s)| s.clone())
    }

    pub fn metadata(&self, short_name: &str) -> Option<SourceMetadata> {
        self.factories.get(short_name).map(|(m, _)| m.clone())
    }

    pub fn list(&self) -> Vec<SourceMetadata> {
        self.factories.values().map(|(m, _)| m.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{AuthMethod, EntityStream};
    use crate::http::RateLimitedHttpClient;
    use airweave_common::error::Result;
    use async_trait::async_trait;

    struct Stub;

    #[async_trait]
    impl Source for Stub {
        fn metadata(&self) -> SourceMetadata {
            SourceMetadata {
                short_name: "stub",
                display_name: "Stub",
                auth_methods: vec![AuthMethod::None],
                oauth_type: None,
                labels: vec![],
                supports_continuous: false,
            }
        }

        fn generate_entities<'a>(
            &'a self,
            _http: &'a mut RateLimitedHttpClient,
            _cursor: serde_json::Value,
        ) -> EntityStream<'a> {
            Box::pin(futures::stream::empty::<Result<airweave_common::entity::Entity>>())
        }
    }

    #[test]
    fn registers_and_looks_up_by_short_name() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(Stub));
        assert!(registry.get("stub").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.list().len(), 1);
    }
}
