//! The source adapter contract (spec §4.4, C5). Mirrors the shape of
//! `rootsignal_core::Ingestor` (`modules/rootsignal-core/src/ingestor.rs`):
//! a small async trait with default method bodies, rather than the original
//! Python's abstract base class with lifecycle hooks.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use airweave_common::entity::Entity;
use airweave_common::error::Result;

use crate::http::RateLimitedHttpClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    None,
    ApiKey,
    OAuthBrowser,
    OAuthToken,
    OAuthByok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthType {
    WithRefresh,
    WithoutRefresh,
    WithRotatingRefresh,
}

/// Registry-facing description of a source plug-in (spec §6): auth methods,
/// OAuth flavor, labels, and whether it supports a long-lived continuous
/// sync (which decides whether the source limiter is org- or
/// connection-scoped).
#[derive(Debug, Clone)]
pub struct SourceMetadata {
    pub short_name: &'static str,
    pub display_name: &'static str,
    pub auth_methods: Vec<AuthMethod>,
    pub oauth_type: Option<OAuthType>,
    pub labels: Vec<&'static str>,
    pub supports_continuous: bool,
}

pub type EntityStream<'a> = BoxStream<'a, Result<Entity>>;

/// A uniform entity stream + cursor + token refresh + HTTP client injection
/// contract (spec §4.4). Implementors never hold a raw `reqwest::Client`;
/// they receive a `RateLimitedHttpClient` so outbound calls always go
/// through the source limiter.
#[async_trait]
pub trait Source: Send + Sync {
    fn metadata(&self) -> SourceMetadata;

    /// JSON Schema for this source's cursor shape, if it declares one.
    /// `None` means the source is stateless (always a full sync).
    fn cursor_schema(&self) -> Option<Value> {
        None
    }

    /// Validates credentials/config during connection creation. Default is
    /// a no-op for sources with nothing worth checking ahead of time.
    async fn validate_connection(&self, _http: &mut RateLimitedHttpClient) -> Result<()> {
        Ok(())
    }

    /// Streams entities and deletion signals. `cursor` is the persisted
    /// cursor value from the previous run (or an empty object for a first /
    /// full sync). Implementations may update the cursor as they progress
    /// but are not required to — the orchestrator only persists whatever
    /// the source returns via `current_cursor` once the stream ends.
    fn generate_entities<'a>(
        &'a self,
        http: &'a mut RateLimitedHttpClient,
        cursor: Value,
    ) -> EntityStream<'a>;

    /// Snapshot of the cursor as of the last `generate_entities` call.
    /// Sources that never advance their cursor can leave this at its
    /// default (an empty object, meaning "nothing to persist").
    fn current_cursor(&self) -> Value {
        Value::Object(Default::default())
    }
}
