//! Source adapter contract and the rate-limited HTTP client every adapter
//! is injected with (spec §4.4, C5).

pub mod generic_rest;
pub mod http;
pub mod registry;
pub mod source;

pub use generic_rest::{GenericRestConfig, GenericRestSource};
pub use http::RateLimitedHttpClient;
pub use registry::SourceRegistry;
pub use source::{AuthMethod, EntityStream, OAuthType, Source, SourceMetadata};
