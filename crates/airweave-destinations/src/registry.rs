//! Short-name plug-in registry for destinations, mirroring
//! `airweave_sources::registry::SourceRegistry` (spec §6).

use std::collections::HashMap;
use std::sync::Arc;

use crate::destination::Destination;

#[derive(Default)]
pub struct DestinationRegistry {
    destinations: HashMap<&'static str, Arc<dyn Destination>>,
}

impl DestinationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, short_name: &'static str, destination: Arc<dyn Destination>) {
        self.destinations.insert(short_name, destination);
    }

    pub fn get(&self, short_name: &str) -> Option<Arc<dyn Destination>> {
        self.destinations.get(short_name).cloned()
    }
}
