//! Endpoint descriptor registry (C7).
//!
//! An explicit object built once at startup and threaded by reference into
//! the orchestrator and adapters — not a global singleton.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Free,
    Premium,
}

/// Descriptor for one named endpoint (§3 "Endpoint Descriptor").
#[derive(Debug, Clone)]
pub struct EndpointDescriptor {
    pub name: String,
    pub path_template: String,
    pub category: String,
    pub tier: Tier,
    pub description: String,
    pub required_params: Vec<String>,
    pub optional_params: Vec<String>,
}

impl EndpointDescriptor {
    pub fn all_params(&self) -> Vec<&str> {
        self.required_params
            .iter()
            .chain(self.optional_params.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Optional filters for [`EndpointRegistry::list`].
#[derive(Debug, Clone, Default)]
pub struct EndpointFilter<'a> {
    pub category: Option<&'a str>,
    pub tier: Option<Tier>,
}

#[derive(Debug, Clone, Default)]
pub struct RegistryStats {
    pub total: usize,
    pub free: usize,
    pub premium: usize,
    pub categories: BTreeMap<String, usize>,
}

/// Endpoints for a single provider, keyed by name. Registration is not
/// required to be concurrency-safe with lookups — it happens once at
/// startup, before the registry is shared.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: BTreeMap<String, EndpointDescriptor>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `descriptor`. Re-registering a name already present
    /// replaces the prior entry.
    pub fn register(&mut self, descriptor: EndpointDescriptor) {
        tracing::trace!(endpoint = %descriptor.name, "endpoint registered");
        self.endpoints.insert(descriptor.name.clone(), descriptor);
    }

    pub fn lookup(&self, name: &str) -> Option<&EndpointDescriptor> {
        self.endpoints.get(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.endpoints.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.endpoints.keys().map(String::as_str).collect()
    }

    pub fn list(&self, filter: EndpointFilter<'_>) -> Vec<&EndpointDescriptor> {
        self.endpoints
            .values()
            .filter(|ep| match filter.category {
                Some(c) => ep.category == c,
                None => true,
            })
            .filter(|ep| match filter.tier {
                Some(t) => ep.tier == t,
                None => true,
            })
            .collect()
    }

    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            total: self.endpoints.len(),
            ..Default::default()
        };
        for ep in self.endpoints.values() {
            match ep.tier {
                Tier::Free => stats.free += 1,
                Tier::Premium => stats.premium += 1,
            }
            *stats.categories.entry(ep.category.clone()).or_insert(0) += 1;
        }
        stats
    }
}
