//! Process-wide cache of adapter instances.
//!
//! One weak slot per version equivalence class holds the default-settings
//! adapter. The registry never keeps an adapter alive: once every caller drops
//! its handle, the next request builds a new one. Construction runs outside the
//! slot lock, so concurrent first requests may each build an instance; the
//! last one published wins the slot.
//!
//! Type introspectors are shared the same way, keyed by the settings that
//! influence introspection, for every adapter the registry builds.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, Weak},
};

use modelwrap_types::CompatibilityVersion;
use once_cell::sync::Lazy;
use tracing::debug;

use crate::{
    adapter::DefaultAdapter,
    error::AdapterError,
    fallback::{IntrospectionKey, TypeIntrospector},
    resolver::Bridges,
    settings::AdapterSettings,
    version::{CLASS_COUNT, check_version, normalize, slot_index},
};

static GLOBAL: Lazy<AdapterRegistry> = Lazy::new(AdapterRegistry::new);

pub struct AdapterRegistry {
    bridges: Bridges,
    slots: [Mutex<Weak<DefaultAdapter>>; CLASS_COUNT],
    introspectors: Mutex<HashMap<IntrospectionKey, Weak<TypeIntrospector>>>,
}

impl AdapterRegistry {
    /// Registry without bridges or extra probes.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> AdapterRegistryBuilder {
        AdapterRegistryBuilder::default()
    }

    /// Lazily built process default, without bridges.
    pub fn global() -> &'static AdapterRegistry {
        &GLOBAL
    }

    pub fn bridges(&self) -> &Bridges {
        &self.bridges
    }

    pub fn get_instance(&self, version: CompatibilityVersion) -> Result<Arc<DefaultAdapter>, AdapterError> {
        self.get_instance_with(version, AdapterSettings::DEFAULT)
    }

    /// Returns the adapter for `(version, settings)`.
    ///
    /// Only [`AdapterSettings::DEFAULT`] adapters are cached; any other bundle
    /// gets a fresh instance on every call.
    pub fn get_instance_with(
        &self,
        version: CompatibilityVersion,
        settings: AdapterSettings,
    ) -> Result<Arc<DefaultAdapter>, AdapterError> {
        check_version(version)?;
        let normalized = normalize(version)?;

        if !settings.is_default() {
            debug!(version = %normalized, settings = ?settings, "non-default settings; building uncached adapter");
            return self.build(normalized, settings);
        }

        let slot = &self.slots[slot_index(normalized)?];
        let cached = slot.lock().unwrap_or_else(PoisonError::into_inner).upgrade();
        if let Some(adapter) = cached {
            adapter.synchronize();
            debug!(version = %normalized, instance_id = adapter.instance_id(), "adapter cache hit");
            return Ok(adapter);
        }

        debug!(version = %normalized, "adapter cache miss");
        let adapter = self.build(normalized, settings)?;
        adapter.synchronize();
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Arc::downgrade(&adapter);
        debug!(version = %normalized, instance_id = adapter.instance_id(), "published adapter");
        Ok(adapter)
    }

    /// The default adapter ignores the simple-map-wrapper flag, so asking for
    /// it is always a configuration error.
    pub fn get_instance_simple_map(
        &self,
        version: CompatibilityVersion,
        simple_map_wrapper: bool,
    ) -> Result<Arc<DefaultAdapter>, AdapterError> {
        debug!(version = %version, simple_map_wrapper, "rejected simple-map-wrapper request");
        Err(AdapterError::rejected(
            "the default adapter is not affected by the simple_map_wrapper setting; use get_instance(version)",
        ))
    }

    /// Number of equivalence-class slots whose adapter is still alive.
    pub fn live_instances(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).strong_count() > 0)
            .count()
    }

    fn build(
        &self,
        normalized: CompatibilityVersion,
        settings: AdapterSettings,
    ) -> Result<Arc<DefaultAdapter>, AdapterError> {
        let introspector = self.shared_introspector(IntrospectionKey::new(normalized, &settings));
        DefaultAdapter::builder(normalized)
            .settings(settings)
            .bridges(self.bridges.clone())
            .introspector(introspector)
            .build()
    }

    fn shared_introspector(&self, key: IntrospectionKey) -> Arc<TypeIntrospector> {
        let mut introspectors = self.introspectors.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(introspector) = introspectors.get(&key).and_then(Weak::upgrade) {
            return introspector;
        }

        introspectors.retain(|_, introspector| introspector.strong_count() > 0);
        let introspector = Arc::new(TypeIntrospector::new(key));
        introspectors.insert(key, Arc::downgrade(&introspector));
        introspector
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("bridges", &self.bridges)
            .field("live_instances", &self.live_instances())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct AdapterRegistryBuilder {
    bridges: Bridges,
}

impl AdapterRegistryBuilder {
    /// Bridges and probes handed to every adapter the registry builds.
    pub fn bridges(mut self, bridges: Bridges) -> Self {
        self.bridges = bridges;
        self
    }

    pub fn build(self) -> AdapterRegistry {
        AdapterRegistry {
            bridges: self.bridges,
            slots: std::array::from_fn(|_| Mutex::new(Weak::new())),
            introspectors: Mutex::new(HashMap::new()),
        }
    }
}
