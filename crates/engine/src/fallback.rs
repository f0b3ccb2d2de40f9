//! Structured-object fallback: the terminal rule of the unknown-type resolver.
//!
//! The fallback owns the only mutable state reachable from an adapter, a
//! per-type profile cache ([`TypeIntrospector`]). Introspectors are shared by
//! every adapter built with compatible introspection settings.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use modelwrap_types::{CompatibilityVersion, ForeignModel, NativeObject, Value, WrapError};
use tracing::debug;

use crate::{
    settings::{AdapterSettings, ExposureLevel},
    version::V2_3_21,
};

/// Wraps objects no other rule claimed. Implementations must be total over
/// arbitrary objects; they may still fail for a specific instance.
pub trait StructuredFallback: Send + Sync {
    fn wrap(&self, object: NativeObject) -> Result<Value, WrapError>;

    /// Representation of an absent value.
    fn wrap_null(&self) -> Value {
        Value::Null
    }

    /// Makes writes to internal caches visible to the calling thread.
    fn synchronize(&self) {}
}

/// Settings that influence introspection results. Adapters whose keys are
/// equal can share one [`TypeIntrospector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntrospectionKey {
    pub version: CompatibilityVersion,
    pub exposure_level: ExposureLevel,
    pub expose_fields: bool,
}

impl IntrospectionKey {
    /// `version` is expected to be normalized already.
    pub fn new(version: CompatibilityVersion, settings: &AdapterSettings) -> Self {
        Self {
            version,
            exposure_level: settings.exposure_level(),
            expose_fields: settings.expose_fields(),
        }
    }
}

/// What the fallback learned about one concrete type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeProfile {
    pub type_id: TypeId,
    pub type_name: &'static str,
    /// Simple name from 2.3.21 on, full path before.
    pub display_name: String,
    pub exposure_level: ExposureLevel,
    pub expose_fields: bool,
}

/// Shared cache of [`TypeProfile`]s keyed by concrete type.
pub struct TypeIntrospector {
    key: IntrospectionKey,
    profiles: RwLock<HashMap<TypeId, Arc<TypeProfile>>>,
}

impl TypeIntrospector {
    pub fn new(key: IntrospectionKey) -> Self {
        Self {
            key,
            profiles: RwLock::new(HashMap::new()),
        }
    }

    pub fn key(&self) -> IntrospectionKey {
        self.key
    }

    /// Returns the cached profile for the object's type, building it once.
    pub fn profile(&self, object: &NativeObject) -> Arc<TypeProfile> {
        let type_id = object.type_id();
        if let Some(profile) = self.profiles.read().unwrap_or_else(PoisonError::into_inner).get(&type_id) {
            return Arc::clone(profile);
        }

        let mut profiles = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
        let profile = profiles.entry(type_id).or_insert_with(|| {
            debug!(type_name = object.type_name(), version = %self.key.version, "introspected new type");
            Arc::new(self.build_profile(object))
        });
        Arc::clone(profile)
    }

    pub fn cached_types(&self) -> usize {
        self.profiles.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Lock round trip on the profile cache.
    pub fn synchronize(&self) {
        drop(self.profiles.write().unwrap_or_else(PoisonError::into_inner));
    }

    fn build_profile(&self, object: &NativeObject) -> TypeProfile {
        let type_name = object.type_name();
        let display_name = if self.key.version >= V2_3_21 {
            simple_type_name(type_name).to_string()
        } else {
            type_name.to_string()
        };
        TypeProfile {
            type_id: object.type_id(),
            type_name,
            display_name,
            exposure_level: self.key.exposure_level,
            expose_fields: self.key.expose_fields,
        }
    }
}

impl fmt::Debug for TypeIntrospector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeIntrospector")
            .field("key", &self.key)
            .field("cached_types", &self.cached_types())
            .finish()
    }
}

/// `my_crate::billing::Invoice<T>` -> `Invoice`.
fn simple_type_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

/// Foreign representation produced by [`IntrospectingFallback`].
#[derive(Debug)]
pub struct ObjectModel {
    object: NativeObject,
    profile: Arc<TypeProfile>,
}

impl ObjectModel {
    pub const FAMILY: &'static str = "object";

    pub fn object(&self) -> &NativeObject {
        &self.object
    }

    pub fn profile(&self) -> &TypeProfile {
        &self.profile
    }
}

impl ForeignModel for ObjectModel {
    fn family(&self) -> &str {
        Self::FAMILY
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Default fallback: wraps any object into an [`ObjectModel`] carrying its
/// cached type profile.
#[derive(Debug, Clone)]
pub struct IntrospectingFallback {
    introspector: Arc<TypeIntrospector>,
}

impl IntrospectingFallback {
    pub fn new(introspector: Arc<TypeIntrospector>) -> Self {
        Self { introspector }
    }

    pub fn introspector(&self) -> &Arc<TypeIntrospector> {
        &self.introspector
    }
}

impl StructuredFallback for IntrospectingFallback {
    fn wrap(&self, object: NativeObject) -> Result<Value, WrapError> {
        let profile = self.introspector.profile(&object);
        Ok(Value::Foreign(Arc::new(ObjectModel { object, profile })))
    }

    fn synchronize(&self) {
        self.introspector.synchronize();
    }
}
