//! Adapter engine: turns native values into interpretable values.
//!
//! The pieces, leaves first:
//! - [`version`]: validation and normalization of compatibility versions.
//! - [`settings`]: the immutable [`AdapterSettings`] bundle and settings files.
//! - [`fallback`]: the structured-object fallback and its shared type cache.
//! - [`resolver`]: bridges and probes for types no built-in rule claims.
//! - [`adapter`]: [`DefaultAdapter`], the ordered dispatch chain.
//! - [`registry`]: [`AdapterRegistry`], the weak instance cache.
//!
//! Most callers only need [`get_instance`]:
//!
//! ```no_run
//! use modelwrap_engine::{CURRENT_VERSION, get_instance};
//! use modelwrap_types::NativeValue;
//!
//! let adapter = get_instance(CURRENT_VERSION)?;
//! let value = adapter.wrap(NativeValue::from(vec![1, 2, 3]))?;
//! println!("{value}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod adapter;
pub mod error;
pub mod fallback;
pub mod registry;
pub mod resolver;
pub mod settings;
pub mod version;

use std::sync::Arc;

pub use adapter::{DefaultAdapter, DefaultAdapterBuilder};
pub use error::{AdapterError, SettingsError};
pub use fallback::{IntrospectingFallback, IntrospectionKey, ObjectModel, StructuredFallback, TypeIntrospector, TypeProfile};
pub use modelwrap_types::CompatibilityVersion;
pub use registry::{AdapterRegistry, AdapterRegistryBuilder};
pub use resolver::{Bridges, ForeignBridge, NodeBridge, TypeDescriptor, TypeProbe, TypedProbe, UnknownTypeResolver};
pub use settings::{AdapterSettings, ExposureLevel, default_settings_path};
pub use version::{CURRENT_VERSION, normalize};

/// Default-settings adapter from the process-wide registry.
pub fn get_instance(version: CompatibilityVersion) -> Result<Arc<DefaultAdapter>, AdapterError> {
    AdapterRegistry::global().get_instance(version)
}

/// Adapter for `(version, settings)` from the process-wide registry.
pub fn get_instance_with(
    version: CompatibilityVersion,
    settings: AdapterSettings,
) -> Result<Arc<DefaultAdapter>, AdapterError> {
    AdapterRegistry::global().get_instance_with(version, settings)
}

/// Always fails; see [`AdapterRegistry::get_instance_simple_map`].
pub fn get_instance_simple_map(
    version: CompatibilityVersion,
    simple_map_wrapper: bool,
) -> Result<Arc<DefaultAdapter>, AdapterError> {
    AdapterRegistry::global().get_instance_simple_map(version, simple_map_wrapper)
}
