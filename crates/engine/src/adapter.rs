//! The default adapter: a total, ordered dispatch from native values to
//! interpretable values.

use std::{
    fmt,
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering, fence},
    },
};

use chrono::{NaiveDate, NaiveTime};
use modelwrap_types::{
    CompatibilityVersion, DateKind, DateModel, LazySequence, Mapping, NativeCursor, NativeValue, ObjectWrapper,
    Sequence, Temporal, Value, WrapError,
};
use tracing::debug;

use crate::{
    error::AdapterError,
    fallback::{IntrospectingFallback, IntrospectionKey, StructuredFallback, TypeIntrospector},
    resolver::{Bridges, UnknownTypeResolver},
    settings::AdapterSettings,
    version::{check_version, normalize},
};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Adapter instance. Always handed out behind an [`Arc`].
///
/// The dispatcher holds no mutable state of its own; the only cache it can
/// reach is the fallback's type introspector.
pub struct DefaultAdapter {
    version: CompatibilityVersion,
    settings: AdapterSettings,
    resolver: UnknownTypeResolver,
    introspector: Option<Arc<TypeIntrospector>>,
    instance_id: u64,
    this: Weak<DefaultAdapter>,
}

impl DefaultAdapter {
    /// Builds an unshared adapter with default settings and no bridges.
    pub fn new(version: CompatibilityVersion) -> Result<Arc<Self>, AdapterError> {
        Self::builder(version).build()
    }

    pub fn builder(version: CompatibilityVersion) -> DefaultAdapterBuilder {
        DefaultAdapterBuilder {
            version,
            settings: AdapterSettings::DEFAULT,
            bridges: Bridges::default(),
            fallback: None,
            introspector: None,
        }
    }

    /// Normalized compatibility version.
    pub fn compatibility_version(&self) -> CompatibilityVersion {
        self.version
    }

    pub fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    /// Process-unique id; a rebuilt adapter never reuses an earlier id.
    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    pub fn resolver(&self) -> &UnknownTypeResolver {
        &self.resolver
    }

    /// Introspector of the default fallback; `None` with a custom fallback.
    pub fn introspector(&self) -> Option<&Arc<TypeIntrospector>> {
        self.introspector.as_ref()
    }

    /// Publishes cache writes made on other threads to the caller.
    pub fn synchronize(&self) {
        fence(Ordering::SeqCst);
        self.resolver.fallback().synchronize();
    }

    pub fn wrap(&self, value: NativeValue) -> Result<Value, WrapError> {
        match value {
            NativeValue::Null => Ok(self.resolver.fallback().wrap_null()),
            NativeValue::Wrapped(value) => Ok(value),
            NativeValue::Text(text) => Ok(Value::Scalar(text)),
            NativeValue::Number(number) => Ok(Value::Number(number)),
            NativeValue::Temporal(temporal) => Ok(Value::Date(self.wrap_temporal(temporal))),
            NativeValue::Array(items) => self.wrap(NativeValue::Collection(items.into_vec())),
            NativeValue::Collection(items) => {
                let items = items.into_iter().map(|item| self.wrap(item)).collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Sequence(Sequence::Materialized(items)))
            }
            NativeValue::Mapping(entries) => {
                let mapping = entries
                    .into_iter()
                    .map(|(key, item)| Ok((key, self.wrap(item)?)))
                    .collect::<Result<Mapping, WrapError>>()?;
                Ok(Value::Mapping(mapping))
            }
            NativeValue::Boolean(flag) => Ok(Value::boolean(flag)),
            NativeValue::Cursor(cursor) => self.wrap_cursor(cursor),
            NativeValue::Object(object) => match object.into_builtin() {
                Ok(native) => self.wrap(native),
                Err(object) => self.resolver.resolve(object),
            },
        }
    }

    fn wrap_temporal(&self, temporal: Temporal) -> DateModel {
        match temporal {
            Temporal::Date(date) => DateModel::new(date.and_time(NaiveTime::MIN), DateKind::Date),
            Temporal::Time(time) => DateModel::new(NaiveDate::default().and_time(time), DateKind::Time),
            Temporal::DateTime(value) => DateModel::new(value, DateKind::DateTime),
            Temporal::Instant(instant) => DateModel::new(instant.naive_utc(), self.settings.default_date_kind()),
        }
    }

    fn wrap_cursor(&self, cursor: NativeCursor) -> Result<Value, WrapError> {
        let wrapper: Arc<dyn ObjectWrapper> = self.this.upgrade().ok_or(WrapError::WrapperReleased)?;
        Ok(Value::Sequence(Sequence::Lazy(LazySequence::new(cursor, wrapper))))
    }
}

impl ObjectWrapper for DefaultAdapter {
    fn wrap(&self, value: NativeValue) -> Result<Value, WrapError> {
        DefaultAdapter::wrap(self, value)
    }
}

impl fmt::Debug for DefaultAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultAdapter")
            .field("instance_id", &self.instance_id)
            .field("version", &self.version)
            .field("settings", &self.settings)
            .field("resolver", &self.resolver)
            .finish()
    }
}

/// Composition of a [`DefaultAdapter`].
pub struct DefaultAdapterBuilder {
    version: CompatibilityVersion,
    settings: AdapterSettings,
    bridges: Bridges,
    fallback: Option<Arc<dyn StructuredFallback>>,
    introspector: Option<Arc<TypeIntrospector>>,
}

impl DefaultAdapterBuilder {
    pub fn settings(mut self, settings: AdapterSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn bridges(mut self, bridges: Bridges) -> Self {
        self.bridges = bridges;
        self
    }

    /// Replaces the default introspecting fallback. Cannot be combined with
    /// [`introspector`](Self::introspector); `build` rejects the pair.
    pub fn fallback(mut self, fallback: Arc<dyn StructuredFallback>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Shares an existing introspector with the default fallback. Its key must
    /// match the normalized version and the settings of this builder.
    pub fn introspector(mut self, introspector: Arc<TypeIntrospector>) -> Self {
        self.introspector = Some(introspector);
        self
    }

    pub fn build(self) -> Result<Arc<DefaultAdapter>, AdapterError> {
        check_version(self.version)?;
        let version = normalize(self.version)?;
        let key = IntrospectionKey::new(version, &self.settings);

        let (fallback, introspector): (Arc<dyn StructuredFallback>, _) = match (self.fallback, self.introspector) {
            (Some(_), Some(_)) => {
                return Err(AdapterError::invariant(
                    "a custom fallback cannot be combined with a shared introspector",
                ));
            }
            (Some(fallback), None) => (fallback, None),
            (None, Some(introspector)) => {
                if introspector.key() != key {
                    return Err(AdapterError::invariant(format!(
                        "introspector built for {:?} cannot serve {:?}",
                        introspector.key(),
                        key
                    )));
                }
                (Arc::new(IntrospectingFallback::new(Arc::clone(&introspector))), Some(introspector))
            }
            (None, None) => {
                let introspector = Arc::new(TypeIntrospector::new(key));
                (Arc::new(IntrospectingFallback::new(Arc::clone(&introspector))), Some(introspector))
            }
        };

        let resolver = UnknownTypeResolver::new(&self.bridges, fallback);
        let instance_id = NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed);
        debug!(instance_id, version = %version, requested = %self.version, "built adapter");

        Ok(Arc::new_cyclic(|this| DefaultAdapter {
            version,
            settings: self.settings,
            resolver,
            introspector,
            instance_id,
            this: this.clone(),
        }))
    }
}
