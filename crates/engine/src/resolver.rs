//! Unknown-type resolver: the open end of the dispatch chain.
//!
//! Objects that match no built-in rule are offered, in order, to:
//! 1. the markup-node bridge, when one is registered and its node type resolves;
//! 2. the foreign-object bridge, when one is registered;
//! 3. additional [`TypeProbe`]s, in registration order;
//! 4. the [`StructuredFallback`], which always answers.
//!
//! New object families are supported by registering probes. The built-in rules
//! in the adapter are never touched.

use std::{
    any::{Any, TypeId},
    fmt,
    marker::PhantomData,
    sync::Arc,
};

use modelwrap_types::{NativeObject, Value, WrapError};
use tracing::{debug, trace};

use crate::fallback::StructuredFallback;

/// Identity of an external type, resolved once at composition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeDescriptor {
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type-membership test.
    pub fn matches(&self, object: &NativeObject) -> bool {
        object.type_id() == self.type_id
    }
}

/// Bridge to a markup/XML node model.
pub trait NodeBridge: Send + Sync {
    /// Descriptor of the node type; `None` when the markup library is not part
    /// of this deployment, in which case the bridge is skipped.
    fn node_type(&self) -> Option<TypeDescriptor>;

    fn is_node(&self, object: &NativeObject) -> bool {
        self.node_type().is_some_and(|descriptor| descriptor.matches(object))
    }

    fn wrap_node(&self, object: NativeObject) -> Result<Value, WrapError>;
}

/// Bridge to objects owned by a foreign-language runtime.
pub trait ForeignBridge: Send + Sync {
    fn name(&self) -> &str;

    fn is_foreign_object(&self, object: &NativeObject) -> bool;

    fn wrap(&self, object: NativeObject) -> Result<Value, WrapError>;
}

/// Capability-gated handler for an additional object family.
pub trait TypeProbe: Send + Sync {
    fn name(&self) -> &str;

    fn accepts(&self, object: &NativeObject) -> bool;

    fn wrap(&self, object: NativeObject) -> Result<Value, WrapError>;
}

/// Probe claiming exactly one concrete type `T`.
pub struct TypedProbe<T, F> {
    name: String,
    wrap: F,
    _type: PhantomData<fn() -> T>,
}

impl<T, F> TypedProbe<T, F>
where
    T: Any + Send + Sync,
    F: Fn(&T) -> Result<Value, WrapError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, wrap: F) -> Self {
        Self {
            name: name.into(),
            wrap,
            _type: PhantomData,
        }
    }
}

impl<T, F> TypeProbe for TypedProbe<T, F>
where
    T: Any + Send + Sync,
    F: Fn(&T) -> Result<Value, WrapError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self, object: &NativeObject) -> bool {
        object.is::<T>()
    }

    fn wrap(&self, object: NativeObject) -> Result<Value, WrapError> {
        match object.downcast_ref::<T>() {
            Some(typed) => (self.wrap)(typed),
            None => Err(WrapError::unwrappable(object.type_name(), format!("probe '{}' cannot handle this type", self.name))),
        }
    }
}

struct NodeProbe(Arc<dyn NodeBridge>);

impl TypeProbe for NodeProbe {
    fn name(&self) -> &str {
        "xml-node"
    }

    fn accepts(&self, object: &NativeObject) -> bool {
        self.0.is_node(object)
    }

    fn wrap(&self, object: NativeObject) -> Result<Value, WrapError> {
        self.0.wrap_node(object)
    }
}

struct ForeignProbe(Arc<dyn ForeignBridge>);

impl TypeProbe for ForeignProbe {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn accepts(&self, object: &NativeObject) -> bool {
        self.0.is_foreign_object(object)
    }

    fn wrap(&self, object: NativeObject) -> Result<Value, WrapError> {
        self.0.wrap(object)
    }
}

/// Optional bridges and extra probes, registered by a composition root.
#[derive(Clone, Default)]
pub struct Bridges {
    node: Option<Arc<dyn NodeBridge>>,
    foreign: Option<Arc<dyn ForeignBridge>>,
    probes: Vec<Arc<dyn TypeProbe>>,
}

impl Bridges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node_bridge(mut self, bridge: Arc<dyn NodeBridge>) -> Self {
        self.node = Some(bridge);
        self
    }

    pub fn with_foreign_bridge(mut self, bridge: Arc<dyn ForeignBridge>) -> Self {
        self.foreign = Some(bridge);
        self
    }

    /// Appends a probe. Probes run after the bridges and before the fallback.
    pub fn with_probe(mut self, probe: Arc<dyn TypeProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.node.is_none() && self.foreign.is_none() && self.probes.is_empty()
    }
}

impl fmt::Debug for Bridges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridges")
            .field("node", &self.node.as_ref().and_then(|bridge| bridge.node_type()))
            .field("foreign", &self.foreign.as_ref().map(|bridge| bridge.name().to_string()))
            .field("probes", &self.probes.iter().map(|probe| probe.name().to_string()).collect::<Vec<_>>())
            .finish()
    }
}

/// Ordered probe chain terminated by a structured-object fallback.
pub struct UnknownTypeResolver {
    probes: Vec<Arc<dyn TypeProbe>>,
    fallback: Arc<dyn StructuredFallback>,
}

impl UnknownTypeResolver {
    pub fn new(bridges: &Bridges, fallback: Arc<dyn StructuredFallback>) -> Self {
        let mut probes: Vec<Arc<dyn TypeProbe>> = Vec::with_capacity(bridges.probes.len() + 2);

        match &bridges.node {
            Some(bridge) if bridge.node_type().is_some() => probes.push(Arc::new(NodeProbe(Arc::clone(bridge)))),
            Some(_) => debug!("markup node type not available; node bridge skipped"),
            None => {}
        }
        if let Some(bridge) = &bridges.foreign {
            probes.push(Arc::new(ForeignProbe(Arc::clone(bridge))));
        }
        probes.extend(bridges.probes.iter().cloned());

        Self { probes, fallback }
    }

    /// Probe names in evaluation order, fallback excluded.
    pub fn probe_names(&self) -> Vec<&str> {
        self.probes.iter().map(|probe| probe.name()).collect()
    }

    pub fn fallback(&self) -> &Arc<dyn StructuredFallback> {
        &self.fallback
    }

    pub fn resolve(&self, object: NativeObject) -> Result<Value, WrapError> {
        for probe in &self.probes {
            if probe.accepts(&object) {
                trace!(probe = probe.name(), type_name = object.type_name(), "unknown type claimed by probe");
                return probe.wrap(object);
            }
        }
        trace!(type_name = object.type_name(), "unknown type handed to structured fallback");
        self.fallback.wrap(object)
    }
}

impl fmt::Debug for UnknownTypeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnknownTypeResolver")
            .field("probes", &self.probe_names())
            .finish_non_exhaustive()
    }
}
