use std::{
    any::Any,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use modelwrap_engine::{
    AdapterRegistry, Bridges, DefaultAdapter, ForeignBridge, NodeBridge, ObjectModel, TypeDescriptor, TypeProbe,
    TypedProbe, version::V2_3_21,
};
use modelwrap_types::{ForeignModel, NativeObject, NativeValue, Value, WrapError};

#[derive(Debug)]
struct XmlElement {
    tag: String,
}

#[derive(Debug)]
struct NodeModel {
    tag: String,
}

impl ForeignModel for NodeModel {
    fn family(&self) -> &str {
        "xml-node"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct XmlBridge;

impl NodeBridge for XmlBridge {
    fn node_type(&self) -> Option<TypeDescriptor> {
        Some(TypeDescriptor::of::<XmlElement>())
    }

    fn wrap_node(&self, object: NativeObject) -> Result<Value, WrapError> {
        let element = object
            .downcast_ref::<XmlElement>()
            .ok_or_else(|| WrapError::unwrappable(object.type_name(), "not an element"))?;
        Ok(Value::Foreign(Arc::new(NodeModel { tag: element.tag.clone() })))
    }
}

struct ScriptObject {
    id: u32,
}

struct ScriptBridge;

impl ForeignBridge for ScriptBridge {
    fn name(&self) -> &str {
        "script"
    }

    fn is_foreign_object(&self, object: &NativeObject) -> bool {
        object.is::<ScriptObject>()
    }

    fn wrap(&self, object: NativeObject) -> Result<Value, WrapError> {
        let script = object
            .downcast_ref::<ScriptObject>()
            .ok_or_else(|| WrapError::unwrappable(object.type_name(), "not a script object"))?;
        if script.id == 0 {
            return Err(WrapError::unwrappable(object.type_name(), "object was collected by its runtime"));
        }
        Ok(Value::Scalar(format!("script#{}", script.id)))
    }
}

struct Money {
    cents: i64,
}

fn money_probe() -> Arc<dyn TypeProbe> {
    Arc::new(TypedProbe::new("money", |money: &Money| {
        Ok(Value::Scalar(format!("{}.{:02}", money.cents / 100, money.cents % 100)))
    }))
}

#[test]
fn registered_probe_claims_its_type_before_the_fallback() {
    let without = DefaultAdapter::new(V2_3_21).expect("adapter");
    let value = without.wrap(NativeValue::object(Money { cents: 1999 })).expect("wrap");
    assert!(value.as_foreign().and_then(|model| model.as_any().downcast_ref::<ObjectModel>()).is_some());

    let with = DefaultAdapter::builder(V2_3_21)
        .bridges(Bridges::new().with_probe(money_probe()))
        .build()
        .expect("adapter");
    let value = with.wrap(NativeValue::object(Money { cents: 1999 })).expect("wrap");
    assert_eq!(value.as_str(), Some("19.99"));
}

#[test]
fn probes_never_see_builtin_categories() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let text_probe = TypedProbe::new("text", move |_: &String| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Null)
    });
    let adapter = DefaultAdapter::builder(V2_3_21)
        .bridges(Bridges::new().with_probe(Arc::new(text_probe)))
        .build()
        .expect("adapter");

    let value = adapter.wrap(NativeValue::object(String::from("plain"))).expect("wrap");
    assert_eq!(value.as_str(), Some("plain"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn registry_hands_its_bridges_to_every_adapter() {
    let registry = AdapterRegistry::builder()
        .bridges(
            Bridges::new()
                .with_node_bridge(Arc::new(XmlBridge))
                .with_foreign_bridge(Arc::new(ScriptBridge))
                .with_probe(money_probe()),
        )
        .build();
    let adapter = registry.get_instance(V2_3_21).expect("adapter");
    assert_eq!(adapter.resolver().probe_names(), ["xml-node", "script", "money"]);

    let node = adapter
        .wrap(NativeValue::object(XmlElement { tag: "title".to_string() }))
        .expect("wrap");
    let model = node.as_foreign().expect("foreign");
    assert_eq!(model.family(), "xml-node");
    assert_eq!(model.as_any().downcast_ref::<NodeModel>().map(|node| node.tag.as_str()), Some("title"));

    let script = adapter.wrap(NativeValue::object(ScriptObject { id: 12 })).expect("wrap");
    assert_eq!(script.as_str(), Some("script#12"));
}

#[test]
fn bridge_failures_propagate_unchanged() {
    let adapter = DefaultAdapter::builder(V2_3_21)
        .bridges(Bridges::new().with_foreign_bridge(Arc::new(ScriptBridge)))
        .build()
        .expect("adapter");

    let error = adapter
        .wrap(NativeValue::from(vec![NativeValue::object(ScriptObject { id: 0 })]))
        .unwrap_err();
    assert_eq!(
        error,
        WrapError::unwrappable(std::any::type_name::<ScriptObject>(), "object was collected by its runtime")
    );
}
