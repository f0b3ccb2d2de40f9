//! Bridging between `serde_json` documents and the value model.

use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};

use crate::{
    native::NativeValue,
    number::Number,
    value::{DateKind, Value},
    wrapper::WrapError,
};

impl From<JsonValue> for NativeValue {
    /// JSON arrays become fixed-size arrays and objects become mappings in
    /// document order. Strings stay text; date detection is left to callers.
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => NativeValue::Null,
            JsonValue::Bool(flag) => NativeValue::Boolean(flag),
            JsonValue::Number(number) => NativeValue::Number(number_from_json(&number)),
            JsonValue::String(text) => NativeValue::Text(text),
            JsonValue::Array(items) => NativeValue::array(items),
            JsonValue::Object(entries) => NativeValue::mapping(entries),
        }
    }
}

fn number_from_json(number: &JsonNumber) -> Number {
    if let Some(value) = number.as_i64() {
        Number::Int(value)
    } else if let Some(value) = number.as_u64() {
        Number::UInt(value)
    } else {
        Number::Float(number.as_f64().unwrap_or(f64::NAN))
    }
}

impl Value {
    /// Renders the value as JSON.
    ///
    /// Lazy sequences are listed, so a one-shot cursor is consumed by this call.
    /// Foreign values render as `{"$foreign": family, "debug": ...}`.
    pub fn to_json(&self) -> Result<JsonValue, WrapError> {
        Ok(match self {
            Value::Scalar(text) => JsonValue::String(text.clone()),
            Value::Number(number) => number_to_json(*number),
            Value::Boolean(model) => JsonValue::Bool(model.get()),
            Value::Date(date) => {
                let mut entries = JsonMap::new();
                entries.insert("$date".to_string(), JsonValue::String(date.to_iso_string()));
                entries.insert("kind".to_string(), JsonValue::String(date_kind_label(date.kind()).to_string()));
                JsonValue::Object(entries)
            }
            Value::Sequence(sequence) => {
                JsonValue::Array(sequence.to_vec()?.iter().map(Value::to_json).collect::<Result<_, _>>()?)
            }
            Value::Mapping(mapping) => {
                let mut entries = JsonMap::new();
                for (key, item) in mapping {
                    entries.insert(key.clone(), item.to_json()?);
                }
                JsonValue::Object(entries)
            }
            Value::Foreign(model) => {
                let mut entries = JsonMap::new();
                entries.insert("$foreign".to_string(), JsonValue::String(model.family().to_string()));
                entries.insert("debug".to_string(), JsonValue::String(format!("{model:?}")));
                JsonValue::Object(entries)
            }
            Value::Null => JsonValue::Null,
        })
    }
}

fn number_to_json(number: Number) -> JsonValue {
    match number {
        Number::Int(value) => JsonValue::from(value),
        Number::UInt(value) => JsonValue::from(value),
        Number::Float(value) => JsonNumber::from_f64(value).map_or(JsonValue::Null, JsonValue::Number),
    }
}

fn date_kind_label(kind: DateKind) -> &'static str {
    match kind {
        DateKind::Date => "date",
        DateKind::Time => "time",
        DateKind::DateTime => "datetime",
        DateKind::Unknown => "unknown",
    }
}
