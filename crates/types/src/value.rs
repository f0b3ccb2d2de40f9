//! Interpretable values: the closed model consumed by an evaluator.

use std::{any::Any, fmt, sync::Arc};

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    native::{CursorIter, NativeCursor},
    number::Number,
    wrapper::{ObjectWrapper, WrapError},
};

/// Ordered key/value model; keys are unique as provided by the source.
pub type Mapping = IndexMap<String, Value>;

/// A wrapped value. Every adapter output is exactly one of these variants.
#[derive(Debug, Clone)]
pub enum Value {
    Scalar(String),
    Number(Number),
    /// Always one of [`BooleanModel::TRUE`] or [`BooleanModel::FALSE`].
    Boolean(&'static BooleanModel),
    Date(DateModel),
    Sequence(Sequence),
    Mapping(Mapping),
    /// Representation owned by a bridge or the structured-object fallback.
    Foreign(Arc<dyn ForeignModel>),
    Null,
}

impl Value {
    /// Canonical boolean model for `value`.
    pub fn boolean(value: bool) -> Self {
        Value::Boolean(BooleanModel::of(value))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
            Value::Foreign(_) => "foreign",
            Value::Null => "null",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(model) => Some(model.get()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Value::Sequence(sequence) => Some(sequence),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    pub fn as_foreign(&self) -> Option<&Arc<dyn ForeignModel>> {
        match self {
            Value::Foreign(model) => Some(model),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Scalar(left), Value::Scalar(right)) => left == right,
            (Value::Number(left), Value::Number(right)) => left == right,
            (Value::Boolean(left), Value::Boolean(right)) => left == right,
            (Value::Date(left), Value::Date(right)) => left == right,
            (Value::Sequence(left), Value::Sequence(right)) => left == right,
            (Value::Mapping(left), Value::Mapping(right)) => left == right,
            (Value::Foreign(left), Value::Foreign(right)) => Arc::ptr_eq(left, right),
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    /// Tagged rendering, e.g. `Sequence[Number(1), Scalar("a")]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(text) => write!(f, "Scalar({text:?})"),
            Value::Number(number) => write!(f, "Number({number})"),
            Value::Boolean(model) => write!(f, "Boolean({})", model.get()),
            Value::Date(date) => write!(f, "Date({:?}, {})", date.kind(), date.value()),
            Value::Sequence(Sequence::Materialized(items)) => {
                write!(f, "Sequence[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Sequence(Sequence::Lazy(lazy)) => write!(f, "Sequence<{:?}>", lazy.cursor()),
            Value::Mapping(mapping) => {
                write!(f, "Mapping{{")?;
                for (index, (key, item)) in mapping.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key:?}: {item}")?;
                }
                write!(f, "}}")
            }
            Value::Foreign(model) => write!(f, "Foreign({}: {model:?})", model.family()),
            Value::Null => write!(f, "Null"),
        }
    }
}

/// Canonical boolean model. Only the two statics exist.
#[derive(Debug, PartialEq, Eq)]
pub struct BooleanModel(bool);

static TRUE_MODEL: BooleanModel = BooleanModel(true);
static FALSE_MODEL: BooleanModel = BooleanModel(false);

impl BooleanModel {
    pub const TRUE: &'static BooleanModel = &TRUE_MODEL;
    pub const FALSE: &'static BooleanModel = &FALSE_MODEL;

    pub fn of(value: bool) -> &'static BooleanModel {
        if value { Self::TRUE } else { Self::FALSE }
    }

    pub fn get(&self) -> bool {
        self.0
    }
}

/// Date/time subkind carried by a [`DateModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateKind {
    Date,
    Time,
    #[serde(alias = "date_time")]
    DateTime,
    /// No subkind information was available.
    #[default]
    Unknown,
}

/// A wrapped temporal value.
///
/// Date-only values sit at midnight; time-only values sit on 1970-01-01.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateModel {
    value: NaiveDateTime,
    kind: DateKind,
}

impl DateModel {
    pub fn new(value: NaiveDateTime, kind: DateKind) -> Self {
        Self { value, kind }
    }

    pub fn value(&self) -> NaiveDateTime {
        self.value
    }

    pub fn kind(&self) -> DateKind {
        self.kind
    }

    /// ISO-8601 text restricted to the parts the subkind carries.
    pub fn to_iso_string(&self) -> String {
        match self.kind {
            DateKind::Date => self.value.date().to_string(),
            DateKind::Time => self.value.time().to_string(),
            DateKind::DateTime | DateKind::Unknown => self.value.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        }
    }
}

/// An ordered sequence of wrapped values.
#[derive(Debug, Clone)]
pub enum Sequence {
    Materialized(Vec<Value>),
    /// Cursor-backed and produced on demand; see [`LazySequence::iter`].
    Lazy(LazySequence),
}

impl Sequence {
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Sequence::Materialized(items) => Some(items),
            Sequence::Lazy(_) => None,
        }
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, Sequence::Lazy(_))
    }

    /// Lists the sequence. Materialized sequences can be listed any number of
    /// times; lazy ones follow their cursor's restart policy.
    pub fn to_vec(&self) -> Result<Vec<Value>, WrapError> {
        match self {
            Sequence::Materialized(items) => Ok(items.clone()),
            Sequence::Lazy(lazy) => lazy.iter()?.collect(),
        }
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Sequence::Materialized(left), Sequence::Materialized(right)) => left == right,
            (Sequence::Lazy(left), Sequence::Lazy(right)) => left.cursor.same_cursor(&right.cursor),
            _ => false,
        }
    }
}

/// Sequence produced from a forward-only cursor.
///
/// Elements are wrapped on the fly by the adapter that produced the sequence.
#[derive(Clone)]
pub struct LazySequence {
    cursor: NativeCursor,
    wrapper: Arc<dyn ObjectWrapper>,
}

impl LazySequence {
    pub fn new(cursor: NativeCursor, wrapper: Arc<dyn ObjectWrapper>) -> Self {
        Self { cursor, wrapper }
    }

    pub fn cursor(&self) -> &NativeCursor {
        &self.cursor
    }

    /// Starts a pass: re-opens a restartable cursor, fails with
    /// [`WrapError::CursorConsumed`] when a one-shot cursor was already listed.
    pub fn iter(&self) -> Result<LazyIter, WrapError> {
        let source = self.cursor.open().ok_or(WrapError::CursorConsumed)?;
        Ok(LazyIter {
            source,
            wrapper: Arc::clone(&self.wrapper),
        })
    }
}

impl fmt::Debug for LazySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySequence").field("cursor", &self.cursor).finish_non_exhaustive()
    }
}

/// One pass over a [`LazySequence`].
pub struct LazyIter {
    source: CursorIter,
    wrapper: Arc<dyn ObjectWrapper>,
}

impl Iterator for LazyIter {
    type Item = Result<Value, WrapError>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.source.next()?;
        Some(self.wrapper.wrap(item))
    }
}

/// Opaque value produced by a bridge (XML nodes, foreign-language objects) or
/// by the structured-object fallback.
pub trait ForeignModel: fmt::Debug + Send + Sync {
    /// Name of the object family, e.g. `"xml-node"`.
    fn family(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn boolean_models_are_canonical() {
        let first = Value::boolean(true);
        let second = Value::boolean(true);
        match (first, second) {
            (Value::Boolean(left), Value::Boolean(right)) => assert!(std::ptr::eq(left, right)),
            other => panic!("expected booleans, got {other:?}"),
        }
        assert!(std::ptr::eq(BooleanModel::of(false), BooleanModel::FALSE));
        assert_ne!(Value::boolean(true), Value::boolean(false));
    }

    #[test]
    fn date_model_renders_only_its_subkind() {
        let value = NaiveDate::from_ymd_opt(2024, 2, 29)
            .and_then(|date| date.and_hms_opt(13, 5, 0))
            .expect("valid timestamp");
        assert_eq!(DateModel::new(value, DateKind::Date).to_iso_string(), "2024-02-29");
        assert_eq!(DateModel::new(value, DateKind::Time).to_iso_string(), "13:05:00");
        assert_eq!(DateModel::new(value, DateKind::DateTime).to_iso_string(), "2024-02-29T13:05:00");
    }

    #[test]
    fn display_uses_tagged_notation() {
        let value = Value::Sequence(Sequence::Materialized(vec![
            Value::Sequence(Sequence::Materialized(vec![
                Value::Number(Number::Int(1)),
                Value::Number(Number::Int(2)),
            ])),
            Value::Sequence(Sequence::Materialized(vec![Value::Number(Number::Int(3))])),
        ]));
        assert_eq!(value.to_string(), "Sequence[Sequence[Number(1), Number(2)], Sequence[Number(3)]]");

        let mut mapping = Mapping::new();
        mapping.insert("b".to_string(), Value::Scalar("x".to_string()));
        mapping.insert("a".to_string(), Value::Null);
        assert_eq!(Value::Mapping(mapping).to_string(), r#"Mapping{"b": Scalar("x"), "a": Null}"#);
    }

    #[test]
    fn date_kind_deserializes_from_snake_case() {
        let kind: DateKind = serde_json::from_str("\"datetime\"").unwrap();
        assert_eq!(kind, DateKind::DateTime);
        let kind: DateKind = serde_json::from_str("\"date_time\"").unwrap();
        assert_eq!(kind, DateKind::DateTime);
        assert_eq!(DateKind::default(), DateKind::Unknown);
    }
}
