//! Host-side values handed to an adapter before wrapping.
//!
//! The built-in categories are a closed enum so the dispatcher can match them
//! exhaustively. Everything else travels as a [`NativeObject`], a type-erased
//! shared host object that supports type-membership tests and downcasts.

use std::{
    any::{Any, TypeId},
    collections::{BTreeMap, HashMap},
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use indexmap::IndexMap;

use crate::{number::Number, value::Value};

/// A native value prior to adaptation.
#[derive(Debug, Clone)]
pub enum NativeValue {
    /// Absent value; wrapped by the adapter's null policy.
    Null,
    /// A value that has already been wrapped.
    Wrapped(Value),
    Text(String),
    Number(Number),
    Temporal(Temporal),
    /// Fixed-size array. Normalized into an ordered list before wrapping.
    Array(Box<[NativeValue]>),
    /// List or set, in the iteration order of the source.
    Collection(Vec<NativeValue>),
    /// Key/value mapping in insertion order.
    Mapping(IndexMap<String, NativeValue>),
    Boolean(bool),
    /// Forward-only iterator.
    Cursor(NativeCursor),
    /// Any other host object.
    Object(NativeObject),
}

impl NativeValue {
    /// Builds a fixed-size array value.
    pub fn array<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NativeValue>,
    {
        NativeValue::Array(items.into_iter().map(Into::into).collect())
    }

    /// Builds an ordered mapping from `(key, value)` pairs.
    pub fn mapping<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<NativeValue>,
    {
        NativeValue::Mapping(entries.into_iter().map(|(key, value)| (key.into(), value.into())).collect())
    }

    /// Wraps an arbitrary host object.
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        NativeValue::Object(NativeObject::new(value))
    }

    /// Short category label, used in logs and error messages.
    pub fn category(&self) -> &'static str {
        match self {
            NativeValue::Null => "null",
            NativeValue::Wrapped(_) => "wrapped",
            NativeValue::Text(_) => "text",
            NativeValue::Number(_) => "number",
            NativeValue::Temporal(_) => "temporal",
            NativeValue::Array(_) => "array",
            NativeValue::Collection(_) => "collection",
            NativeValue::Mapping(_) => "mapping",
            NativeValue::Boolean(_) => "boolean",
            NativeValue::Cursor(_) => "cursor",
            NativeValue::Object(_) => "object",
        }
    }
}

/// Temporal inputs, from most to least specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temporal {
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    /// A point in time that carries no date/time subkind information.
    Instant(DateTime<Utc>),
}

/// Type-erased, shared host object.
#[derive(Clone)]
pub struct NativeObject {
    inner: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

impl NativeObject {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Concrete type of the wrapped object (not of the `Arc` holding it).
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type-membership test.
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Recovers the typed handle, or returns the object untouched.
    pub fn downcast<T: Any + Send + Sync>(self) -> Result<Arc<T>, NativeObject> {
        let Self { inner, type_id, type_name } = self;
        inner.downcast::<T>().map_err(|inner| Self { inner, type_id, type_name })
    }

    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self.inner.as_ref()
    }

    /// Identity comparison.
    pub fn same_object(&self, other: &NativeObject) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Re-expresses objects whose concrete type is one of the built-in native
    /// categories as the matching [`NativeValue`]. Any other object is handed
    /// back unchanged.
    pub fn into_builtin(self) -> Result<NativeValue, NativeObject> {
        macro_rules! classify {
            ($object:ident; $($ty:ty),* $(,)?) => {
                $(if let Some(value) = $object.downcast_ref::<$ty>() {
                    return Ok(NativeValue::from(value.clone()));
                })*
            };
        }

        let object = &self;
        classify!(
            object;
            NativeValue,
            Value,
            String,
            &'static str,
            Number,
            i8,
            i16,
            i32,
            i64,
            i128,
            isize,
            u8,
            u16,
            u32,
            u64,
            u128,
            usize,
            f32,
            f64,
            Temporal,
            NaiveDate,
            NaiveTime,
            NaiveDateTime,
            DateTime<Utc>,
            Vec<NativeValue>,
            Box<[NativeValue]>,
            IndexMap<String, NativeValue>,
            HashMap<String, NativeValue>,
            BTreeMap<String, NativeValue>,
            bool,
            NativeCursor,
        );
        Err(self)
    }
}

impl fmt::Debug for NativeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeObject({})", self.type_name)
    }
}

/// Boxed item stream produced by a [`NativeCursor`].
pub type CursorIter = Box<dyn Iterator<Item = NativeValue> + Send>;

enum CursorSource {
    Restartable(Box<dyn Fn() -> CursorIter + Send + Sync>),
    OneShot(Mutex<Option<CursorIter>>),
}

/// A forward-only iterator over native values.
///
/// A one-shot cursor yields its items to the first caller of
/// [`NativeCursor::open`] only. A restartable cursor re-invokes its factory on
/// every call.
#[derive(Clone)]
pub struct NativeCursor {
    source: Arc<CursorSource>,
}

impl NativeCursor {
    pub fn once<I>(items: I) -> Self
    where
        I: IntoIterator<Item = NativeValue>,
        I::IntoIter: Send + 'static,
    {
        let iter: CursorIter = Box::new(items.into_iter());
        Self {
            source: Arc::new(CursorSource::OneShot(Mutex::new(Some(iter)))),
        }
    }

    pub fn restartable<F, I>(factory: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: IntoIterator<Item = NativeValue>,
        I::IntoIter: Send + 'static,
    {
        let factory = move || -> CursorIter { Box::new(factory().into_iter()) };
        Self {
            source: Arc::new(CursorSource::Restartable(Box::new(factory))),
        }
    }

    pub fn is_restartable(&self) -> bool {
        matches!(*self.source, CursorSource::Restartable(_))
    }

    /// Starts a pass over the cursor; `None` once a one-shot cursor was taken.
    pub fn open(&self) -> Option<CursorIter> {
        match &*self.source {
            CursorSource::Restartable(factory) => Some(factory()),
            CursorSource::OneShot(slot) => slot.lock().unwrap_or_else(PoisonError::into_inner).take(),
        }
    }

    pub fn same_cursor(&self, other: &NativeCursor) -> bool {
        Arc::ptr_eq(&self.source, &other.source)
    }
}

impl fmt::Debug for NativeCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_restartable() { "restartable" } else { "one-shot" };
        write!(f, "NativeCursor({kind})")
    }
}

impl From<Value> for NativeValue {
    fn from(value: Value) -> Self {
        NativeValue::Wrapped(value)
    }
}

impl From<String> for NativeValue {
    fn from(value: String) -> Self {
        NativeValue::Text(value)
    }
}

impl From<&str> for NativeValue {
    fn from(value: &str) -> Self {
        NativeValue::Text(value.to_string())
    }
}

impl From<bool> for NativeValue {
    fn from(value: bool) -> Self {
        NativeValue::Boolean(value)
    }
}

impl From<Number> for NativeValue {
    fn from(value: Number) -> Self {
        NativeValue::Number(value)
    }
}

macro_rules! native_from_number {
    ($($source:ty),*) => {
        $(impl From<$source> for NativeValue {
            fn from(value: $source) -> Self {
                NativeValue::Number(Number::from(value))
            }
        })*
    };
}

native_from_number!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl From<Temporal> for NativeValue {
    fn from(value: Temporal) -> Self {
        NativeValue::Temporal(value)
    }
}

impl From<NaiveDate> for NativeValue {
    fn from(value: NaiveDate) -> Self {
        NativeValue::Temporal(Temporal::Date(value))
    }
}

impl From<NaiveTime> for NativeValue {
    fn from(value: NaiveTime) -> Self {
        NativeValue::Temporal(Temporal::Time(value))
    }
}

impl From<NaiveDateTime> for NativeValue {
    fn from(value: NaiveDateTime) -> Self {
        NativeValue::Temporal(Temporal::DateTime(value))
    }
}

impl From<DateTime<Utc>> for NativeValue {
    fn from(value: DateTime<Utc>) -> Self {
        NativeValue::Temporal(Temporal::Instant(value))
    }
}

impl<T: Into<NativeValue>> From<Vec<T>> for NativeValue {
    fn from(items: Vec<T>) -> Self {
        NativeValue::Collection(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<NativeValue>, const N: usize> From<[T; N]> for NativeValue {
    fn from(items: [T; N]) -> Self {
        NativeValue::array(items)
    }
}

impl<T: Into<NativeValue>> From<IndexMap<String, T>> for NativeValue {
    fn from(entries: IndexMap<String, T>) -> Self {
        NativeValue::mapping(entries)
    }
}

/// Iteration order of the map becomes the mapping order.
impl<T: Into<NativeValue>> From<HashMap<String, T>> for NativeValue {
    fn from(entries: HashMap<String, T>) -> Self {
        NativeValue::mapping(entries)
    }
}

impl<T: Into<NativeValue>> From<BTreeMap<String, T>> for NativeValue {
    fn from(entries: BTreeMap<String, T>) -> Self {
        NativeValue::mapping(entries)
    }
}

impl From<Box<[NativeValue]>> for NativeValue {
    fn from(items: Box<[NativeValue]>) -> Self {
        NativeValue::Array(items)
    }
}

impl<T: Into<NativeValue>> From<Option<T>> for NativeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(NativeValue::Null, Into::into)
    }
}

impl From<NativeCursor> for NativeValue {
    fn from(value: NativeCursor) -> Self {
        NativeValue::Cursor(value)
    }
}

impl From<NativeObject> for NativeValue {
    fn from(value: NativeObject) -> Self {
        NativeValue::Object(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Invoice {
        number: u32,
    }

    #[test]
    fn type_membership_uses_the_concrete_type() {
        let object = NativeObject::new(Invoice { number: 7 });
        assert!(object.is::<Invoice>());
        assert!(!object.is::<String>());
        assert_eq!(object.downcast_ref::<Invoice>().map(|invoice| invoice.number), Some(7));
        assert!(object.type_name().ends_with("Invoice"));
    }

    #[test]
    fn downcast_returns_the_object_on_mismatch() {
        let object = NativeObject::new(Invoice { number: 1 });
        let object = object.downcast::<String>().unwrap_err();
        let invoice = object.downcast::<Invoice>().expect("invoice");
        assert_eq!(invoice.number, 1);
    }

    #[test]
    fn builtin_objects_are_reclassified() {
        let text = NativeObject::new(String::from("hello")).into_builtin().expect("builtin");
        assert!(matches!(text, NativeValue::Text(ref value) if value == "hello"));

        let flag = NativeObject::new(true).into_builtin().expect("builtin");
        assert!(matches!(flag, NativeValue::Boolean(true)));

        let list = NativeObject::new(vec![NativeValue::from(1), NativeValue::from(2)])
            .into_builtin()
            .expect("builtin");
        assert!(matches!(list, NativeValue::Collection(ref items) if items.len() == 2));

        assert!(NativeObject::new(Invoice { number: 3 }).into_builtin().is_err());
    }

    #[test]
    fn every_builtin_category_is_reclassified_from_an_object() {
        let size = NativeObject::new(5usize).into_builtin().expect("builtin");
        assert!(matches!(size, NativeValue::Number(Number::UInt(5))));

        let wide = NativeObject::new(-7i128).into_builtin().expect("builtin");
        assert!(matches!(wide, NativeValue::Number(Number::Int(-7))));

        let number = NativeObject::new(Number::Int(3)).into_builtin().expect("builtin");
        assert!(matches!(number, NativeValue::Number(Number::Int(3))));

        let mut entries = HashMap::new();
        entries.insert("k".to_string(), NativeValue::from(1));
        let map = NativeObject::new(entries).into_builtin().expect("builtin");
        assert!(matches!(map, NativeValue::Mapping(ref entries) if entries.len() == 1));

        let sorted = NativeObject::new(BTreeMap::from([("a".to_string(), NativeValue::Null)]))
            .into_builtin()
            .expect("builtin");
        assert!(matches!(sorted, NativeValue::Mapping(_)));

        let items: Box<[NativeValue]> = vec![NativeValue::from(1)].into_boxed_slice();
        assert!(matches!(NativeObject::new(items).into_builtin(), Ok(NativeValue::Array(_))));

        let date = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
        let temporal = NativeObject::new(Temporal::Date(date)).into_builtin().expect("builtin");
        assert!(matches!(temporal, NativeValue::Temporal(Temporal::Date(_))));

        let cursor = NativeObject::new(NativeCursor::once(Vec::new())).into_builtin().expect("builtin");
        assert_eq!(cursor.category(), "cursor");

        let native = NativeObject::new(NativeValue::from("x")).into_builtin().expect("builtin");
        assert!(matches!(native, NativeValue::Text(ref text) if text == "x"));
    }

    #[test]
    fn one_shot_cursor_yields_once() {
        let cursor = NativeCursor::once(vec![NativeValue::from(1), NativeValue::from(2)]);
        assert!(!cursor.is_restartable());
        assert_eq!(cursor.open().map(|iter| iter.count()), Some(2));
        assert!(cursor.open().is_none());
    }

    #[test]
    fn restartable_cursor_reopens() {
        let cursor = NativeCursor::restartable(|| (0..3).map(NativeValue::from));
        assert!(cursor.is_restartable());
        assert_eq!(cursor.open().map(|iter| iter.count()), Some(3));
        assert_eq!(cursor.open().map(|iter| iter.count()), Some(3));
    }

    #[test]
    fn option_and_array_conversions() {
        assert!(matches!(NativeValue::from(None::<i32>), NativeValue::Null));
        assert!(matches!(NativeValue::from([1, 2, 3]), NativeValue::Array(ref items) if items.len() == 3));
        assert_eq!(NativeValue::from(vec!["a", "b"]).category(), "collection");
    }
}
