//! Shared value model for the modelwrap crates.
//!
//! Two families of values live here:
//! - [`NativeValue`]: what the host hands to an adapter (text, numbers, chrono
//!   temporals, arrays, collections, mappings, cursors and opaque host objects).
//! - [`Value`]: the closed set of interpretable values an evaluator consumes.
//!
//! The conversion between them is owned by `modelwrap-engine`; this crate only
//! defines the shapes and the [`ObjectWrapper`] seam.

pub mod json;
pub mod native;
pub mod number;
pub mod value;
pub mod version;
pub mod wrapper;

pub use native::{NativeCursor, NativeObject, NativeValue, Temporal};
pub use number::Number;
pub use value::{BooleanModel, DateKind, DateModel, ForeignModel, LazySequence, Mapping, Sequence, Value};
pub use version::{CompatibilityVersion, ParseVersionError};
pub use wrapper::{ObjectWrapper, WrapError};
