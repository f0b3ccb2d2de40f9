use thiserror::Error;

use crate::{native::NativeValue, value::Value};

/// Anything that can turn a native value into an interpretable one.
///
/// Adapters implement this; lazy sequences use it to wrap their elements.
pub trait ObjectWrapper: Send + Sync {
    fn wrap(&self, value: NativeValue) -> Result<Value, WrapError>;
}

/// Data-class failure raised while wrapping a specific value.
///
/// Collaborator failures pass through the adapter unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WrapError {
    #[error("cannot wrap object of type {type_name}: {reason}")]
    Unwrappable { type_name: String, reason: String },

    #[error("cursor was already consumed; a one-shot iterator can only be listed once")]
    CursorConsumed,

    #[error("the adapter that produced this value has been released")]
    WrapperReleased,
}

impl WrapError {
    pub fn unwrappable(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        WrapError::Unwrappable {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}
