use thiserror::Error;

use crate::{Change, Key, ObjectId, ObserverId};

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Empty key, or an observed object that no longer exists
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The observed object declared its keys and this is not one of them
    #[error("{object} has no observable key '{key}'")]
    UnknownKey { object: ObjectId, key: Key },

    /// An observer panicked while handling a change and the registry is configured to propagate
    #[error("observer fault: {0}")]
    CallbackFault(Fault),
}

/// A panic caught while dispatching a change to one observer
#[derive(Debug, Clone, Error)]
#[error("{observer} panicked on {change}: {message}")]
pub struct Fault {
    pub observer: ObserverId,
    pub change: Change,
    pub message: String,
}

impl Fault {
    pub(crate) fn from_panic(observer: ObserverId, change: &Change, payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "<non-string panic payload>".to_string()
        };
        Self { observer, change: change.clone(), message }
    }
}
