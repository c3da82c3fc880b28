use thiserror::Error;

use crate::mask::MAX_COMPONENT_TYPES;

/// Errors raised by the entity-component store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EcsError {
    #[error("cannot register component `{0}`: limit of {MAX_COMPONENT_TYPES} component types reached")]
    TooManyComponents(&'static str),
}
