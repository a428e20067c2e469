use stompconf_schema::{EngineError, SchemaError};

/// All errors raised while building device grammars or converting files.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The device schema tree itself is inconsistent.
    #[error("device schema is invalid: {0}")]
    Schema(#[from] SchemaError),

    /// A parse or generate run was aborted; carries the offending path.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// No built-in or configured profile has this name.
    #[error("unknown device profile '{0}'")]
    UnknownProfile(String),

    /// A profile's dimensions cannot describe a device.
    #[error("device profile '{name}' is invalid: {reason}")]
    InvalidProfile { name: String, reason: String },

    /// The file was exported for a different device model.
    #[error("file is for device model '{found}', but profile '{expected}' is selected")]
    ProfileMismatch { expected: String, found: String },
}

impl DeviceError {
    /// The engine error behind this failure, if any.
    pub fn engine(&self) -> Option<&EngineError> {
        match self {
            DeviceError::Engine(e) => Some(e),
            _ => None,
        }
    }
}
