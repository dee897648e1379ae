use thiserror::Error;

use crate::device::ShaderStage;

/// Result alias used across the engine.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Kind of cached resource, used for diagnostics.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResourceKind {
    Texture,
    Material,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Texture => f.write_str("texture"),
            ResourceKind::Material => f.write_str("material"),
        }
    }
}

/// Fatal engine errors.
///
/// Construction failures (data types, shaders, context objects) and runtime
/// attribute/uniform misses end up here. Callers are expected to abort the
/// operation that produced them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("{kind} '{name}' is not registered")]
    ResourceNotFound { kind: ResourceKind, name: String },

    #[error("unable to find attribute named '{name}' in shader named '{shader}'")]
    AttributeNotFound { shader: String, name: String },

    #[error("unable to find uniform named '{name}' in shader named '{shader}'")]
    UniformNotFound { shader: String, name: String },

    #[error("unrecognised data type: {0:#06x}")]
    UnsupportedDataType(u32),

    #[error("error compiling {stage} shader '{shader}': {log}")]
    ShaderCompile {
        shader: String,
        stage: ShaderStage,
        log: String,
    },

    #[error("error linking shader '{shader}': {log}")]
    ShaderLink { shader: String, log: String },

    #[error("sprite '{0}' was drawn before load()")]
    SpriteNotLoaded(String),

    #[error("engine has not been started")]
    NotStarted,

    #[error("sprite '{0}' already exists")]
    DuplicateSprite(String),

    #[error("sprite '{0}' does not exist")]
    SpriteNotFound(String),

    #[error("graphics context error: {0}")]
    Context(String),
}

/// Non-fatal message bus bookkeeping anomalies.
///
/// These are logged as warnings when they happen and leave the subscription
/// table untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusWarning {
    #[error("attempting to add a duplicate handler to code '{0}'; subscription not added")]
    DuplicateSubscription(String),

    #[error("cannot unsubscribe handler from code '{0}': handler is not subscribed")]
    UnknownSubscription(String),
}
