//! Compile errors.
//!
//! Every failure is either recoverable (the offending schema is skipped and
//! the batch continues) or fatal (the whole run aborts). Fatal errors come
//! from the compiler's own static tables or hard-coded assumptions being
//! wrong; recoverable ones come from plausible but unexpected input.

use thiserror::Error;

use crate::pattern::PatternError;

/// Errors raised while compiling resource schemas.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Requested type name is not in the schema set.
    #[error("schema not found: {0}")]
    MissingSchema(String),
    /// Package was built without a variant.
    #[error("{0}: package has no schema variant")]
    MissingVariant(String),
    /// Variant has no object `domain` tree.
    #[error("{0}: domain prop is missing or not an object")]
    MissingDomain(String),
    /// Variant has no object `secrets` tree.
    #[error("{0}: secrets prop is missing or not an object")]
    MissingSecrets(String),
    /// A finished package failed structural validation.
    #[error("{schema}: invalid package: {errors}")]
    InvalidPackage { schema: String, errors: String },

    /// Nesting limit hit, usually a cyclic schema.
    #[error("{schema}: prop tree deeper than {limit} segments at {path}")]
    DepthExceeded {
        schema: String,
        path: String,
        limit: usize,
    },
    /// Property type has no prop kind.
    #[error("{schema}: no matching prop kind at {path}")]
    UnsupportedType { schema: String, path: String },
    /// String or number `format` with no validation mapping.
    #[error("{schema}: unsupported format {format:?} at {path}")]
    UnsupportedFormat {
        schema: String,
        path: String,
        format: String,
    },
    /// Pattern could not be translated.
    #[error("{schema}: unsupported pattern at {path}: {source}")]
    UnsupportedPattern {
        schema: String,
        path: String,
        #[source]
        source: PatternError,
    },
    /// Map declares more pattern properties than supported.
    #[error("{schema}: {count} pattern properties at {path}, at most 2 are supported")]
    TooManyPatternProperties {
        schema: String,
        path: String,
        count: usize,
    },
    /// Override points at a prop that does not exist.
    #[error("{schema}: override target {target} not found under {parent}")]
    OverrideTargetNotFound {
        schema: String,
        parent: String,
        target: String,
    },
    /// Override found its prop but with the wrong kind.
    #[error("{schema}: override target {target} is {actual}, expected {expected}")]
    OverrideKindMismatch {
        schema: String,
        target: String,
        expected: &'static str,
        actual: &'static str,
    },
    /// Override points at a function the package does not have.
    #[error("{schema}: function {func} not found")]
    FunctionNotFound { schema: String, func: String },
    /// Dedicated rayon pool could not be created.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl CompileError {
    /// Whether the batch may continue after skipping the affected schema.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingSchema(_)
                | Self::MissingVariant(_)
                | Self::MissingDomain(_)
                | Self::MissingSecrets(_)
                | Self::InvalidPackage { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
