//! Structured reporting for a compile run.

use serde::{Deserialize, Serialize};

use crate::CompileError;

/// Structured code for a schema skipped during compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipCode {
    /// Requested schema was not returned by the provider.
    MissingSchema,
    /// Package had no schema variant.
    MissingVariant,
    /// Domain prop missing or not an object.
    MissingDomain,
    /// Secrets prop missing or not an object.
    MissingSecrets,
    /// Finished package failed structural validation.
    InvalidPackage,
}

impl SkipCode {
    /// Maps a recoverable error to its skip code. Fatal errors have none.
    pub fn from_error(err: &CompileError) -> Option<Self> {
        match err {
            CompileError::MissingSchema(_) => Some(Self::MissingSchema),
            CompileError::MissingVariant(_) => Some(Self::MissingVariant),
            CompileError::MissingDomain(_) => Some(Self::MissingDomain),
            CompileError::MissingSecrets(_) => Some(Self::MissingSecrets),
            CompileError::InvalidPackage { .. } => Some(Self::InvalidPackage),
            _ => None,
        }
    }
}

impl std::fmt::Display for SkipCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSchema => write!(f, "missing_schema"),
            Self::MissingVariant => write!(f, "missing_variant"),
            Self::MissingDomain => write!(f, "missing_domain"),
            Self::MissingSecrets => write!(f, "missing_secrets"),
            Self::InvalidPackage => write!(f, "invalid_package"),
        }
    }
}

/// Per-schema outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaReport {
    pub schema: String,
    pub compiled: bool,
    /// Whether this package was extracted from another schema.
    #[serde(default)]
    pub sub_asset: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_code: Option<SkipCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_detail: Option<String>,
}

impl SchemaReport {
    pub fn compiled(schema: impl Into<String>, sub_asset: bool) -> Self {
        Self {
            schema: schema.into(),
            compiled: true,
            sub_asset,
            skip_code: None,
            skip_detail: None,
        }
    }

    pub fn skipped(schema: impl Into<String>, code: SkipCode, detail: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            compiled: false,
            sub_asset: false,
            skip_code: Some(code),
            skip_detail: Some(detail.into()),
        }
    }
}

/// Wall-clock timing of one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub packages: usize,
    pub elapsed_ms: u64,
}

/// Summary of a whole compile run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileReport {
    pub schemas: Vec<SchemaReport>,
    pub stages: Vec<StageTiming>,
}

impl CompileReport {
    pub fn compiled_count(&self) -> usize {
        self.schemas.iter().filter(|r| r.compiled).count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SchemaReport> {
        self.schemas.iter().filter(|r| !r.compiled)
    }
}
