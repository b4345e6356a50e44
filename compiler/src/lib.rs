//! Compiles CloudFormation resource schemas into asset specification
//! packages.
//!
//! A batch of [`RawSchema`]s goes through a fixed sequence of stages:
//!
//! 1. [`prop_tree`] builds the domain, resource_value and secrets trees,
//!    [`default_props`] adds the `extra` branch, and [`sockets`] adds output
//!    sockets.
//! 2. [`sockets`] adds input sockets once every output socket is known.
//! 3. [`sub_assets`] extracts shared array-of-object element shapes into
//!    their own packages, deduplicated by structural hash.
//! 4. [`suggestions`] links props to the primary identifiers of other
//!    schemas.
//! 5. [`attach`] clones the default functions each schema supports.
//! 6. [`overrides`] applies the hand-authored corrections.
//! 7. [`prune`] degrades schemas without a `read` handler.
//! 8. [`codegen`] renders each variant's asset definition.
//!
//! [`compile`] drives the whole run and reports skipped schemas.
//!
//! # Example
//!
//! ```
//! use asset_spec_compiler::{CompileOptions, compile};
//! use asset_spec_core::{ActionKind, RawSchema, SocketKind};
//!
//! let schema: RawSchema = serde_json::from_value(serde_json::json!({
//!     "typeName": "AWS::Demo::Widget",
//!     "properties": {
//!         "Name": { "type": "string" },
//!         "Id": { "type": "string" }
//!     },
//!     "readOnlyProperties": ["/properties/Id"],
//!     "primaryIdentifier": ["/properties/Id"],
//!     "handlers": { "create": {}, "read": {}, "delete": {} }
//! }))
//! .unwrap();
//!
//! let options = CompileOptions {
//!     created_at: Some("2025-01-01T00:00:00Z".to_string()),
//!     ..Default::default()
//! };
//! let outcome = compile(vec![schema], &[], &options).unwrap();
//! let variant = outcome.packages[0].variant().unwrap();
//!
//! assert!(variant.domain.find_child("Name").unwrap().metadata.required);
//! assert!(variant.find_socket("Id", SocketKind::Output).is_some());
//! let mut kinds: Vec<ActionKind> = variant.action_funcs.iter().map(|b| b.kind).collect();
//! kinds.sort_by_key(|k| format!("{k:?}"));
//! assert_eq!(kinds, vec![ActionKind::Create, ActionKind::Delete, ActionKind::Refresh]);
//! ```
//!
//! [`RawSchema`]: asset_spec_core::RawSchema

pub mod attach;
pub mod codegen;
pub mod default_props;
mod error;
pub mod funcs;
pub mod naming;
pub mod overrides;
pub mod pattern;
pub mod pipeline;
pub mod prop_tree;
pub mod prune;
pub mod report;
pub mod sockets;
pub mod sub_assets;
pub mod suggestions;
pub mod validation;

pub use error::{CompileError, Result};
pub use pipeline::{CompileOptions, CompileOutcome, PackageStamp, compile};
pub use report::{CompileReport, SchemaReport, SkipCode, StageTiming};
