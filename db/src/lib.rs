//! Schema loading, package id index and compile configuration.
//!
//! This crate is the input side of the asset-spec compiler: it reads
//! CloudFormation registry schemas from disk (inlining `$ref` definitions),
//! remembers the ids assigned to previously written packages, and loads the
//! YAML compile configuration.
//!
//! # Quick start
//!
//! ```no_run
//! use asset_spec_db::{CompileConfig, PackageIdIndex, SchemaProvider, SchemaStore};
//!
//! let config = CompileConfig::load("asset-spec.yml").unwrap();
//! let mut store = SchemaStore::from_dir("schemas/").unwrap();
//! store.retain(|name| config.is_allowed(name));
//!
//! let schemas = store.load(&[]).unwrap();
//! let ids = PackageIdIndex::load_or_default("out/ids.json").unwrap();
//! println!("{} schemas, {} known ids", schemas.len(), ids.packages.len());
//! ```

mod config;
mod error;
mod id_index;
mod loader;
mod refs;

pub use config::{CompileConfig, CompileSettings, PackageConfig};
pub use error::{DatabaseError, Result};
pub use id_index::{PackageIdEntry, PackageIdIndex};
pub use loader::{SchemaProvider, SchemaStore, StoreBuilder, StoreSource};
pub use refs::resolve_refs;
