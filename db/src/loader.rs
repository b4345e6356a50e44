//! Schema loading from registry files, with a fallback chain.
//!
//! Provides the [`SchemaProvider`] seam the compiler reads from,
//! [`SchemaStore`] as the in-memory provider, and [`StoreBuilder`] for
//! constructing a store from several sources with automatic fallback.
//!
//! # Loading patterns
//!
//! ```no_run
//! use asset_spec_db::{SchemaProvider, SchemaStore};
//!
//! // A directory of CloudFormation registry JSON files
//! let store = SchemaStore::from_dir("schemas/").unwrap();
//! assert!(store.get("AWS::EC2::VPC").is_some());
//!
//! // Try a fresh download first, fall back to a checked-in bundle
//! let store = SchemaStore::builder()
//!     .from_dir("downloads/")
//!     .from_bundle("schemas.json")
//!     .build()
//!     .unwrap();
//! let everything = store.load(&[]).unwrap();
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use asset_spec_core::RawSchema;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{DatabaseError, Result};
use crate::refs::resolve_refs;

/// Anything that can hand the compiler a batch of raw schemas.
pub trait SchemaProvider {
    /// Returns the schemas named in `requested`, or every schema when
    /// `requested` is empty. Unknown names are not an error; the compiler
    /// reports them.
    fn load(&self, requested: &[String]) -> Result<Vec<RawSchema>>;
}

/// Describes where a [`SchemaStore`] was loaded from.
#[derive(Debug, Clone)]
pub enum StoreSource {
    /// A directory of individual registry files.
    Directory(PathBuf),
    /// A single JSON array of registry schemas.
    Bundle(PathBuf),
    /// Loaded via a fallback chain of multiple sources.
    Multiple(Vec<StoreSource>),
}

/// In-memory collection of raw schemas keyed by type name.
///
/// # Examples
///
/// ```no_run
/// use asset_spec_db::SchemaStore;
///
/// let store = SchemaStore::from_dir("schemas/").unwrap();
/// println!("Loaded {} schemas", store.len());
/// for name in store.type_names() {
///     println!("  {}", name);
/// }
/// ```
#[derive(Debug)]
pub struct SchemaStore {
    schemas: BTreeMap<String, RawSchema>,
    source: StoreSource,
}

impl SchemaStore {
    /// Returns a new [`StoreBuilder`] for configuring a fallback chain.
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Loads every `*.json` file in `path` as a registry schema.
    ///
    /// `$ref` pointers into `definitions` are inlined before parsing.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::IoError`] if the directory cannot be read,
    /// [`DatabaseError::InvalidSchema`] if a file is not a resource schema,
    /// or [`DatabaseError::DuplicateSchema`] if two files share a type name.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()?;
        files.retain(|f| f.extension().and_then(|e| e.to_str()) == Some("json"));
        files.sort();

        let mut schemas = BTreeMap::new();
        for file_path in files {
            let file = std::fs::File::open(&file_path)?;
            let reader = std::io::BufReader::new(file);
            let value: Value = serde_json::from_reader(reader)?;
            let schema = parse_schema(value, &file_path)?;
            insert_unique(&mut schemas, schema, &file_path)?;
        }
        info!(path = %path.display(), count = schemas.len(), "Loaded schema directory");

        Ok(Self {
            schemas,
            source: StoreSource::Directory(path.to_path_buf()),
        })
    }

    /// Loads a single JSON file holding an array of registry schemas.
    pub fn from_bundle(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let values: Vec<Value> = serde_json::from_reader(reader)?;

        let mut schemas = BTreeMap::new();
        for value in values {
            let schema = parse_schema(value, path)?;
            insert_unique(&mut schemas, schema, path)?;
        }
        info!(path = %path.display(), count = schemas.len(), "Loaded schema bundle");

        Ok(Self {
            schemas,
            source: StoreSource::Bundle(path.to_path_buf()),
        })
    }

    /// Builds a store from schemas already in memory.
    pub fn from_schemas(schemas: impl IntoIterator<Item = RawSchema>, source: StoreSource) -> Self {
        Self {
            schemas: schemas
                .into_iter()
                .map(|s| (s.type_name.clone(), s))
                .collect(),
            source,
        }
    }

    pub fn get(&self, type_name: &str) -> Option<&RawSchema> {
        self.schemas.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.schemas.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Type names in sorted order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Keeps only the schemas for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.schemas.retain(|name, _| keep(name));
    }

    pub fn source(&self) -> &StoreSource {
        &self.source
    }
}

impl SchemaProvider for SchemaStore {
    fn load(&self, requested: &[String]) -> Result<Vec<RawSchema>> {
        if requested.is_empty() {
            return Ok(self.schemas.values().cloned().collect());
        }
        Ok(requested
            .iter()
            .filter_map(|name| self.schemas.get(name))
            .cloned()
            .collect())
    }
}

fn parse_schema(mut value: Value, path: &Path) -> Result<RawSchema> {
    if value.get("typeName").and_then(Value::as_str).is_none() {
        return Err(DatabaseError::InvalidSchema {
            path: path.to_path_buf(),
            message: "missing typeName".to_string(),
        });
    }
    let unresolved = resolve_refs(&mut value);
    let schema: RawSchema =
        serde_json::from_value(value).map_err(|e| DatabaseError::InvalidSchema {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    if unresolved > 0 {
        debug!(schema = %schema.type_name, unresolved, "Left references in place");
    }
    Ok(schema)
}

fn insert_unique(
    schemas: &mut BTreeMap<String, RawSchema>,
    schema: RawSchema,
    path: &Path,
) -> Result<()> {
    if schemas.contains_key(&schema.type_name) {
        return Err(DatabaseError::DuplicateSchema {
            type_name: schema.type_name,
            path: path.to_path_buf(),
        });
    }
    schemas.insert(schema.type_name.clone(), schema);
    Ok(())
}

/// Builder for constructing a [`SchemaStore`] with a fallback chain.
///
/// Sources are tried in the order they are added. The first successful load
/// wins; if all fail, [`DatabaseError::NoSourcesAvailable`] is returned.
pub struct StoreBuilder {
    sources: Vec<StoreSource>,
}

impl StoreBuilder {
    /// Creates a new builder with no sources.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Adds a directory of registry files as a source.
    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(StoreSource::Directory(path.into()));
        self
    }

    /// Adds a bundle file as a source.
    pub fn from_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(StoreSource::Bundle(path.into()));
        self
    }

    /// Attempts to load schemas from configured sources in order.
    pub fn build(self) -> Result<SchemaStore> {
        if self.sources.is_empty() {
            return Err(DatabaseError::NoSourcesAvailable);
        }

        let all_sources = self.sources.clone();

        for source in &self.sources {
            let result = match source {
                StoreSource::Directory(path) => SchemaStore::from_dir(path),
                StoreSource::Bundle(path) => SchemaStore::from_bundle(path),
                StoreSource::Multiple(_) => continue,
            };

            match result {
                Ok(mut store) => {
                    store.source = StoreSource::Multiple(all_sources);
                    return Ok(store);
                }
                Err(err) => warn!(source = ?source, error = %err, "Schema source failed, trying next"),
            }
        }

        Err(DatabaseError::NoSourcesAvailable)
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
