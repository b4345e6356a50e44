//! Core data model for compiled cloud-resource asset specifications.
//!
//! This crate defines the types shared by every stage of the asset compiler:
//!
//! - [`RawSchema`] / [`RawProperty`] — the CloudFormation-shaped input, with
//!   [`OnlyProperties`] classification sets and declared [`HandlerKind`]s.
//! - [`PropertyNode`] — a node of a compiled property tree, tagged by
//!   [`PropKind`]; containers own their children.
//! - [`Socket`] — a named, directional connection point with fuzzy-match
//!   [`ConnectionAnnotation`]s.
//! - [`FuncSpec`] and the action/leaf/management bindings that reference it.
//! - [`SchemaVariant`] / [`SchemaSpec`] / [`CompiledPackage`] — the output
//!   package, one schema with one variant.
//!
//! Validation ([`validate_package`]) checks structural well-formedness of a
//! compiled package before it is written.
//!
//! # Example
//!
//! ```
//! use asset_spec_core::*;
//!
//! let mut variant = SchemaVariant::empty(VariantData::default());
//! let path = variant.domain.metadata.prop_path.clone();
//! variant
//!     .domain
//!     .push_entry(PropertyNode::scalar("Name", PropKind::String, &path));
//! variant.add_socket(Socket::new("Name", SocketKind::Input, SocketArity::One));
//!
//! let schema = SchemaSpec::new("AWS::Demo::Widget", "AWS::Demo", variant);
//! let package = CompiledPackage::new(schema, "1", "2025-01-01T00:00:00Z", "docs");
//!
//! assert!(validate_package(&package).is_empty());
//! assert_eq!(
//!     package.variant().unwrap().domain.find_child("Name").unwrap().path_str(),
//!     "/domain/Name"
//! );
//! ```

mod package;
mod raw;
mod types;
mod validate;

pub use package::*;
pub use raw::*;
pub use types::*;
pub use validate::*;
