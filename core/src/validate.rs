//! Compiled package validation.
//!
//! Checks the structural invariants every compiled package must hold before
//! it is handed to the downstream consumer: one schema with one variant,
//! well-formed prop paths, unique ids, unique sibling names, unique sockets,
//! and no binding that points at a function the package does not carry.
//!
//! # Examples
//!
//! ```
//! use asset_spec_core::*;
//!
//! let variant = SchemaVariant::empty(VariantData::default());
//! let schema = SchemaSpec::new("AWS::Demo::Widget", "AWS::Demo", variant);
//! let mut package = CompiledPackage::new(schema, "1", "2025-01-01T00:00:00Z", "tests");
//! assert!(validate_package(&package).is_empty());
//!
//! // A binding to a function the package does not carry
//! package.variant_mut().unwrap().management_funcs.push(ManagementFuncBinding {
//!     func_unique_id: "missing".into(),
//! });
//! assert_eq!(
//!     validate_package(&package),
//!     vec![ValidationError::MissingFunc("missing".into())]
//! );
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{CompiledPackage, PropertyNode, SchemaVariant, TreeRoot};

/// Package validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("package name cannot be empty")]
    EmptyPackageName,
    #[error("package version cannot be empty")]
    EmptyPackageVersion,
    /// A package must carry exactly one schema.
    #[error("expected exactly one schema, found {0}")]
    SchemaCount(usize),
    /// A schema must carry exactly one variant.
    #[error("expected exactly one variant, found {0}")]
    VariantCount(usize),
    #[error("default variant does not match the variant id")]
    DefaultVariantMismatch,
    /// A tree root is not at `["root", <tree>]`.
    #[error("invalid tree root path: {0}")]
    InvalidRootPath(String),
    /// A node's path is not its parent's path plus its own name.
    #[error("prop path does not match tree position: {0}")]
    PropPathMismatch(String),
    #[error("duplicate unique id: {0}")]
    DuplicateUniqueId(String),
    /// Two entries of the same object share a name.
    #[error("duplicate prop name: {0}")]
    DuplicateProp(String),
    /// Two sockets share a name and direction.
    #[error("duplicate socket: {0}")]
    DuplicateSocket(String),
    /// A binding references a function id not in `funcs`.
    #[error("binding references unknown function: {0}")]
    MissingFunc(String),
}

/// Validates a compiled package, returning every problem found.
pub fn validate_package(package: &CompiledPackage) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if package.name.trim().is_empty() {
        errors.push(ValidationError::EmptyPackageName);
    }
    if package.version.trim().is_empty() {
        errors.push(ValidationError::EmptyPackageVersion);
    }
    if package.schemas.len() != 1 {
        errors.push(ValidationError::SchemaCount(package.schemas.len()));
        return errors;
    }
    let schema = &package.schemas[0];
    if schema.variants.len() != 1 {
        errors.push(ValidationError::VariantCount(schema.variants.len()));
        return errors;
    }
    let variant = &schema.variants[0];
    if schema.data.default_schema_variant.as_deref() != Some(variant.unique_id.as_str()) {
        errors.push(ValidationError::DefaultVariantMismatch);
    }

    errors.extend(validate_variant(variant));

    let func_ids: HashSet<&str> = package.funcs.iter().map(|f| f.unique_id.as_str()).collect();
    for id in bound_func_ids(variant) {
        if !func_ids.contains(id) {
            errors.push(ValidationError::MissingFunc(id.to_string()));
        }
    }

    errors
}

/// Validates the trees and sockets of one variant.
pub fn validate_variant(variant: &SchemaVariant) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen_ids: HashSet<&str> = HashSet::new();

    for root in [TreeRoot::Domain, TreeRoot::ResourceValue, TreeRoot::Secrets] {
        let tree = variant.tree(root);
        if tree.metadata.prop_path != root.path() {
            errors.push(ValidationError::InvalidRootPath(tree.path_str()));
            continue;
        }
        validate_tree(tree, &mut seen_ids, &mut errors);
    }

    let mut seen_sockets = HashSet::new();
    for socket in &variant.sockets {
        if !seen_sockets.insert((socket.name.as_str(), socket.kind())) {
            errors.push(ValidationError::DuplicateSocket(socket.name.clone()));
        }
    }

    errors
}

fn validate_tree<'a>(
    tree: &'a PropertyNode,
    seen_ids: &mut HashSet<&'a str>,
    errors: &mut Vec<ValidationError>,
) {
    let mut stack = vec![tree];
    while let Some(node) = stack.pop() {
        if !seen_ids.insert(node.unique_id.as_str()) {
            errors.push(ValidationError::DuplicateUniqueId(node.unique_id.clone()));
        }

        let mut names = HashSet::new();
        for child in node.children() {
            let expected = node
                .metadata
                .prop_path
                .iter()
                .chain(std::iter::once(&child.name));
            if !child.metadata.prop_path.iter().eq(expected) {
                errors.push(ValidationError::PropPathMismatch(child.path_str()));
            }
            if node.is_object() && !names.insert(child.name.as_str()) {
                errors.push(ValidationError::DuplicateProp(child.path_str()));
            }
            stack.push(child);
        }
    }
}

fn bound_func_ids(variant: &SchemaVariant) -> Vec<&str> {
    let mut ids: Vec<&str> = Vec::new();
    ids.extend(variant.data.func_unique_id.as_deref());
    ids.extend(variant.action_funcs.iter().map(|b| b.func_unique_id.as_str()));
    ids.extend(variant.leaf_functions.iter().map(|b| b.func_unique_id.as_str()));
    ids.extend(
        variant
            .management_funcs
            .iter()
            .map(|b| b.func_unique_id.as_str()),
    );
    ids.extend(
        variant
            .sockets
            .iter()
            .filter_map(|s| s.binding.as_ref().map(|b| b.func_unique_id.as_str())),
    );
    for tree in [&variant.domain, &variant.resource_value, &variant.secrets] {
        ids.extend(tree.bfs().filter_map(|n| n.data.func_unique_id.as_deref()));
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PropKind, SchemaSpec, Socket, SocketArity, SocketKind, VariantData};

    fn package() -> CompiledPackage {
        let variant = SchemaVariant::empty(VariantData::default());
        let schema = SchemaSpec::new("AWS::Demo::Widget", "AWS::Demo", variant);
        CompiledPackage::new(schema, "1", "2025-01-01T00:00:00Z", "tests")
    }

    #[test]
    fn test_empty_package_is_valid() {
        assert!(validate_package(&package()).is_empty());
    }

    #[test]
    fn test_rejects_two_variants() {
        let mut pkg = package();
        let extra = SchemaVariant::empty(VariantData::default());
        pkg.schemas[0].variants.push(extra);
        assert_eq!(
            validate_package(&pkg),
            vec![ValidationError::VariantCount(2)]
        );
    }

    #[test]
    fn test_detects_duplicate_sibling_names() {
        let mut pkg = package();
        let domain = &mut pkg.variant_mut().unwrap().domain;
        let path = domain.metadata.prop_path.clone();
        domain.push_entry(PropertyNode::scalar("Name", PropKind::String, &path));
        domain.push_entry(PropertyNode::scalar("Name", PropKind::String, &path));

        let errors = validate_package(&pkg);
        assert!(errors.contains(&ValidationError::DuplicateProp("/domain/Name".into())));
    }

    #[test]
    fn test_detects_stale_prop_path() {
        let mut pkg = package();
        let domain = &mut pkg.variant_mut().unwrap().domain;
        domain.push_entry(PropertyNode::scalar(
            "Name",
            PropKind::String,
            &TreeRoot::Secrets.path(),
        ));

        let errors = validate_package(&pkg);
        assert_eq!(
            errors,
            vec![ValidationError::PropPathMismatch("/secrets/Name".into())]
        );
    }

    #[test]
    fn test_detects_duplicate_ids_across_trees() {
        let mut pkg = package();
        let variant = pkg.variant_mut().unwrap();
        variant.secrets.unique_id = variant.domain.unique_id.clone();

        let errors = validate_package(&pkg);
        assert!(matches!(errors.as_slice(), [ValidationError::DuplicateUniqueId(_)]));
    }

    #[test]
    fn test_detects_duplicate_sockets_and_unbound_func() {
        let mut pkg = package();
        let variant = pkg.variant_mut().unwrap();
        let socket =
            Socket::new("Id", SocketKind::Output, SocketArity::One).with_binding("si:identity", "/resource_value/Id");
        variant.sockets.push(socket.clone());
        variant.sockets.push(socket);

        let errors = validate_package(&pkg);
        assert!(errors.contains(&ValidationError::DuplicateSocket("Id".into())));
        assert!(errors.contains(&ValidationError::MissingFunc("si:identity".into())));
    }
}
