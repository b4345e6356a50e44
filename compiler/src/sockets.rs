//! Output and input socket synthesis.
//!
//! Output sockets come from a single variant. Input sockets need the output
//! sockets of every compiled package, so they are built in two phases: a
//! read-only [`SocketCatalog::collect`] over all packages, then
//! [`add_input_sockets`] per package once the catalog is complete.

use std::collections::BTreeSet;

use asset_spec_core::{
    AttrInput, CompiledPackage, EXTRA_PROP_NAME, PropKind, PropertyNode, SchemaVariant, Socket,
    SocketArity, SocketKind, TypeNameParts,
};

use crate::funcs::IDENTITY_FUNC;
use crate::naming::{pluralize, socket_name_for};

/// Adds one output socket per read-only scalar directly under
/// `resource_value` and per primary identifier anywhere in `domain`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use asset_spec_compiler::{prop_tree::build_variant, sockets::add_output_sockets};
/// use asset_spec_core::{RawSchema, SocketKind};
///
/// let schema: RawSchema = serde_json::from_value(serde_json::json!({
///     "typeName": "AWS::IAM::Role",
///     "properties": { "Arn": { "type": "string" }, "RoleName": { "type": "string" } },
///     "readOnlyProperties": ["/properties/Arn"],
///     "primaryIdentifier": ["/properties/RoleName"]
/// }))
/// .unwrap();
///
/// let mut variant = build_variant(&Arc::new(schema)).unwrap();
/// add_output_sockets(&mut variant);
///
/// let names: Vec<&str> = variant.sockets_of(SocketKind::Output).map(|s| s.name.as_str()).collect();
/// assert_eq!(names, vec!["Arn", "RoleName"]);
/// ```
pub fn add_output_sockets(variant: &mut SchemaVariant) {
    let mut sockets = Vec::new();
    for prop in variant.resource_value.children() {
        if prop.is_scalar() {
            sockets.push(output_socket(prop));
        }
    }
    for prop in domain_props(&variant.domain) {
        if prop.metadata.primary_identifier && prop.is_scalar() {
            sockets.push(output_socket(prop));
        }
    }
    for socket in sockets {
        variant.add_socket(socket);
    }
}

fn output_socket(prop: &PropertyNode) -> Socket {
    let name = socket_name_for(prop);
    let mut socket = Socket::new(name.as_str(), SocketKind::Output, SocketArity::One)
        .with_binding(&IDENTITY_FUNC.unique_id(), prop.path_str());
    if name != prop.name {
        socket.add_annotation(prop.name.as_str());
    }
    if let Some(stem) = prop.name.strip_suffix("Arn").filter(|s| !s.is_empty()) {
        socket.add_annotation(stem);
    }
    socket
}

/// Domain props below the tree root, breadth-first, skipping `extra`.
fn domain_props(domain: &PropertyNode) -> impl Iterator<Item = &PropertyNode> {
    domain
        .children()
        .iter()
        .filter(|child| child.name != EXTRA_PROP_NAME)
        .flat_map(PropertyNode::bfs)
}

/// A primary-identifier output socket of some compiled schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierSocket {
    pub schema: String,
    pub resource: String,
    pub socket: String,
}

/// Output socket names and identifier sockets across every package.
#[derive(Debug, Clone, Default)]
pub struct SocketCatalog {
    pub output_names: BTreeSet<String>,
    pub identifiers: Vec<IdentifierSocket>,
}

impl SocketCatalog {
    /// Reads every package's output sockets.
    pub fn collect(packages: &[CompiledPackage]) -> Self {
        let mut catalog = Self::default();
        for package in packages {
            if let Some(variant) = package.variant() {
                catalog.add_variant(&package.name, variant);
            }
        }
        catalog
    }

    fn add_variant(&mut self, schema: &str, variant: &SchemaVariant) {
        self.output_names.extend(
            variant
                .sockets_of(SocketKind::Output)
                .map(|s| s.name.clone()),
        );

        let resource = TypeNameParts::parse(schema).resource.to_string();
        let trees = [&variant.resource_value, &variant.domain];
        for prop in trees.into_iter().flat_map(|tree| tree.bfs().skip(1)) {
            if !prop.metadata.primary_identifier {
                continue;
            }
            let name = socket_name_for(prop);
            if variant.find_socket(&name, SocketKind::Output).is_some() {
                self.identifiers.push(IdentifierSocket {
                    schema: schema.to_string(),
                    resource: resource.clone(),
                    socket: name,
                });
            }
        }
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.output_names.extend(other.output_names);
        self.identifiers.extend(other.identifiers);
        self
    }
}

struct PlannedInput {
    path: Vec<String>,
    socket: Socket,
}

/// Adds input sockets to one variant from a complete catalog.
///
/// A scalar domain prop gets an input socket when its bare name is the name
/// of any output socket. A string array gets a many-arity input socket when
/// its name is the plural of another schema's identifier socket that starts
/// with that schema's resource name (`SubnetIds` ← `AWS::EC2::Subnet`'s
/// `SubnetId`).
pub fn add_input_sockets(variant: &mut SchemaVariant, own_schema: &str, catalog: &SocketCatalog) {
    let identity = IDENTITY_FUNC.unique_id();
    let mut planned = Vec::new();

    for prop in domain_props(&variant.domain) {
        if prop.metadata.read_only || prop.data.func_unique_id.is_some() {
            continue;
        }
        if prop.is_scalar() && catalog.output_names.contains(&prop.name) {
            let mut socket = Socket::new(socket_name_for(prop), SocketKind::Input, SocketArity::One)
                .with_binding(&identity, prop.path_str());
            if socket.name != prop.name {
                socket.add_annotation(prop.name.as_str());
            }
            planned.push(PlannedInput {
                path: prop.path_below_tree().to_vec(),
                socket,
            });
            continue;
        }

        if let PropKind::Array { type_prop } = &prop.kind {
            if !matches!(type_prop.kind, PropKind::String) {
                continue;
            }
            let matched = catalog.identifiers.iter().find(|id| {
                id.schema != own_schema
                    && id.socket.starts_with(&id.resource)
                    && pluralize(&id.socket) == prop.name
            });
            if let Some(identifier) = matched {
                let mut socket =
                    Socket::new(socket_name_for(prop), SocketKind::Input, SocketArity::Many)
                        .with_binding(&identity, prop.path_str());
                socket.add_annotation(identifier.socket.as_str());
                socket.add_annotation(prop.name.as_str());
                planned.push(PlannedInput {
                    path: prop.path_below_tree().to_vec(),
                    socket,
                });
            }
        }
    }

    for PlannedInput { path, socket } in planned {
        let segments: Vec<&str> = path.iter().map(String::as_str).collect();
        let Some(prop) = variant.domain.find_by_path_mut(&segments) else {
            continue;
        };
        prop.data.func_unique_id = Some(identity.clone());
        prop.data.inputs = vec![AttrInput::InputSocket {
            name: "identity".to_string(),
            socket_name: socket.name.clone(),
        }];
        variant.add_socket(socket);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::prop_tree::build_variant;
    use asset_spec_core::{RawSchema, SchemaSpec};
    use serde_json::json;

    fn variant(value: serde_json::Value) -> SchemaVariant {
        let schema: RawSchema = serde_json::from_value(value).unwrap();
        build_variant(&Arc::new(schema)).unwrap()
    }

    fn package(variant: SchemaVariant) -> CompiledPackage {
        let name = variant.data.display_name.clone();
        CompiledPackage::new(SchemaSpec::new(name, "AWS", variant), "1", "now", "tests")
    }

    #[test]
    fn test_nested_primary_identifier_uses_compacted_name() {
        let mut v = variant(json!({
            "typeName": "AWS::EC2::LaunchTemplate",
            "properties": {
                "LaunchTemplateData": {
                    "type": "object",
                    "properties": { "UserData": { "type": "string" } }
                }
            },
            "primaryIdentifier": ["/properties/LaunchTemplateData/UserData"]
        }));
        add_output_sockets(&mut v);

        let socket = v.find_socket("LaunchTemplateUserData", SocketKind::Output).unwrap();
        assert!(socket.has_annotation("UserData"));
        assert_eq!(
            socket.binding.as_ref().unwrap().prop_path,
            "/domain/LaunchTemplateData/UserData"
        );
    }

    #[test]
    fn test_arn_outputs_get_stripped_annotation() {
        let mut v = variant(json!({
            "typeName": "AWS::IAM::Role",
            "properties": { "RoleArn": { "type": "string" } },
            "readOnlyProperties": ["/properties/RoleArn"]
        }));
        add_output_sockets(&mut v);
        let socket = v.find_socket("RoleArn", SocketKind::Output).unwrap();
        assert!(socket.has_annotation("Role"));
    }

    #[test]
    fn test_nested_read_only_values_do_not_become_outputs() {
        let mut v = variant(json!({
            "typeName": "AWS::Demo::Widget",
            "properties": {
                "Status": {
                    "type": "object",
                    "properties": { "Code": { "type": "string" } }
                }
            },
            "readOnlyProperties": ["/properties/Status"]
        }));
        add_output_sockets(&mut v);
        assert_eq!(v.sockets_of(SocketKind::Output).count(), 0);
    }

    #[test]
    fn test_inputs_match_outputs_across_packages() {
        let mut vpc = variant(json!({
            "typeName": "AWS::EC2::VPC",
            "properties": { "VpcId": { "type": "string" } },
            "readOnlyProperties": ["/properties/VpcId"],
            "primaryIdentifier": ["/properties/VpcId"]
        }));
        add_output_sockets(&mut vpc);
        let mut subnet = variant(json!({
            "typeName": "AWS::EC2::Subnet",
            "properties": {
                "VpcId": { "type": "string" },
                "SubnetId": { "type": "string" }
            },
            "readOnlyProperties": ["/properties/SubnetId"],
            "primaryIdentifier": ["/properties/SubnetId"]
        }));
        add_output_sockets(&mut subnet);
        let mut instance = variant(json!({
            "typeName": "AWS::EC2::LoadBalancerish",
            "properties": {
                "SubnetIds": { "type": "array", "items": { "type": "string" } }
            }
        }));

        let packages = vec![package(vpc), package(subnet.clone())];
        let catalog = SocketCatalog::collect(&packages);
        assert!(catalog.output_names.contains("VpcId"));
        assert!(catalog.identifiers.iter().any(|id| id.socket == "SubnetId"));

        add_input_sockets(&mut subnet, "AWS::EC2::Subnet", &catalog);
        let input = subnet.find_socket("VpcId", SocketKind::Input).unwrap();
        assert_eq!(input.data.arity, SocketArity::One);
        let prop = subnet.domain.find_child("VpcId").unwrap();
        assert!(matches!(
            prop.data.inputs.first(),
            Some(AttrInput::InputSocket { socket_name, .. }) if socket_name == "VpcId"
        ));

        add_input_sockets(&mut instance, "AWS::EC2::LoadBalancerish", &catalog);
        let many = instance.find_socket("SubnetIds", SocketKind::Input).unwrap();
        assert_eq!(many.data.arity, SocketArity::Many);
        assert!(many.has_annotation("SubnetId"));
    }

    #[test]
    fn test_catalog_merge() {
        let mut a = SocketCatalog::default();
        a.output_names.insert("A".into());
        let mut b = SocketCatalog::default();
        b.output_names.insert("B".into());
        let merged = a.merge(b);
        assert_eq!(merged.output_names.len(), 2);
    }
}
