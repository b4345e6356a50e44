//! The compiler-injected `extra` branch of every resource domain.

use asset_spec_core::{
    AttrInput, EXTRA_PROP_NAME, PropKind, PropertyNode, SchemaVariant, Socket, SocketArity,
    SocketKind, WidgetKind,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::funcs::IDENTITY_FUNC;
use crate::{CompileError, Result};

pub const REGION_PROP: &str = "Region";
pub const AWS_RESOURCE_TYPE_PROP: &str = "AwsResourceType";
pub const PROP_USAGE_MAP_PROP: &str = "PropUsageMap";
pub const CLOUDFORMATION_ONLY_PROP: &str = "CloudFormationOnly";

/// A secret recorded in the prop usage map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretUsage {
    pub secret_key: String,
    pub prop_path: Vec<String>,
}

/// Which top-level domain props are create-only, which can be updated in
/// place, and which were moved into secrets.
///
/// Stored as the JSON default value of `/domain/extra/PropUsageMap`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropUsageMap {
    pub create_only: Vec<String>,
    pub updatable: Vec<String>,
    #[serde(default)]
    pub secrets: Vec<SecretUsage>,
}

impl PropUsageMap {
    /// Computes the map from the top-level props of a domain tree.
    pub fn from_domain(domain: &PropertyNode) -> Self {
        let mut usage = Self::default();
        for prop in domain.children() {
            if prop.name == EXTRA_PROP_NAME {
                continue;
            }
            if prop.metadata.create_only {
                usage.create_only.push(prop.name.clone());
            } else {
                usage.updatable.push(prop.name.clone());
            }
        }
        usage
    }

    /// Reads the map stored on `variant`.
    pub fn read(variant: &SchemaVariant, schema: &str) -> Result<Self> {
        let prop = variant
            .domain
            .find_by_path(&[EXTRA_PROP_NAME, PROP_USAGE_MAP_PROP])
            .ok_or_else(|| missing(schema, PROP_USAGE_MAP_PROP))?;
        let text = prop
            .data
            .default_value
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or("{}");
        Ok(serde_json::from_str(text).unwrap_or_default())
    }

    /// Stores this map on `variant`.
    pub fn write(&self, variant: &mut SchemaVariant, schema: &str) -> Result<()> {
        let prop = variant
            .domain
            .find_by_path_mut(&[EXTRA_PROP_NAME, PROP_USAGE_MAP_PROP])
            .ok_or_else(|| missing(schema, PROP_USAGE_MAP_PROP))?;
        prop.data.default_value = Some(Value::String(self.to_json()));
        Ok(())
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

fn missing(schema: &str, target: &str) -> CompileError {
    CompileError::OverrideTargetNotFound {
        schema: schema.to_string(),
        parent: format!("/domain/{EXTRA_PROP_NAME}"),
        target: target.to_string(),
    }
}

/// Adds `/domain/extra` with `Region`, `AwsResourceType` and
/// `PropUsageMap`, plus the `Region` input socket.
pub fn add_default_props(variant: &mut SchemaVariant, type_name: &str) -> Result<()> {
    let usage = PropUsageMap::from_domain(&variant.domain);
    let domain_path = variant.domain.metadata.prop_path.clone();
    let mut extra = PropertyNode::object(EXTRA_PROP_NAME, &domain_path);
    let extra_path = extra.metadata.prop_path.clone();

    let mut region = PropertyNode::scalar(REGION_PROP, PropKind::String, &extra_path);
    let identity = IDENTITY_FUNC.unique_id();
    region.data.func_unique_id = Some(identity.clone());
    region.data.inputs.push(AttrInput::InputSocket {
        name: "identity".to_string(),
        socket_name: REGION_PROP.to_string(),
    });
    let region_path = region.path_str();

    let mut resource_type = hidden_string(AWS_RESOURCE_TYPE_PROP, &extra_path);
    resource_type.data.default_value = Some(Value::String(type_name.to_string()));

    let mut usage_map = hidden_string(PROP_USAGE_MAP_PROP, &extra_path);
    usage_map.data.default_value = Some(Value::String(usage.to_json()));

    extra.push_entry(region);
    extra.push_entry(resource_type);
    extra.push_entry(usage_map);

    let entries = variant
        .domain
        .entries_mut()
        .ok_or_else(|| CompileError::MissingDomain(type_name.to_string()))?;
    entries.push(extra);

    variant.add_socket(
        Socket::new(REGION_PROP, SocketKind::Input, SocketArity::One)
            .with_binding(&identity, region_path),
    );
    Ok(())
}

/// A hidden string prop with a text widget.
pub fn hidden_string(name: &str, parent_path: &[String]) -> PropertyNode {
    let mut prop = PropertyNode::scalar(name, PropKind::String, parent_path);
    prop.data.widget_kind = Some(WidgetKind::Text);
    prop.data.hidden = true;
    prop
}
