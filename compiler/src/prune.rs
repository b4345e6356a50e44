//! Degrades schemas without a `read` handler to CloudFormation-only assets.

use asset_spec_core::{
    AttrInput, CompiledPackage, EXTRA_PROP_NAME, HandlerKind, PropKind, PropertyNode, SocketKind,
    TreeRoot, WidgetKind,
};
use serde_json::Value;
use tracing::debug;

use crate::default_props::{CLOUDFORMATION_ONLY_PROP, hidden_string};
use crate::funcs::{CLOUDFORMATION_LINT, RESOURCE_BODY_FUNC};
use crate::{CompileError, Result};

/// Name of the serialized-body prop under `/resource_value`.
pub const RESOURCE_BODY_PROP: &str = "CloudFormationResourceBody";

/// Whether `package` was compiled from a schema that cannot be read back.
pub fn is_prunable(package: &CompiledPackage) -> bool {
    package
        .variant()
        .and_then(|v| v.source.as_deref())
        .is_some_and(|schema| !schema.has_handler(HandlerKind::Read))
}

/// Prunes `package` if it is prunable; returns whether it was.
///
/// Output sockets and management functions go, leaf functions shrink to the
/// lint function, `/domain/extra/CloudFormationOnly` is set, and
/// `/resource_value/CloudFormationResourceBody` is computed from the domain.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use asset_spec_compiler::{
///     attach::attach_default_funcs, default_props::add_default_props, prop_tree::build_variant,
///     prune::prune_package,
/// };
/// use asset_spec_core::{CompiledPackage, RawSchema, SchemaSpec};
///
/// let schema: RawSchema = serde_json::from_value(serde_json::json!({
///     "typeName": "AWS::Demo::Widget",
///     "properties": { "Name": { "type": "string" } },
///     "handlers": { "create": {} }
/// }))
/// .unwrap();
/// let mut variant = build_variant(&Arc::new(schema)).unwrap();
/// add_default_props(&mut variant, "AWS::Demo::Widget").unwrap();
/// let mut package = CompiledPackage::new(
///     SchemaSpec::new("AWS::Demo::Widget", "AWS::Demo", variant),
///     "1",
///     "2025-01-01T00:00:00Z",
///     "docs",
/// );
/// attach_default_funcs(&mut package).unwrap();
///
/// assert!(prune_package(&mut package).unwrap());
/// assert_eq!(package.variant().unwrap().leaf_functions.len(), 1);
/// ```
pub fn prune_package(package: &mut CompiledPackage) -> Result<bool> {
    if !is_prunable(package) {
        return Ok(false);
    }
    let schema = package.name.clone();
    let lint_ids: Vec<String> = package
        .funcs
        .iter()
        .filter(|f| f.name == CLOUDFORMATION_LINT)
        .map(|f| f.unique_id.clone())
        .collect();
    let type_name = package.type_name().unwrap_or(schema.as_str()).to_string();

    let variant = package
        .variant_mut()
        .ok_or_else(|| CompileError::MissingVariant(schema.clone()))?;

    variant.sockets.retain(|s| s.kind() == SocketKind::Input);
    variant.management_funcs.clear();
    variant
        .leaf_functions
        .retain(|b| lint_ids.contains(&b.func_unique_id));

    let extra = variant
        .domain
        .find_child_mut(EXTRA_PROP_NAME)
        .ok_or_else(|| CompileError::MissingDomain(schema.clone()))?;
    let mut only = PropertyNode::scalar(
        CLOUDFORMATION_ONLY_PROP,
        PropKind::Boolean,
        &extra.metadata.prop_path,
    );
    only.data.hidden = true;
    only.data.default_value = Some(Value::Bool(true));
    extra.push_entry(only);

    let body_func = RESOURCE_BODY_FUNC.to_spec();
    let mut body = hidden_string(RESOURCE_BODY_PROP, &TreeRoot::ResourceValue.path());
    body.data.widget_kind = Some(WidgetKind::CodeEditor);
    body.data.func_unique_id = Some(body_func.unique_id.clone());
    body.data.inputs = vec![
        AttrInput::Constant {
            name: "typeName".to_string(),
            value: Value::String(type_name),
        },
        AttrInput::Prop {
            name: "domain".to_string(),
            prop_path: "/domain".to_string(),
        },
    ];
    variant.resource_value.push_entry(body);

    package.add_func(body_func);
    package.retain_referenced_funcs();
    debug!(schema = %schema, "Pruned to CloudFormation-only asset");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funcs::{REGION_QUALIFICATION, func_id};
    use crate::overrides::modify_func;
    use crate::overrides::tests::compiled;
    use crate::sockets::add_output_sockets;
    use asset_spec_core::validate_package;
    use serde_json::json;

    fn widget(handlers: serde_json::Value) -> CompiledPackage {
        let mut package = compiled(json!({
            "typeName": "AWS::Demo::Widget",
            "properties": {
                "Name": { "type": "string" },
                "Id": { "type": "string" }
            },
            "readOnlyProperties": ["/properties/Id"],
            "primaryIdentifier": ["/properties/Id"],
            "handlers": handlers
        }));
        add_output_sockets(package.variant_mut().unwrap());
        package
    }

    #[test]
    fn test_readable_schemas_are_untouched() {
        let mut package = widget(json!({ "create": {}, "read": {}, "list": {} }));
        let before = package.clone();
        assert!(!prune_package(&mut package).unwrap());
        assert_eq!(package, before);
    }

    #[test]
    fn test_unreadable_schema_is_degraded() {
        let mut package = widget(json!({ "create": {}, "delete": {} }));
        assert!(
            package
                .variant()
                .unwrap()
                .sockets_of(SocketKind::Output)
                .next()
                .is_some()
        );
        assert!(prune_package(&mut package).unwrap());

        let variant = package.variant().unwrap();
        assert_eq!(variant.sockets_of(SocketKind::Output).count(), 0);
        assert!(variant.find_socket("Region", SocketKind::Input).is_some());
        assert!(variant.management_funcs.is_empty());
        assert_eq!(variant.leaf_functions.len(), 1);
        assert_eq!(
            variant.leaf_functions[0].func_unique_id,
            func_id(CLOUDFORMATION_LINT)
        );

        let only = variant
            .domain
            .find_by_path(&[EXTRA_PROP_NAME, CLOUDFORMATION_ONLY_PROP])
            .unwrap();
        assert_eq!(only.path_str(), "/domain/extra/CloudFormationOnly");
        assert_eq!(only.kind, PropKind::Boolean);
        assert!(only.data.hidden);
        assert_eq!(only.data.default_value, Some(Value::Bool(true)));

        let body = variant.resource_value.find_child(RESOURCE_BODY_PROP).unwrap();
        let body_id = body.data.func_unique_id.clone().unwrap();
        assert!(package.func(&body_id).is_some());
        assert!(package.func(&func_id(REGION_QUALIFICATION)).is_none());
        assert!(validate_package(&package).is_empty());
    }

    #[test]
    fn test_renamed_lint_function_survives() {
        let mut package = widget(json!({ "create": {} }));
        let lint = func_id(CLOUDFORMATION_LINT);
        modify_func(&mut package, &lint, "custom-lint".into(), "async function main() {}").unwrap();
        prune_package(&mut package).unwrap();

        let variant = package.variant().unwrap();
        assert_eq!(variant.leaf_functions.len(), 1);
        assert_eq!(variant.leaf_functions[0].func_unique_id, "custom-lint");
        assert!(package.func("custom-lint").is_some());
    }
}
