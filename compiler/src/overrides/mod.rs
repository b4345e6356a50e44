//! Hand-authored corrections applied after automatic compilation.
//!
//! Two tables, both in registration order:
//!
//! - schema overrides, keyed by exact type name, run first and may change
//!   anything in the package;
//! - prop overrides, a flat list of `(schema pattern, prop pattern, fn)`
//!   triples. Schema patterns are anchored against the type name, prop
//!   patterns against the prop path below `/domain/`. Every prop of the
//!   domain and resource_value trees is visited breadth-first, and every
//!   matching triple runs, not just the first.
//!
//! The tables are static data shipped with the compiler, so a lookup that
//! misses is a fatal error rather than a skipped schema.

mod props;
mod schema;

use std::sync::LazyLock;

use asset_spec_core::{
    ActionFuncBinding, ActionKind, ArgumentKind, CompiledPackage, FuncKind, LeafFuncBinding,
    LeafInput, LeafKind, ManagementFuncBinding, PropKind, PropertyNode, SchemaVariant,
    Suggestion, TreeRoot, WidgetKind,
};
use regex::Regex;
use tracing::debug;

use crate::default_props::{PropUsageMap, SecretUsage};
use crate::funcs::{encode_code, func_id, new_func};
use crate::{CompileError, Result};

pub use props::prop_overrides;
pub use schema::schema_overrides;

/// A prop override. Receives the schema type name and the matched prop.
pub type PropOverrideFn = Box<dyn Fn(&str, &mut PropertyNode) -> Result<()> + Send + Sync>;

/// A schema override.
pub type SchemaOverrideFn = fn(&mut CompiledPackage) -> Result<()>;

/// One compiled entry of the prop override table.
pub struct PropOverride {
    pub schema: Regex,
    pub prop: Regex,
    pub apply: PropOverrideFn,
}

impl PropOverride {
    /// Anchors both patterns. Panics on an invalid pattern; tables are
    /// constants covered by tests.
    pub fn new(schema: &str, prop: &str, apply: PropOverrideFn) -> Self {
        Self {
            schema: anchored(&format!("^(?:{schema})$")),
            prop: anchored(&format!("^/domain/(?:{prop})$")),
            apply,
        }
    }
}

fn anchored(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid override pattern {pattern}: {err}"))
}

pub struct SchemaOverride {
    pub schema: &'static str,
    pub apply: SchemaOverrideFn,
}

static PROP_OVERRIDES: LazyLock<Vec<PropOverride>> = LazyLock::new(prop_overrides);

/// Runs the schema overrides, then the prop overrides, for one package.
/// Packages without a source schema are left alone.
pub fn apply_overrides(package: &mut CompiledPackage) -> Result<()> {
    let Some(type_name) = package.type_name().map(str::to_string) else {
        return Ok(());
    };
    for entry in schema_overrides().iter().filter(|o| o.schema == type_name) {
        debug!(schema = %type_name, "Running schema override");
        (entry.apply)(package)?;
    }
    apply_prop_overrides(package, &type_name, &PROP_OVERRIDES)?;
    Ok(())
}

/// Runs every matching entry of `table` over the domain and resource_value
/// trees. Returns how many override functions ran.
pub fn apply_prop_overrides(
    package: &mut CompiledPackage,
    type_name: &str,
    table: &[PropOverride],
) -> Result<usize> {
    let matching: Vec<&PropOverride> = table
        .iter()
        .filter(|entry| entry.schema.is_match(type_name))
        .collect();
    if matching.is_empty() {
        return Ok(0);
    }
    let variant = variant_for_override(package)?;

    let mut applied = 0;
    for root in [TreeRoot::Domain, TreeRoot::ResourceValue] {
        let visits: Vec<(String, Vec<String>)> = variant
            .tree(root)
            .bfs()
            .skip(1)
            .map(|node| (node.path_str(), node.path_below_tree().to_vec()))
            .collect();

        for (path, segments) in visits {
            let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
            for entry in &matching {
                if !entry.prop.is_match(&path) {
                    continue;
                }
                // An earlier override may have reshaped the tree.
                let Some(prop) = variant.tree_mut(root).find_by_path_mut(&segments) else {
                    continue;
                };
                debug!(schema = %type_name, path = %path, pattern = %entry.prop, "Running prop override");
                (entry.apply)(type_name, prop)?;
                applied += 1;
            }
        }
    }
    Ok(applied)
}

/// Suggestion target for `prop` on `schema`. Bare names refer to
/// `/resource_value`.
///
/// # Examples
///
/// ```
/// use asset_spec_compiler::overrides::suggestion;
///
/// assert_eq!(suggestion("AWS::IAM::Role", "Arn").prop, "/resource_value/Arn");
/// assert_eq!(suggestion("AWS::EC2::SecurityGroup", "/domain/GroupName").prop, "/domain/GroupName");
/// ```
pub fn suggestion(schema: &str, prop: &str) -> Suggestion {
    if prop.starts_with('/') {
        Suggestion::new(schema, prop)
    } else {
        Suggestion::new(schema, format!("/resource_value/{prop}"))
    }
}

/// Adds a suggestion pointing at `prop` on `schema`.
pub fn suggest(schema: &'static str, prop: &'static str) -> PropOverrideFn {
    Box::new(move |_, node| {
        node.add_suggest_source(suggestion(schema, prop));
        Ok(())
    })
}

/// Suggests the `Arn` of `schema`.
pub fn arn_prop(schema: &'static str) -> PropOverrideFn {
    suggest(schema, "Arn")
}

/// Suggests a differently named ARN prop of `schema`.
pub fn arn_prop_named(schema: &'static str, prop: &'static str) -> PropOverrideFn {
    suggest(schema, prop)
}

pub fn policy_document_prop() -> PropOverrideFn {
    Box::new(policy_document)
}

/// Turns a string or JSON prop into a JSON policy document fed by a string
/// template.
pub fn policy_document(schema: &str, prop: &mut PropertyNode) -> Result<()> {
    if !matches!(prop.kind, PropKind::String | PropKind::Json) {
        return Err(CompileError::OverrideKindMismatch {
            schema: schema.to_string(),
            target: prop.path_str(),
            expected: "string or json",
            actual: prop.kind_name(),
        });
    }
    prop.kind = PropKind::Json;
    prop.data.widget_kind = Some(WidgetKind::CodeEditor);
    prop.add_suggest_source(Suggestion::new("String Template", "/domain/Rendered/Value"));
    Ok(())
}

/// Stable id for a function an override adds to `schema`.
pub fn override_func_id(schema: &str, name: &str) -> String {
    func_id(&format!("{schema}/{name}"))
}

pub fn variant_for_override(package: &mut CompiledPackage) -> Result<&mut SchemaVariant> {
    let name = package.name.clone();
    package
        .variant_mut()
        .ok_or(CompileError::MissingVariant(name))
}

/// Direct child of `parent`, matched case-insensitively.
pub fn prop_for_override<'a>(
    schema: &str,
    parent: &'a mut PropertyNode,
    name: &str,
) -> Result<&'a mut PropertyNode> {
    let parent_path = parent.path_str();
    parent
        .find_child_mut(name)
        .ok_or_else(|| CompileError::OverrideTargetNotFound {
            schema: schema.to_string(),
            parent: parent_path,
            target: name.to_string(),
        })
}

fn expect_kind<'a>(
    schema: &str,
    prop: &'a mut PropertyNode,
    expected: &'static str,
) -> Result<&'a mut PropertyNode> {
    if prop.kind_name() == expected {
        return Ok(prop);
    }
    Err(CompileError::OverrideKindMismatch {
        schema: schema.to_string(),
        target: prop.path_str(),
        expected,
        actual: prop.kind_name(),
    })
}

pub fn object_prop_for_override<'a>(
    schema: &str,
    parent: &'a mut PropertyNode,
    name: &str,
) -> Result<&'a mut PropertyNode> {
    expect_kind(schema, prop_for_override(schema, parent, name)?, "object")
}

pub fn array_prop_for_override<'a>(
    schema: &str,
    parent: &'a mut PropertyNode,
    name: &str,
) -> Result<&'a mut PropertyNode> {
    expect_kind(schema, prop_for_override(schema, parent, name)?, "array")
}

pub fn string_prop_for_override<'a>(
    schema: &str,
    parent: &'a mut PropertyNode,
    name: &str,
) -> Result<&'a mut PropertyNode> {
    expect_kind(schema, prop_for_override(schema, parent, name)?, "string")
}

/// Follows `path` from the domain root, case-insensitively.
pub fn domain_prop<'a>(
    package: &'a mut CompiledPackage,
    path: &[&str],
) -> Result<&'a mut PropertyNode> {
    let schema = package.name.clone();
    let mut current = &mut variant_for_override(package)?.domain;
    for segment in path {
        current = prop_for_override(&schema, current, segment)?;
    }
    Ok(current)
}

/// Replaces the package-local function `target_id` with `code` under a new
/// id, and re-points every binding to it.
pub fn modify_func(
    package: &mut CompiledPackage,
    target_id: &str,
    new_id: String,
    code: &str,
) -> Result<()> {
    let schema = package.name.clone();
    let func = package
        .func_mut(target_id)
        .ok_or_else(|| CompileError::FunctionNotFound {
            schema,
            func: target_id.to_string(),
        })?;
    func.unique_id = new_id.clone();
    func.data.code_base64 = Some(encode_code(code));
    func.data.handler = Some("main".to_string());

    let variant = variant_for_override(package)?;
    let repoint = |id: &mut String| {
        if id == target_id {
            *id = new_id.clone();
        }
    };
    variant
        .action_funcs
        .iter_mut()
        .for_each(|b| repoint(&mut b.func_unique_id));
    variant
        .leaf_functions
        .iter_mut()
        .for_each(|b| repoint(&mut b.func_unique_id));
    variant
        .management_funcs
        .iter_mut()
        .for_each(|b| repoint(&mut b.func_unique_id));
    Ok(())
}

/// Adds a new action of `kind` running `code`.
pub fn attach_extra_action(
    package: &mut CompiledPackage,
    name: &str,
    kind: ActionKind,
    code: &str,
) -> Result<()> {
    let id = override_func_id(&package.name, name);
    let func = new_func(name, Some(name), FuncKind::Action, "jsAction", "action", Some(code), id, &[]);
    variant_for_override(package)?
        .action_funcs
        .push(ActionFuncBinding {
            kind,
            func_unique_id: func.unique_id.clone(),
        });
    package.add_func(func);
    Ok(())
}

/// Adds a new management function running `code`.
pub fn attach_extra_management(package: &mut CompiledPackage, name: &str, code: &str) -> Result<()> {
    let id = override_func_id(&package.name, name);
    let func = new_func(name, Some(name), FuncKind::Management, "management", "management", Some(code), id, &[]);
    variant_for_override(package)?
        .management_funcs
        .push(ManagementFuncBinding {
            func_unique_id: func.unique_id.clone(),
        });
    package.add_func(func);
    Ok(())
}

/// Adds a qualification reading `inputs`.
pub fn attach_qualification(
    package: &mut CompiledPackage,
    name: &str,
    code: &str,
    inputs: &[LeafInput],
) -> Result<()> {
    let id = override_func_id(&package.name, name);
    let func = new_func(
        name,
        Some(name),
        FuncKind::Qualification,
        "jsAttribute",
        "qualification",
        Some(code),
        id,
        &[("domain", ArgumentKind::Object)],
    );
    variant_for_override(package)?
        .leaf_functions
        .push(LeafFuncBinding {
            leaf_kind: LeafKind::Qualification,
            func_unique_id: func.unique_id.clone(),
            inputs: inputs.to_vec(),
        });
    package.add_func(func);
    Ok(())
}

/// Moves the domain prop at `path` into the secrets tree and records it in
/// the prop usage map. A prop that does not exist is left alone.
pub fn add_secret_prop(
    package: &mut CompiledPackage,
    secret_kind: &str,
    secret_key: &str,
    path: &[&str],
) -> Result<()> {
    let schema = package.name.clone();
    let variant = variant_for_override(package)?;
    let Some((name, parent_path)) = path.split_last() else {
        return Ok(());
    };
    let Some(parent) = variant.domain.find_by_path_mut(parent_path) else {
        debug!(schema = %schema, prop = %name, "Secret prop parent not found");
        return Ok(());
    };
    let Some(mut secret) = parent.remove_entry(name) else {
        debug!(schema = %schema, prop = %name, "Secret prop not found");
        return Ok(());
    };

    secret.rebase(&TreeRoot::Secrets.path());
    secret.data.widget_kind = Some(WidgetKind::Secret);
    secret.data.widget_options.clear();
    secret.set_widget_option("secretKind", secret_kind);
    let secret_path = secret.metadata.prop_path.clone();

    variant
        .secrets
        .entries_mut()
        .ok_or_else(|| CompileError::MissingSecrets(schema.clone()))?
        .push(secret);

    let mut usage = PropUsageMap::read(variant, &schema)?;
    usage.secrets.push(SecretUsage {
        secret_key: secret_key.to_string(),
        prop_path: secret_path,
    });
    usage.write(variant, &schema)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::attach::attach_default_funcs;
    use crate::default_props::add_default_props;
    use crate::funcs::{UPDATE_ASSET, action_func};
    use crate::prop_tree::build_variant;
    use asset_spec_core::{RawSchema, SchemaSpec, validate_package};
    use serde_json::json;

    pub(crate) fn compiled(value: serde_json::Value) -> CompiledPackage {
        let schema: RawSchema = serde_json::from_value(value).unwrap();
        let name = schema.type_name.clone();
        let mut variant = build_variant(&Arc::new(schema)).unwrap();
        add_default_props(&mut variant, &name).unwrap();
        let mut package =
            CompiledPackage::new(SchemaSpec::new(name, "AWS", variant), "1", "now", "tests");
        attach_default_funcs(&mut package).unwrap();
        package
    }

    fn widget() -> CompiledPackage {
        compiled(json!({
            "typeName": "AWS::Demo::Widget",
            "properties": {
                "Name": { "type": "string" },
                "Password": { "type": "string" },
                "ExecutionRoleArn": { "type": "string" },
                "Config": {
                    "type": "object",
                    "properties": { "RoleArn": { "type": "string" } }
                }
            },
            "handlers": { "create": {}, "read": {}, "update": {} }
        }))
    }

    #[test]
    fn test_every_matching_prop_override_runs_in_order() {
        let mut package = widget();
        let table = vec![
            PropOverride::new(".*", ".*RoleArn", arn_prop("AWS::IAM::Role")),
            PropOverride::new("AWS::Demo::.*", "Config/RoleArn", suggest("AWS::Demo::Other", "Id")),
            PropOverride::new("AWS::Other::.*", ".*", suggest("AWS::Nope::Nope", "Id")),
        ];
        let applied = apply_prop_overrides(&mut package, "AWS::Demo::Widget", &table).unwrap();
        assert_eq!(applied, 3);

        let domain = &package.variant().unwrap().domain;
        let nested = domain.find_by_path(&["Config", "RoleArn"]).unwrap();
        assert_eq!(
            nested.data.ui_optionals.suggest_sources,
            vec![
                Suggestion::new("AWS::IAM::Role", "/resource_value/Arn"),
                Suggestion::new("AWS::Demo::Other", "/resource_value/Id"),
            ]
        );
        let top = domain.find_child("ExecutionRoleArn").unwrap();
        assert_eq!(top.data.ui_optionals.suggest_sources.len(), 1);
    }

    #[test]
    fn test_prop_patterns_are_anchored() {
        let entry = PropOverride::new("AWS::EC2::.*", "GroupId", suggest("x", "y"));
        assert!(entry.schema.is_match("AWS::EC2::Route"));
        assert!(!entry.schema.is_match("Custom::AWS::EC2::Route"));
        assert!(entry.prop.is_match("/domain/GroupId"));
        assert!(!entry.prop.is_match("/domain/SourceGroupId"));
        assert!(!entry.prop.is_match("/resource_value/GroupId"));
    }

    #[test]
    fn test_policy_document_rejects_objects() {
        let mut package = widget();
        let variant = package.variant_mut().unwrap();
        let config = variant.domain.find_child_mut("Config").unwrap();
        assert!(matches!(
            policy_document("AWS::Demo::Widget", config),
            Err(CompileError::OverrideKindMismatch { .. })
        ));

        let name = variant.domain.find_child_mut("Name").unwrap();
        policy_document("AWS::Demo::Widget", name).unwrap();
        assert_eq!(name.kind, PropKind::Json);
        assert_eq!(name.data.widget_kind, Some(WidgetKind::CodeEditor));
    }

    #[test]
    fn test_lookup_misses_are_fatal() {
        let mut package = widget();
        let err = domain_prop(&mut package, &["Missing"]).unwrap_err();
        assert!(!err.is_recoverable());
        assert!(matches!(err, CompileError::OverrideTargetNotFound { .. }));

        let domain = &mut package.variant_mut().unwrap().domain;
        assert!(matches!(
            object_prop_for_override("AWS::Demo::Widget", domain, "name"),
            Err(CompileError::OverrideKindMismatch { .. })
        ));
        assert!(string_prop_for_override("AWS::Demo::Widget", domain, "name").is_ok());
    }

    #[test]
    fn test_modify_func_repoints_bindings() {
        let mut package = widget();
        let target = action_func(UPDATE_ASSET).unwrap().func.unique_id();
        modify_func(&mut package, &target, "replaced".into(), "async function main() {}").unwrap();

        assert!(package.func(&target).is_none());
        assert!(package.func("replaced").is_some());
        let variant = package.variant().unwrap();
        assert!(variant.action_funcs.iter().any(|b| b.func_unique_id == "replaced"));
        assert!(validate_package(&package).is_empty());

        let err = modify_func(&mut package, &target, "again".into(), "").unwrap_err();
        assert!(matches!(err, CompileError::FunctionNotFound { .. }));
    }

    #[test]
    fn test_secret_prop_moves_and_is_recorded() {
        let mut package = widget();
        add_secret_prop(&mut package, "Secret String", "secretString", &["Password"]).unwrap();

        let variant = package.variant().unwrap();
        assert!(variant.domain.find_child("Password").is_none());
        let secret = variant.secrets.find_child("Password").unwrap();
        assert_eq!(secret.path_str(), "/secrets/Password");
        assert_eq!(secret.data.widget_kind, Some(WidgetKind::Secret));
        assert_eq!(secret.data.widget_options[0].value, "Secret String");

        let usage = PropUsageMap::read(variant, "AWS::Demo::Widget").unwrap();
        assert_eq!(usage.secrets.len(), 1);
        assert_eq!(usage.secrets[0].secret_key, "secretString");

        // A missing prop is not an error.
        add_secret_prop(&mut package, "Secret String", "secretString", &["Nope"]).unwrap();
    }

    #[test]
    fn test_extra_functions_get_stable_ids() {
        let mut package = widget();
        attach_extra_action(&mut package, "Reboot", ActionKind::Other, "async function main() {}").unwrap();
        attach_qualification(&mut package, "Check", "async function main() {}", &[LeafInput::Domain]).unwrap();

        let id = override_func_id("AWS::Demo::Widget", "Reboot");
        assert!(package.func(&id).is_some());
        let variant = package.variant().unwrap();
        assert!(variant.action_funcs.iter().any(|b| b.func_unique_id == id && b.kind == ActionKind::Other));
        assert!(validate_package(&package).is_empty());
    }
}
