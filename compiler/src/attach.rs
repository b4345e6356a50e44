//! Handler-gated attachment of the default functions.

use asset_spec_core::{
    ActionFuncBinding, CompiledPackage, FuncSpec, LeafFuncBinding, ManagementFuncBinding,
    SchemaVariant,
};

use crate::funcs::{
    ACTION_FUNCS, CODE_GENERATION_FUNCS, IDENTITY_FUNC, LeafTemplate, MANAGEMENT_FUNCS,
    QUALIFICATION_FUNCS,
};
use crate::{CompileError, Result};

/// Attaches every default function the package's source schema supports.
///
/// Actions need the handler matching their kind (`refresh` and `other` need
/// `read`); management functions need every handler they declare; leaf
/// functions need their declared handlers, if any. Variants without a source
/// schema (extracted sub-assets) get nothing.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use asset_spec_compiler::{attach::attach_default_funcs, prop_tree::build_variant};
/// use asset_spec_core::{ActionKind, CompiledPackage, RawSchema, SchemaSpec};
///
/// let schema: RawSchema = serde_json::from_value(serde_json::json!({
///     "typeName": "AWS::Demo::Widget",
///     "properties": { "Name": { "type": "string" } },
///     "handlers": { "create": {}, "read": {} }
/// }))
/// .unwrap();
/// let variant = build_variant(&Arc::new(schema)).unwrap();
/// let mut package = CompiledPackage::new(
///     SchemaSpec::new("AWS::Demo::Widget", "AWS::Demo", variant),
///     "1",
///     "2025-01-01T00:00:00Z",
///     "docs",
/// );
///
/// attach_default_funcs(&mut package).unwrap();
/// let kinds: Vec<ActionKind> = package
///     .variant()
///     .unwrap()
///     .action_funcs
///     .iter()
///     .map(|b| b.kind)
///     .collect();
/// assert_eq!(kinds, vec![ActionKind::Create, ActionKind::Refresh]);
/// ```
pub fn attach_default_funcs(package: &mut CompiledPackage) -> Result<()> {
    let name = package.name.clone();
    let variant = package
        .variant_mut()
        .ok_or_else(|| CompileError::MissingVariant(name))?;
    let Some(schema) = variant.source.clone() else {
        return Ok(());
    };

    let mut funcs = Vec::new();

    for template in &ACTION_FUNCS {
        if !schema.has_handler(template.required_handler()) {
            continue;
        }
        let func = template.func.to_spec();
        variant.action_funcs.push(ActionFuncBinding {
            kind: template.kind,
            func_unique_id: func.unique_id.clone(),
        });
        funcs.push(func);
    }

    for template in CODE_GENERATION_FUNCS.iter().chain(&QUALIFICATION_FUNCS) {
        if template.func.is_supported_by(&schema) {
            funcs.push(bind_leaf(variant, template));
        }
    }

    for template in &MANAGEMENT_FUNCS {
        if !template.is_supported_by(&schema) {
            continue;
        }
        let func = template.to_spec();
        variant.management_funcs.push(ManagementFuncBinding {
            func_unique_id: func.unique_id.clone(),
        });
        funcs.push(func);
    }

    if uses_identity(variant) {
        funcs.push(IDENTITY_FUNC.to_spec());
    }

    for func in funcs {
        package.add_func(func);
    }
    Ok(())
}

fn bind_leaf(variant: &mut SchemaVariant, template: &LeafTemplate) -> FuncSpec {
    let func = template.func.to_spec();
    variant.leaf_functions.push(LeafFuncBinding {
        leaf_kind: template.leaf_kind,
        func_unique_id: func.unique_id.clone(),
        inputs: template.inputs.to_vec(),
    });
    func
}

/// Whether any socket or prop of `variant` is bound through the identity
/// function.
pub fn uses_identity(variant: &SchemaVariant) -> bool {
    let identity = IDENTITY_FUNC.unique_id();
    let in_sockets = variant
        .sockets
        .iter()
        .filter_map(|s| s.binding.as_ref())
        .any(|b| b.func_unique_id == identity);
    in_sockets
        || [&variant.domain, &variant.resource_value, &variant.secrets]
            .into_iter()
            .flat_map(|tree| tree.bfs())
            .any(|node| node.data.func_unique_id.as_deref() == Some(identity.as_str()))
}
