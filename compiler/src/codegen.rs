//! Asset definition code generation.
//!
//! Every variant is serialized into a TypeScript `AssetBuilder` program, one
//! `const` declaration per tree node, children before their parents. Domain
//! props come first, then secrets, then resource values, then input sockets,
//! then output sockets. The program is stored as the package's
//! schema-variant-definition function.

use asset_spec_core::{
    AttrInput, CompiledPackage, FuncKind, PropKind, PropertyNode, SchemaVariant, Socket,
    SocketArity, SocketKind, TreeRoot, WidgetKind,
};

use crate::funcs::{func_id, new_func};
use crate::{CompileError, Result};

/// Renders the `AssetBuilder` program for `variant`.
///
/// The output depends only on tree shape and prop data, never on unique
/// ids, so recompiling the same schema yields the same program.
///
/// # Examples
///
/// ```
/// use asset_spec_compiler::codegen::generate_asset_code;
/// use asset_spec_core::{PropKind, PropertyNode, SchemaVariant, TreeRoot, VariantData};
///
/// let mut variant = SchemaVariant::empty(VariantData::default());
/// variant
///     .domain
///     .push_entry(PropertyNode::scalar("Name", PropKind::String, &TreeRoot::Domain.path()));
///
/// let code = generate_asset_code(&variant);
/// assert!(code.contains(".setName(\"Name\")"));
/// assert!(code.contains("asset.addProp(prop0);"));
/// ```
pub fn generate_asset_code(variant: &SchemaVariant) -> String {
    let mut writer = AssetWriter::default();
    writer.out.push_str("function main() {\n");
    writer.out.push_str("  const asset = new AssetBuilder();\n");

    for prop in variant.domain.children() {
        let var = writer.prop(prop, false);
        writer.out.push_str(&format!("  asset.addProp({var});\n"));
    }
    for prop in variant.secrets.children() {
        let is_secret = prop.data.widget_kind == Some(WidgetKind::Secret);
        let var = writer.prop(prop, is_secret);
        if is_secret {
            writer.out.push_str(&format!("  asset.addSecretProp({var});\n"));
        } else {
            writer.out.push_str(&format!("  asset.addProp({var});\n"));
        }
    }
    for prop in variant.resource_value.children() {
        let var = writer.prop(prop, false);
        writer.out.push_str(&format!("  asset.addResourceProp({var});\n"));
    }
    for kind in [SocketKind::Input, SocketKind::Output] {
        for socket in variant.sockets_of(kind) {
            let var = writer.socket(socket);
            let method = match kind {
                SocketKind::Input => "addInputSocket",
                SocketKind::Output => "addOutputSocket",
            };
            writer.out.push_str(&format!("  asset.{method}({var});\n"));
        }
    }

    writer.out.push_str("  return asset.build();\n");
    writer.out.push_str("}\n");
    writer.out
}

#[derive(Default)]
struct AssetWriter {
    out: String,
    props: usize,
    sockets: usize,
}

impl AssetWriter {
    /// Declares `prop` and its subtree; returns the variable holding it.
    fn prop(&mut self, prop: &PropertyNode, secret: bool) -> String {
        let children: Vec<String> = match &prop.kind {
            PropKind::Object { entries } => entries.iter().map(|c| self.prop(c, false)).collect(),
            PropKind::Array { type_prop } | PropKind::Map { type_prop } => {
                vec![self.prop(type_prop, false)]
            }
            PropKind::String
            | PropKind::Number
            | PropKind::Float
            | PropKind::Boolean
            | PropKind::Json => Vec::new(),
        };

        let var = format!("prop{}", self.props);
        self.props += 1;

        let builder = if secret { "SecretPropBuilder" } else { "PropBuilder" };
        let mut calls = vec![format!("setName({})", literal(&prop.name))];
        if secret {
            let kind = prop
                .data
                .widget_options
                .iter()
                .find(|o| o.label == "secretKind")
                .map(|o| o.value.as_str())
                .unwrap_or_default();
            calls.push(format!("setSecretKind({})", literal(kind)));
        } else {
            calls.push(format!("setKind({})", literal(prop.kind_name())));
        }

        match &prop.kind {
            PropKind::Object { .. } => {
                calls.extend(children.iter().map(|c| format!("addChild({c})")));
            }
            PropKind::Array { .. } | PropKind::Map { .. } => {
                calls.extend(children.iter().map(|c| format!("setEntry({c})")));
            }
            _ => {}
        }

        let data = &prop.data;
        if data.hidden {
            calls.push("setHidden(true)".to_string());
        }
        match data.widget_kind {
            Some(widget) if !secret => {
                calls.push(format!("setWidget({})", widget_definition(prop, widget)));
            }
            _ => {}
        }
        if let Some(default) = &data.default_value {
            calls.push(format!("setDefaultValue({default})"));
        }
        if let Some(validation) = &data.validation_format {
            calls.push(format!("setValidationFormat({validation})"));
        }
        if let Some(value_from) = data.inputs.iter().find_map(value_from) {
            calls.push(format!("setValueFrom({value_from})"));
        }
        if let Some(doc_link) = &data.doc_link {
            calls.push(format!("setDocLink({})", literal(doc_link)));
        }
        if let Some(documentation) = &data.documentation {
            calls.push(format!("setDocumentation({})", literal(documentation)));
        }

        self.declare(&var, builder, &calls);
        var
    }

    fn socket(&mut self, socket: &Socket) -> String {
        let var = format!("socket{}", self.sockets);
        self.sockets += 1;

        let arity = match socket.data.arity {
            SocketArity::One => "one",
            SocketArity::Many => "many",
        };
        let mut calls = vec![
            format!("setName({})", literal(&socket.name)),
            format!("setArity({})", literal(arity)),
        ];
        for annotation in &socket.data.connection_annotations {
            let tokens: Vec<String> = annotation.tokens.iter().map(|t| literal(t)).collect();
            calls.push(format!("setConnectionAnnotation([{}])", tokens.join(", ")));
        }
        if socket.data.ui_hidden {
            calls.push("setUiHidden(true)".to_string());
        }
        // Input sockets are read by props, not the other way round.
        if let (SocketKind::Output, Some(binding)) = (socket.kind(), &socket.binding) {
            calls.push(format!("setValueFrom({})", prop_value_from(&binding.prop_path)));
        }

        self.declare(&var, "SocketDefinitionBuilder", &calls);
        var
    }

    fn declare(&mut self, var: &str, builder: &str, calls: &[String]) {
        self.out.push_str(&format!("\n  const {var} = new {builder}()\n"));
        for call in calls {
            self.out.push_str(&format!("    .{call}\n"));
        }
        self.out.push_str("    .build();\n");
    }
}

fn widget_definition(prop: &PropertyNode, widget: WidgetKind) -> String {
    let mut out = format!(
        "new PropWidgetDefinitionBuilder().setKind({})",
        literal(widget.as_str())
    );
    for option in &prop.data.widget_options {
        out.push_str(&format!(
            ".addOption({}, {})",
            literal(&option.label),
            literal(&option.value)
        ));
    }
    out.push_str(".build()");
    out
}

fn value_from(input: &AttrInput) -> Option<String> {
    match input {
        AttrInput::InputSocket { socket_name, .. } => Some(format!(
            "new ValueFromBuilder().setKind(\"inputSocket\").setSocketName({}).build()",
            literal(socket_name)
        )),
        AttrInput::Prop { prop_path, .. } => Some(prop_value_from(prop_path)),
        AttrInput::Constant { .. } => None,
    }
}

fn prop_value_from(prop_path: &str) -> String {
    let segments: Vec<String> = std::iter::once("root")
        .chain(prop_path.split('/').filter(|s| !s.is_empty()))
        .map(literal)
        .collect();
    format!(
        "new ValueFromBuilder().setKind(\"prop\").setPropPath([{}]).build()",
        segments.join(", ")
    )
}

/// A JavaScript string literal. JSON string syntax is valid JavaScript.
fn literal(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Generates the asset definition for `package` and binds it to the variant.
pub fn attach_asset_definition(package: &mut CompiledPackage) -> Result<()> {
    let schema = package.name.clone();
    let variant = package
        .variant_mut()
        .ok_or_else(|| CompileError::MissingVariant(schema.clone()))?;
    if !variant.tree(TreeRoot::Domain).is_object() {
        return Err(CompileError::MissingDomain(schema));
    }

    let code = generate_asset_code(variant);
    let id = func_id(&code);
    let display_name = variant.data.display_name.clone();
    variant.data.func_unique_id = Some(id.clone());

    let func = new_func(
        &schema,
        Some(display_name.as_str()).filter(|n| !n.is_empty()),
        FuncKind::SchemaVariantDefinition,
        "jsSchemaVariantDefinition",
        "schemaVariantDefinition",
        Some(&code),
        id,
        &[],
    );
    package.add_func(func);
    Ok(())
}
