use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ActionFuncBinding, FuncSpec, HandlerKind, LeafFuncBinding, ManagementFuncBinding,
    PropertyNode, RawSchema, Socket, SocketKind, TreeRoot, new_unique_id,
};

/// Display and asset-definition data of a schema variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantData {
    pub version: String,
    pub display_name: String,
    pub category: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Id of the asset-definition function generated for this variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func_unique_id: Option<String>,
}

/// The single variant of a compiled schema.
///
/// Owns its three property trees, its sockets and its function bindings.
/// `source` points back to the raw schema the variant was built from; it is
/// `None` for generated sub-assets.
///
/// # Examples
///
/// ```
/// use asset_spec_core::*;
///
/// let variant = SchemaVariant::empty(VariantData::default());
/// assert_eq!(variant.domain.path_str(), "/domain");
/// assert!(variant.domain.children().is_empty());
/// assert!(!variant.has_handler(HandlerKind::Read));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaVariant {
    pub unique_id: String,
    pub data: VariantData,
    pub domain: PropertyNode,
    pub resource_value: PropertyNode,
    pub secrets: PropertyNode,
    #[serde(default)]
    pub sockets: Vec<Socket>,
    #[serde(default)]
    pub action_funcs: Vec<ActionFuncBinding>,
    #[serde(default)]
    pub leaf_functions: Vec<LeafFuncBinding>,
    #[serde(default)]
    pub management_funcs: Vec<ManagementFuncBinding>,
    #[serde(skip)]
    pub source: Option<Arc<RawSchema>>,
}

impl SchemaVariant {
    /// Creates a variant with three empty object trees.
    pub fn empty(data: VariantData) -> Self {
        let root = vec!["root".to_string()];
        let mut domain = PropertyNode::object(TreeRoot::Domain.as_str(), &root);
        let mut resource_value = PropertyNode::object(TreeRoot::ResourceValue.as_str(), &root);
        let mut secrets = PropertyNode::object(TreeRoot::Secrets.as_str(), &root);
        for tree in [&mut domain, &mut resource_value, &mut secrets] {
            tree.metadata.required = true;
        }
        Self {
            unique_id: new_unique_id(),
            data,
            domain,
            resource_value,
            secrets,
            sockets: Vec::new(),
            action_funcs: Vec::new(),
            leaf_functions: Vec::new(),
            management_funcs: Vec::new(),
            source: None,
        }
    }

    pub fn tree(&self, root: TreeRoot) -> &PropertyNode {
        match root {
            TreeRoot::Domain => &self.domain,
            TreeRoot::ResourceValue => &self.resource_value,
            TreeRoot::Secrets => &self.secrets,
        }
    }

    pub fn tree_mut(&mut self, root: TreeRoot) -> &mut PropertyNode {
        match root {
            TreeRoot::Domain => &mut self.domain,
            TreeRoot::ResourceValue => &mut self.resource_value,
            TreeRoot::Secrets => &mut self.secrets,
        }
    }

    /// Whether the source schema declares `kind`. Always `false` for
    /// variants without a source.
    pub fn has_handler(&self, kind: HandlerKind) -> bool {
        self.source
            .as_ref()
            .is_some_and(|schema| schema.has_handler(kind))
    }

    pub fn sockets_of(&self, kind: SocketKind) -> impl Iterator<Item = &Socket> {
        self.sockets.iter().filter(move |s| s.kind() == kind)
    }

    pub fn find_socket(&self, name: &str, kind: SocketKind) -> Option<&Socket> {
        self.sockets_of(kind).find(|s| s.name == name)
    }

    /// Adds a socket unless one of the same name and direction exists.
    /// Returns whether it was added.
    pub fn add_socket(&mut self, socket: Socket) -> bool {
        if self.find_socket(&socket.name, socket.kind()).is_some() {
            return false;
        }
        self.sockets.push(socket);
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaData {
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(default)]
    pub ui_hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_schema_variant: Option<String>,
}

/// A schema and its variants. Compiled packages carry exactly one of each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSpec {
    pub name: String,
    pub unique_id: String,
    pub data: SchemaData,
    pub variants: Vec<SchemaVariant>,
}

impl SchemaSpec {
    /// Creates a schema owning `variant` as its default variant.
    pub fn new(name: impl Into<String>, category: impl Into<String>, variant: SchemaVariant) -> Self {
        let name = name.into();
        Self {
            unique_id: new_unique_id(),
            data: SchemaData {
                name: name.clone(),
                category: category.into(),
                category_name: None,
                ui_hidden: false,
                default_schema_variant: Some(variant.unique_id.clone()),
            },
            name,
            variants: vec![variant],
        }
    }
}

/// A compiled, self-contained package: one schema, one variant, and every
/// function the variant references.
///
/// # Examples
///
/// ```
/// use asset_spec_core::*;
///
/// let variant = SchemaVariant::empty(VariantData::default());
/// let schema = SchemaSpec::new("AWS::Demo::Widget", "AWS::Demo", variant);
/// let mut package = CompiledPackage::new(schema, "2025-01-01", "2025-01-01T00:00:00Z", "Clover");
///
/// assert_eq!(package.kind, "module");
/// assert_eq!(package.name, "AWS::Demo::Widget");
/// assert!(package.variant().is_some());
/// assert!(package.variant_mut().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledPackage {
    pub kind: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub created_at: String,
    pub created_by: String,
    pub schemas: Vec<SchemaSpec>,
    pub funcs: Vec<FuncSpec>,
    #[serde(default)]
    pub change_sets: Vec<Value>,
}

impl CompiledPackage {
    pub fn new(
        schema: SchemaSpec,
        version: impl Into<String>,
        created_at: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            kind: "module".to_string(),
            name: schema.name.clone(),
            version: version.into(),
            description: String::new(),
            created_at: created_at.into(),
            created_by: created_by.into(),
            schemas: vec![schema],
            funcs: Vec::new(),
            change_sets: Vec::new(),
        }
    }

    pub fn schema(&self) -> Option<&SchemaSpec> {
        self.schemas.first()
    }

    pub fn schema_mut(&mut self) -> Option<&mut SchemaSpec> {
        self.schemas.first_mut()
    }

    pub fn variant(&self) -> Option<&SchemaVariant> {
        self.schema()?.variants.first()
    }

    pub fn variant_mut(&mut self) -> Option<&mut SchemaVariant> {
        self.schema_mut()?.variants.first_mut()
    }

    /// The raw type name this package was compiled from, if any.
    pub fn type_name(&self) -> Option<&str> {
        self.variant()?
            .source
            .as_deref()
            .map(|schema| schema.type_name.as_str())
    }

    pub fn func(&self, unique_id: &str) -> Option<&FuncSpec> {
        self.funcs.iter().find(|f| f.unique_id == unique_id)
    }

    pub fn func_mut(&mut self, unique_id: &str) -> Option<&mut FuncSpec> {
        self.funcs.iter_mut().find(|f| f.unique_id == unique_id)
    }

    pub fn func_by_name(&self, name: &str) -> Option<&FuncSpec> {
        self.funcs.iter().find(|f| f.name == name)
    }

    /// Adds a function unless one with the same id is already present.
    pub fn add_func(&mut self, func: FuncSpec) {
        if self.func(&func.unique_id).is_none() {
            self.funcs.push(func);
        }
    }

    /// Drops every function no binding, socket, or prop refers to.
    pub fn retain_referenced_funcs(&mut self) {
        let Some(variant) = self.variant() else {
            return;
        };
        let mut used: Vec<String> = Vec::new();
        used.extend(variant.data.func_unique_id.iter().cloned());
        used.extend(variant.action_funcs.iter().map(|b| b.func_unique_id.clone()));
        used.extend(variant.leaf_functions.iter().map(|b| b.func_unique_id.clone()));
        used.extend(
            variant
                .management_funcs
                .iter()
                .map(|b| b.func_unique_id.clone()),
        );
        used.extend(
            variant
                .sockets
                .iter()
                .filter_map(|s| s.binding.as_ref().map(|b| b.func_unique_id.clone())),
        );
        for tree in [&variant.domain, &variant.resource_value, &variant.secrets] {
            used.extend(tree.bfs().filter_map(|n| n.data.func_unique_id.clone()));
        }
        self.funcs.retain(|f| used.contains(&f.unique_id));
    }
}
