//! Compiled property tree, socket, and function binding types.
//!
//! The property tree is an explicit sum type: every [`PropertyNode`] carries a
//! [`PropKind`] whose container variants own their children. Trees are
//! exclusively owned by one [`SchemaVariant`](crate::SchemaVariant); the only
//! cross-tree copy is [`PropertyNode::regenerate_ids`] on a deep clone.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version of the compiled package contract (semver).
pub const SPEC_CONTRACT_VERSION: &str = "1.0.0";

/// Widget option label marking a property as create-only.
pub const CREATE_ONLY_PROP_LABEL: &str = "si_create_only_prop";

/// Name of the reserved branch holding compiler-injected domain props.
pub const EXTRA_PROP_NAME: &str = "extra";

/// Generates a fresh, sortable unique id.
pub fn new_unique_id() -> String {
    ulid::Ulid::new().to_string()
}

/// The three trees owned by a schema variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeRoot {
    Domain,
    ResourceValue,
    Secrets,
}

impl TreeRoot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::ResourceValue => "resource_value",
            Self::Secrets => "secrets",
        }
    }

    /// The `["root", <tree>]` path prefix of this tree.
    pub fn path(&self) -> Vec<String> {
        vec!["root".to_string(), self.as_str().to_string()]
    }
}

/// UI widget used to edit a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetKind {
    Array,
    Checkbox,
    CodeEditor,
    ComboBox,
    Header,
    Map,
    Secret,
    Text,
}

impl WidgetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Array => "array",
            Self::Checkbox => "checkbox",
            Self::CodeEditor => "codeEditor",
            Self::ComboBox => "comboBox",
            Self::Header => "header",
            Self::Map => "map",
            Self::Secret => "secret",
            Self::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetOption {
    pub label: String,
    pub value: String,
}

impl WidgetOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A cross-schema hint: a value for this property likely comes from
/// `prop` on `schema`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Suggestion {
    pub schema: String,
    pub prop: String,
}

impl Suggestion {
    pub fn new(schema: impl Into<String>, prop: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            prop: prop.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiOptionals {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggest_sources: Vec<Suggestion>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggest_as_source_for: Vec<Suggestion>,
}

/// Input of an attribute function bound to a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AttrInput {
    #[serde(rename_all = "camelCase")]
    Prop { name: String, prop_path: String },
    #[serde(rename_all = "camelCase")]
    InputSocket { name: String, socket_name: String },
    Constant { name: String, value: Value },
}

/// Widget, validation, default value, and function binding data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_kind: Option<WidgetKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub widget_options: Vec<WidgetOption>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Joi validation expression, e.g. `Joi.string().required()`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func_unique_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<AttrInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default)]
    pub ui_optionals: UiOptionals,
}

/// Classification flags and the node's position in its tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropMetadata {
    #[serde(default)]
    pub create_only: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub write_only: bool,
    #[serde(default)]
    pub primary_identifier: bool,
    #[serde(default)]
    pub required: bool,
    /// Always starts `["root", <tree>]`.
    pub prop_path: Vec<String>,
}

/// Kind of a property, with per-kind payload.
///
/// Container kinds own their children: `array` and `map` own exactly one
/// element node, `object` owns an ordered list of entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PropKind {
    String,
    Number,
    Float,
    Boolean,
    Json,
    Array {
        #[serde(rename = "typeProp")]
        type_prop: Box<PropertyNode>,
    },
    Map {
        #[serde(rename = "typeProp")]
        type_prop: Box<PropertyNode>,
    },
    Object { entries: Vec<PropertyNode> },
}

impl PropKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Json => "json",
            Self::Array { .. } => "array",
            Self::Map { .. } => "map",
            Self::Object { .. } => "object",
        }
    }

    pub fn is_scalar(&self) -> bool {
        match self {
            Self::String | Self::Number | Self::Float | Self::Boolean | Self::Json => true,
            Self::Array { .. } | Self::Map { .. } | Self::Object { .. } => false,
        }
    }
}

/// A node of a compiled property tree.
///
/// # Examples
///
/// ```
/// use asset_spec_core::*;
///
/// let mut domain = PropertyNode::object("domain", &["root".to_string()]);
/// let name = PropertyNode::scalar("Name", PropKind::String, &domain.metadata.prop_path);
/// domain.push_entry(name);
///
/// assert_eq!(domain.children().len(), 1);
/// assert_eq!(domain.find_child("name").unwrap().path_str(), "/domain/Name");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyNode {
    pub unique_id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: PropKind,
    #[serde(default)]
    pub data: PropData,
    pub metadata: PropMetadata,
}

impl PropertyNode {
    /// Creates a node with a fresh id under `parent_path`.
    pub fn new(name: impl Into<String>, kind: PropKind, parent_path: &[String]) -> Self {
        let name = name.into();
        let mut prop_path = parent_path.to_vec();
        prop_path.push(name.clone());
        Self {
            unique_id: new_unique_id(),
            name,
            kind,
            data: PropData::default(),
            metadata: PropMetadata {
                prop_path,
                ..Default::default()
            },
        }
    }

    /// Creates an empty object with a header widget.
    pub fn object(name: impl Into<String>, parent_path: &[String]) -> Self {
        let mut node = Self::new(
            name,
            PropKind::Object {
                entries: Vec::new(),
            },
            parent_path,
        );
        node.data.widget_kind = Some(WidgetKind::Header);
        node
    }

    /// Creates a scalar with the default widget for its kind.
    pub fn scalar(name: impl Into<String>, kind: PropKind, parent_path: &[String]) -> Self {
        let widget = match kind {
            PropKind::Boolean => WidgetKind::Checkbox,
            PropKind::Json => WidgetKind::CodeEditor,
            _ => WidgetKind::Text,
        };
        let mut node = Self::new(name, kind, parent_path);
        node.data.widget_kind = Some(widget);
        node
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_scalar(&self) -> bool {
        self.kind.is_scalar()
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind, PropKind::Object { .. })
    }

    /// Direct children: the element of an array/map, the entries of an
    /// object, nothing for scalars.
    pub fn children(&self) -> &[PropertyNode] {
        match &self.kind {
            PropKind::Array { type_prop } | PropKind::Map { type_prop } => {
                std::slice::from_ref(&**type_prop)
            }
            PropKind::Object { entries } => entries,
            PropKind::String
            | PropKind::Number
            | PropKind::Float
            | PropKind::Boolean
            | PropKind::Json => &[],
        }
    }

    pub fn children_mut(&mut self) -> &mut [PropertyNode] {
        match &mut self.kind {
            PropKind::Array { type_prop } | PropKind::Map { type_prop } => {
                std::slice::from_mut(&mut **type_prop)
            }
            PropKind::Object { entries } => entries,
            PropKind::String
            | PropKind::Number
            | PropKind::Float
            | PropKind::Boolean
            | PropKind::Json => &mut [],
        }
    }

    /// Entries of an object node.
    pub fn entries(&self) -> Option<&Vec<PropertyNode>> {
        match &self.kind {
            PropKind::Object { entries } => Some(entries),
            _ => None,
        }
    }

    pub fn entries_mut(&mut self) -> Option<&mut Vec<PropertyNode>> {
        match &mut self.kind {
            PropKind::Object { entries } => Some(entries),
            _ => None,
        }
    }

    /// Element node of an array or map.
    pub fn element(&self) -> Option<&PropertyNode> {
        match &self.kind {
            PropKind::Array { type_prop } | PropKind::Map { type_prop } => Some(&**type_prop),
            _ => None,
        }
    }

    pub fn element_mut(&mut self) -> Option<&mut PropertyNode> {
        match &mut self.kind {
            PropKind::Array { type_prop } | PropKind::Map { type_prop } => Some(&mut **type_prop),
            _ => None,
        }
    }

    /// Appends an entry to an object node. Returns `false` for non-objects.
    pub fn push_entry(&mut self, child: PropertyNode) -> bool {
        match self.entries_mut() {
            Some(entries) => {
                entries.push(child);
                true
            }
            None => false,
        }
    }

    /// Finds a direct child by name, ignoring ASCII case.
    pub fn find_child(&self, name: &str) -> Option<&PropertyNode> {
        self.children()
            .iter()
            .find(|child| child.name.eq_ignore_ascii_case(name))
    }

    pub fn find_child_mut(&mut self, name: &str) -> Option<&mut PropertyNode> {
        self.children_mut()
            .iter_mut()
            .find(|child| child.name.eq_ignore_ascii_case(name))
    }

    /// Removes a direct entry of an object node by exact name.
    pub fn remove_entry(&mut self, name: &str) -> Option<PropertyNode> {
        let entries = self.entries_mut()?;
        let index = entries.iter().position(|child| child.name == name)?;
        Some(entries.remove(index))
    }

    /// Follows `segments` (relative to this node) by exact child name.
    pub fn find_by_path(&self, segments: &[&str]) -> Option<&PropertyNode> {
        let mut current = self;
        for segment in segments {
            current = current.children().iter().find(|c| c.name == *segment)?;
        }
        Some(current)
    }

    pub fn find_by_path_mut(&mut self, segments: &[&str]) -> Option<&mut PropertyNode> {
        let mut current = self;
        for segment in segments {
            current = current
                .children_mut()
                .iter_mut()
                .find(|c| c.name == *segment)?;
        }
        Some(current)
    }

    /// Slash-joined path without the leading `root`, e.g. `/domain/Name`.
    pub fn path_str(&self) -> String {
        prop_path_str(&self.metadata.prop_path)
    }

    /// Path segments below the tree root, e.g. `["Tags", "TagsItem"]`.
    pub fn path_below_tree(&self) -> &[String] {
        self.metadata.prop_path.get(2..).unwrap_or(&[])
    }

    /// Recomputes `prop_path` for this subtree as if attached under
    /// `parent_path`.
    pub fn rebase(&mut self, parent_path: &[String]) {
        let mut path = parent_path.to_vec();
        path.push(self.name.clone());
        let own = path.clone();
        self.metadata.prop_path = path;
        for child in self.children_mut() {
            child.rebase(&own);
        }
    }

    /// Replaces every unique id in this subtree with a fresh one.
    pub fn regenerate_ids(&mut self) {
        self.for_each_mut(&mut |node| node.unique_id = new_unique_id());
    }

    /// Breadth-first traversal, this node first.
    pub fn bfs(&self) -> Bfs<'_> {
        Bfs {
            queue: VecDeque::from([self]),
        }
    }

    /// Visits this subtree depth-first, parents before children.
    pub fn for_each_mut(&mut self, f: &mut impl FnMut(&mut PropertyNode)) {
        f(self);
        for child in self.children_mut() {
            child.for_each_mut(f);
        }
    }

    pub fn set_widget_option(&mut self, label: &str, value: &str) {
        match self
            .data
            .widget_options
            .iter_mut()
            .find(|opt| opt.label == label)
        {
            Some(existing) => existing.value = value.to_string(),
            None => self
                .data
                .widget_options
                .push(WidgetOption::new(label, value)),
        }
    }

    pub fn add_suggest_source(&mut self, suggestion: Suggestion) {
        let sources = &mut self.data.ui_optionals.suggest_sources;
        if !sources.contains(&suggestion) {
            sources.push(suggestion);
        }
    }

    pub fn add_suggest_as_source_for(&mut self, suggestion: Suggestion) {
        let targets = &mut self.data.ui_optionals.suggest_as_source_for;
        if !targets.contains(&suggestion) {
            targets.push(suggestion);
        }
    }

    pub fn is_create_only(&self) -> bool {
        self.data
            .widget_options
            .iter()
            .any(|opt| opt.label == CREATE_ONLY_PROP_LABEL)
    }
}

/// Breadth-first iterator over a property subtree.
pub struct Bfs<'a> {
    queue: VecDeque<&'a PropertyNode>,
}

impl<'a> Iterator for Bfs<'a> {
    type Item = &'a PropertyNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        self.queue.extend(node.children());
        Some(node)
    }
}

/// Formats a prop path without its `root` segment.
///
/// # Examples
///
/// ```
/// use asset_spec_core::prop_path_str;
///
/// let path = vec!["root".to_string(), "domain".to_string(), "Name".to_string()];
/// assert_eq!(prop_path_str(&path), "/domain/Name");
/// ```
pub fn prop_path_str(path: &[String]) -> String {
    let rest = match path.first() {
        Some(first) if first == "root" => &path[1..],
        _ => path,
    };
    format!("/{}", rest.join("/"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SocketKind {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SocketArity {
    One,
    Many,
}

/// Token sequence used for fuzzy cross-schema socket matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionAnnotation {
    pub tokens: Vec<String>,
}

impl ConnectionAnnotation {
    pub fn single(token: impl Into<String>) -> Self {
        Self {
            tokens: vec![token.into()],
        }
    }
}

/// Which property feeds (output) or receives (input) a socket's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketBinding {
    pub func_unique_id: String,
    pub prop_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketData {
    pub kind: SocketKind,
    pub arity: SocketArity,
    pub connection_annotations: Vec<ConnectionAnnotation>,
    #[serde(default)]
    pub ui_hidden: bool,
}

/// A connection point between assets.
///
/// # Examples
///
/// ```
/// use asset_spec_core::*;
///
/// let mut socket = Socket::new("VpcId", SocketKind::Output, SocketArity::One);
/// socket.add_annotation("Vpc");
/// socket.add_annotation("Vpc");
///
/// assert!(socket.has_annotation("VpcId"));
/// assert_eq!(socket.data.connection_annotations.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Socket {
    pub unique_id: String,
    pub name: String,
    pub data: SocketData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<SocketBinding>,
}

impl Socket {
    /// Creates a socket annotated with its own name.
    pub fn new(name: impl Into<String>, kind: SocketKind, arity: SocketArity) -> Self {
        let name = name.into();
        Self {
            unique_id: new_unique_id(),
            data: SocketData {
                kind,
                arity,
                connection_annotations: vec![ConnectionAnnotation::single(name.clone())],
                ui_hidden: false,
            },
            name,
            binding: None,
        }
    }

    pub fn with_binding(mut self, func_unique_id: &str, prop_path: impl Into<String>) -> Self {
        self.binding = Some(SocketBinding {
            func_unique_id: func_unique_id.to_string(),
            prop_path: prop_path.into(),
        });
        self
    }

    pub fn kind(&self) -> SocketKind {
        self.data.kind
    }

    /// Adds a single-token annotation unless already present.
    pub fn add_annotation(&mut self, token: impl Into<String>) {
        let annotation = ConnectionAnnotation::single(token);
        if !self.data.connection_annotations.contains(&annotation) {
            self.data.connection_annotations.push(annotation);
        }
    }

    pub fn has_annotation(&self, token: &str) -> bool {
        self.data
            .connection_annotations
            .iter()
            .any(|a| a.tokens.iter().any(|t| t == token))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FuncKind {
    Action,
    CodeGeneration,
    Qualification,
    Management,
    Intrinsic,
    Attribute,
    SchemaVariantDefinition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArgumentKind {
    Any,
    Array,
    Boolean,
    Json,
    Number,
    Object,
    String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuncArgument {
    pub name: String,
    pub kind: ArgumentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_kind: Option<ArgumentKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuncData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_base64: Option<String>,
    pub backend_kind: String,
    pub response_type: String,
    #[serde(default)]
    pub hidden: bool,
}

/// A behavior function carried by a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuncSpec {
    pub name: String,
    pub unique_id: String,
    pub kind: FuncKind,
    pub data: FuncData,
    #[serde(default)]
    pub arguments: Vec<FuncArgument>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
    Refresh,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionFuncBinding {
    pub kind: ActionKind,
    pub func_unique_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeafKind {
    CodeGeneration,
    Qualification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeafInput {
    Code,
    DeletedAt,
    Domain,
    Resource,
    Secrets,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafFuncBinding {
    pub leaf_kind: LeafKind,
    pub func_unique_id: String,
    pub inputs: Vec<LeafInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementFuncBinding {
    pub func_unique_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> PropertyNode {
        PropertyNode::object("domain", &["root".to_string()])
    }

    #[test]
    fn test_prop_kind_serializes_with_kind_tag() {
        let mut root = domain();
        let tags = PropertyNode::new(
            "Tags",
            PropKind::Array {
                type_prop: Box::new(PropertyNode::scalar(
                    "TagsItem",
                    PropKind::String,
                    &TreeRoot::Domain.path(),
                )),
            },
            &root.metadata.prop_path,
        );
        root.push_entry(tags);

        let json = serde_json::to_value(&root).unwrap();
        assert_eq!(json["kind"], "object");
        assert_eq!(json["entries"][0]["kind"], "array");
        assert_eq!(json["entries"][0]["typeProp"]["kind"], "string");

        let back: PropertyNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, root);
    }

    #[test]
    fn test_bfs_visits_level_by_level() {
        let mut root = domain();
        let mut a = PropertyNode::object("A", &root.metadata.prop_path);
        a.push_entry(PropertyNode::scalar(
            "Deep",
            PropKind::String,
            &a.metadata.prop_path,
        ));
        root.push_entry(a);
        root.push_entry(PropertyNode::scalar(
            "B",
            PropKind::Number,
            &root.metadata.prop_path,
        ));

        let names: Vec<&str> = root.bfs().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["domain", "A", "B", "Deep"]);
    }

    #[test]
    fn test_rebase_rewrites_descendant_paths() {
        let mut obj = PropertyNode::object("Rule", &TreeRoot::Domain.path());
        obj.push_entry(PropertyNode::scalar(
            "Port",
            PropKind::Number,
            &obj.metadata.prop_path,
        ));
        obj.rebase(&TreeRoot::Secrets.path());

        assert_eq!(obj.path_str(), "/secrets/Rule");
        assert_eq!(obj.children()[0].path_str(), "/secrets/Rule/Port");
    }

    #[test]
    fn test_regenerate_ids_changes_every_id() {
        let mut obj = PropertyNode::object("Rule", &TreeRoot::Domain.path());
        obj.push_entry(PropertyNode::scalar(
            "Port",
            PropKind::Number,
            &obj.metadata.prop_path,
        ));
        let before = obj.clone();
        obj.regenerate_ids();

        assert_ne!(obj.unique_id, before.unique_id);
        assert_ne!(obj.children()[0].unique_id, before.children()[0].unique_id);
        assert_eq!(obj.children()[0].name, "Port");
    }

    #[test]
    fn test_remove_entry_and_path_lookup() {
        let mut root = domain();
        let mut cfg = PropertyNode::object("Config", &root.metadata.prop_path);
        cfg.push_entry(PropertyNode::scalar(
            "Mode",
            PropKind::String,
            &cfg.metadata.prop_path,
        ));
        root.push_entry(cfg);

        assert!(root.find_by_path(&["Config", "Mode"]).is_some());
        assert!(root.find_by_path(&["Config", "mode"]).is_none());
        assert!(root.remove_entry("Config").is_some());
        assert!(root.children().is_empty());
    }

    #[test]
    fn test_socket_annotations_deduplicate() {
        let mut socket = Socket::new("SubnetId", SocketKind::Input, SocketArity::Many);
        socket.add_annotation("SubnetId");
        assert_eq!(socket.data.connection_annotations.len(), 1);
    }
}
