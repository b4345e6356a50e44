//! Typed property tree construction.
//!
//! [`PropTreeBuilder`] turns one [`RawSchema`]'s property definitions into
//! the domain, resource_value, and secrets trees of a [`SchemaVariant`].
//! Construction uses an explicit worklist instead of recursion: every raw
//! property becomes a shell in an arena, children are queued behind their
//! parent, and the finished tree is assembled bottom-up once the queue
//! drains. Paths longer than [`MAX_PROP_DEPTH`] segments abort the run.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use asset_spec_compiler::prop_tree::build_variant;
//! use asset_spec_core::{PropKind, RawSchema};
//!
//! let schema: RawSchema = serde_json::from_value(serde_json::json!({
//!     "typeName": "AWS::Demo::Widget",
//!     "properties": {
//!         "Name": { "type": "string" },
//!         "Id": { "type": "string" }
//!     },
//!     "readOnlyProperties": ["/properties/Id"]
//! }))
//! .unwrap();
//!
//! let variant = build_variant(&Arc::new(schema)).unwrap();
//! let name = variant.domain.find_child("Name").unwrap();
//! assert!(matches!(name.kind, PropKind::String));
//! assert!(name.metadata.required);
//! assert!(variant.resource_value.find_child("Id").unwrap().metadata.read_only);
//! ```

use std::borrow::Cow;
use std::collections::VecDeque;
use std::sync::Arc;

use asset_spec_core::{
    AdditionalProperties, CREATE_ONLY_PROP_LABEL, OnlyProperties, PropKind, PropertyNode,
    RawProperty, RawSchema, SchemaVariant, TreeRoot, TypeNameParts, TypeValue, VariantData,
    WidgetKind, WidgetOption,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::validation::{
    ValidationIssue, doc_link, number_validation, presence_validation, resource_doc_link,
    string_validation,
};
use crate::{CompileError, Result};

/// Longest allowed prop path, counting the `root` and tree segments.
pub const MAX_PROP_DEPTH: usize = 30;

/// Variant color used for every AWS asset.
pub const AWS_COLOR: &str = "#FF9900";

/// Builds a variant with all three trees for `schema`.
pub fn build_variant(schema: &Arc<RawSchema>) -> Result<SchemaVariant> {
    let builder = PropTreeBuilder::new(schema);
    let parts = schema.type_parts();

    let mut variant = SchemaVariant::empty(VariantData {
        version: String::new(),
        display_name: schema.type_name.clone(),
        category: category_name(&parts),
        color: AWS_COLOR.to_string(),
        link: Some(resource_doc_link(&schema.type_name)),
        description: schema.description.clone(),
        func_unique_id: None,
    });
    for root in [TreeRoot::Domain, TreeRoot::ResourceValue, TreeRoot::Secrets] {
        let entries = builder.build_entries(root)?;
        if let Some(tree) = variant.tree_mut(root).entries_mut() {
            *tree = entries;
        }
    }
    variant.source = Some(Arc::clone(schema));
    Ok(variant)
}

/// `Vendor::Category`, the category every asset of a service shares.
pub fn category_name(parts: &TypeNameParts<'_>) -> String {
    if parts.category.is_empty() {
        parts.vendor.to_string()
    } else {
        format!("{}::{}", parts.vendor, parts.category)
    }
}

/// Builds prop trees for one raw schema.
pub struct PropTreeBuilder<'a> {
    schema: &'a RawSchema,
    only: OnlyProperties,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Scalar,
    Array,
    Map,
    Object,
}

/// The resolved JSON type of a normalized raw property.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolved {
    Integer,
    Number,
    Boolean,
    String,
    Json,
    Array,
    Object,
    Unknown(String),
    Missing,
}

/// Where a child's raw definition lives inside its parent.
#[derive(Debug, Clone, Copy)]
enum ChildSource {
    Items,
    Pattern(usize),
    Additional,
    Property(usize),
}

struct Task<'a> {
    path: Vec<String>,
    raw: Cow<'a, RawProperty>,
    parent: Option<(usize, Shape)>,
    required: bool,
    /// Definition the prop is nested in, for documentation links.
    enclosing_def: Option<String>,
}

struct Shell {
    node: PropertyNode,
    shape: Shape,
    children: Vec<usize>,
}

impl<'a> PropTreeBuilder<'a> {
    pub fn new(schema: &'a RawSchema) -> Self {
        Self {
            schema,
            only: OnlyProperties::from_schema(schema),
        }
    }

    /// Builds the entries of one tree root. Domain receives every writable
    /// top-level property, resource_value the read-only ones, and secrets
    /// starts empty.
    pub fn build_entries(&self, root: TreeRoot) -> Result<Vec<PropertyNode>> {
        let props: Vec<(&'a str, &'a RawProperty)> = match root {
            TreeRoot::Secrets => Vec::new(),
            TreeRoot::Domain | TreeRoot::ResourceValue => self
                .schema
                .properties
                .iter()
                .filter(|(name, _)| {
                    self.only.read_only.contains(name.as_str()) == (root == TreeRoot::ResourceValue)
                })
                .map(|(name, raw)| (name.as_str(), raw))
                .collect(),
        };
        self.build_props(&root.path(), props)
    }

    /// Builds a list of sibling props under `parent_path` with the worklist.
    pub fn build_props(
        &self,
        parent_path: &[String],
        props: Vec<(&'a str, &'a RawProperty)>,
    ) -> Result<Vec<PropertyNode>> {
        let mut queue: VecDeque<Task<'a>> = props
            .into_iter()
            .map(|(name, raw)| {
                let mut path = parent_path.to_vec();
                path.push(name.to_string());
                Task {
                    path,
                    raw: Cow::Borrowed(raw),
                    parent: None,
                    required: true,
                    enclosing_def: None,
                }
            })
            .collect();

        let mut arena: Vec<Shell> = Vec::new();
        let mut roots: Vec<usize> = Vec::new();

        while let Some(task) = queue.pop_front() {
            if task.path.len() > MAX_PROP_DEPTH {
                return Err(CompileError::DepthExceeded {
                    schema: self.schema.type_name.clone(),
                    path: task.path.join("/"),
                    limit: MAX_PROP_DEPTH,
                });
            }

            let parent = task.parent;
            let Some((shell, children)) = self.process(task)? else {
                continue;
            };
            let index = arena.len();
            arena.push(shell);
            match parent {
                Some((parent_index, _)) => arena[parent_index].children.push(index),
                None => roots.push(index),
            }
            for mut child in children {
                child.parent = Some((index, arena[index].shape));
                queue.push_back(child);
            }
        }

        Ok(assemble(arena, &roots))
    }

    /// Turns one task into a shell plus the tasks for its children.
    fn process(&self, task: Task<'a>) -> Result<Option<(Shell, Vec<Task<'a>>)>> {
        let Task {
            path,
            raw,
            parent,
            required,
            enclosing_def,
        } = task;
        let raw = normalize(raw);
        let name = path.last().cloned().unwrap_or_default();
        let parent_path = &path[..path.len().saturating_sub(1)];

        if raw.reference.is_some() && raw.type_value.is_none() {
            debug!(
                schema = %self.schema.type_name,
                path = %path.join("/"),
                "Circular or unresolved property definition, skipping"
            );
            return Ok(None);
        }

        let resolved = resolve_type(&raw);
        let (kind, shape, sources) = match &resolved {
            Resolved::Integer | Resolved::Number => {
                let kind = if resolved == Resolved::Integer {
                    PropKind::Number
                } else {
                    PropKind::Float
                };
                (kind, Shape::Scalar, Vec::new())
            }
            Resolved::Boolean => (PropKind::Boolean, Shape::Scalar, Vec::new()),
            Resolved::String | Resolved::Json => (PropKind::String, Shape::Scalar, Vec::new()),
            Resolved::Array => {
                if raw.items.is_none() {
                    warn!(schema = %self.schema.type_name, path = %path.join("/"), "Array without items, skipping");
                    return Ok(None);
                }
                (placeholder(), Shape::Array, vec![ChildSource::Items])
            }
            Resolved::Object => self.object_plan(&raw, &path)?,
            Resolved::Unknown(type_name) => {
                return Err(CompileError::UnsupportedType {
                    schema: self.schema.type_name.clone(),
                    path: format!("{} (type {type_name})", path.join("/")),
                });
            }
            Resolved::Missing => {
                if raw.title.is_some() || raw.description.is_some() {
                    warn!(
                        schema = %self.schema.type_name,
                        path = %path.join("/"),
                        "No type for prop, skipping"
                    );
                    return Ok(None);
                }
                return Err(CompileError::UnsupportedType {
                    schema: self.schema.type_name.clone(),
                    path: path.join("/"),
                });
            }
        };

        let mut node = PropertyNode::new(name.clone(), kind, parent_path);
        node.metadata.required = required;
        node.metadata.create_only = self.only.create_only.contains(&name);
        node.metadata.read_only = self.only.read_only.contains(&name);
        node.metadata.write_only = self.only.write_only.contains(&name);
        node.metadata.primary_identifier = self.only.primary_identifier.contains(&name);
        node.data.documentation = raw.description.clone();
        if matches!(parent, None | Some((_, Shape::Object))) {
            node.data.doc_link = Some(doc_link(
                &self.schema.type_name,
                enclosing_def.as_deref(),
                &name,
            ));
        }
        if node.metadata.create_only {
            node.data
                .widget_options
                .push(WidgetOption::new(CREATE_ONLY_PROP_LABEL, "true"));
        }

        self.apply_widget_and_validation(&mut node, &raw, &resolved, shape, &path)?;

        let child_def = raw.def_name.clone().or(enclosing_def);
        let mut children = Vec::with_capacity(sources.len());
        for source in sources {
            let Some((child_name, child_raw)) = child_for(&raw, source) else {
                continue;
            };
            let child_name = child_name.unwrap_or_else(|| format!("{name}Item"));
            let child_required = match source {
                ChildSource::Property(_) => required && raw.required.contains(&child_name),
                ChildSource::Items | ChildSource::Pattern(_) | ChildSource::Additional => true,
            };
            let mut child_path = path.clone();
            child_path.push(child_name);
            children.push(Task {
                path: child_path,
                raw: child_raw,
                parent: None,
                required: child_required,
                enclosing_def: child_def.clone(),
            });
        }

        Ok(Some((
            Shell {
                node,
                shape,
                children: Vec::new(),
            },
            children,
        )))
    }

    fn object_plan(
        &self,
        raw: &RawProperty,
        path: &[String],
    ) -> Result<(PropKind, Shape, Vec<ChildSource>)> {
        if let Some(patterns) = raw.pattern_properties.as_ref().filter(|p| !p.is_empty()) {
            let source = match patterns.len() {
                1 => ChildSource::Pattern(0),
                2 => ChildSource::Pattern(1),
                count => {
                    return Err(CompileError::TooManyPatternProperties {
                        schema: self.schema.type_name.clone(),
                        path: path.join("/"),
                        count,
                    });
                }
            };
            return Ok((placeholder(), Shape::Map, vec![source]));
        }
        if matches!(raw.additional_properties, Some(AdditionalProperties::Schema(_))) {
            return Ok((placeholder(), Shape::Map, vec![ChildSource::Additional]));
        }
        if let Some(properties) = &raw.properties {
            let sources = (0..properties.len()).map(ChildSource::Property).collect();
            return Ok((placeholder(), Shape::Object, sources));
        }
        Ok((PropKind::String, Shape::Scalar, Vec::new()))
    }

    fn apply_widget_and_validation(
        &self,
        node: &mut PropertyNode,
        raw: &RawProperty,
        resolved: &Resolved,
        shape: Shape,
        path: &[String],
    ) -> Result<()> {
        let required = node.metadata.required;
        let (widget, validation) = match (shape, resolved) {
            (Shape::Array, _) => (WidgetKind::Array, None),
            (Shape::Map, _) => (WidgetKind::Map, None),
            (Shape::Object, _) => (WidgetKind::Header, None),
            (Shape::Scalar, Resolved::Integer | Resolved::Number) => {
                let integer = *resolved == Resolved::Integer;
                let validation = number_validation(raw, integer, required)
                    .map_err(|issue| self.validation_error(issue, path))?;
                (enum_widget(raw, node), validation)
            }
            (Shape::Scalar, Resolved::Boolean) => (
                WidgetKind::Checkbox,
                presence_validation("Joi.boolean()", required),
            ),
            (Shape::Scalar, Resolved::Json) => (
                WidgetKind::CodeEditor,
                presence_validation("Joi.string()", required),
            ),
            (Shape::Scalar, Resolved::String) => {
                let validation = string_validation(raw, required)
                    .map_err(|issue| self.validation_error(issue, path))?;
                (enum_widget(raw, node), validation)
            }
            // Objects with neither properties nor a value schema.
            (Shape::Scalar, _) => (
                WidgetKind::Text,
                presence_validation("Joi.string()", required),
            ),
        };
        node.data.widget_kind = Some(widget);
        node.data.validation_format = validation;
        Ok(())
    }

    fn validation_error(&self, issue: ValidationIssue, path: &[String]) -> CompileError {
        let schema = self.schema.type_name.clone();
        let path = path.join("/");
        match issue {
            ValidationIssue::Format(format) => CompileError::UnsupportedFormat {
                schema,
                path,
                format,
            },
            ValidationIssue::Pattern(source) => CompileError::UnsupportedPattern {
                schema,
                path,
                source,
            },
        }
    }
}

/// Sets enum choices as widget options and returns the widget to use.
fn enum_widget(raw: &RawProperty, node: &mut PropertyNode) -> WidgetKind {
    let Some(values) = &raw.enum_values else {
        return WidgetKind::Text;
    };
    for value in values {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        node.data
            .widget_options
            .push(WidgetOption::new(text.clone(), text));
    }
    WidgetKind::ComboBox
}

fn placeholder() -> PropKind {
    PropKind::Object {
        entries: Vec::new(),
    }
}

/// Resolves the raw definition of one child, borrowing when the parent is
/// borrowed.
fn child_for<'a>(
    raw: &Cow<'a, RawProperty>,
    source: ChildSource,
) -> Option<(Option<String>, Cow<'a, RawProperty>)> {
    match raw {
        Cow::Borrowed(parent) => {
            let (name, child) = child_ref(*parent, source)?;
            Some((name, Cow::Borrowed(child)))
        }
        Cow::Owned(parent) => {
            let (name, child) = child_ref(parent, source)?;
            Some((name, Cow::Owned(child.clone())))
        }
    }
}

fn child_ref(raw: &RawProperty, source: ChildSource) -> Option<(Option<String>, &RawProperty)> {
    match source {
        ChildSource::Items => raw.items.as_deref().map(|c| (None, c)),
        ChildSource::Pattern(index) => raw
            .pattern_properties
            .as_ref()?
            .get_index(index)
            .map(|(_, c)| (None, c)),
        ChildSource::Additional => match raw.additional_properties.as_ref()? {
            AdditionalProperties::Schema(schema) => Some((None, &**schema)),
            AdditionalProperties::Allowed(_) => None,
        },
        ChildSource::Property(index) => raw
            .properties
            .as_ref()?
            .get_index(index)
            .map(|(name, c)| (Some(name.clone()), c)),
    }
}

/// Folds `oneOf`/`anyOf` variants into one concrete definition.
///
/// Variant properties are unioned in order (first definition wins), the
/// required list gains the names every variant requires, and a missing type
/// becomes `object` when any variant is an object, else the first variant's
/// type.
fn normalize(raw: Cow<'_, RawProperty>) -> Cow<'_, RawProperty> {
    let variants: Vec<&RawProperty> = raw
        .one_of
        .iter()
        .chain(raw.any_of.iter())
        .flatten()
        .collect();
    if variants.is_empty() {
        return raw;
    }

    let mut merged = raw.as_ref().clone();
    merged.one_of = None;
    merged.any_of = None;

    for variant in &variants {
        if let Some(props) = &variant.properties {
            let target = merged.properties.get_or_insert_with(Default::default);
            for (name, prop) in props {
                target.entry(name.clone()).or_insert_with(|| prop.clone());
            }
        }
        if merged.items.is_none() {
            merged.items = variant.items.clone();
        }
        if merged.enum_values.is_none() {
            merged.enum_values = variant.enum_values.clone();
        }
        if merged.pattern_properties.is_none() {
            merged.pattern_properties = variant.pattern_properties.clone();
        }
    }

    if let Some((first, rest)) = variants.split_first() {
        for name in &first.required {
            let everywhere = rest.iter().all(|v| v.required.contains(name));
            if everywhere && !merged.required.contains(name) {
                merged.required.push(name.clone());
            }
        }
    }

    if merged.type_value.is_none() {
        let any_object = variants.iter().any(|v| {
            v.properties.is_some() || matches!(resolve_type(v), Resolved::Object)
        });
        merged.type_value = if any_object || merged.properties.is_some() {
            Some(TypeValue::Single("object".to_string()))
        } else {
            variants.iter().find_map(|v| v.type_value.clone())
        };
    }

    Cow::Owned(merged)
}

fn resolve_type(raw: &RawProperty) -> Resolved {
    let names = raw.type_names();
    if names.is_empty() {
        if raw.properties.is_some()
            || raw.pattern_properties.is_some()
            || matches!(raw.additional_properties, Some(AdditionalProperties::Schema(_)))
        {
            return Resolved::Object;
        }
        if raw.items.is_some() {
            return Resolved::Array;
        }
        if raw.enum_values.is_some() {
            return Resolved::String;
        }
        return Resolved::Missing;
    }

    let non_null: Vec<&str> = names.into_iter().filter(|n| *n != "null").collect();
    let has_container = non_null.iter().any(|n| matches!(*n, "object" | "array"));
    let has_scalar = non_null.iter().any(|n| !matches!(*n, "object" | "array"));
    if has_container && has_scalar {
        return Resolved::Json;
    }

    match non_null.first().copied() {
        Some("integer") => Resolved::Integer,
        Some("number") => Resolved::Number,
        Some("boolean") => Resolved::Boolean,
        Some("string") => Resolved::String,
        Some("json") => Resolved::Json,
        Some("array") => Resolved::Array,
        Some("object") => Resolved::Object,
        Some(other) => Resolved::Unknown(other.to_string()),
        None => Resolved::Unknown("null".to_string()),
    }
}

/// Assembles finished nodes bottom-up. Children always have larger arena
/// indices than their parent, so a reverse sweep sees every child first.
fn assemble(arena: Vec<Shell>, roots: &[usize]) -> Vec<PropertyNode> {
    let mut finished: Vec<Option<PropertyNode>> = Vec::with_capacity(arena.len());
    finished.resize_with(arena.len(), || None);
    let mut shells: Vec<Option<Shell>> = arena.into_iter().map(Some).collect();

    for index in (0..shells.len()).rev() {
        let Some(Shell {
            mut node,
            shape,
            children,
        }) = shells[index].take()
        else {
            continue;
        };
        match shape {
            Shape::Scalar => {}
            Shape::Array | Shape::Map => {
                let element = children.first().and_then(|c| finished[*c].take());
                let Some(element) = element else {
                    warn!(path = %node.path_str(), "Unable to create element type, skipping");
                    continue;
                };
                node.kind = if shape == Shape::Array {
                    PropKind::Array {
                        type_prop: Box::new(element),
                    }
                } else {
                    PropKind::Map {
                        type_prop: Box::new(element),
                    }
                };
            }
            Shape::Object => {
                let entries = children.iter().filter_map(|c| finished[*c].take()).collect();
                node.kind = PropKind::Object { entries };
            }
        }
        finished[index] = Some(node);
    }

    roots.iter().filter_map(|r| finished[*r].take()).collect()
}
