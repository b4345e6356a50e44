//! Raw resource schema input types.
//!
//! These mirror the CloudFormation registry schema shape closely enough to be
//! deserialized straight from the vendor JSON. They are read-only for the
//! duration of a compile run; the compiler never mutates a [`RawSchema`].

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A declared CRUD/list capability of a resource schema.
///
/// # Examples
///
/// ```
/// use asset_spec_core::HandlerKind;
///
/// let kind: HandlerKind = serde_json::from_str("\"read\"").unwrap();
/// assert_eq!(kind, HandlerKind::Read);
/// assert_eq!(kind.as_str(), "read");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl HandlerKind {
    /// Every handler kind, in declaration order.
    pub const ALL: [HandlerKind; 5] = [
        HandlerKind::Create,
        HandlerKind::Read,
        HandlerKind::Update,
        HandlerKind::Delete,
        HandlerKind::List,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
        }
    }
}

/// Handler declaration. Only its presence matters to the compiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handler {
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_in_minutes: Option<u32>,
}

/// The `type` keyword, which may be a single name or a list of names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeValue {
    Single(String),
    Multiple(Vec<String>),
}

impl TypeValue {
    /// Returns every type name in declaration order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Single(name) => vec![name.as_str()],
            Self::Multiple(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// `additionalProperties` is either a boolean switch or a value schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<RawProperty>),
}

/// One property definition inside a raw schema.
///
/// Unknown JSON keywords (`insertionOrder`, `uniqueItems`, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProperty {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_value: Option<TypeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, RawProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<RawProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_properties: Option<IndexMap<String, RawProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<RawProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<RawProperty>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Unresolved `$ref` pointer, left in place only when a provider could
    /// not (or chose not to) inline the definition.
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Name of the `definitions` entry this property was inlined from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub def_name: Option<String>,
}

impl RawProperty {
    /// Creates a property with a single primitive type.
    ///
    /// # Examples
    ///
    /// ```
    /// use asset_spec_core::RawProperty;
    ///
    /// let prop = RawProperty::typed("string");
    /// assert_eq!(prop.type_names(), vec!["string"]);
    /// ```
    pub fn typed(type_name: &str) -> Self {
        Self {
            type_value: Some(TypeValue::Single(type_name.to_string())),
            ..Default::default()
        }
    }

    /// Declared type names, empty when the keyword is absent.
    pub fn type_names(&self) -> Vec<&str> {
        self.type_value
            .as_ref()
            .map(TypeValue::names)
            .unwrap_or_default()
    }
}

/// A raw resource schema as returned by a schema provider.
///
/// # Examples
///
/// ```
/// use asset_spec_core::{HandlerKind, RawSchema};
///
/// let schema: RawSchema = serde_json::from_value(serde_json::json!({
///     "typeName": "AWS::Demo::Widget",
///     "properties": { "Name": { "type": "string" } },
///     "handlers": { "create": {}, "read": {} }
/// }))
/// .unwrap();
///
/// assert!(schema.has_handler(HandlerKind::Read));
/// assert!(!schema.has_handler(HandlerKind::Delete));
/// assert_eq!(schema.type_parts().resource, "Widget");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSchema {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: IndexMap<String, RawProperty>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub definitions: IndexMap<String, RawProperty>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default)]
    pub create_only_properties: Vec<String>,
    #[serde(default)]
    pub read_only_properties: Vec<String>,
    #[serde(default)]
    pub write_only_properties: Vec<String>,
    #[serde(default)]
    pub primary_identifier: Vec<String>,
    #[serde(default)]
    pub handlers: BTreeMap<HandlerKind, Handler>,
}

impl RawSchema {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            ..Default::default()
        }
    }

    pub fn has_handler(&self, kind: HandlerKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn type_parts(&self) -> TypeNameParts<'_> {
        TypeNameParts::parse(&self.type_name)
    }
}

/// The `Vendor::Category::Resource` segments of a type name.
///
/// Missing segments parse as empty strings; a single-segment name is treated
/// as the resource.
///
/// # Examples
///
/// ```
/// use asset_spec_core::TypeNameParts;
///
/// let parts = TypeNameParts::parse("AWS::EC2::LaunchTemplate");
/// assert_eq!(parts.vendor, "AWS");
/// assert_eq!(parts.category, "EC2");
/// assert_eq!(parts.resource, "LaunchTemplate");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeNameParts<'a> {
    pub vendor: &'a str,
    pub category: &'a str,
    pub resource: &'a str,
}

impl<'a> TypeNameParts<'a> {
    pub fn parse(type_name: &'a str) -> Self {
        let segments: Vec<&str> = type_name.split("::").collect();
        match segments.as_slice() {
            [resource] => Self {
                vendor: "",
                category: "",
                resource,
            },
            [vendor, resource] => Self {
                vendor,
                category: "",
                resource,
            },
            [vendor, category, rest @ ..] => Self {
                vendor,
                category,
                resource: rest.last().copied().unwrap_or(""),
            },
            [] => Self {
                vendor: "",
                category: "",
                resource: "",
            },
        }
    }
}

/// Property classification sets, keyed by bare property name.
///
/// Built from the `/properties/...` pointer lists of a [`RawSchema`]; each
/// pointer contributes its last segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnlyProperties {
    pub create_only: BTreeSet<String>,
    pub read_only: BTreeSet<String>,
    pub write_only: BTreeSet<String>,
    pub primary_identifier: BTreeSet<String>,
}

impl OnlyProperties {
    /// # Examples
    ///
    /// ```
    /// use asset_spec_core::{OnlyProperties, RawSchema};
    ///
    /// let mut schema = RawSchema::new("AWS::Demo::Widget");
    /// schema.read_only_properties = vec!["/properties/Id".into()];
    /// schema.primary_identifier = vec!["/properties/Id".into()];
    ///
    /// let only = OnlyProperties::from_schema(&schema);
    /// assert!(only.read_only.contains("Id"));
    /// assert!(only.primary_identifier.contains("Id"));
    /// assert!(only.create_only.is_empty());
    /// ```
    pub fn from_schema(schema: &RawSchema) -> Self {
        Self {
            create_only: pointer_names(&schema.create_only_properties),
            read_only: pointer_names(&schema.read_only_properties),
            write_only: pointer_names(&schema.write_only_properties),
            primary_identifier: pointer_names(&schema.primary_identifier),
        }
    }
}

fn pointer_names(pointers: &[String]) -> BTreeSet<String> {
    pointers
        .iter()
        .filter_map(|pointer| pointer.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}
