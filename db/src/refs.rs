//! Inlining of `#/definitions/...` references in registry schemas.
//!
//! Registry schemas describe shared shapes once under `definitions` and
//! point at them with `{"$ref": "#/definitions/Name"}`. [`resolve_refs`]
//! replaces each pointer with a copy of the definition, recording the
//! definition's name under `defName` so doc links can name it. Keys that sit
//! next to `$ref` override the definition's own.
//!
//! A reference back into a definition that is already being inlined is left
//! in place; the tree builder skips such nodes.

use serde_json::{Map, Value};

const DEFINITION_PREFIX: &str = "#/definitions/";

/// Keywords whose value is one nested schema.
const SCHEMA_KEYS: &[&str] = &["items", "additionalProperties"];
/// Keywords whose value maps names to nested schemas.
const SCHEMA_MAP_KEYS: &[&str] = &["properties", "patternProperties"];
/// Keywords whose value is a list of nested schemas.
const SCHEMA_LIST_KEYS: &[&str] = &["oneOf", "anyOf", "allOf"];

/// Inlines every resolvable reference reachable from `schema.properties`.
///
/// Returns the number of references left unresolved (cycles and pointers
/// to missing definitions).
///
/// # Examples
///
/// ```
/// use asset_spec_db::resolve_refs;
/// use serde_json::json;
///
/// let mut schema = json!({
///     "typeName": "AWS::Demo::Widget",
///     "definitions": {
///         "Tag": { "type": "object", "properties": { "Key": { "type": "string" } } }
///     },
///     "properties": {
///         "Tags": { "type": "array", "items": { "$ref": "#/definitions/Tag" } }
///     }
/// });
///
/// assert_eq!(resolve_refs(&mut schema), 0);
/// let item = &schema["properties"]["Tags"]["items"];
/// assert_eq!(item["defName"], "Tag");
/// assert_eq!(item["properties"]["Key"]["type"], "string");
/// ```
pub fn resolve_refs(schema: &mut Value) -> usize {
    let definitions = schema
        .get("definitions")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let mut resolver = Resolver {
        definitions: &definitions,
        stack: Vec::new(),
        unresolved: 0,
    };
    if let Some(properties) = schema.get_mut("properties").and_then(Value::as_object_mut) {
        for value in properties.values_mut() {
            resolver.visit(value);
        }
    }
    resolver.unresolved
}

struct Resolver<'a> {
    definitions: &'a Map<String, Value>,
    stack: Vec<String>,
    unresolved: usize,
}

impl Resolver<'_> {
    fn visit(&mut self, value: &mut Value) {
        let Some(object) = value.as_object_mut() else {
            return;
        };

        let pointer = object.get("$ref").and_then(Value::as_str).map(str::to_string);
        if let Some(pointer) = pointer {
            match self.inline(&pointer, object) {
                Some(inlined) => *value = inlined,
                None => self.unresolved += 1,
            }
            return;
        }
        self.visit_children(object);
    }

    fn visit_children(&mut self, object: &mut Map<String, Value>) {
        for key in SCHEMA_KEYS {
            if let Some(child) = object.get_mut(*key) {
                self.visit(child);
            }
        }
        for key in SCHEMA_MAP_KEYS {
            if let Some(children) = object.get_mut(*key).and_then(Value::as_object_mut) {
                for child in children.values_mut() {
                    self.visit(child);
                }
            }
        }
        for key in SCHEMA_LIST_KEYS {
            if let Some(children) = object.get_mut(*key).and_then(Value::as_array_mut) {
                for child in children {
                    self.visit(child);
                }
            }
        }
    }

    /// The resolved copy of `pointer` merged with the sibling keys of the
    /// referencing node, or `None` when it must stay a reference.
    fn inline(&mut self, pointer: &str, siblings: &Map<String, Value>) -> Option<Value> {
        let name = pointer.strip_prefix(DEFINITION_PREFIX)?;
        if name.contains('/') || self.stack.iter().any(|n| n == name) {
            return None;
        }
        let mut resolved = self.definitions.get(name)?.as_object()?.clone();

        self.stack.push(name.to_string());
        self.visit_children(&mut resolved);
        self.stack.pop();

        for (key, value) in siblings {
            if key != "$ref" {
                resolved.insert(key.clone(), value.clone());
            }
        }
        resolved
            .entry("defName")
            .or_insert_with(|| Value::String(name.to_string()));
        Some(Value::Object(resolved))
    }
}
