//! Cross-schema suggestions from primary identifiers.
//!
//! [`SuggestionIndex::collect`] reads every package and maps each alias of a
//! primary identifier to the schema and prop that produce it.
//! [`plan_suggestions`] then matches every other schema's domain props
//! against that map; matching is plain string-set membership.

use std::collections::{BTreeSet, HashMap};

use asset_spec_core::{CompiledPackage, EXTRA_PROP_NAME, PropertyNode, Suggestion, TypeNameParts};

use crate::naming::{pluralize, space_separated};

/// Names too generic to suggest anything on their own.
const GENERIC_NAMES: &[&str] = &["Id", "Arn", "Name"];

/// Aliases under which a primary identifier may appear in other schemas.
///
/// # Examples
///
/// ```
/// use asset_spec_compiler::suggestions::identifier_aliases;
///
/// let aliases = identifier_aliases("AWS::EC2::Subnet", "SubnetId");
/// for alias in ["SubnetId", "SubnetIds", "Subnet Id", "EC2SubnetId", "SubnetIdentifier"] {
///     assert!(aliases.contains(alias), "{alias}");
/// }
///
/// let aliases = identifier_aliases("AWS::IAM::Role", "Arn");
/// assert!(aliases.contains("RoleArn"));
/// assert!(!aliases.contains("Arn"));
/// ```
pub fn identifier_aliases(type_name: &str, prop: &str) -> BTreeSet<String> {
    let parts = TypeNameParts::parse(type_name);
    let mut bases = vec![prop.to_string()];
    if !parts.resource.is_empty() && !prop.starts_with(parts.resource) {
        bases.push(format!("{}{prop}", parts.resource));
    }
    if !parts.category.is_empty() {
        bases.push(format!("{}{prop}", parts.category));
    }

    let mut aliases = BTreeSet::new();
    for base in bases {
        if let Some(stem) = base.strip_suffix("Id") {
            let identifier = format!("{stem}Identifier");
            aliases.insert(pluralize(&identifier));
            aliases.insert(space_separated(&identifier));
            aliases.insert(identifier);
        }
        aliases.insert(pluralize(&base));
        aliases.insert(space_separated(&base));
        aliases.insert(base);
    }
    aliases.retain(|alias| !GENERIC_NAMES.contains(&alias.as_str()));
    aliases
}

/// An identifier prop: which schema it belongs to and where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierSource {
    pub package_index: usize,
    pub schema: String,
    /// Path below the tree root.
    pub segments: Vec<String>,
    /// Full path string, e.g. `/resource_value/VpcId`.
    pub prop_path: String,
    pub tree: &'static str,
}

/// Alias → identifier sources, across every package.
#[derive(Debug, Default)]
pub struct SuggestionIndex {
    aliases: HashMap<String, Vec<IdentifierSource>>,
}

impl SuggestionIndex {
    pub fn collect(packages: &[CompiledPackage]) -> Self {
        let mut index = Self::default();
        for (package_index, package) in packages.iter().enumerate() {
            let Some(variant) = package.variant() else {
                continue;
            };
            let Some(type_name) = package.type_name() else {
                continue;
            };
            let trees = [
                ("resource_value", &variant.resource_value),
                ("domain", &variant.domain),
            ];
            for (tree, root) in trees {
                for prop in root.children() {
                    if !prop.metadata.primary_identifier || prop.name == EXTRA_PROP_NAME {
                        continue;
                    }
                    let source = IdentifierSource {
                        package_index,
                        schema: type_name.to_string(),
                        segments: prop.path_below_tree().to_vec(),
                        prop_path: prop.path_str(),
                        tree,
                    };
                    for alias in identifier_aliases(type_name, &prop.name) {
                        index.aliases.entry(alias).or_default().push(source.clone());
                    }
                }
            }
        }
        index
    }

    pub fn lookup(&self, name: &str) -> &[IdentifierSource] {
        self.aliases.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// One suggestion edge: the target prop gets `suggest_source`, the
/// identifier gets `suggest_as_source_for`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSuggestion {
    pub target_index: usize,
    pub target_segments: Vec<String>,
    pub suggest_source: Suggestion,
    pub source_index: usize,
    pub source_tree: &'static str,
    pub source_segments: Vec<String>,
    pub suggest_as_source_for: Suggestion,
}

/// Plans the suggestions for one package. Read-only, safe to run in
/// parallel.
pub fn plan_suggestions(
    target_index: usize,
    package: &CompiledPackage,
    index: &SuggestionIndex,
) -> Vec<PlannedSuggestion> {
    let Some(variant) = package.variant() else {
        return Vec::new();
    };
    let schema = package
        .schema()
        .map(|s| s.name.clone())
        .unwrap_or_else(|| package.name.clone());
    let own_type = package.type_name();

    let mut planned = Vec::new();
    let props = variant
        .domain
        .children()
        .iter()
        .filter(|c| c.name != EXTRA_PROP_NAME)
        .flat_map(PropertyNode::bfs);
    for prop in props {
        for source in index.lookup(&prop.name) {
            if Some(source.schema.as_str()) == own_type {
                continue;
            }
            // Arrays of scalars receive the suggestion on their element.
            let target = match prop.element() {
                Some(element) if element.is_scalar() && !prop.is_object() => element,
                _ => prop,
            };
            planned.push(PlannedSuggestion {
                target_index,
                target_segments: target.path_below_tree().to_vec(),
                suggest_source: Suggestion::new(source.schema.as_str(), source.prop_path.as_str()),
                source_index: source.package_index,
                source_tree: source.tree,
                source_segments: source.segments.clone(),
                suggest_as_source_for: Suggestion::new(schema.as_str(), target.path_str()),
            });
        }
    }
    planned
}

/// Applies planned suggestions in order. Targets that no longer exist are
/// ignored.
pub fn apply_suggestions(packages: &mut [CompiledPackage], planned: Vec<PlannedSuggestion>) {
    for plan in planned {
        if let Some(target) = find_mut(packages, plan.target_index, "domain", &plan.target_segments)
        {
            target.add_suggest_source(plan.suggest_source);
        }
        if let Some(source) = find_mut(
            packages,
            plan.source_index,
            plan.source_tree,
            &plan.source_segments,
        ) {
            source.add_suggest_as_source_for(plan.suggest_as_source_for);
        }
    }
}

fn find_mut<'a>(
    packages: &'a mut [CompiledPackage],
    index: usize,
    tree: &str,
    segments: &[String],
) -> Option<&'a mut PropertyNode> {
    let variant = packages.get_mut(index)?.variant_mut()?;
    let root = match tree {
        "resource_value" => &mut variant.resource_value,
        "secrets" => &mut variant.secrets,
        _ => &mut variant.domain,
    };
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
    root.find_by_path_mut(&segments)
}
