//! Extraction of nested array-of-object props into deduplicated sub-assets.
//!
//! Every `array` of `object` directly under a domain is deep-copied with
//! fresh ids and hashed structurally. The first occurrence of a hash becomes
//! a new package; later occurrences only record another parent. Naming is
//! decided once every parent is known.

use std::collections::VecDeque;

use asset_spec_core::{
    CompiledPackage, PropKind, PropertyNode, SchemaSpec, SchemaVariant, Suggestion, TreeRoot,
    TypeNameParts, VariantData,
};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::pipeline::PackageStamp;
use crate::prop_tree::{AWS_COLOR, category_name};

/// Structural hash of a subtree: names and kinds only, breadth-first, with
/// object entries sorted by name then kind. Each object also contributes its
/// entry count, so the walk marks where one node's children end.
///
/// # Examples
///
/// ```
/// use asset_spec_compiler::sub_assets::structural_hash;
/// use asset_spec_core::{PropKind, PropertyNode, TreeRoot};
///
/// let mut rule = PropertyNode::object("Rule", &TreeRoot::Domain.path());
/// let path = rule.metadata.prop_path.clone();
/// rule.push_entry(PropertyNode::scalar("Port", PropKind::Number, &path));
///
/// let mut copy = rule.clone();
/// copy.regenerate_ids();
/// copy.children_mut()[0].data.documentation = Some("changed".into());
/// assert_eq!(structural_hash(&rule), structural_hash(&copy));
///
/// copy.children_mut()[0].kind = PropKind::String;
/// assert_ne!(structural_hash(&rule), structural_hash(&copy));
/// ```
pub fn structural_hash(root: &PropertyNode) -> String {
    let mut hasher = Sha256::new();
    let mut queue = VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        hasher.update(node.name.as_bytes());
        hasher.update([0]);
        hasher.update(node.kind_name().as_bytes());
        hasher.update([b'\n']);
        match &node.kind {
            PropKind::Object { entries } => {
                hasher.update((entries.len() as u64).to_le_bytes());
                let mut sorted: Vec<&PropertyNode> = entries.iter().collect();
                sorted.sort_by(|a, b| {
                    a.name
                        .cmp(&b.name)
                        .then_with(|| a.kind_name().cmp(b.kind_name()))
                });
                queue.extend(sorted);
            }
            PropKind::Array { type_prop } | PropKind::Map { type_prop } => {
                queue.push_back(&**type_prop);
            }
            PropKind::String
            | PropKind::Number
            | PropKind::Float
            | PropKind::Boolean
            | PropKind::Json => {}
        }
    }
    format!("{:x}", hasher.finalize())
}

/// How a deduplicated sub-asset is named, decided from all of its parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubAssetName {
    /// Every parent has the same resource token.
    SharedResource { resource: String, category: String },
    /// Parents differ but share a service category.
    SharedCategory { token: String, category: String },
    /// No common ground, or no parents at all.
    Generic,
}

impl SubAssetName {
    /// # Examples
    ///
    /// ```
    /// use asset_spec_compiler::sub_assets::SubAssetName;
    ///
    /// let same = SubAssetName::unify(&["AWS::ECS::TaskDefinition".to_string()]);
    /// assert_eq!(same.display_name("ContainerDefinitions"), "TaskDefinition ContainerDefinitions");
    ///
    /// let mixed = SubAssetName::unify(&["AWS::EC2::Instance".into(), "AWS::EC2::LaunchTemplate".into()]);
    /// assert_eq!(mixed.display_name("Tags"), "EC2 Tags");
    /// assert_eq!(mixed.category(), "AWS::EC2");
    ///
    /// assert_eq!(SubAssetName::unify(&[]), SubAssetName::Generic);
    /// ```
    pub fn unify(parents: &[String]) -> Self {
        let parts: Vec<TypeNameParts<'_>> =
            parents.iter().map(|p| TypeNameParts::parse(p)).collect();
        let Some(first) = parts.first() else {
            return Self::Generic;
        };
        if parts.iter().all(|p| p.resource == first.resource) {
            return Self::SharedResource {
                resource: first.resource.to_string(),
                category: category_name(first),
            };
        }
        if parts.iter().all(|p| p.category == first.category) {
            return Self::SharedCategory {
                token: first.category.to_string(),
                category: category_name(first),
            };
        }
        Self::Generic
    }

    pub fn display_name(&self, leaf: &str) -> String {
        match self {
            Self::SharedResource { resource, .. } => format!("{resource} {leaf}"),
            Self::SharedCategory { token, .. } => format!("{token} {leaf}"),
            Self::Generic => format!("AWS {leaf}"),
        }
    }

    pub fn category(&self) -> String {
        match self {
            Self::SharedResource { category, .. } | Self::SharedCategory { category, .. } => {
                category.clone()
            }
            Self::Generic => "AWS".to_string(),
        }
    }
}

/// One array-of-object prop found in a package, with a fresh-id copy of its
/// element.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub package_index: usize,
    pub parent: String,
    pub prop: String,
    pub hash: String,
    pub element: PropertyNode,
}

/// Finds the candidates of one package. Read-only, safe to run in parallel.
pub fn collect_candidates(package_index: usize, package: &CompiledPackage) -> Vec<Candidate> {
    let Some(variant) = package.variant() else {
        return Vec::new();
    };
    let mut found = Vec::new();
    for prop in variant.domain.children() {
        let PropKind::Array { type_prop } = &prop.kind else {
            continue;
        };
        if !type_prop.is_object() {
            continue;
        }
        let mut element = (**type_prop).clone();
        element.regenerate_ids();
        found.push(Candidate {
            package_index,
            parent: package.name.clone(),
            prop: prop.name.clone(),
            hash: structural_hash(&element),
            element,
        });
    }
    found
}

struct Group {
    prop: String,
    first_parent: String,
    element: PropertyNode,
    parents: Vec<String>,
    links: Vec<(usize, String)>,
}

/// Deduplicates candidates (in package order), materializes one package per
/// distinct hash, and points every parent's element at its sub-asset.
pub fn extract_sub_assets(
    packages: &mut [CompiledPackage],
    candidates: Vec<Candidate>,
    stamp: &PackageStamp,
) -> Vec<CompiledPackage> {
    let mut groups: IndexMap<String, Group> = IndexMap::new();
    for candidate in candidates {
        match groups.get_mut(&candidate.hash) {
            Some(group) => {
                debug!(
                    schema = %candidate.parent,
                    prop = %candidate.prop,
                    "Sub-asset already extracted, recording parent"
                );
                if !group.parents.contains(&candidate.parent) {
                    group.parents.push(candidate.parent);
                }
                group.links.push((candidate.package_index, candidate.prop));
            }
            None => {
                groups.insert(
                    candidate.hash,
                    Group {
                        prop: candidate.prop.clone(),
                        first_parent: candidate.parent.clone(),
                        element: candidate.element,
                        parents: vec![candidate.parent],
                        links: vec![(candidate.package_index, candidate.prop)],
                    },
                );
            }
        }
    }

    let mut extracted = Vec::with_capacity(groups.len());
    for group in groups.into_values() {
        let naming = SubAssetName::unify(&group.parents);
        let display = naming.display_name(&group.prop);

        for (index, prop) in &group.links {
            let item = format!("{prop}Item");
            let element = packages
                .get_mut(*index)
                .and_then(CompiledPackage::variant_mut)
                .and_then(|v| v.domain.find_by_path_mut(&[prop.as_str(), item.as_str()]));
            if let Some(element) = element {
                element.add_suggest_source(Suggestion::new(display.as_str(), "/domain"));
            }
        }

        extracted.push(materialize(group, &naming, display, stamp));
    }
    extracted
}

fn materialize(
    group: Group,
    naming: &SubAssetName,
    display: String,
    stamp: &PackageStamp,
) -> CompiledPackage {
    let category = naming.category();
    let mut variant = SchemaVariant::empty(VariantData {
        version: stamp.version.clone(),
        display_name: display.clone(),
        category: category.clone(),
        color: AWS_COLOR.to_string(),
        link: None,
        description: group.element.data.documentation.clone(),
        func_unique_id: None,
    });

    let domain_path = TreeRoot::Domain.path();
    if let (PropKind::Object { entries }, Some(domain)) =
        (group.element.kind, variant.domain.entries_mut())
    {
        for mut entry in entries {
            entry.rebase(&domain_path);
            domain.push(entry);
        }
    }

    let mut package = stamp.package(SchemaSpec::new(display, category, variant));
    package.name = format!("{}::{}", group.first_parent, group.prop);
    package
}
