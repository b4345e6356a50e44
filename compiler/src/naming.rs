//! Name heuristics shared by socket synthesis, suggestions, and sub-asset
//! naming.

use asset_spec_core::{EXTRA_PROP_NAME, PropertyNode};

/// Suffixes stripped from ancestor names when compacting socket names.
pub const GENERIC_SUFFIXES: &[&str] = &[
    "Configuration",
    "Config",
    "Specification",
    "Options",
    "Definition",
    "Settings",
    "Info",
    "Parameters",
    "Attributes",
    "Preference",
    "Details",
];

/// Splits a CamelCase identifier into words, keeping acronyms together.
///
/// # Examples
///
/// ```
/// use asset_spec_compiler::naming::camel_words;
///
/// assert_eq!(camel_words("LaunchTemplateData"), vec!["Launch", "Template", "Data"]);
/// assert_eq!(camel_words("VPCSecurityGroupIds"), vec!["VPC", "Security", "Group", "Ids"]);
/// assert_eq!(camel_words("Ipv6CidrBlock"), vec!["Ipv6", "Cidr", "Block"]);
/// ```
pub fn camel_words(name: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = name.char_indices().collect();
    let mut words = Vec::new();
    let mut start = 0;
    for i in 1..chars.len() {
        let (idx, c) = chars[i];
        let prev = chars[i - 1].1;
        let next_lower = chars.get(i + 1).is_some_and(|(_, n)| n.is_lowercase());
        let boundary = c.is_uppercase()
            && (prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower));
        if boundary || !c.is_alphanumeric() {
            if idx > start {
                words.push(&name[start..idx]);
            }
            start = if c.is_alphanumeric() { idx } else { idx + c.len_utf8() };
        }
    }
    if start < name.len() {
        words.push(&name[start..]);
    }
    words
}

/// `SubnetId` → `Subnet Id`.
pub fn space_separated(name: &str) -> String {
    camel_words(name).join(" ")
}

/// English plural of an identifier's last word.
///
/// # Examples
///
/// ```
/// use asset_spec_compiler::naming::pluralize;
///
/// assert_eq!(pluralize("SubnetId"), "SubnetIds");
/// assert_eq!(pluralize("Policy"), "Policies");
/// assert_eq!(pluralize("Address"), "Addresses");
/// assert_eq!(pluralize("Gateway"), "Gateways");
/// ```
pub fn pluralize(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if let Some(stem) = name.strip_suffix('y') {
        let before = stem.chars().last();
        if before.is_some_and(|c| !"aeiouAEIOU".contains(c)) {
            return format!("{stem}ies");
        }
    }
    if ["s", "x", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        return format!("{name}es");
    }
    format!("{name}s")
}

/// Strips one generic suffix, unless that would leave nothing.
pub fn strip_generic_suffix(name: &str) -> &str {
    for suffix in GENERIC_SUFFIXES {
        if let Some(stem) = name.strip_suffix(suffix) {
            if !stem.is_empty() {
                return stem;
            }
        }
    }
    name
}

/// Socket name for a prop, compacting its ancestor path.
///
/// Props directly under the tree root (or anywhere under `extra`) keep their
/// own name. Deeper props are prefixed with their object ancestors, each with
/// a generic suffix stripped and, for the nearest ancestor, its trailing word
/// dropped when the prop name ends with the same word. Array and map element
/// segments are skipped.
///
/// # Examples
///
/// ```
/// use asset_spec_compiler::naming::socket_name_for_path;
///
/// assert_eq!(socket_name_for_path(&["LaunchTemplateData", "UserData"]), "LaunchTemplateUserData");
/// assert_eq!(socket_name_for_path(&["NetworkConfiguration", "SubnetId"]), "NetworkSubnetId");
/// assert_eq!(socket_name_for_path(&["extra", "Region"]), "Region");
/// assert_eq!(socket_name_for_path(&["VpcId"]), "VpcId");
/// ```
pub fn socket_name_for_path<S: AsRef<str>>(segments: &[S]) -> String {
    let Some((own, ancestors)) = segments.split_last() else {
        return String::new();
    };
    let own = own.as_ref();
    if ancestors.first().is_some_and(|s| s.as_ref() == EXTRA_PROP_NAME) {
        return own.to_string();
    }

    let mut prefix: Vec<String> = Vec::new();
    let mut parent: Option<&str> = None;
    for segment in ancestors {
        let segment = segment.as_ref();
        if parent.is_some_and(|p| segment == format!("{p}Item")) {
            parent = Some(segment);
            continue;
        }
        parent = Some(segment);
        prefix.push(strip_generic_suffix(segment).to_string());
    }
    if prefix.is_empty() {
        return own.to_string();
    }

    let own_last = camel_words(own).last().copied().unwrap_or(own);
    if let Some(nearest) = prefix.last_mut() {
        let words = camel_words(nearest);
        if words.len() > 1 && words.last() == Some(&own_last) {
            let keep = words[..words.len() - 1].concat();
            *nearest = keep;
        }
    }

    format!("{}{own}", prefix.concat())
}

/// Socket name for `prop`, from its path below the tree root.
pub fn socket_name_for(prop: &PropertyNode) -> String {
    socket_name_for_path(prop.path_below_tree())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_words_handles_separators() {
        assert_eq!(camel_words("Subnet Id"), vec!["Subnet", "Id"]);
        assert_eq!(camel_words("Id"), vec!["Id"]);
        assert_eq!(camel_words(""), Vec::<&str>::new());
    }

    #[test]
    fn test_pluralize_vowel_y() {
        assert_eq!(pluralize("Key"), "Keys");
        assert_eq!(pluralize("Box"), "Boxes");
    }

    #[test]
    fn test_strip_generic_suffix_keeps_bare_suffix() {
        assert_eq!(strip_generic_suffix("Config"), "Config");
        assert_eq!(strip_generic_suffix("LoggingConfig"), "Logging");
        assert_eq!(strip_generic_suffix("Network"), "Network");
    }

    #[test]
    fn test_socket_name_skips_element_segments() {
        let path = ["Subnets", "SubnetsItem", "SubnetId"];
        assert_eq!(socket_name_for_path(&path), "SubnetsSubnetId");
    }

    #[test]
    fn test_socket_name_multiple_ancestors() {
        let path = ["ServiceSettings", "NetworkConfiguration", "VpcId"];
        assert_eq!(socket_name_for_path(&path), "ServiceNetworkVpcId");
    }
}
