//! Compile configuration.
//!
//! Controls which resource types are compiled and how packages are stamped.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! services:
//!   - EC2
//!   - S3
//! exclude:
//!   - AWS::EC2::Host
//! package:
//!   version: "2025-01-01"
//!   created_by: Clover
//! compile:
//!   jobs: 4
//!   extract_sub_assets: true
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use asset_spec_core::TypeNameParts;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How compiled packages are stamped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Package version; the compile date when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Author recorded in every package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// Settings controlling the compile run itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileSettings {
    /// Worker threads; rayon's default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
    /// Whether shared array elements become their own packages.
    #[serde(default = "default_true")]
    pub extract_sub_assets: bool,
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self {
            jobs: None,
            extract_sub_assets: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Top-level compile configuration.
///
/// Loaded from a YAML file (typically `asset-spec.yml` next to the schema
/// directory).
///
/// # Examples
///
/// ```no_run
/// use asset_spec_db::CompileConfig;
///
/// let config = CompileConfig::load("asset-spec.yml").unwrap();
/// if config.is_allowed("AWS::EC2::VPC") {
///     println!("VPC will be compiled");
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Service tokens to compile (empty = every service).
    #[serde(default)]
    pub services: Vec<String>,
    /// Exact type names to skip.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub package: PackageConfig,
    #[serde(default)]
    pub compile: CompileSettings,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            services: Vec::new(),
            exclude: Vec::new(),
            package: PackageConfig::default(),
            compile: CompileSettings::default(),
        }
    }
}

impl CompileConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::DatabaseError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::DatabaseError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Returns `true` if `type_name` is in the exclusion list.
    pub fn is_excluded(&self, type_name: &str) -> bool {
        self.exclude.iter().any(|t| t == type_name)
    }

    /// Returns `true` if `type_name` should be compiled.
    ///
    /// Exclusions always win. An empty service list allows everything;
    /// otherwise the type name's service token must be listed.
    ///
    /// # Examples
    ///
    /// ```
    /// # let yaml = r#"
    /// # version: "1.0"
    /// # services: [EC2]
    /// # exclude: [AWS::EC2::Host]
    /// # "#;
    /// # let config: asset_spec_db::CompileConfig = serde_yaml::from_str(yaml).unwrap();
    /// assert!(config.is_allowed("AWS::EC2::VPC"));
    /// assert!(!config.is_allowed("AWS::S3::Bucket"));
    /// assert!(!config.is_allowed("AWS::EC2::Host"));
    /// ```
    pub fn is_allowed(&self, type_name: &str) -> bool {
        if self.is_excluded(type_name) {
            return false;
        }
        if self.services.is_empty() {
            return true;
        }
        let service = TypeNameParts::parse(type_name).category;
        self.services.iter().any(|s| s.eq_ignore_ascii_case(service))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
version: "1.0"
services:
  - EC2
  - S3
exclude:
  - AWS::EC2::Host
package:
  version: "2025-01-01"
  created_by: Clover
compile:
  jobs: 8
  extract_sub_assets: false
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config: CompileConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.services, vec!["EC2", "S3"]);
        assert_eq!(config.exclude, vec!["AWS::EC2::Host"]);
        assert_eq!(config.package.version.as_deref(), Some("2025-01-01"));
        assert_eq!(config.package.created_by.as_deref(), Some("Clover"));
        assert_eq!(config.compile.jobs, Some(8));
        assert!(!config.compile.extract_sub_assets);
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: CompileConfig = serde_yaml::from_str("version: \"1.0\"\n").unwrap();
        assert!(config.services.is_empty());
        assert!(config.exclude.is_empty());
        assert!(config.package.version.is_none());
        assert!(config.compile.jobs.is_none());
        assert!(config.compile.extract_sub_assets);
    }

    #[test]
    fn test_services_filter_by_category_token() {
        let config: CompileConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert!(config.is_allowed("AWS::EC2::VPC"));
        assert!(config.is_allowed("AWS::S3::Bucket"));
        assert!(!config.is_allowed("AWS::IAM::Role"));
    }

    #[test]
    fn test_exclusions_win_over_services() {
        let config: CompileConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert!(config.is_excluded("AWS::EC2::Host"));
        assert!(!config.is_allowed("AWS::EC2::Host"));
    }

    #[test]
    fn test_empty_services_allows_all_non_excluded() {
        let config = CompileConfig {
            exclude: vec!["AWS::EC2::Host".into()],
            ..Default::default()
        };
        assert!(config.is_allowed("AWS::IAM::Role"));
        assert!(!config.is_allowed("AWS::EC2::Host"));
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asset-spec.yml");

        let original: CompileConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        original.save(&path).unwrap();

        let loaded = CompileConfig::load(&path).unwrap();
        assert_eq!(loaded.services, original.services);
        assert_eq!(loaded.exclude, original.exclude);
        assert_eq!(loaded.package.created_by, original.package.created_by);
        assert_eq!(loaded.compile.jobs, original.compile.jobs);
        assert_eq!(
            loaded.compile.extract_sub_assets,
            original.compile.extract_sub_assets
        );
    }
}
