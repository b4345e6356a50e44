//! The package id index: stable schema ids across compile runs.
//!
//! Each written package records its schema unique id and the SHA-256
//! checksum of the file on disk. The next compile reuses the id for the same
//! package name, so downstream consumers see one schema evolving rather than
//! a new schema per run.
//!
//! # Examples
//!
//! ```no_run
//! use asset_spec_db::{PackageIdEntry, PackageIdIndex};
//!
//! let mut index = PackageIdIndex::load_or_default("ids.json").unwrap();
//! index.update_entry("AWS::EC2::VPC".into(), PackageIdEntry {
//!     unique_id: "01J00000000000000000000000".into(),
//!     checksum: "abc123".into(),
//!     file: Some("aws-ec2-vpc.json".into()),
//! });
//! index.save("ids.json").unwrap();
//! ```

use std::collections::{BTreeMap, HashMap};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{DatabaseError, Result};

/// What the index remembers about one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageIdEntry {
    /// Schema unique id to reuse on the next run.
    pub unique_id: String,
    /// SHA-256 hex digest of the package file as written.
    pub checksum: String,
    /// Package file name relative to the output directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Package name to [`PackageIdEntry`], persisted as pretty JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageIdIndex {
    /// Index format version.
    pub version: String,
    /// RFC 3339 timestamp of the last update.
    pub updated_at: String,
    pub packages: BTreeMap<String, PackageIdEntry>,
}

impl Default for PackageIdIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageIdIndex {
    pub fn new() -> Self {
        Self {
            version: "1.0".to_string(),
            updated_at: now_rfc3339(),
            packages: BTreeMap::new(),
        }
    }

    /// Loads an index from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::DatabaseError::IoError) if the file cannot
    /// be read, or [`JsonError`](crate::DatabaseError::JsonError) if the
    /// content is not an index.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Like [`load`](Self::load), but a missing file yields an empty index.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        match Self::load(path) {
            Err(DatabaseError::IoError(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::new())
            }
            other => other,
        }
    }

    /// Saves the index as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Inserts or updates the entry for `package` and refreshes `updated_at`.
    pub fn update_entry(&mut self, package: String, entry: PackageIdEntry) {
        self.packages.insert(package, entry);
        self.updated_at = now_rfc3339();
    }

    pub fn get(&self, package: &str) -> Option<&PackageIdEntry> {
        self.packages.get(package)
    }

    pub fn contains(&self, package: &str) -> bool {
        self.packages.contains_key(package)
    }

    pub fn unique_id(&self, package: &str) -> Option<&str> {
        self.packages.get(package).map(|e| e.unique_id.as_str())
    }

    /// Package name to unique id, the shape the compiler consumes.
    ///
    /// # Examples
    ///
    /// ```
    /// use asset_spec_db::{PackageIdEntry, PackageIdIndex};
    ///
    /// let mut index = PackageIdIndex::new();
    /// index.update_entry("AWS::S3::Bucket".into(), PackageIdEntry {
    ///     unique_id: "01J00000000000000000000000".into(),
    ///     checksum: String::new(),
    ///     file: None,
    /// });
    /// let ids = index.existing_ids();
    /// assert_eq!(ids["AWS::S3::Bucket"], "01J00000000000000000000000");
    /// ```
    pub fn existing_ids(&self) -> HashMap<String, String> {
        self.packages
            .iter()
            .map(|(name, entry)| (name.clone(), entry.unique_id.clone()))
            .collect()
    }

    /// SHA-256 hex digest of `bytes`.
    pub fn checksum(bytes: &[u8]) -> String {
        format!("{:x}", Sha256::digest(bytes))
    }

    /// SHA-256 hex digest of a file.
    pub fn calculate_checksum(path: impl AsRef<Path>) -> Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(Self::checksum(&bytes))
    }

    /// Checks that the file recorded for `package` under `dir` still matches
    /// its checksum.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidChecksum`] on a mismatch or when the
    /// entry has no file, and [`DatabaseError::IoError`] if the file cannot
    /// be read.
    pub fn verify(&self, package: &str, dir: impl AsRef<Path>) -> Result<()> {
        let entry = self
            .packages
            .get(package)
            .ok_or_else(|| DatabaseError::InvalidChecksum(format!("{package}: not indexed")))?;
        let file = entry
            .file
            .as_deref()
            .ok_or_else(|| DatabaseError::InvalidChecksum(format!("{package}: no file recorded")))?;
        let actual = Self::calculate_checksum(dir.as_ref().join(file))?;
        if actual != entry.checksum {
            return Err(DatabaseError::InvalidChecksum(format!(
                "{package}: expected {}, found {actual}",
                entry.checksum
            )));
        }
        Ok(())
    }

    /// Names of packages that differ between `self` and `other`: present in
    /// only one index, or recorded with a different checksum.
    pub fn diff(&self, other: &PackageIdIndex) -> Vec<String> {
        let mut changed: Vec<String> = self
            .packages
            .iter()
            .filter(|(name, entry)| {
                other
                    .packages
                    .get(*name)
                    .is_none_or(|o| o.checksum != entry.checksum)
            })
            .map(|(name, _)| name.clone())
            .collect();
        changed.extend(
            other
                .packages
                .keys()
                .filter(|name| !self.packages.contains_key(*name))
                .cloned(),
        );
        changed
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, checksum: &str) -> PackageIdEntry {
        PackageIdEntry {
            unique_id: id.into(),
            checksum: checksum.into(),
            file: None,
        }
    }

    #[test]
    fn test_update_entry_replaces() {
        let mut index = PackageIdIndex::new();
        index.update_entry("AWS::Demo::A".into(), entry("1", "a"));
        index.update_entry("AWS::Demo::A".into(), entry("1", "b"));
        assert_eq!(index.packages.len(), 1);
        assert_eq!(index.get("AWS::Demo::A").unwrap().checksum, "b");
        assert_eq!(index.unique_id("AWS::Demo::A"), Some("1"));
        assert!(index.unique_id("AWS::Demo::B").is_none());
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let index = PackageIdIndex::load_or_default(dir.path().join("ids.json")).unwrap();
        assert!(index.packages.is_empty());
    }

    #[test]
    fn test_load_or_default_still_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            PackageIdIndex::load_or_default(&path),
            Err(DatabaseError::JsonError(_))
        ));
    }

    #[test]
    fn test_checksum_is_sha256_hex() {
        assert_eq!(
            PackageIdIndex::checksum(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_diff_reports_changed_added_and_removed() {
        let mut old = PackageIdIndex::new();
        old.update_entry("Same".into(), entry("1", "x"));
        old.update_entry("Changed".into(), entry("2", "x"));
        old.update_entry("Removed".into(), entry("3", "x"));

        let mut new = PackageIdIndex::new();
        new.update_entry("Same".into(), entry("1", "x"));
        new.update_entry("Changed".into(), entry("2", "y"));
        new.update_entry("Added".into(), entry("4", "x"));

        let mut changed = old.diff(&new);
        changed.sort();
        assert_eq!(changed, vec!["Added", "Changed", "Removed"]);
    }

    #[test]
    fn test_verify_detects_modified_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();

        let mut index = PackageIdIndex::new();
        index.update_entry(
            "A".into(),
            PackageIdEntry {
                unique_id: "1".into(),
                checksum: PackageIdIndex::checksum(b"{}"),
                file: Some("a.json".into()),
            },
        );
        index.verify("A", dir.path()).unwrap();

        std::fs::write(dir.path().join("a.json"), "{\"changed\":true}").unwrap();
        assert!(matches!(
            index.verify("A", dir.path()),
            Err(DatabaseError::InvalidChecksum(_))
        ));
        assert!(index.verify("B", dir.path()).is_err());
    }
}
