//! Project manifest reader
//!
//! Reads `pubspec.yaml` and `pubspec.lock` into the name -> resolved version
//! map the scanner consumes. Both files are YAML; only the keys we need are
//! deserialized and everything else is ignored.
//!
//! A missing or structurally invalid manifest is the one fatal condition of a
//! scan; everything downstream degrades instead of failing.

use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const MANIFEST_FILE: &str = "pubspec.yaml";
pub const LOCK_FILE: &str = "pubspec.lock";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("no pubspec.yaml found in {}", .0.display())]
    MissingManifest(PathBuf),

    #[error("no pubspec.lock found in {}; run `dart pub get` first", .0.display())]
    MissingLockfile(PathBuf),

    #[error("{} is invalid: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How a locked package entered the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    DirectMain,
    DirectDev,
    DirectOverridden,
    Transitive,
}

impl DependencyKind {
    fn parse(raw: &str) -> Self {
        match raw {
            "direct main" => DependencyKind::DirectMain,
            "direct dev" => DependencyKind::DirectDev,
            "direct overridden" => DependencyKind::DirectOverridden,
            _ => DependencyKind::Transitive,
        }
    }

    pub fn is_direct(self) -> bool {
        self != DependencyKind::Transitive
    }
}

/// One entry of the `packages:` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedPackage {
    pub name: String,
    pub version: String,
    pub kind: DependencyKind,
    pub source: String,
}

impl LockedPackage {
    /// Only registry-hosted packages can be scored
    pub fn is_hosted(&self) -> bool {
        self.source == "hosted"
    }
}

/// Parsed `pubspec.lock`
#[derive(Debug, Clone, Default)]
pub struct Lockfile {
    pub packages: Vec<LockedPackage>,
    /// `sdks.dart`
    pub dart_sdk: Option<String>,
}

/// The subset of `pubspec.yaml` we read
#[derive(Debug, Clone, Default)]
pub struct Pubspec {
    pub name: String,
    /// `environment.sdk`
    pub sdk_constraint: Option<String>,
}

/// Dependencies to scan, as handed to the scanner
#[derive(Debug, Clone, Default)]
pub struct DependencySet {
    pub project: String,
    pub dependencies: BTreeMap<String, String>,
    pub sdk_constraint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PubspecFile {
    name: Option<String>,
    #[serde(default)]
    environment: Option<EnvironmentSection>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentSection {
    #[serde(default, deserialize_with = "scalar_string")]
    sdk: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LockFile {
    #[serde(default)]
    packages: Option<BTreeMap<String, LockEntry>>,
    #[serde(default)]
    sdks: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct LockEntry {
    #[serde(default)]
    dependency: String,
    #[serde(default)]
    source: String,
    #[serde(default, deserialize_with = "scalar_string")]
    version: Option<String>,
}

/// Accept `1.2.0`, `"1.2.0"` and bare numbers such as `2.0`
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_to_string(&Value::deserialize(deserializer)?))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Load the dependency set for the project rooted at `project_dir`.
pub fn load(project_dir: &Path, include_transitive: bool) -> Result<DependencySet, ManifestError> {
    let manifest_path = project_dir.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Err(ManifestError::MissingManifest(project_dir.to_path_buf()));
    }
    let lock_path = project_dir.join(LOCK_FILE);
    if !lock_path.is_file() {
        return Err(ManifestError::MissingLockfile(project_dir.to_path_buf()));
    }

    let pubspec = parse_pubspec(&read(&manifest_path)?).map_err(|reason| ManifestError::Invalid {
        path: manifest_path.clone(),
        reason,
    })?;
    let lockfile = parse_lockfile(&read(&lock_path)?).map_err(|reason| ManifestError::Invalid {
        path: lock_path.clone(),
        reason,
    })?;

    let dependencies: BTreeMap<String, String> = lockfile
        .packages
        .iter()
        .filter(|p| p.is_hosted())
        .filter(|p| include_transitive || p.kind.is_direct())
        .map(|p| (p.name.clone(), p.version.clone()))
        .collect();

    debug!(
        "Loaded {} of {} locked packages from {:?}",
        dependencies.len(),
        lockfile.packages.len(),
        lock_path
    );

    Ok(DependencySet {
        project: pubspec.name,
        dependencies,
        sdk_constraint: pubspec.sdk_constraint.or(lockfile.dart_sdk),
    })
}

fn read(path: &Path) -> Result<String, ManifestError> {
    std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_pubspec(content: &str) -> Result<Pubspec, String> {
    let file: PubspecFile = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    let name = file
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| "missing top-level `name`".to_string())?;

    Ok(Pubspec {
        name,
        sdk_constraint: file.environment.and_then(|env| env.sdk),
    })
}

pub fn parse_lockfile(content: &str) -> Result<Lockfile, String> {
    // Presence of the key is required; `packages: {}` or an empty value is fine
    let document: Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    if document.get("packages").is_none() {
        return Err("missing `packages` section".to_string());
    }
    let file: LockFile = serde_yaml::from_value(document).map_err(|e| e.to_string())?;

    let packages = file
        .packages
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(name, entry)| {
            Some(LockedPackage {
                name,
                version: entry.version?,
                kind: DependencyKind::parse(&entry.dependency),
                source: entry.source,
            })
        })
        .collect();
    let dart_sdk = file
        .sdks
        .as_ref()
        .and_then(|sdks| sdks.get("dart"))
        .and_then(scalar_to_string);

    Ok(Lockfile { packages, dart_sdk })
}
