//! Package records parsed from `pyproject.toml` manifests.
//!
//! Handles the Poetry layout:
//! ```toml
//! [tool.poetry]
//! name = "service"
//! version = "0.3.0"
//!
//! [tool.poetry.dependencies]
//! core = { path = "../core", develop = true }
//! requests = "^2.31"
//!
//! [tool.poetry.group.dev.dependencies]
//! pytest = "^8.0"
//! ```
//!
//! `name` and `version` fall back to the PEP 621 `[project]` table field by
//! field, so Poetry 2 manifests that keep metadata in `[project]` and
//! dependencies in `[tool.poetry]` load too.

use crate::error::{LinkError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, Item};

/// Manifest file name searched for when none is given.
pub const DEFAULT_MANIFEST_NAME: &str = "pyproject.toml";

/// Right-hand side of a dependency declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// Registry constraint: `dep = "^1.0"` or `dep = { version = "^1.0" }`.
    Version(String),
    /// Local link: `dep = { path = "../dep", develop = true }`.
    Path { path: String, develop: bool },
    /// Git, url and other forms, kept as raw TOML text.
    Other(String),
}

impl Declaration {
    fn from_item(item: &Item) -> Self {
        if let Some(version) = item.as_str() {
            return Declaration::Version(version.to_string());
        }

        if let Some(table) = item.as_table_like() {
            if let Some(path) = table.get("path").and_then(Item::as_str) {
                let develop = table
                    .get("develop")
                    .and_then(Item::as_bool)
                    .unwrap_or(false);
                return Declaration::Path {
                    path: path.to_string(),
                    develop,
                };
            }
            if let Some(version) = table.get("version").and_then(Item::as_str) {
                return Declaration::Version(version.to_string());
            }
        }

        Declaration::Other(item.to_string().trim().to_string())
    }
}

/// A package discovered in the monorepo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    /// Absolute path of the manifest file.
    pub path: PathBuf,
    /// Dependency declarations in file order.
    pub dependencies: Vec<(String, Declaration)>,
}

impl PackageRecord {
    pub fn new(name: impl Into<String>, version: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            path: path.into(),
            dependencies: Vec::new(),
        }
    }

    /// Adds a dependency declaration, keeping insertion order.
    pub fn with_dependency(mut self, name: impl Into<String>, declaration: Declaration) -> Self {
        self.dependencies.push((name.into(), declaration));
        self
    }

    /// Loads a package from a manifest file or from the directory holding one.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the manifest does not exist
    /// - `ManifestParse`: invalid TOML, no package table, or missing `name`/`version`
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let manifest = resolve_manifest_path(path.as_ref(), DEFAULT_MANIFEST_NAME)?;
        Self::load(&manifest)?.ok_or_else(|| {
            LinkError::parse(&manifest, "no [tool.poetry] or [project] table")
        })
    }

    /// Loads a manifest, returning `None` when it does not describe a package
    /// (for example a bare tool configuration file).
    pub fn load(manifest: &Path) -> Result<Option<Self>> {
        if !manifest.is_file() {
            return Err(LinkError::NotFound(manifest.to_path_buf()));
        }
        let manifest = fs::canonicalize(manifest)?;
        let content = fs::read_to_string(&manifest)?;
        Self::parse(&manifest, &content)
    }

    /// Parses manifest text. `manifest` is recorded as the record's path.
    pub fn parse(manifest: &Path, content: &str) -> Result<Option<Self>> {
        let doc = parse_document(manifest, content)?;

        let poetry = doc.get("tool").and_then(|t| t.get("poetry"));
        let project = doc.get("project");
        if poetry.is_none() && project.is_none() {
            return Ok(None);
        }
        let tables: Vec<&Item> = poetry.into_iter().chain(project).collect();

        let name = required_str(&tables, "name", manifest)?;
        let version = required_str(&tables, "version", manifest)?;
        if name.trim().is_empty() {
            return Err(LinkError::parse(manifest, "package name is empty"));
        }

        let mut record = PackageRecord::new(name, version, manifest);
        if let Some(poetry) = poetry {
            record.dependencies = collect_dependencies(poetry);
        }

        log::debug!(
            "Loaded package '{}' {} ({} dependencies) from {}",
            record.name,
            record.version,
            record.dependencies.len(),
            manifest.display()
        );

        Ok(Some(record))
    }

    /// Directory containing the manifest.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    /// Manifest file name, e.g. `pyproject.toml`.
    pub fn manifest_file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_MANIFEST_NAME.to_string())
    }

    pub fn declaration(&self, dependency: &str) -> Option<&Declaration> {
        self.dependencies
            .iter()
            .find(|(name, _)| name == dependency)
            .map(|(_, decl)| decl)
    }

    /// Maps each path-form dependency to its declared path.
    pub fn local_dependencies(&self) -> Vec<(&str, &str)> {
        self.dependencies
            .iter()
            .filter_map(|(name, decl)| match decl {
                Declaration::Path { path, .. } => Some((name.as_str(), path.as_str())),
                _ => None,
            })
            .collect()
    }
}

/// Ordered, name-indexed package collection shared read-only by a run.
#[derive(Debug, Clone, Default)]
pub struct PackageSet {
    packages: Vec<PackageRecord>,
    index: HashMap<String, usize>,
}

impl PackageSet {
    /// Builds the set, rejecting duplicate names.
    pub fn new(packages: Vec<PackageRecord>) -> Result<Self> {
        let mut index = HashMap::with_capacity(packages.len());
        let mut duplicates = Vec::new();

        for (idx, pkg) in packages.iter().enumerate() {
            if index.insert(pkg.name.clone(), idx).is_some() && !duplicates.contains(&pkg.name) {
                duplicates.push(pkg.name.clone());
            }
        }

        if !duplicates.is_empty() {
            return Err(LinkError::DuplicatePackage(duplicates));
        }

        Ok(Self { packages, index })
    }

    pub fn get(&self, name: &str) -> Option<&PackageRecord> {
        self.index.get(name).map(|&idx| &self.packages[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Records in input order.
    pub fn iter(&self) -> std::slice::Iter<'_, PackageRecord> {
        self.packages.iter()
    }

    pub fn as_slice(&self) -> &[PackageRecord] {
        &self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl<'a> IntoIterator for &'a PackageSet {
    type Item = &'a PackageRecord;
    type IntoIter = std::slice::Iter<'a, PackageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.packages.iter()
    }
}

/// Validates that a manifest is well-formed TOML.
pub fn parse_document(manifest: &Path, content: &str) -> Result<DocumentMut> {
    content
        .parse::<DocumentMut>()
        .map_err(|e| LinkError::parse(manifest, e.to_string()))
}

/// Resolves a manifest path given either the file or its directory.
pub fn resolve_manifest_path(path: &Path, manifest_name: &str) -> Result<PathBuf> {
    let candidate = if path.is_dir() {
        path.join(manifest_name)
    } else {
        path.to_path_buf()
    };

    if !candidate.is_file() {
        return Err(LinkError::NotFound(candidate));
    }
    Ok(fs::canonicalize(candidate)?)
}

/// First string value of `key` across `tables`, in order.
fn required_str(tables: &[&Item], key: &str, manifest: &Path) -> Result<String> {
    tables
        .iter()
        .find_map(|table| table.get(key).and_then(Item::as_str))
        .map(str::to_string)
        .ok_or_else(|| LinkError::parse(manifest, format!("missing string field '{key}'")))
}

fn collect_dependencies(poetry: &Item) -> Vec<(String, Declaration)> {
    let mut tables: Vec<&Item> = Vec::new();

    for section in ["dependencies", "dev-dependencies"] {
        if let Some(item) = poetry.get(section) {
            tables.push(item);
        }
    }

    if let Some(groups) = poetry.get("group").and_then(Item::as_table_like) {
        for (_, group) in groups.iter() {
            if let Some(item) = group.get("dependencies") {
                tables.push(item);
            }
        }
    }

    let mut dependencies = Vec::new();
    for table in tables.into_iter().filter_map(Item::as_table_like) {
        for (name, item) in table.iter() {
            dependencies.push((name.to_string(), Declaration::from_item(item)));
        }
    }
    dependencies
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const POETRY_MANIFEST: &str = r#"
[build-system]
build-backend = "poetry.core.masonry.api"
requires = ["poetry-core"]

[tool.poetry]
name = "test-package"
version = "1.0.0"

[tool.poetry.dependencies]
python = "^3.9"
requests = "^2.25.1"
local-package = {path = "../local-package"}

[tool.poetry.group.dev.dependencies]
pytest = "^6.2.5"
"#;

    #[test]
    fn test_parse_poetry_dependencies() {
        let record = PackageRecord::parse(Path::new("/ws/test/pyproject.toml"), POETRY_MANIFEST)
            .unwrap()
            .unwrap();

        assert_eq!(record.name, "test-package");
        assert_eq!(record.version, "1.0.0");
        assert_eq!(
            record.dependencies,
            vec![
                ("python".to_string(), Declaration::Version("^3.9".into())),
                ("requests".to_string(), Declaration::Version("^2.25.1".into())),
                (
                    "local-package".to_string(),
                    Declaration::Path {
                        path: "../local-package".into(),
                        develop: false
                    }
                ),
                ("pytest".to_string(), Declaration::Version("^6.2.5".into())),
            ]
        );
    }

    #[test]
    fn test_local_dependencies() {
        let record = PackageRecord::new("test-package", "1.0.0", "/ws/test/pyproject.toml")
            .with_dependency("requests", Declaration::Version("^2.25.1".into()))
            .with_dependency(
                "local-package",
                Declaration::Path {
                    path: "../local-package".into(),
                    develop: false,
                },
            )
            .with_dependency(
                "another-local",
                Declaration::Path {
                    path: "../another-local".into(),
                    develop: true,
                },
            );

        assert_eq!(
            record.local_dependencies(),
            vec![
                ("local-package", "../local-package"),
                ("another-local", "../another-local")
            ]
        );
    }

    #[test]
    fn test_table_with_version_and_git() {
        let content = r#"
[tool.poetry]
name = "app"
version = "0.1.0"

[tool.poetry.dependencies]
numpy = { version = "^1.26", optional = true }
tool = { git = "https://example.com/tool.git" }
"#;
        let record = PackageRecord::parse(Path::new("/ws/app/pyproject.toml"), content)
            .unwrap()
            .unwrap();

        assert_eq!(
            record.declaration("numpy"),
            Some(&Declaration::Version("^1.26".into()))
        );
        assert!(matches!(record.declaration("tool"), Some(Declaration::Other(_))));
    }

    #[test]
    fn test_project_table_fallback() {
        let content = "[project]\nname = \"plain\"\nversion = \"2.0.0\"\n";
        let record = PackageRecord::parse(Path::new("/ws/plain/pyproject.toml"), content)
            .unwrap()
            .unwrap();
        assert_eq!(record.name, "plain");
        assert!(record.dependencies.is_empty());
    }

    #[test]
    fn test_project_metadata_with_poetry_dependencies() {
        let content = r#"
[project]
name = "app"
version = "0.1.0"

[tool.poetry]
packages = [{ include = "app", from = "src" }]

[tool.poetry.dependencies]
core = { path = "../core", develop = true }
"#;
        let record = PackageRecord::parse(Path::new("/ws/app/pyproject.toml"), content)
            .unwrap()
            .unwrap();

        assert_eq!(record.name, "app");
        assert_eq!(record.version, "0.1.0");
        assert_eq!(record.local_dependencies(), vec![("core", "../core")]);
    }

    #[test]
    fn test_poetry_fields_win_over_project() {
        let content = "[project]\nname = \"pep\"\nversion = \"1.0.0\"\n\n[tool.poetry]\nname = \"poetry\"\n";
        let record = PackageRecord::parse(Path::new("/ws/app/pyproject.toml"), content)
            .unwrap()
            .unwrap();

        assert_eq!(record.name, "poetry");
        assert_eq!(record.version, "1.0.0");
    }

    #[test]
    fn test_not_a_package() {
        let content = "[tool.black]\nline-length = 100\n";
        let parsed = PackageRecord::parse(Path::new("/ws/pyproject.toml"), content).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn test_missing_version_is_parse_error() {
        let content = "[tool.poetry]\nname = \"app\"\n";
        let err = PackageRecord::parse(Path::new("/ws/app/pyproject.toml"), content).unwrap_err();
        assert!(matches!(err, LinkError::ManifestParse { .. }));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = PackageRecord::parse(
            Path::new("/ws/app/pyproject.toml"),
            "This is not a valid TOML file",
        )
        .unwrap_err();
        assert!(matches!(err, LinkError::ManifestParse { .. }));
    }

    #[test]
    fn test_from_path_directory_and_file() {
        let temp = TempDir::new().unwrap();
        let manifest = temp.path().join("pyproject.toml");
        fs::write(&manifest, POETRY_MANIFEST).unwrap();

        let from_dir = PackageRecord::from_path(temp.path()).unwrap();
        let from_file = PackageRecord::from_path(&manifest).unwrap();

        assert_eq!(from_dir, from_file);
        assert_eq!(from_dir.path, fs::canonicalize(&manifest).unwrap());
        assert_eq!(from_dir.manifest_file_name(), "pyproject.toml");
    }

    #[test]
    fn test_from_path_missing() {
        let err = PackageRecord::from_path("/nonexistent/path/pyproject.toml").unwrap_err();
        assert!(matches!(err, LinkError::NotFound(_)));
    }

    #[test]
    fn test_package_set_rejects_duplicates() {
        let err = PackageSet::new(vec![
            PackageRecord::new("a", "1.0.0", "/ws/a/pyproject.toml"),
            PackageRecord::new("b", "1.0.0", "/ws/b/pyproject.toml"),
            PackageRecord::new("a", "2.0.0", "/ws/other/a/pyproject.toml"),
        ])
        .unwrap_err();

        match err {
            LinkError::DuplicatePackage(names) => assert_eq!(names, vec!["a".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_package_set_lookup_keeps_order() {
        let set = PackageSet::new(vec![
            PackageRecord::new("b", "1.0.0", "/ws/b/pyproject.toml"),
            PackageRecord::new("a", "1.0.0", "/ws/a/pyproject.toml"),
        ])
        .unwrap();

        assert_eq!(set.get("a").unwrap().name, "a");
        assert!(!set.contains("c"));
        let names: Vec<_> = set.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
