//! Match rules selecting dependency declarations to rewrite.

use crate::error::{LinkError, Result};
use crate::manifest::PackageRecord;
use regex::Regex;
use std::fmt;

/// Version pattern used by the stock rules: the whole right-hand side.
pub const ANY_VERSION: &str = r"^.*$";

/// Template producing an editable local path link.
pub const LOCAL_TEMPLATE: &str = r#"{develop = true, path = "{package.path.relative}"}"#;

/// Template producing a quoted registry version.
pub const REMOTE_TEMPLATE: &str = r#""{package.version}""#;

/// Which form declarations are converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// `dep = {develop = true, path = "../dep"}`
    Local,
    /// `dep = "1.2.0"`
    Remote,
}

impl Direction {
    pub fn template(self) -> &'static str {
        match self {
            Direction::Local => LOCAL_TEMPLATE,
            Direction::Remote => REMOTE_TEMPLATE,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Local => f.write_str("local"),
            Direction::Remote => f.write_str("remote"),
        }
    }
}

/// One conversion: which keys, which part of the value, and what to put there.
#[derive(Debug, Clone)]
pub struct MatchRule {
    package: Regex,
    version: Regex,
    version_to: String,
}

impl MatchRule {
    /// Compiles a rule.
    ///
    /// `package_regex` must match the whole dependency key. `version_to` uses
    /// regex replacement syntax (`$1`, `${name}`) plus the template fields
    /// `{package.*}` and `{self.*}`.
    pub fn new(package_regex: &str, version_regex: &str, version_to: impl Into<String>) -> Result<Self> {
        Ok(Self {
            package: Regex::new(&format!("^(?:{package_regex})$"))?,
            version: Regex::new(version_regex)?,
            version_to: version_to.into(),
        })
    }

    /// Rule converting matching keys to an editable path link.
    pub fn to_local(package_regex: &str) -> Result<Self> {
        Self::new(package_regex, ANY_VERSION, LOCAL_TEMPLATE)
    }

    /// Rule converting matching keys to the target package's version.
    pub fn to_remote(package_regex: &str) -> Result<Self> {
        Self::new(package_regex, ANY_VERSION, REMOTE_TEMPLATE)
    }

    /// Rule matching exactly `package.name`.
    pub fn for_package(package: &PackageRecord, direction: Direction) -> Result<Self> {
        Self::new(
            &format!("^{}$", regex::escape(&package.name)),
            ANY_VERSION,
            direction.template(),
        )
    }

    /// True if the rule selects dependency `key`.
    pub fn matches(&self, key: &str) -> bool {
        self.package.is_match(key)
    }

    /// Applies the version substitution, without rendering template fields.
    pub fn substitute(&self, raw_value: &str) -> String {
        self.version
            .replace_all(raw_value, self.version_to.as_str())
            .into_owned()
    }

    pub fn version_to(&self) -> &str {
        &self.version_to
    }
}

/// Picks the rules for one conversion call.
///
/// Explicit rules win when both are given; packages yield one anchored rule
/// each.
///
/// # Errors
///
/// `Configuration` when neither source is given, or when the chosen source
/// is empty.
pub fn resolve_rules(
    rules: Option<&[MatchRule]>,
    packages: Option<&[PackageRecord]>,
    direction: Direction,
) -> Result<Vec<MatchRule>> {
    let resolved = match (rules, packages) {
        (None, None) => {
            return Err(LinkError::Configuration(
                "either match rules or packages must be provided".to_string(),
            ));
        }
        (Some(rules), _) => rules.to_vec(),
        (None, Some(packages)) => packages
            .iter()
            .map(|pkg| MatchRule::for_package(pkg, direction))
            .collect::<Result<Vec<_>>>()?,
    };

    if resolved.is_empty() {
        return Err(LinkError::Configuration(
            "no match rules were created; the manifest would not be modified".to_string(),
        ));
    }
    Ok(resolved)
}
