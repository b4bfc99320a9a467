//! Line-oriented rewriting of dependency declarations.
//!
//! The rewriter never edits the TOML tree. It walks the manifest line by
//! line, and for each `key = value` line whose key is selected by a
//! [`MatchRule`] it substitutes the value and re-emits the line as
//! `key = new-value`. Everything else is copied through untouched:
//!
//! ```toml
//! [tool.poetry.dependencies]
//! python = "^3.9"              # no rule for `python`: byte-identical
//! core = "^0.2.0"              # -> core = {develop = true, path = "../core"}
//! ```
//!
//! # Rule precedence
//!
//! Every rule is tried in order. Each selecting rule computes its value from
//! the original right-hand side, and the last one wins.
//!
//! # Line endings
//!
//! Each line keeps its own terminator (`\n`, `\r\n`, or none on the last
//! line), so a rewrite that reproduces the original text is not a change.

use crate::error::{LinkError, Result};
use crate::manifest::package::parse_document;
use crate::manifest::{PackageRecord, PackageSet};
use crate::rewrite::rule::MatchRule;
use crate::rewrite::template;
use std::fs;
use std::path::Path;

/// One rewritten line: `(original, replacement)` without line terminators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub original: String,
    pub replacement: String,
}

/// Output of a rewrite: the new body and what changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rewrite {
    /// Every line of the new body, terminators included.
    pub lines: Vec<String>,
    /// Changed lines in file order. Empty means the body equals the input.
    pub changes: Vec<ChangeRecord>,
}

impl Rewrite {
    pub fn body(&self) -> String {
        self.lines.concat()
    }

    pub fn is_unchanged(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Applies match rules to the manifest of `source`.
pub struct DeclarationRewriter<'a> {
    source: &'a PackageRecord,
    rules: &'a [MatchRule],
    lookup: &'a PackageSet,
}

impl<'a> DeclarationRewriter<'a> {
    pub fn new(source: &'a PackageRecord, rules: &'a [MatchRule], lookup: &'a PackageSet) -> Self {
        Self {
            source,
            rules,
            lookup,
        }
    }

    /// Reads and validates `manifest_path`, then rewrites it.
    ///
    /// # Errors
    ///
    /// - `NotFound`: missing manifest
    /// - `ManifestParse`: the manifest is not valid TOML
    pub fn rewrite(&self, manifest_path: &Path) -> Result<Rewrite> {
        if !manifest_path.is_file() {
            return Err(LinkError::NotFound(manifest_path.to_path_buf()));
        }
        let content = fs::read_to_string(manifest_path)?;
        parse_document(manifest_path, &content)?;
        Ok(self.rewrite_str(&content))
    }

    /// Rewrites manifest text. Assumes the text was already validated.
    pub fn rewrite_str(&self, content: &str) -> Rewrite {
        let mut rewrite = Rewrite::default();

        for line in content.split_inclusive('\n') {
            let (text, terminator) = split_terminator(line);

            match self.rewrite_line(text) {
                Some(replacement) if replacement != text => {
                    log::debug!("{}: {} -> {}", self.source.name, text.trim(), replacement);
                    rewrite.lines.push(format!("{replacement}{terminator}"));
                    rewrite.changes.push(ChangeRecord {
                        original: text.to_string(),
                        replacement,
                    });
                }
                _ => rewrite.lines.push(line.to_string()),
            }
        }

        rewrite
    }

    /// Returns the reassembled line if some rule selects its key.
    fn rewrite_line(&self, text: &str) -> Option<String> {
        let (key, raw_value) = text.trim().split_once('=')?;
        let key = key.trim();
        let raw_value = raw_value.trim();

        let mut value = None;
        for rule in self.rules.iter().filter(|rule| rule.matches(key)) {
            let target = self.lookup.get(key);
            if target.is_none() {
                log::debug!(
                    "'{}' matched a rule but is not a known package; rendering without it",
                    key
                );
            }
            let substituted = rule.substitute(raw_value);
            value = Some(template::render(&substituted, self.source, target));
        }

        value.map(|value| format!("{key} = {value}"))
    }
}

fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(text) = line.strip_suffix("\r\n") {
        (text, "\r\n")
    } else if let Some(text) = line.strip_suffix('\n') {
        (text, "\n")
    } else {
        (line, "")
    }
}
