//! Dependency declaration rewriting.
//!
//! - `rule`: which declarations to touch and what to put there
//! - `template`: `{package.*}` / `{self.*}` field substitution
//! - `declaration`: the line-oriented rewriter
//! - `converter`: one manifest end to end, including the write

pub mod converter;
pub mod declaration;
pub mod rule;
pub mod template;

pub use converter::ManifestConverter;
pub use declaration::{ChangeRecord, DeclarationRewriter, Rewrite};
pub use rule::{ANY_VERSION, Direction, LOCAL_TEMPLATE, MatchRule, REMOTE_TEMPLATE, resolve_rules};
