//! Language families and the alias table used to recognize them.
//!
//! A family groups the fence tags that are formatted by the same tool chain
//! (e.g. `bash`, `sh` and `shell` all route to the shell formatter).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The closed set of language families fencefmt knows how to format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Family {
    Python,
    Shell,
}

impl Family {
    /// Every family, in scan order.
    pub const ALL: [Family; 2] = [Family::Python, Family::Shell];

    /// Canonical key, used for config tables and temp subdirectories.
    pub fn key(self) -> &'static str {
        match self {
            Family::Python => "python",
            Family::Shell => "shell",
        }
    }

    /// Single letter embedded in isolated unit names.
    pub fn letter(self) -> char {
        match self {
            Family::Python => 'p',
            Family::Shell => 's',
        }
    }

    /// File extension (with dot) given to isolated units.
    pub fn extension(self) -> &'static str {
        match self {
            Family::Python => ".py",
            Family::Shell => ".sh",
        }
    }

    /// Ordinal offset that keeps unit ordinals of different families disjoint.
    pub fn bucket(self) -> usize {
        match self {
            Family::Python => 0,
            Family::Shell => 1000,
        }
    }

    /// Tags recognized for this family out of the box.
    pub fn default_aliases(self) -> &'static [&'static str] {
        match self {
            Family::Python => &["python", "py", "{ .py .annotate }"],
            Family::Shell => &["bash", "sh", "shell"],
        }
    }

    pub fn from_key(key: &str) -> Option<Family> {
        Family::ALL.into_iter().find(|f| f.key().eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Family::from_key(s).ok_or_else(|| format!("unknown language family '{s}' (expected python or shell)"))
    }
}

/// Immutable mapping from family to the tag spellings that select it.
///
/// Built once at startup and handed to the extractor; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    aliases: BTreeMap<Family, Vec<String>>,
}

impl AliasTable {
    /// Default aliases plus any configured extras, deduplicated.
    pub fn new(extra: &BTreeMap<Family, Vec<String>>) -> Self {
        let mut aliases = BTreeMap::new();
        for family in Family::ALL {
            let mut tags: Vec<String> = family.default_aliases().iter().map(|s| s.to_string()).collect();
            if let Some(more) = extra.get(&family) {
                for tag in more {
                    let tag = tag.trim();
                    if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                        tags.push(tag.to_string());
                    }
                }
            }
            aliases.insert(family, tags);
        }
        Self { aliases }
    }

    pub fn aliases(&self, family: Family) -> &[String] {
        self.aliases.get(&family).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Regex alternation matching any alias of `family`, longest first.
    ///
    /// Whitespace inside an alias matches any run of spaces, including none,
    /// so `{ .py .annotate }` also matches `{.py .annotate}`.
    pub fn pattern(&self, family: Family) -> String {
        let mut tags: Vec<&String> = self.aliases(family).iter().collect();
        tags.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        tags.iter().map(|tag| alias_pattern(tag)).collect::<Vec<_>>().join("|")
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::new(&BTreeMap::new())
    }
}

fn alias_pattern(alias: &str) -> String {
    let body = alias.split_whitespace().map(regex::escape).collect::<Vec<_>>().join(" *");
    let lead = if alias.starts_with(' ') { " *" } else { "" };
    let trail = if alias.ends_with(' ') { " *" } else { "" };
    format!("{lead}{body}{trail}")
}
