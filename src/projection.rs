//! Projections: the columns a reader actually needs
//!
//! A projection is an ordered list of field paths. Position `i` in the list
//! is slot `i` of the target record. MAP columns may carry a requested-key
//! set restricting which entries are extracted.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

/// Requested keys of a MAP column. Unique, order irrelevant.
pub type KeySet = BTreeSet<String>;

static ENTRY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<path>[^#{}|]*?)\s*(?:#\s*\{(?P<keys>[^{}]*)\})?\s*$").unwrap()
});

/// One projected column
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectedColumn {
    /// Dotted field path; `None` reserves the slot without producing it
    pub name: Option<String>,
    pub keys: Option<KeySet>,
}

impl ProjectedColumn {
    pub fn new(name: impl Into<String>) -> Self {
        ProjectedColumn {
            name: Some(name.into()),
            keys: None,
        }
    }

    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Display form, e.g. `a.c#{k1|k2}`
    pub fn label(&self) -> String {
        let name = self.name.as_deref().unwrap_or("");
        match &self.keys {
            Some(keys) => {
                let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
                format!("{}#{{{}}}", name, keys.join("|"))
            }
            None => name.to_string(),
        }
    }
}

/// Ordered list of projected columns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    columns: Vec<ProjectedColumn>,
}

impl Projection {
    pub fn new(columns: Vec<ProjectedColumn>) -> Self {
        Projection { columns }
    }

    /// Projection of plain paths with no key filters
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection {
            columns: paths.into_iter().map(ProjectedColumn::new).collect(),
        }
    }

    /// Parse `a.b, a.c#{k1|k2}, , d`. Empty entries are unnamed columns.
    pub fn parse(text: &str) -> Result<Self> {
        let mut columns = Vec::new();
        for entry in split_entries(text)? {
            let caps = ENTRY_REGEX
                .captures(entry)
                .ok_or_else(|| Error::Projection(format!("malformed entry '{}'", entry.trim())))?;

            let path = caps.name("path").map_or("", |m| m.as_str());
            let keys = caps.name("keys").map(|m| {
                m.as_str()
                    .split('|')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(String::from)
                    .collect::<KeySet>()
            });

            if path.is_empty() && keys.is_some() {
                return Err(Error::Projection(format!(
                    "key set without a column in '{}'",
                    entry.trim()
                )));
            }

            columns.push(ProjectedColumn {
                name: (!path.is_empty()).then(|| path.to_string()),
                keys,
            });
        }

        let projection = Projection { columns };
        projection.check_labels()?;
        Ok(projection)
    }

    /// Labels key the output rows, so two named columns may not share one
    pub fn check_labels(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for label in self.columns.iter().map(ProjectedColumn::label) {
            if !label.is_empty() && !seen.insert(label.clone()) {
                return Err(Error::Projection(format!("duplicate column '{}'", label)));
            }
        }
        Ok(())
    }

    pub fn columns(&self) -> &[ProjectedColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Split on top-level commas, leaving commas inside `{...}` alone
fn split_entries(text: &str) -> Result<Vec<&str>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::Projection("unbalanced '}'".to_string()))?;
            }
            ',' if depth == 0 => {
                entries.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(Error::Projection("unbalanced '{'".to_string()));
    }
    entries.push(&text[start..]);
    Ok(entries)
}
