//! Label table: category key -> integer label code
//!
//! File grammar, one entry per line:
//!
//! ```text
//! <key> <code> [ignored trailing tokens]
//! ```
//!
//! `key` is any run of non-whitespace characters and `code` a non-negative
//! decimal integer. Blank lines are skipped. When a key repeats, the later
//! line wins.

use crate::error::{Result, VoxelizeError};
use nom::{
    bytes::complete::take_till1,
    character::complete::{i64 as nom_i64, space0, space1},
    sequence::{preceded, tuple},
    IResult,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Label code for categories missing from the table.
pub const UNKNOWN_LABEL: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    entries: HashMap<String, u32>,
    fallback: u32,
}

impl Default for LabelTable {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            fallback: UNKNOWN_LABEL,
        }
    }
}

// Key, then whitespace, then a signed integer (sign checked by the caller)
fn entry(input: &str) -> IResult<&str, (&str, i64)> {
    tuple((
        preceded(space0, take_till1(char::is_whitespace)),
        preceded(space1, nom_i64),
    ))(input)
}

impl LabelTable {
    /// Load a label definition file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| VoxelizeError::from_io(path, err))?;
        let table = Self::parse_at(&text, path)?;
        debug!("Loaded {} labels from {}", table.len(), path.display());
        Ok(table)
    }

    /// Build a table from `(key, code)` pairs; later pairs win.
    pub fn from_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, u32)>) -> Self {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            fallback: UNKNOWN_LABEL,
        }
    }

    /// Replace the code returned for unmapped keys.
    pub fn with_fallback(mut self, fallback: u32) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn fallback(&self) -> u32 {
        self.fallback
    }

    /// Code for `key`, if the table maps it.
    pub fn get(&self, key: &str) -> Option<u32> {
        self.entries.get(key).copied()
    }

    /// Code for `key`, or the fallback code when unmapped.
    pub fn lookup(&self, key: &str) -> u32 {
        self.get(key).unwrap_or(self.fallback)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn parse_at(text: &str, origin: &Path) -> Result<Self> {
        let mut entries = HashMap::new();

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            if line.trim().is_empty() {
                continue;
            }

            let (_, (key, code)) = entry(line).map_err(|_| {
                VoxelizeError::parse(origin, Some(line_no), "expected '<key> <code>'")
            })?;

            let code = u32::try_from(code).map_err(|_| {
                VoxelizeError::parse(
                    origin,
                    Some(line_no),
                    format!("label code {code} is not in 0..={}", u32::MAX),
                )
            })?;

            if let Some(previous) = entries.insert(key.to_string(), code) {
                if previous != code {
                    warn!(
                        "{}:{}: key '{}' redefined ({} -> {})",
                        origin.display(),
                        line_no,
                        key,
                        previous,
                        code
                    );
                }
            }
        }

        Ok(Self {
            entries,
            fallback: UNKNOWN_LABEL,
        })
    }
}

impl FromStr for LabelTable {
    type Err = VoxelizeError;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse_at(text, &PathBuf::from("<inline>"))
    }
}
