use std::fmt;
use std::str::FromStr;

use crate::error::TreemapError;

const TREE_ID_DIGITS: usize = 7;

/// Identifier of a single street tree, always seven decimal digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeId(u32);

impl TreeId {
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TreeId {
    type Err = TreemapError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = value
            .trim()
            .parse::<u32>()
            .map_err(|_| TreemapError::InvalidTreeId(value.to_string()))?;
        // Leading zeros are dropped by the parse, so "0123456" is six digits.
        if parsed.to_string().len() != TREE_ID_DIGITS {
            return Err(TreemapError::InvalidTreeId(value.to_string()));
        }
        Ok(Self(parsed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeciesId(u32);

impl SpeciesId {
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SpeciesId {
    type Err = TreemapError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|_| TreemapError::InvalidSpeciesId(value.to_string()))
    }
}

/// The subset of species fields both pipelines read. Missing fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeciesRecord {
    pub common_name: String,
    pub scientific_name: String,
    pub species_photo_id: String,
    pub cultivar_name: String,
}

/// Pulls a tree id out of the last `/`-separated segment of a line.
pub fn extract_tree_id(line: &str) -> Option<TreeId> {
    line.trim()
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
}

/// Capitalizes every space-separated word: first letter upper, the rest lower.
pub fn format_name(common_name: &str) -> String {
    common_name
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
