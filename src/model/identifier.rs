use std::fmt;

use serde::{Deserialize, Serialize};

use super::validation::{validate, Rule, ValidationError};

/// Primary key of an entity: either a string or an integer
///
/// Integers sort before strings; within a variant the natural order applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Int(i64),
    Str(String),
}

impl Identifier {
    /// Validate a string identifier against `rules`. Integer identifiers always pass.
    pub fn validate(&self, field: &'static str, rules: &[Rule]) -> Result<(), ValidationError> {
        match self {
            Identifier::Int(_) => Ok(()),
            Identifier::Str(s) => validate(field, s, rules),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Identifier::Str(s) => Some(s),
            Identifier::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Identifier::Int(i) => Some(*i),
            Identifier::Str(_) => None,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Int(i) => write!(f, "{}", i),
            Identifier::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Identifier::Int(value)
    }
}

impl From<i32> for Identifier {
    fn from(value: i32) -> Self {
        Identifier::Int(i64::from(value))
    }
}

impl From<u32> for Identifier {
    fn from(value: u32) -> Self {
        Identifier::Int(i64::from(value))
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier::Str(value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::Str(value.to_string())
    }
}

impl From<&Identifier> for Identifier {
    fn from(value: &Identifier) -> Self {
        value.clone()
    }
}
