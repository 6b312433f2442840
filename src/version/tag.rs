use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a specific release of the template artifact (e.g. `v2.1.0`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagName(String);

impl TagName {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Tag derived from a bare version number: `2.0.0` -> `v2.0.0`
    pub fn from_version(version: &str) -> Self {
        Self(format!("v{}", version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
