//! Active scene correlation token

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the scene currently considered live.
///
/// The output engine stores it for other consumers and never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveSceneId(String);

impl ActiveSceneId {
    /// Wrap an opaque scene id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActiveSceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActiveSceneId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ActiveSceneId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
