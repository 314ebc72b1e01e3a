use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The logical identity of a data object: an absolute collection path plus
/// an object name, e.g. `/zone/home/alice/results.dat`.
///
/// Logical paths are what clients name and what the catalog keys on; they
/// say nothing about where replica bytes physically live.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LogicalPath {
    collection: String,
    name: String,
}

impl LogicalPath {
    /// Parse an absolute path of the form `/collection/.../name`.
    ///
    /// The path must start with `/`, contain no empty segments, and end in
    /// a non-empty object name.
    pub fn parse(path: &str) -> Result<Self, TypeError> {
        if !path.starts_with('/') {
            return Err(TypeError::InvalidPath(format!(
                "path must be absolute: {path:?}"
            )));
        }
        let trimmed = &path[1..];
        if trimmed.is_empty() || trimmed.ends_with('/') {
            return Err(TypeError::InvalidPath(format!(
                "path must end in an object name: {path:?}"
            )));
        }
        if trimmed.split('/').any(str::is_empty) {
            return Err(TypeError::InvalidPath(format!(
                "path contains an empty segment: {path:?}"
            )));
        }
        let (collection, name) = match trimmed.rsplit_once('/') {
            Some((parent, name)) => (format!("/{parent}"), name.to_string()),
            None => ("/".to_string(), trimmed.to_string()),
        };
        Ok(Self { collection, name })
    }

    /// Build a path from an already-validated collection and name.
    pub fn from_parts(collection: &str, name: &str) -> Result<Self, TypeError> {
        if collection == "/" {
            return Self::parse(&format!("/{name}"));
        }
        Self::parse(&format!("{collection}/{name}"))
    }

    /// The collection holding this object (`/zone/home/alice`).
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The object name (`results.dat`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full rendered path.
    pub fn as_string(&self) -> String {
        if self.collection == "/" {
            format!("/{}", self.name)
        } else {
            format!("{}/{}", self.collection, self.name)
        }
    }
}

impl fmt::Debug for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogicalPath({})", self.as_string())
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}
