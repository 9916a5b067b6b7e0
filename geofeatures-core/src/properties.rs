//! Free-form feature properties.

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An arbitrary JSON object attached to a feature.
///
/// Stored verbatim as JSON text; an absent object is represented as `{}`.
///
/// # Examples
/// ```
/// use geofeatures_core::Properties;
/// use serde_json::json;
///
/// let mut properties = Properties::new();
/// properties.insert("name".into(), json!("Tiergarten"));
/// assert_eq!(properties.to_string(), r#"{"name":"Tiergarten"}"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(pub Map<String, Value>);

impl Properties {
    /// An empty object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Deref for Properties {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Properties {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Map<String, Value>> for Properties {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl std::fmt::Display for Properties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Serialising a map of JSON values cannot fail.
        let text = serde_json::to_string(&self.0).map_err(|_| std::fmt::Error)?;
        f.write_str(&text)
    }
}
