//! Resource listing types

use serde::{Deserialize, Serialize};

/// A readable resource exposed by a tool server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource URI (e.g. `file:///srv/docs/rfc3261.txt`)
    pub uri: String,
    /// Short name
    pub name: String,
    /// Human-readable description, shown to the model
    pub description: String,
    /// MIME type of the resource content
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

impl Resource {
    pub fn new(
        uri: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: description.into(),
            mime_type: mime_type.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_serialization() {
        let res = Resource::new("file:///tmp/a.txt", "a", "VoIP documentation: a", "text/plain");
        let json = serde_json::to_string(&res).unwrap();
        assert!(json.contains("\"mimeType\":\"text/plain\""));
    }
}
