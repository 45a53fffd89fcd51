//! A thin, schema-agnostic view over a workspace JSON document.
//!
//! The engine never models the architecture content itself; it reads and
//! writes the handful of top-level fields it needs and leaves everything
//! else untouched.

use crate::error::{ArchwayError, Result};
use crate::workspace::id::WorkspaceId;
use crate::workspace::metadata::{format_iso_date, parse_iso_date};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

/// Workspace property holding an embedded, base64 encoded DSL source.
pub const DSL_PROPERTY: &str = "structurizr.dsl";

const ENCRYPTION_STRATEGY_MARKER: &str = "\"encryptionStrategy\"";
const CIPHERTEXT_MARKER: &str = "\"ciphertext\"";

/// Cheap substring check for an encrypted envelope, done before any parse.
pub fn is_encrypted_envelope(json: &str) -> bool {
    json.contains(ENCRYPTION_STRATEGY_MARKER) && json.contains(CIPHERTEXT_MARKER)
}

/// Visibility declared inside a workspace's configuration block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// Role of a user declared inside a workspace's configuration block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    ReadWrite,
    ReadOnly,
}

/// A user entry from a workspace's configuration block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredUser {
    pub username: String,
    pub role: Role,
}

/// The configuration block of a workspace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceConfiguration {
    pub visibility: Option<Visibility>,
    pub users: Vec<ConfiguredUser>,
    pub scope: Option<String>,
}

/// A workspace document held as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceDocument {
    root: Map<String, Value>,
}

impl WorkspaceDocument {
    /// Parses a document; the top level must be a JSON object.
    pub fn parse(json: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(root) => Ok(Self { root }),
            _ => Err(ArchwayError::serialization(
                "JSON",
                "workspace document must be a JSON object",
            )),
        }
    }

    /// Creates a document with an empty model and empty views.
    pub fn new_empty(name: &str, description: &str) -> Self {
        let value = json!({
            "name": name,
            "description": description,
            "model": {},
            "views": {
                "configuration": {
                    "branding": {},
                    "styles": {},
                    "terminology": {}
                }
            },
            "configuration": {}
        });

        match value {
            Value::Object(root) => Self { root },
            _ => Self { root: Map::new() },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.root)?)
    }

    pub fn as_value(&self) -> &Map<String, Value> {
        &self.root
    }

    fn string_field(&self, key: &str) -> Option<&str> {
        self.root.get(key).and_then(Value::as_str)
    }

    fn set_string_field(&mut self, key: &str, value: Option<&str>) {
        match value {
            Some(value) => {
                self.root.insert(key.to_string(), Value::String(value.to_string()));
            }
            None => {
                self.root.remove(key);
            }
        }
    }

    pub fn id(&self) -> Option<WorkspaceId> {
        self.root.get("id").and_then(Value::as_u64)
    }

    pub fn set_id(&mut self, id: WorkspaceId) {
        self.root.insert("id".to_string(), Value::from(id));
    }

    pub fn name(&self) -> Option<&str> {
        self.string_field("name")
    }

    pub fn set_name(&mut self, name: &str) {
        self.set_string_field("name", Some(name));
    }

    pub fn description(&self) -> Option<&str> {
        self.string_field("description")
    }

    pub fn last_modified_user(&self) -> Option<&str> {
        self.string_field("lastModifiedUser")
    }

    pub fn last_modified_agent(&self) -> Option<&str> {
        self.string_field("lastModifiedAgent")
    }

    pub fn last_modified_date(&self) -> Option<DateTime<Utc>> {
        self.string_field("lastModifiedDate").and_then(parse_iso_date)
    }

    pub fn set_last_modified_date(&mut self, date: &DateTime<Utc>) {
        let formatted = format_iso_date(date);
        self.set_string_field("lastModifiedDate", Some(formatted.as_str()));
    }

    /// Reads the configuration block. Unknown values are ignored.
    pub fn configuration(&self) -> WorkspaceConfiguration {
        let Some(config) = self.root.get("configuration").and_then(Value::as_object) else {
            return WorkspaceConfiguration::default();
        };

        let visibility = config
            .get("visibility")
            .and_then(Value::as_str)
            .and_then(|v| match v.to_ascii_lowercase().as_str() {
                "public" => Some(Visibility::Public),
                "private" => Some(Visibility::Private),
                _ => None,
            });

        let users = config
            .get("users")
            .and_then(Value::as_array)
            .map(|users| {
                users
                    .iter()
                    .filter_map(|user| {
                        let username = user.get("username")?.as_str()?.to_string();
                        let role = match user.get("role").and_then(Value::as_str) {
                            Some(role) if role.eq_ignore_ascii_case("ReadWrite") => Role::ReadWrite,
                            _ => Role::ReadOnly,
                        };
                        Some(ConfiguredUser { username, role })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let scope = config
            .get("scope")
            .and_then(Value::as_str)
            .map(str::to_string);

        WorkspaceConfiguration {
            visibility,
            users,
            scope,
        }
    }

    pub fn scope(&self) -> Option<String> {
        self.configuration().scope
    }

    pub fn set_scope(&mut self, scope: &str) {
        let config = self
            .root
            .entry("configuration".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(config) = config {
            config.insert("scope".to_string(), Value::String(scope.to_string()));
        }
    }

    /// Removes the configuration block, keeping only the scope, and returns
    /// what was there.
    pub fn take_configuration(&mut self) -> WorkspaceConfiguration {
        let configuration = self.configuration();
        let mut stripped = Map::new();
        if let Some(scope) = &configuration.scope {
            stripped.insert("scope".to_string(), Value::String(scope.clone()));
        }
        self.root
            .insert("configuration".to_string(), Value::Object(stripped));

        configuration
    }

    /// Decodes the embedded DSL source, if present.
    pub fn embedded_dsl(&self) -> Option<String> {
        let encoded = self
            .root
            .get("properties")
            .and_then(Value::as_object)
            .and_then(|props| props.get(DSL_PROPERTY))
            .and_then(Value::as_str)?;

        let bytes = BASE64.decode(encoded.trim()).ok()?;
        String::from_utf8(bytes).ok()
    }

    pub fn set_embedded_dsl(&mut self, dsl: &str) {
        let props = self
            .root
            .entry("properties".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(props) = props {
            props.insert(DSL_PROPERTY.to_string(), Value::String(BASE64.encode(dsl)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_is_encrypted_envelope() {
        assert!(is_encrypted_envelope(
            r#"{"encryptionStrategy":{"location":"Client"},"ciphertext":"abc"}"#
        ));
        assert!(!is_encrypted_envelope(r#"{"ciphertext":"abc"}"#));
        assert!(!is_encrypted_envelope(r#"{"name":"encryptionStrategy ciphertext"}"#));
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(WorkspaceDocument::parse("[1,2]").is_err());
        assert!(WorkspaceDocument::parse("not json").is_err());
    }

    #[test]
    fn test_new_empty_document() {
        let doc = WorkspaceDocument::new_empty("Workspace 0001", "Description");
        assert_eq!(doc.name(), Some("Workspace 0001"));
        assert_eq!(doc.description(), Some("Description"));
        assert!(doc.id().is_none());
        assert!(doc.as_value().contains_key("model"));
    }

    #[test]
    fn test_id_and_last_modified_date() {
        let mut doc = WorkspaceDocument::parse(r#"{"name":"A"}"#).unwrap();
        doc.set_id(7);
        let date = Utc.with_ymd_and_hms(2021, 1, 31, 14, 30, 59).unwrap();
        doc.set_last_modified_date(&date);

        let json = doc.to_json().unwrap();
        assert!(json.contains("\"lastModifiedDate\":\"2021-01-31T14:30:59Z\""));

        let reparsed = WorkspaceDocument::parse(&json).unwrap();
        assert_eq!(reparsed.id(), Some(7));
        assert_eq!(reparsed.last_modified_date(), Some(date));
    }

    #[test]
    fn test_take_configuration_keeps_scope() {
        let mut doc = WorkspaceDocument::parse(
            r#"{
                "configuration": {
                    "visibility": "Public",
                    "scope": "SoftwareSystem",
                    "users": [
                        {"username": "alice", "role": "ReadWrite"},
                        {"username": "bob", "role": "ReadOnly"},
                        {"role": "ReadOnly"}
                    ]
                }
            }"#,
        )
        .unwrap();

        let config = doc.take_configuration();
        assert_eq!(config.visibility, Some(Visibility::Public));
        assert_eq!(config.scope.as_deref(), Some("SoftwareSystem"));
        assert_eq!(
            config.users,
            vec![
                ConfiguredUser {
                    username: "alice".to_string(),
                    role: Role::ReadWrite
                },
                ConfiguredUser {
                    username: "bob".to_string(),
                    role: Role::ReadOnly
                },
            ]
        );

        let remaining = doc.configuration();
        assert!(remaining.visibility.is_none());
        assert!(remaining.users.is_empty());
        assert_eq!(remaining.scope.as_deref(), Some("SoftwareSystem"));
    }

    #[test]
    fn test_embedded_dsl() {
        let mut doc = WorkspaceDocument::new_empty("A", "B");
        assert!(doc.embedded_dsl().is_none());
        doc.set_embedded_dsl("workspace {\n}");
        assert_eq!(doc.embedded_dsl().as_deref(), Some("workspace {\n}"));
    }

    #[test]
    fn test_set_scope() {
        let mut doc = WorkspaceDocument::parse("{}").unwrap();
        doc.set_scope("Landscape");
        assert_eq!(doc.scope().as_deref(), Some("Landscape"));
    }
}
