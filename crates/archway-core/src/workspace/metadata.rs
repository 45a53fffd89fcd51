//! Workspace metadata: identity, visibility, users, credentials and the
//! advisory editor lock.

use crate::user::{AccessPolicy, Permission, User};
use crate::workspace::id::WorkspaceId;
use crate::workspace::version::user_friendly_version;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How long a lock stays active after it was last stamped.
pub const LOCK_TTL: Duration = Duration::minutes(2);

const SHARING_TOKEN_PREFIX_LENGTH: usize = 6;

/// Property keys used when metadata is persisted as `key=value` pairs.
pub mod keys {
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const VERSION: &str = "version";
    pub const CLIENT_SIDE_ENCRYPTED: &str = "clientSideEncrypted";
    pub const LAST_MODIFIED_USER: &str = "lastModifiedUser";
    pub const LAST_MODIFIED_AGENT: &str = "lastModifiedAgent";
    pub const LAST_MODIFIED_DATE: &str = "lastModifiedDate";
    pub const API_KEY: &str = "apiKey";
    pub const API_SECRET: &str = "apiSecret";
    pub const PUBLIC: &str = "public";
    pub const SHARING_TOKEN: &str = "sharingToken";
    pub const OWNER: &str = "owner";
    pub const LOCKED_USER: &str = "lockedUser";
    pub const LOCKED_AGENT: &str = "lockedAgent";
    pub const LOCKED_DATE: &str = "lockedDate";
    pub const READ_USERS_AND_ROLES: &str = "readUsersAndRoles";
    pub const WRITE_USERS_AND_ROLES: &str = "writeUsersAndRoles";
    pub const ARCHIVED: &str = "archived";
}

/// Everything the engine knows about a workspace apart from its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMetadata {
    pub id: WorkspaceId,
    name: Option<String>,
    description: Option<String>,
    pub internal_version: Option<String>,
    pub owner: Option<String>,
    pub client_side_encrypted: bool,
    pub last_modified_user: Option<String>,
    pub last_modified_agent: Option<String>,
    pub last_modified_date: DateTime<Utc>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    public: bool,
    sharing_token: Option<String>,
    locked_user: Option<String>,
    locked_agent: Option<String>,
    locked_date: Option<DateTime<Utc>>,
    read_users: BTreeSet<String>,
    write_users: BTreeSet<String>,
    pub archived: bool,
    /// Size in bytes of the most recently stored content.
    pub size: u64,
}

impl WorkspaceMetadata {
    pub fn new(id: WorkspaceId) -> Self {
        Self {
            id,
            name: None,
            description: None,
            internal_version: None,
            owner: None,
            client_side_encrypted: false,
            last_modified_user: None,
            last_modified_agent: None,
            last_modified_date: DateTime::<Utc>::UNIX_EPOCH,
            api_key: None,
            api_secret: None,
            public: false,
            sharing_token: None,
            locked_user: None,
            locked_agent: None,
            locked_date: None,
            read_users: BTreeSet::new(),
            write_users: BTreeSet::new(),
            archived: false,
            size: 0,
        }
    }

    // ------------------------------------------------------------------
    // Naming
    // ------------------------------------------------------------------

    /// The workspace name, or `"Workspace {id}"` when unset.
    pub fn name(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("Workspace {}", self.id),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = non_blank(name.into());
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = non_blank(description.into());
    }

    /// The internal version, rendered readably when it is a timestamp.
    pub fn internal_version_display(&self) -> Option<String> {
        self.internal_version.as_deref().map(user_friendly_version)
    }

    // ------------------------------------------------------------------
    // Visibility
    // ------------------------------------------------------------------

    /// Public unless a sharing token is active.
    pub fn is_public_workspace(&self) -> bool {
        self.public && self.sharing_token.is_none()
    }

    /// Making a workspace public revokes any sharing token.
    pub fn set_public_workspace(&mut self, public: bool) {
        self.public = public;
        if public {
            self.sharing_token = None;
        }
    }

    pub fn sharing_token(&self) -> Option<&str> {
        self.sharing_token.as_deref()
    }

    /// Setting a token turns public visibility off; an empty token unshares.
    pub fn set_sharing_token(&mut self, token: impl Into<String>) {
        self.sharing_token = non_blank(token.into());
        if self.sharing_token.is_some() {
            self.public = false;
        }
    }

    pub fn is_shareable(&self) -> bool {
        self.sharing_token.is_some()
    }

    pub fn truncated_sharing_token(&self) -> Option<String> {
        self.sharing_token.as_ref().map(|token| {
            let prefix: String = token.chars().take(SHARING_TOKEN_PREFIX_LENGTH).collect();
            format!("{}...", prefix)
        })
    }

    // ------------------------------------------------------------------
    // Users and roles
    // ------------------------------------------------------------------

    pub fn read_users(&self) -> &BTreeSet<String> {
        &self.read_users
    }

    pub fn write_users(&self) -> &BTreeSet<String> {
        &self.write_users
    }

    pub fn add_read_user(&mut self, user_or_role: &str) {
        if let Some(entry) = normalize_user(user_or_role) {
            self.read_users.insert(entry);
        }
    }

    pub fn add_write_user(&mut self, user_or_role: &str) {
        if let Some(entry) = normalize_user(user_or_role) {
            self.write_users.insert(entry);
        }
    }

    pub fn clear_read_users(&mut self) {
        self.read_users.clear();
    }

    pub fn clear_write_users(&mut self) {
        self.write_users.clear();
    }

    pub fn has_no_users_configured(&self) -> bool {
        self.read_users.is_empty() && self.write_users.is_empty()
    }

    pub fn is_read_user(&self, user: &User) -> bool {
        user.is_user_or_role(&self.read_users)
    }

    pub fn is_write_user(&self, user: &User) -> bool {
        user.is_user_or_role(&self.write_users)
    }

    /// Resolves the permissions an identity holds on this workspace.
    pub fn permissions(&self, user: Option<&User>, policy: &AccessPolicy) -> BTreeSet<Permission> {
        if !policy.authentication_enabled {
            return Permission::all();
        }

        let Some(user) = user.filter(|u| u.is_authenticated()) else {
            return BTreeSet::new();
        };

        if policy.is_admin(user) {
            return Permission::all();
        }

        let mut permissions = BTreeSet::new();
        if self.has_no_users_configured() {
            permissions.insert(Permission::Read);
            permissions.insert(Permission::Write);
            if !policy.admin_users_enabled() {
                permissions.insert(Permission::Admin);
            }
        } else if self.is_write_user(user) {
            permissions.insert(Permission::Read);
            permissions.insert(Permission::Write);
            if !policy.admin_users_enabled() {
                permissions.insert(Permission::Admin);
            }
        } else if self.is_read_user(user) {
            permissions.insert(Permission::Read);
        }

        permissions
    }

    // ------------------------------------------------------------------
    // Locking
    // ------------------------------------------------------------------

    pub fn locked_user(&self) -> Option<&str> {
        self.locked_user.as_deref()
    }

    pub fn locked_agent(&self) -> Option<&str> {
        self.locked_agent.as_deref()
    }

    pub fn locked_date(&self) -> Option<DateTime<Utc>> {
        self.locked_date
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked_at(Utc::now())
    }

    /// Active only while `now - locked_date < LOCK_TTL`.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        match (&self.locked_user, self.locked_date) {
            (Some(_), Some(date)) => now.signed_duration_since(date) < LOCK_TTL,
            _ => false,
        }
    }

    pub fn is_locked_by(&self, user: &str, agent: &str) -> bool {
        self.is_locked_by_at(user, agent, Utc::now())
    }

    pub fn is_locked_by_at(&self, user: &str, agent: &str, now: DateTime<Utc>) -> bool {
        self.is_locked_at(now)
            && self.locked_user.as_deref() == Some(user)
            && self.locked_agent.as_deref() == Some(agent)
    }

    pub fn add_lock(&mut self, user: &str, agent: &str) {
        self.add_lock_at(user, agent, Utc::now());
    }

    pub fn add_lock_at(&mut self, user: &str, agent: &str, now: DateTime<Utc>) {
        self.locked_user = Some(user.to_string());
        self.locked_agent = Some(agent.to_string());
        self.locked_date = Some(now);
    }

    pub fn clear_lock(&mut self) {
        self.locked_user = None;
        self.locked_agent = None;
        self.locked_date = None;
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Flattens the metadata into persisted `key=value` pairs.
    pub fn to_properties(&self) -> BTreeMap<String, String> {
        let mut props = BTreeMap::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                props.insert(key.to_string(), value);
            }
        };

        put(keys::NAME, self.name.clone());
        put(keys::DESCRIPTION, self.description.clone());
        put(keys::VERSION, self.internal_version.clone());
        put(keys::OWNER, self.owner.clone());
        put(
            keys::CLIENT_SIDE_ENCRYPTED,
            Some(self.client_side_encrypted.to_string()),
        );
        put(keys::LAST_MODIFIED_USER, self.last_modified_user.clone());
        put(keys::LAST_MODIFIED_AGENT, self.last_modified_agent.clone());
        put(
            keys::LAST_MODIFIED_DATE,
            Some(format_iso_date(&self.last_modified_date)),
        );
        put(keys::API_KEY, self.api_key.clone());
        put(keys::API_SECRET, self.api_secret.clone());
        put(keys::PUBLIC, Some(self.is_public_workspace().to_string()));
        put(keys::SHARING_TOKEN, self.sharing_token.clone());
        put(keys::LOCKED_USER, self.locked_user.clone());
        put(keys::LOCKED_AGENT, self.locked_agent.clone());
        put(keys::LOCKED_DATE, self.locked_date.as_ref().map(format_iso_date));
        put(keys::READ_USERS_AND_ROLES, join_users(&self.read_users));
        put(keys::WRITE_USERS_AND_ROLES, join_users(&self.write_users));
        put(keys::ARCHIVED, Some(self.archived.to_string()));

        props
    }

    /// Rebuilds metadata from persisted pairs. Unknown keys are ignored.
    pub fn from_properties(id: WorkspaceId, props: &BTreeMap<String, String>) -> Self {
        let get = |key: &str| props.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
        let flag = |key: &str| get(key).is_some_and(|v| v.eq_ignore_ascii_case("true"));
        // free text keeps its surrounding spaces
        let text = |key: &str| props.get(key).filter(|v| !v.trim().is_empty()).cloned();

        let mut metadata = Self::new(id);
        metadata.name = text(keys::NAME);
        metadata.description = text(keys::DESCRIPTION);
        metadata.internal_version = get(keys::VERSION).map(str::to_string);
        metadata.owner = get(keys::OWNER).map(str::to_string);
        metadata.client_side_encrypted = flag(keys::CLIENT_SIDE_ENCRYPTED);
        metadata.last_modified_user = get(keys::LAST_MODIFIED_USER).map(str::to_string);
        metadata.last_modified_agent = get(keys::LAST_MODIFIED_AGENT).map(str::to_string);
        metadata.last_modified_date = get(keys::LAST_MODIFIED_DATE)
            .and_then(parse_iso_date)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        metadata.api_key = get(keys::API_KEY).map(str::to_string);
        metadata.api_secret = get(keys::API_SECRET).map(str::to_string);

        // token wins over the public flag
        metadata.set_public_workspace(flag(keys::PUBLIC));
        if let Some(token) = get(keys::SHARING_TOKEN) {
            metadata.set_sharing_token(token);
        }

        metadata.locked_user = get(keys::LOCKED_USER).map(str::to_string);
        metadata.locked_agent = get(keys::LOCKED_AGENT).map(str::to_string);
        metadata.locked_date = get(keys::LOCKED_DATE).and_then(parse_iso_date);

        for entry in split_users(get(keys::READ_USERS_AND_ROLES)) {
            metadata.add_read_user(entry);
        }
        for entry in split_users(get(keys::WRITE_USERS_AND_ROLES)) {
            metadata.add_write_user(entry);
        }
        metadata.archived = flag(keys::ARCHIVED);

        metadata
    }
}

/// Formats a timestamp as `2021-01-31T14:30:59Z`.
pub fn format_iso_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses an ISO-8601 / RFC 3339 timestamp.
pub fn parse_iso_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn normalize_user(user_or_role: &str) -> Option<String> {
    let trimmed = user_or_role.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

fn join_users(users: &BTreeSet<String>) -> Option<String> {
    if users.is_empty() {
        None
    } else {
        Some(users.iter().cloned().collect::<Vec<_>>().join(","))
    }
}

fn split_users(value: Option<&str>) -> impl Iterator<Item = &str> {
    value.into_iter().flat_map(|v| v.split(','))
}
