//! Calling identities and installation-wide access policy.
//!
//! Authentication itself happens outside the engine; these types only carry
//! the identity a caller resolved and answer membership questions about it.

use once_cell::sync::Lazy;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use tracing::warn;

/// How the calling identity was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationMethod {
    /// Anonymous caller.
    #[default]
    None,
    /// Username/password managed by the installation.
    Local,
    /// Delegated to an external identity provider.
    External,
}

/// The three workspace permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Read,
    Write,
    Admin,
}

impl Permission {
    /// Every permission, used when access control does not apply.
    pub fn all() -> BTreeSet<Permission> {
        [Permission::Read, Permission::Write, Permission::Admin]
            .into_iter()
            .collect()
    }
}

/// A calling identity: username plus role set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub roles: BTreeSet<String>,
    pub authentication_method: AuthenticationMethod,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        roles: impl IntoIterator<Item = impl Into<String>>,
        authentication_method: AuthenticationMethod,
    ) -> Self {
        Self {
            username: username.into(),
            roles: roles.into_iter().map(Into::into).collect(),
            authentication_method,
        }
    }

    /// An unauthenticated caller.
    pub fn anonymous() -> Self {
        Self {
            username: String::new(),
            roles: BTreeSet::new(),
            authentication_method: AuthenticationMethod::None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authentication_method != AuthenticationMethod::None && !self.username.is_empty()
    }

    /// Returns true when the username or one of the roles matches an entry.
    ///
    /// Entries match case-insensitively. An entry of the form `^...$` is
    /// treated as a regular expression.
    pub fn is_user_or_role<'a>(&self, users_and_roles: impl IntoIterator<Item = &'a String>) -> bool {
        let entries: Vec<&String> = users_and_roles.into_iter().collect();
        if entries.is_empty() {
            return false;
        }

        let candidates = std::iter::once(&self.username).chain(self.roles.iter());
        for candidate in candidates {
            if candidate.is_empty() {
                continue;
            }

            for entry in &entries {
                if entry.eq_ignore_ascii_case(candidate) || matches_pattern(entry, candidate) {
                    return true;
                }
            }
        }

        false
    }
}

static PATTERN_CACHE: Lazy<Mutex<HashMap<String, Option<regex::Regex>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn matches_pattern(entry: &str, value: &str) -> bool {
    if !(entry.len() > 1 && entry.starts_with('^') && entry.ends_with('$')) {
        return false;
    }

    let Ok(mut cache) = PATTERN_CACHE.lock() else {
        return false;
    };

    let compiled = cache.entry(entry.to_string()).or_insert_with(|| {
        match RegexBuilder::new(entry).case_insensitive(true).build() {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!("Ignoring invalid user/role pattern {}: {}", entry, e);
                None
            }
        }
    });

    compiled.as_ref().is_some_and(|regex| regex.is_match(value))
}

/// Installation-wide access settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub authentication_enabled: bool,
    pub admin_users_and_roles: BTreeSet<String>,
}

impl AccessPolicy {
    pub fn new(
        authentication_enabled: bool,
        admin_users_and_roles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            authentication_enabled,
            admin_users_and_roles: admin_users_and_roles
                .into_iter()
                .map(|s| s.into().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Access control switched off: everyone may do everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// True when an installation-wide admin list is configured.
    pub fn admin_users_enabled(&self) -> bool {
        !self.admin_users_and_roles.is_empty()
    }

    pub fn is_admin(&self, user: &User) -> bool {
        self.admin_users_enabled() && user.is_user_or_role(&self.admin_users_and_roles)
    }
}
