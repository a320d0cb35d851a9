//! Directory search and filtering rules
//!
//! The backend pushes these filters into SQL; the same rules are applied
//! client-side through the WASM module when refining an already loaded page.

use serde::{Deserialize, Serialize};

use crate::models::{User, UserRole};

/// Directory query filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryFilter {
    /// Case-insensitive substring of the role's location field
    pub location: Option<String>,
    /// Case-insensitive substring of name or username
    pub search: Option<String>,
    /// Exact skill (case-insensitive), workers only
    pub skill: Option<String>,
}

/// Profile key holding the location for each role
pub fn location_field(role: UserRole) -> &'static str {
    match role {
        UserRole::Farmer => "farmLocation",
        UserRole::Hhm => "location",
        UserRole::Factory => "factoryLocation",
        UserRole::Worker => "location",
    }
}

/// Case-insensitive substring match; an empty query matches everything
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Whether a record's location satisfies a location query
pub fn location_matches(location: Option<&str>, query: &str) -> bool {
    if query.trim().is_empty() {
        return true;
    }
    location.is_some_and(|l| contains_ignore_case(l, query))
}

/// Escape a user query for use inside `ILIKE '%…%' ESCAPE '\'`
pub fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl DirectoryFilter {
    /// Normalized non-empty values
    pub fn location_query(&self) -> Option<&str> {
        non_empty(self.location.as_deref())
    }

    pub fn search_query(&self) -> Option<&str> {
        non_empty(self.search.as_deref())
    }

    pub fn skill_query(&self) -> Option<&str> {
        non_empty(self.skill.as_deref())
    }

    pub fn matches(&self, user: &User) -> bool {
        if let Some(location) = self.location_query() {
            if !location_matches(user.profile.location(), location) {
                return false;
            }
        }
        if let Some(search) = self.search_query() {
            if !contains_ignore_case(&user.name, search) && !contains_ignore_case(&user.username, search) {
                return false;
            }
        }
        if let Some(skill) = self.skill_query() {
            if !user.profile.skills().iter().any(|s| s.eq_ignore_ascii_case(skill)) {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, users: &'a [User]) -> Vec<&'a User> {
        users.iter().filter(|u| self.matches(u)).collect()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
