//! User accounts and role-specific profiles

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform roles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UserRole {
    #[serde(alias = "farmer")]
    Farmer,
    #[serde(rename = "HHM", alias = "hhm")]
    Hhm,
    #[serde(alias = "factory")]
    Factory,
    #[serde(alias = "worker")]
    Worker,
}

impl UserRole {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Farmer => "farmer",
            UserRole::Hhm => "hhm",
            UserRole::Factory => "factory",
            UserRole::Worker => "worker",
        }
    }

    /// The role on the other side of a factory/HHM invitation
    pub fn invitation_counterpart(&self) -> Option<UserRole> {
        match self {
            UserRole::Factory => Some(UserRole::Hhm),
            UserRole::Hhm => Some(UserRole::Factory),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UserRole::Farmer => "Farmer",
            UserRole::Hhm => "HHM",
            UserRole::Factory => "Factory",
            UserRole::Worker => "Worker",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for UserRole {
    type Err = String;

    /// Accepts both the storage form and the display form, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "farmer" | "farmers" => Ok(UserRole::Farmer),
            "hhm" | "hhms" => Ok(UserRole::Hhm),
            "factory" | "factories" => Ok(UserRole::Factory),
            "worker" | "workers" => Ok(UserRole::Worker),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// A user account as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub profile: RoleProfile,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FarmerProfile {
    pub farm_location: Option<String>,
    pub farm_size: Option<Decimal>,
    #[serde(default)]
    pub crop_types: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HhmProfile {
    pub management_experience: Option<i32>,
    pub team_size: Option<i32>,
    #[serde(default)]
    pub services_offered: Vec<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FactoryProfile {
    pub factory_name: Option<String>,
    pub factory_location: Option<String>,
    /// Crushing capacity in tons per day
    pub capacity: Option<Decimal>,
    pub experience: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerProfile {
    #[serde(default)]
    pub skills: Vec<String>,
    pub work_experience: Option<i32>,
    pub availability: Option<String>,
    pub wage_expectation: Option<Decimal>,
    pub location: Option<String>,
}

/// Role-specific profile fields.
///
/// Serialized without a tag: the owning user's `role` says which variant it is.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum RoleProfile {
    Farmer(FarmerProfile),
    Hhm(HhmProfile),
    Factory(FactoryProfile),
    Worker(WorkerProfile),
}

impl<'de> Deserialize<'de> for RoleProfile {
    /// Untagged input is ambiguous, so a bare profile always decodes as the
    /// variant with the most specific keys present. Prefer
    /// [`RoleProfile::from_value`] whenever the role is known.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let role = if value.get("farmLocation").is_some() || value.get("cropTypes").is_some() {
            UserRole::Farmer
        } else if value.get("factoryName").is_some() || value.get("factoryLocation").is_some() {
            UserRole::Factory
        } else if value.get("skills").is_some() || value.get("wageExpectation").is_some() {
            UserRole::Worker
        } else {
            UserRole::Hhm
        };
        RoleProfile::from_value(role, value).map_err(serde::de::Error::custom)
    }
}

impl RoleProfile {
    /// Empty profile for a freshly registered user
    pub fn empty(role: UserRole) -> Self {
        match role {
            UserRole::Farmer => RoleProfile::Farmer(FarmerProfile::default()),
            UserRole::Hhm => RoleProfile::Hhm(HhmProfile::default()),
            UserRole::Factory => RoleProfile::Factory(FactoryProfile::default()),
            UserRole::Worker => RoleProfile::Worker(WorkerProfile::default()),
        }
    }

    /// Decode a stored or submitted profile document for a known role
    pub fn from_value(role: UserRole, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let value = if value.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            value
        };
        Ok(match role {
            UserRole::Farmer => RoleProfile::Farmer(serde_json::from_value(value)?),
            UserRole::Hhm => RoleProfile::Hhm(serde_json::from_value(value)?),
            UserRole::Factory => RoleProfile::Factory(serde_json::from_value(value)?),
            UserRole::Worker => RoleProfile::Worker(serde_json::from_value(value)?),
        })
    }

    pub fn to_value(&self) -> serde_json::Value {
        // Profile structs contain only strings, numbers and lists.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn role(&self) -> UserRole {
        match self {
            RoleProfile::Farmer(_) => UserRole::Farmer,
            RoleProfile::Hhm(_) => UserRole::Hhm,
            RoleProfile::Factory(_) => UserRole::Factory,
            RoleProfile::Worker(_) => UserRole::Worker,
        }
    }

    /// The field the directory location filter applies to
    pub fn location(&self) -> Option<&str> {
        match self {
            RoleProfile::Farmer(p) => p.farm_location.as_deref(),
            RoleProfile::Hhm(p) => p.location.as_deref(),
            RoleProfile::Factory(p) => p.factory_location.as_deref(),
            RoleProfile::Worker(p) => p.location.as_deref(),
        }
    }

    /// Worker skills; empty for other roles
    pub fn skills(&self) -> &[String] {
        match self {
            RoleProfile::Worker(p) => &p.skills,
            _ => &[],
        }
    }
}

/// Associated party as shown in a user's "associated" list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociatedParty {
    pub user_id: Uuid,
    pub name: String,
    pub username: String,
    pub role: UserRole,
    pub location: Option<String>,
    pub associated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_both_forms() {
        assert_eq!("HHM".parse::<UserRole>().unwrap(), UserRole::Hhm);
        assert_eq!("hhm".parse::<UserRole>().unwrap(), UserRole::Hhm);
        assert_eq!("Factories".parse::<UserRole>().unwrap(), UserRole::Factory);
        assert!("admin".parse::<UserRole>().is_err());
    }

    #[test]
    fn role_serializes_as_display_name() {
        assert_eq!(serde_json::to_string(&UserRole::Hhm).unwrap(), "\"HHM\"");
        assert_eq!(serde_json::to_string(&UserRole::Farmer).unwrap(), "\"Farmer\"");
    }

    #[test]
    fn counterpart_only_for_factory_and_hhm() {
        assert_eq!(UserRole::Factory.invitation_counterpart(), Some(UserRole::Hhm));
        assert_eq!(UserRole::Hhm.invitation_counterpart(), Some(UserRole::Factory));
        assert_eq!(UserRole::Worker.invitation_counterpart(), None);
    }

    #[test]
    fn profile_from_value_uses_role() {
        let value = serde_json::json!({ "location": "Kolhapur", "skills": ["cutting"] });
        let profile = RoleProfile::from_value(UserRole::Worker, value).unwrap();
        assert_eq!(profile.location(), Some("Kolhapur"));
        assert_eq!(profile.skills(), &["cutting".to_string()]);
    }

    #[test]
    fn null_profile_decodes_as_empty() {
        let profile = RoleProfile::from_value(UserRole::Factory, serde_json::Value::Null).unwrap();
        assert_eq!(profile, RoleProfile::empty(UserRole::Factory));
    }

    #[test]
    fn profile_round_trips_through_storage() {
        let profile = RoleProfile::Farmer(FarmerProfile {
            farm_location: Some("Sangli".to_string()),
            farm_size: Some(Decimal::new(125, 1)),
            crop_types: vec!["sugarcane".to_string()],
        });
        let stored = profile.to_value();
        assert_eq!(stored["farmLocation"], "Sangli");
        let back = RoleProfile::from_value(UserRole::Farmer, stored).unwrap();
        assert_eq!(back, profile);
    }
}
