//! Directory entity types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Numeric identifier assigned by the store. `0` marks an unsaved entity.
pub type EntityId = i64;

/// A CRM contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Assigned label ids; compared as a set.
    #[serde(default)]
    pub label_ids: BTreeSet<EntityId>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            phone: phone.into(),
            email: None,
            role: None,
            label_ids: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }
}

/// A colored tag that can be attached to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: EntityId,
    pub name: String,
    /// Lower-case `#rrggbb`.
    pub color: String,
}

impl Label {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            color: color.into(),
        }
    }
}

/// A named set of users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub member_ids: BTreeSet<EntityId>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: None,
            member_ids: BTreeSet::new(),
        }
    }
}

/// Common view of directory entities used by identifier resolution.
pub trait DirectoryEntity: Clone + Send + Sync {
    /// Noun used in messages ("user", "label", "group").
    const KIND: &'static str;

    fn id(&self) -> EntityId;

    fn display_name(&self) -> &str;

    /// Values an identifier may match besides the numeric id.
    fn lookup_keys(&self) -> Vec<&str>;
}

impl DirectoryEntity for User {
    const KIND: &'static str = "user";

    fn id(&self) -> EntityId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn lookup_keys(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.phone.as_str()]
    }
}

impl DirectoryEntity for Label {
    const KIND: &'static str = "label";

    fn id(&self) -> EntityId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn lookup_keys(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }
}

impl DirectoryEntity for Group {
    const KIND: &'static str = "group";

    fn id(&self) -> EntityId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn lookup_keys(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }
}
