//! Intent catalogue.
//!
//! An [`Intent`] is the enumerated category of an operation requested by the
//! operator. Each intent knows whether it only reads the directory, whether it
//! mutates it, and whether the mutation must be confirmed by a human first.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Enumerated category of a requested operation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    UserCreate,
    UserUpdate,
    UserDelete,
    UserList,
    UserGet,
    UserSetLabels,
    LabelCreate,
    LabelUpdate,
    LabelDelete,
    LabelList,
    GroupCreate,
    GroupUpdate,
    GroupDelete,
    GroupList,
    GroupAddMember,
    GroupRemoveMember,
    Unknown,
}

impl Intent {
    /// Parses an intent name leniently.
    ///
    /// Case, dashes and spaces are ignored; anything unrecognised becomes
    /// [`Intent::Unknown`].
    pub fn parse_lenient(raw: &str) -> Self {
        let normalized = raw.trim().to_uppercase().replace(['-', ' ', '.'], "_");
        Intent::from_str(&normalized).unwrap_or(Intent::Unknown)
    }

    /// Returns true for intents that never change the directory.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Intent::UserList | Intent::UserGet | Intent::LabelList | Intent::GroupList
        )
    }

    /// Returns true for intents that write to the directory.
    pub fn is_mutation(&self) -> bool {
        !self.is_read_only() && *self != Intent::Unknown
    }

    /// Returns true when the mutation must be confirmed before it is applied.
    pub fn requires_confirmation(&self) -> bool {
        matches!(
            self,
            Intent::UserUpdate
                | Intent::UserDelete
                | Intent::LabelUpdate
                | Intent::LabelDelete
                | Intent::GroupUpdate
                | Intent::GroupDelete
        )
    }

    /// Human-readable noun of the entity the intent operates on.
    pub fn entity_noun(&self) -> &'static str {
        match self {
            Intent::UserCreate
            | Intent::UserUpdate
            | Intent::UserDelete
            | Intent::UserList
            | Intent::UserGet
            | Intent::UserSetLabels => "user",
            Intent::LabelCreate | Intent::LabelUpdate | Intent::LabelDelete | Intent::LabelList => {
                "label"
            }
            Intent::GroupCreate
            | Intent::GroupUpdate
            | Intent::GroupDelete
            | Intent::GroupList
            | Intent::GroupAddMember
            | Intent::GroupRemoveMember => "group",
            Intent::Unknown => "request",
        }
    }
}
