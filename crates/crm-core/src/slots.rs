//! Typed slot data collected for an intent.
//!
//! Every intent owns a partial-fields struct whose members are all optional
//! while a conversation is still collecting them. [`IntentData`] is the tagged
//! union over those structs; it is what gets persisted inside a session's
//! progress and what the action executor finally consumes.

use crate::action::ActionError;
use crate::intent::Intent;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Behaviour shared by every partial-fields struct.
pub trait SlotFields: Default + Clone {
    /// Required fields, in the order they are asked for.
    const REQUIRED: &'static [&'static str];

    /// Overwrites fields present in `other`, leaving the rest untouched.
    fn merge_from(&mut self, other: Self);

    /// Whether the named field currently holds a value.
    fn is_filled(&self, field: &str) -> bool;

    /// Names of all fields that hold a value.
    fn filled(&self) -> Vec<&'static str>;

    /// Empties the named field; returns false for unknown names.
    fn clear(&mut self, field: &str) -> bool;

    /// Required fields that are still empty, in asking order.
    fn missing(&self) -> Vec<String> {
        Self::REQUIRED
            .iter()
            .filter(|field| !self.is_filled(field))
            .map(|field| field.to_string())
            .collect()
    }
}

macro_rules! slot_fields {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty ),* $(,)?
        }
        required = [$($req:ident),* $(,)?];
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            $(
                $(#[$fmeta])*
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )*
        }

        impl SlotFields for $name {
            const REQUIRED: &'static [&'static str] = &[$(stringify!($req)),*];

            fn merge_from(&mut self, other: Self) {
                $(
                    if other.$field.is_some() {
                        self.$field = other.$field;
                    }
                )*
            }

            fn is_filled(&self, field: &str) -> bool {
                match field {
                    $( stringify!($field) => self.$field.is_some(), )*
                    _ => false,
                }
            }

            fn filled(&self) -> Vec<&'static str> {
                let mut names = Vec::new();
                $(
                    if self.$field.is_some() {
                        names.push(stringify!($field));
                    }
                )*
                names
            }

            fn clear(&mut self, field: &str) -> bool {
                match field {
                    $( stringify!($field) => {
                        self.$field = None;
                        true
                    } )*
                    _ => false,
                }
            }
        }
    };
}

slot_fields! {
    /// Fields for creating a user.
    pub struct UserCreateFields {
        name: String,
        phone: String,
        email: String,
        role: String,
    }
    required = [name, phone];
}

slot_fields! {
    /// Fields for changing one attribute of an existing entity.
    pub struct UpdateFields {
        /// Id, name or phone of the entity to change.
        identifier: String,
        /// Canonical attribute name (see [`canonical_field_name`]).
        field: String,
        value: String,
    }
    required = [identifier, field, value];
}

slot_fields! {
    /// Fields addressing a single existing entity.
    pub struct TargetFields {
        identifier: String,
    }
    required = [identifier];
}

slot_fields! {
    /// Optional filter for list intents.
    pub struct ListFields {
        query: String,
    }
    required = [];
}

slot_fields! {
    /// Fields for creating a label.
    pub struct LabelCreateFields {
        name: String,
        color: String,
    }
    required = [name, color];
}

slot_fields! {
    /// Fields for creating a group.
    pub struct GroupCreateFields {
        name: String,
        description: String,
    }
    required = [name];
}

slot_fields! {
    /// Fields for replacing the label set of a user.
    pub struct UserLabelsFields {
        user: String,
        labels: Vec<String>,
    }
    required = [user, labels];
}

slot_fields! {
    /// Fields for adding or removing a group member.
    pub struct MembershipFields {
        group: String,
        user: String,
    }
    required = [group, user];
}

/// Slot data keyed by intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", content = "fields", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentData {
    UserCreate(UserCreateFields),
    UserUpdate(UpdateFields),
    UserDelete(TargetFields),
    UserList(ListFields),
    UserGet(TargetFields),
    UserSetLabels(UserLabelsFields),
    LabelCreate(LabelCreateFields),
    LabelUpdate(UpdateFields),
    LabelDelete(TargetFields),
    LabelList(ListFields),
    GroupCreate(GroupCreateFields),
    GroupUpdate(UpdateFields),
    GroupDelete(TargetFields),
    GroupList(ListFields),
    GroupAddMember(MembershipFields),
    GroupRemoveMember(MembershipFields),
    Unknown,
}

// Expands `$body` once per variant with `$f` bound to that variant's fields.
macro_rules! on_fields {
    ($data:expr, $f:ident => $body:expr, unknown => $unknown:expr) => {
        match $data {
            IntentData::UserCreate($f) => $body,
            IntentData::UserUpdate($f) | IntentData::LabelUpdate($f) | IntentData::GroupUpdate($f) => {
                $body
            }
            IntentData::UserDelete($f)
            | IntentData::UserGet($f)
            | IntentData::LabelDelete($f)
            | IntentData::GroupDelete($f) => $body,
            IntentData::UserList($f) | IntentData::LabelList($f) | IntentData::GroupList($f) => $body,
            IntentData::UserSetLabels($f) => $body,
            IntentData::LabelCreate($f) => $body,
            IntentData::GroupCreate($f) => $body,
            IntentData::GroupAddMember($f) | IntentData::GroupRemoveMember($f) => $body,
            IntentData::Unknown => $unknown,
        }
    };
}

impl IntentData {
    /// Empty slot data for an intent.
    pub fn empty(intent: Intent) -> Self {
        match intent {
            Intent::UserCreate => Self::UserCreate(Default::default()),
            Intent::UserUpdate => Self::UserUpdate(Default::default()),
            Intent::UserDelete => Self::UserDelete(Default::default()),
            Intent::UserList => Self::UserList(Default::default()),
            Intent::UserGet => Self::UserGet(Default::default()),
            Intent::UserSetLabels => Self::UserSetLabels(Default::default()),
            Intent::LabelCreate => Self::LabelCreate(Default::default()),
            Intent::LabelUpdate => Self::LabelUpdate(Default::default()),
            Intent::LabelDelete => Self::LabelDelete(Default::default()),
            Intent::LabelList => Self::LabelList(Default::default()),
            Intent::GroupCreate => Self::GroupCreate(Default::default()),
            Intent::GroupUpdate => Self::GroupUpdate(Default::default()),
            Intent::GroupDelete => Self::GroupDelete(Default::default()),
            Intent::GroupList => Self::GroupList(Default::default()),
            Intent::GroupAddMember => Self::GroupAddMember(Default::default()),
            Intent::GroupRemoveMember => Self::GroupRemoveMember(Default::default()),
            Intent::Unknown => Self::Unknown,
        }
    }

    /// Builds typed slot data from loosely typed extracted fields.
    ///
    /// Keys pass through the alias table, scalars are coerced to strings and
    /// blank values are dropped so they never count as filled.
    pub fn from_extracted(intent: Intent, extracted: &Map<String, Value>) -> Result<Self, ActionError> {
        let obj = Value::Object(normalize_extracted(extracted));
        Ok(match intent {
            Intent::UserCreate => Self::UserCreate(parse_fields(&obj)?),
            Intent::UserUpdate => Self::UserUpdate(parse_fields(&obj)?),
            Intent::UserDelete => Self::UserDelete(parse_fields(&obj)?),
            Intent::UserList => Self::UserList(parse_fields(&obj)?),
            Intent::UserGet => Self::UserGet(parse_fields(&obj)?),
            Intent::UserSetLabels => Self::UserSetLabels(parse_fields(&obj)?),
            Intent::LabelCreate => Self::LabelCreate(parse_fields(&obj)?),
            Intent::LabelUpdate => Self::LabelUpdate(parse_fields(&obj)?),
            Intent::LabelDelete => Self::LabelDelete(parse_fields(&obj)?),
            Intent::LabelList => Self::LabelList(parse_fields(&obj)?),
            Intent::GroupCreate => Self::GroupCreate(parse_fields(&obj)?),
            Intent::GroupUpdate => Self::GroupUpdate(parse_fields(&obj)?),
            Intent::GroupDelete => Self::GroupDelete(parse_fields(&obj)?),
            Intent::GroupList => Self::GroupList(parse_fields(&obj)?),
            Intent::GroupAddMember => Self::GroupAddMember(parse_fields(&obj)?),
            Intent::GroupRemoveMember => Self::GroupRemoveMember(parse_fields(&obj)?),
            Intent::Unknown => Self::Unknown,
        })
    }

    /// The intent this data belongs to.
    pub fn intent(&self) -> Intent {
        match self {
            Self::UserCreate(_) => Intent::UserCreate,
            Self::UserUpdate(_) => Intent::UserUpdate,
            Self::UserDelete(_) => Intent::UserDelete,
            Self::UserList(_) => Intent::UserList,
            Self::UserGet(_) => Intent::UserGet,
            Self::UserSetLabels(_) => Intent::UserSetLabels,
            Self::LabelCreate(_) => Intent::LabelCreate,
            Self::LabelUpdate(_) => Intent::LabelUpdate,
            Self::LabelDelete(_) => Intent::LabelDelete,
            Self::LabelList(_) => Intent::LabelList,
            Self::GroupCreate(_) => Intent::GroupCreate,
            Self::GroupUpdate(_) => Intent::GroupUpdate,
            Self::GroupDelete(_) => Intent::GroupDelete,
            Self::GroupList(_) => Intent::GroupList,
            Self::GroupAddMember(_) => Intent::GroupAddMember,
            Self::GroupRemoveMember(_) => Intent::GroupRemoveMember,
            Self::Unknown => Intent::Unknown,
        }
    }

    /// Merges newly extracted data into this one.
    ///
    /// Data for the same intent only overrides the keys it actually carries.
    /// Data for a different intent replaces this one entirely.
    pub fn merge(&mut self, incoming: IntentData) {
        match (self, incoming) {
            (Self::UserCreate(a), Self::UserCreate(b)) => a.merge_from(b),
            (Self::UserUpdate(a), Self::UserUpdate(b))
            | (Self::LabelUpdate(a), Self::LabelUpdate(b))
            | (Self::GroupUpdate(a), Self::GroupUpdate(b)) => a.merge_from(b),
            (Self::UserDelete(a), Self::UserDelete(b))
            | (Self::UserGet(a), Self::UserGet(b))
            | (Self::LabelDelete(a), Self::LabelDelete(b))
            | (Self::GroupDelete(a), Self::GroupDelete(b)) => a.merge_from(b),
            (Self::UserList(a), Self::UserList(b))
            | (Self::LabelList(a), Self::LabelList(b))
            | (Self::GroupList(a), Self::GroupList(b)) => a.merge_from(b),
            (Self::UserSetLabels(a), Self::UserSetLabels(b)) => a.merge_from(b),
            (Self::LabelCreate(a), Self::LabelCreate(b)) => a.merge_from(b),
            (Self::GroupCreate(a), Self::GroupCreate(b)) => a.merge_from(b),
            (Self::GroupAddMember(a), Self::GroupAddMember(b))
            | (Self::GroupRemoveMember(a), Self::GroupRemoveMember(b)) => a.merge_from(b),
            (current, incoming) => {
                if incoming != Self::Unknown {
                    *current = incoming;
                }
            }
        }
    }

    /// Required fields that are still empty, in asking order.
    pub fn missing_fields(&self) -> Vec<String> {
        on_fields!(self, f => f.missing(), unknown => Vec::new())
    }

    /// Names of the fields currently holding a value.
    pub fn filled_fields(&self) -> Vec<&'static str> {
        on_fields!(self, f => f.filled(), unknown => Vec::new())
    }

    /// Fields as a JSON object, used for audit payloads and oracle hints.
    pub fn fields_json(&self) -> Map<String, Value> {
        let value = on_fields!(self, f => serde_json::to_value(f).unwrap_or(Value::Null), unknown => Value::Null);
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Drops a rejected value so the field is asked for again.
    pub fn clear_field(&mut self, field: &str) -> bool {
        on_fields!(self, f => f.clear(field), unknown => false)
    }

    /// Sets one field from raw user text, with the usual normalisation.
    pub fn set_field(&mut self, field: &str, raw: &str) -> Result<(), ActionError> {
        let mut extracted = Map::new();
        extracted.insert(field.to_string(), Value::String(raw.to_string()));
        let incoming = Self::from_extracted(self.intent(), &extracted)?;
        self.merge(incoming);
        Ok(())
    }
}

/// Pure per-intent validation.
///
/// Returns the ordered list of required fields that are still missing.
/// Intents gated by confirmation skip the check once `confirmed` is set: the
/// data was already complete when the confirmation was requested.
pub fn validate(data: &IntentData, confirmed: bool) -> Vec<String> {
    if confirmed && data.intent().requires_confirmation() {
        return Vec::new();
    }
    data.missing_fields()
}

/// Fixed alias table for field names produced by the oracle or typed by users.
const FIELD_ALIASES: &[(&str, &str)] = &[
    ("rolename", "role"),
    ("role_name", "role"),
    ("phone_number", "phone"),
    ("phonenumber", "phone"),
    ("mobile", "phone"),
    ("full_name", "name"),
    ("fullname", "name"),
    ("colour", "color"),
    ("desc", "description"),
    ("target", "identifier"),
    ("id", "identifier"),
    ("new_value", "value"),
    ("label_names", "labels"),
    ("group_name", "group"),
];

/// Canonical name of a field, resolving known aliases.
pub fn canonical_field_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase().replace([' ', '-'], "_");
    FIELD_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(lowered)
}

fn normalize_extracted(extracted: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in extracted {
        let key = canonical_field_name(key);
        let normalized = match (key.as_str(), value) {
            ("labels", Value::String(s)) => split_list(s),
            ("labels", Value::Array(items)) => {
                let names: Vec<Value> = items
                    .iter()
                    .filter_map(scalar_to_string)
                    .map(Value::String)
                    .collect();
                (!names.is_empty()).then_some(Value::Array(names))
            }
            ("field", v) => scalar_to_string(v).map(|s| Value::String(canonical_field_name(&s))),
            (_, v) => scalar_to_string(v).map(Value::String),
        };
        if let Some(v) = normalized {
            out.insert(key, v);
        }
    }
    out
}

fn split_list(raw: &str) -> Option<Value> {
    let names: Vec<Value> = raw
        .split([',', '،', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Value::String(s.to_string()))
        .collect();
    (!names.is_empty()).then_some(Value::Array(names))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn parse_fields<T: DeserializeOwned>(obj: &Value) -> Result<T, ActionError> {
    serde_json::from_value(obj.clone()).map_err(|e| ActionError::Validation {
        field: "extractedData".to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn missing_fields_follow_required_order() {
        let data = IntentData::from_extracted(Intent::UserCreate, &map(json!({"name": "Ali"}))).unwrap();
        assert_eq!(data.missing_fields(), vec!["phone".to_string()]);

        let empty = IntentData::empty(Intent::UserUpdate);
        assert_eq!(empty.missing_fields(), vec!["identifier", "field", "value"]);
    }

    #[test]
    fn partial_merge_keeps_unrelated_fields() {
        let mut data = IntentData::from_extracted(
            Intent::UserCreate,
            &map(json!({"name": "Ali", "email": "ali@example.com"})),
        )
        .unwrap();
        let incoming = IntentData::from_extracted(Intent::UserCreate, &map(json!({"phone": 9120000000u64}))).unwrap();
        data.merge(incoming);

        let IntentData::UserCreate(fields) = &data else {
            panic!("variant changed");
        };
        assert_eq!(fields.name.as_deref(), Some("Ali"));
        assert_eq!(fields.email.as_deref(), Some("ali@example.com"));
        assert_eq!(fields.phone.as_deref(), Some("9120000000"));
        assert!(data.missing_fields().is_empty());
    }

    #[test]
    fn merge_with_other_intent_replaces() {
        let mut data = IntentData::empty(Intent::UserCreate);
        data.merge(IntentData::empty(Intent::LabelList));
        assert_eq!(data.intent(), Intent::LabelList);

        data.merge(IntentData::Unknown);
        assert_eq!(data.intent(), Intent::LabelList);
    }

    #[test]
    fn aliases_apply_to_keys_and_update_field_values() {
        let data = IntentData::from_extracted(
            Intent::UserUpdate,
            &map(json!({"target": "Ali", "field": "RoleName", "new_value": "admin"})),
        )
        .unwrap();
        let IntentData::UserUpdate(fields) = data else {
            panic!("wrong variant");
        };
        assert_eq!(fields.identifier.as_deref(), Some("Ali"));
        assert_eq!(fields.field.as_deref(), Some("role"));
        assert_eq!(fields.value.as_deref(), Some("admin"));
    }

    #[test]
    fn blank_values_are_not_filled() {
        let data = IntentData::from_extracted(Intent::UserCreate, &map(json!({"name": "  ", "phone": null}))).unwrap();
        assert!(data.filled_fields().is_empty());
    }

    #[test]
    fn labels_accept_comma_separated_text() {
        let data = IntentData::from_extracted(
            Intent::UserSetLabels,
            &map(json!({"user": "Ali", "labels": "VIP, Lead،Cold"})),
        )
        .unwrap();
        let IntentData::UserSetLabels(fields) = data else {
            panic!("wrong variant");
        };
        assert_eq!(
            fields.labels,
            Some(vec!["VIP".to_string(), "Lead".to_string(), "Cold".to_string()])
        );
    }

    #[test]
    fn validate_skips_confirmed_updates() {
        let data = IntentData::empty(Intent::UserUpdate);
        assert_eq!(validate(&data, false).len(), 3);
        assert!(validate(&data, true).is_empty());
        // Confirmation does not bypass non-gated intents.
        assert_eq!(validate(&IntentData::empty(Intent::UserCreate), true), vec!["name", "phone"]);
    }

    #[test]
    fn set_field_fills_single_slot() {
        let mut data = IntentData::from_extracted(Intent::UserCreate, &map(json!({"name": "Ali"}))).unwrap();
        data.set_field("phone", " 09120000000 ").unwrap();
        assert!(data.missing_fields().is_empty());
        assert_eq!(data.fields_json().get("phone"), Some(&json!("09120000000")));
    }

    #[test]
    fn cleared_fields_become_missing_again() {
        let mut data = IntentData::from_extracted(
            Intent::LabelCreate,
            &map(json!({"name": "VIP", "color": "ultraviolet"})),
        )
        .unwrap();
        assert!(data.clear_field("color"));
        assert!(!data.clear_field("phone"));
        assert_eq!(data.missing_fields(), vec!["color"]);
    }

    #[test]
    fn serde_is_tagged_by_intent() {
        let data = IntentData::from_extracted(Intent::LabelCreate, &map(json!({"name": "VIP"}))).unwrap();
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value, json!({"intent": "LABEL_CREATE", "fields": {"name": "VIP"}}));
        let back: IntentData = serde_json::from_value(value).unwrap();
        assert_eq!(back, data);
    }
}
