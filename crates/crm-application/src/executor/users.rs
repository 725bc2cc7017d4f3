use super::resolve::resolve;
use super::verify::Expected;
use super::{ActionExecutor, required, show, to_json};
use crate::text::{fold, normalize_phone};
use crm_core::action::{ActionError, ActionOutcome, PendingConfirmation};
use crm_core::directory::User;
use crm_core::intent::Intent;
use crm_core::slots::{UpdateFields, UserCreateFields, UserLabelsFields, TargetFields};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]{5,15}$").expect("phone pattern is valid"));

impl ActionExecutor {
    pub(super) async fn create_user(
        &self,
        ws: &str,
        fields: &UserCreateFields,
    ) -> Result<ActionOutcome, ActionError> {
        let name = required(&fields.name, "name")?.to_string();
        let phone = check_phone(required(&fields.phone, "phone")?)?;
        let email = fields.email.as_deref().map(check_email).transpose()?;
        let role = fields.role.as_deref().map(|r| r.trim().to_lowercase());

        let mut tx = self.directory.begin(ws).await?;
        let users = tx.users().await?;
        if let Some(existing) = users.iter().find(|u| u.phone == phone) {
            if fold(&existing.name) == fold(&name) {
                return Err(ActionError::NoOp(format!(
                    "User \"{}\" with phone {} already exists",
                    existing.name, existing.phone
                )));
            }
            return Err(ActionError::validation(
                "phone",
                format!("{phone} already belongs to \"{}\"", existing.name),
            ));
        }

        let mut user = User::new(name, phone);
        user.email = email;
        user.role = role;
        let stored = tx.save_user(user).await?;
        let message = format!("Created user {} ({})", stored.name, stored.phone);
        let data = to_json(&stored);
        self.commit_and_verify(ws, tx, Expected::User(stored), Intent::UserCreate, message, data)
            .await
    }

    pub(super) async fn update_user(
        &self,
        ws: &str,
        fields: &UpdateFields,
        confirmed: bool,
    ) -> Result<ActionOutcome, ActionError> {
        let identifier = required(&fields.identifier, "identifier")?;
        let field = required(&fields.field, "field")?;
        let value = required(&fields.value, "value")?;

        let mut tx = self.directory.begin(ws).await?;
        let users = tx.users().await?;
        let current = resolve(&users, identifier)?.clone();
        let mut updated = current.clone();
        let (before, after) = match field {
            "name" => {
                updated.name = value.to_string();
                (current.name.clone(), updated.name.clone())
            }
            "phone" => {
                let phone = check_phone(value).map_err(as_value_error)?;
                if let Some(other) = users.iter().find(|u| u.phone == phone && u.id != current.id) {
                    return Err(ActionError::validation(
                        "value",
                        format!("{phone} already belongs to \"{}\"", other.name),
                    ));
                }
                updated.phone = phone;
                (current.phone.clone(), updated.phone.clone())
            }
            "email" => {
                updated.email = Some(check_email(value).map_err(as_value_error)?);
                (show(&current.email).to_string(), show(&updated.email).to_string())
            }
            "role" => {
                updated.role = Some(value.to_lowercase());
                (show(&current.role).to_string(), show(&updated.role).to_string())
            }
            other => {
                return Err(ActionError::validation(
                    "field",
                    format!("users have no field '{other}' (name, phone, email or role)"),
                ));
            }
        };

        if updated == current {
            return Err(ActionError::NoOp(format!(
                "User \"{}\" already has {field} {after}",
                current.name
            )));
        }
        if !confirmed {
            return Err(ActionError::ConfirmationRequired(PendingConfirmation::new(
                Intent::UserUpdate,
                format!("Update user \"{}\": {field} {before} -> {after}", current.name),
            )));
        }

        let stored = tx.save_user(updated).await?;
        let message = format!("Updated user \"{}\": {field} is now {after}", stored.name);
        let data = to_json(&stored);
        self.commit_and_verify(ws, tx, Expected::User(stored), Intent::UserUpdate, message, data)
            .await
    }

    pub(super) async fn delete_user(
        &self,
        ws: &str,
        fields: &TargetFields,
        confirmed: bool,
    ) -> Result<ActionOutcome, ActionError> {
        let identifier = required(&fields.identifier, "identifier")?;
        let mut tx = self.directory.begin(ws).await?;
        let users = tx.users().await?;
        let target = resolve(&users, identifier)?.clone();

        if !confirmed {
            return Err(ActionError::ConfirmationRequired(PendingConfirmation::new(
                Intent::UserDelete,
                format!("Delete user \"{}\" ({})", target.name, target.phone),
            )));
        }

        tx.delete_user(target.id).await?;
        let message = format!("Deleted user \"{}\"", target.name);
        let data = to_json(&target);
        self.verify_and_commit(ws, tx, Expected::UserGone(target.id), Intent::UserDelete, message, data)
            .await
    }

    pub(super) async fn set_user_labels(
        &self,
        ws: &str,
        fields: &UserLabelsFields,
    ) -> Result<ActionOutcome, ActionError> {
        let identifier = required(&fields.user, "user")?;
        let names = fields
            .labels
            .as_deref()
            .filter(|names| !names.is_empty())
            .ok_or_else(|| ActionError::validation("labels", "is required"))?;

        let mut tx = self.directory.begin(ws).await?;
        let users = tx.users().await?;
        let labels = tx.labels().await?;
        let current = resolve(&users, identifier)?.clone();

        let mut label_ids = BTreeSet::new();
        let mut label_names = Vec::new();
        for name in names {
            let label = resolve(&labels, name)?;
            if label_ids.insert(label.id) {
                label_names.push(label.name.clone());
            }
        }
        let listed = label_names.join(", ");

        if current.label_ids == label_ids {
            return Err(ActionError::NoOp(format!(
                "\"{}\" already has labels {listed}",
                current.name
            )));
        }

        let mut updated = current;
        updated.label_ids = label_ids;
        let stored = tx.save_user(updated).await?;
        let message = format!("Labels of \"{}\" are now {listed}", stored.name);
        let data = to_json(&stored);
        self.verify_and_commit(ws, tx, Expected::User(stored), Intent::UserSetLabels, message, data)
            .await
    }
}

/// Normalizes a phone number and rejects anything that is not one.
fn check_phone(raw: &str) -> Result<String, ActionError> {
    let phone = normalize_phone(raw);
    if PHONE_PATTERN.is_match(&phone) {
        Ok(phone)
    } else {
        Err(ActionError::validation(
            "phone",
            format!("'{}' is not a phone number", raw.trim()),
        ))
    }
}

fn check_email(raw: &str) -> Result<String, ActionError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ActionError::validation("email", format!("'{raw}' is not an email address"))),
    }
}

/// Re-targets a validation error at the `value` slot of an update.
pub(super) fn as_value_error(err: ActionError) -> ActionError {
    match err {
        ActionError::Validation { message, .. } => ActionError::validation("value", message),
        other => other,
    }
}
