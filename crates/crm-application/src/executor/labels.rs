use super::resolve::resolve;
use super::users::as_value_error;
use super::verify::Expected;
use super::{ActionExecutor, required, to_json};
use crate::text::fold;
use crm_core::action::{ActionError, ActionOutcome, PendingConfirmation};
use crm_core::color::normalize_color;
use crm_core::directory::Label;
use crm_core::intent::Intent;
use crm_core::slots::{LabelCreateFields, TargetFields, UpdateFields};

impl ActionExecutor {
    pub(super) async fn create_label(
        &self,
        ws: &str,
        fields: &LabelCreateFields,
    ) -> Result<ActionOutcome, ActionError> {
        let name = required(&fields.name, "name")?.to_string();
        let color = normalize_color(required(&fields.color, "color")?)?;

        let mut tx = self.directory.begin(ws).await?;
        let labels = tx.labels().await?;
        if let Some(existing) = labels.iter().find(|l| fold(&l.name) == fold(&name)) {
            if existing.color == color {
                return Err(ActionError::NoOp(format!(
                    "Label \"{}\" already exists with color {}",
                    existing.name, existing.color
                )));
            }
            return Err(ActionError::validation(
                "name",
                format!("label \"{}\" already exists with color {}", existing.name, existing.color),
            ));
        }

        let stored = tx.save_label(Label::new(name, color)).await?;
        let message = format!("Created label {} ({})", stored.name, stored.color);
        let data = to_json(&stored);
        self.commit_and_verify(ws, tx, Expected::Label(stored), Intent::LabelCreate, message, data)
            .await
    }

    pub(super) async fn update_label(
        &self,
        ws: &str,
        fields: &UpdateFields,
        confirmed: bool,
    ) -> Result<ActionOutcome, ActionError> {
        let identifier = required(&fields.identifier, "identifier")?;
        let field = required(&fields.field, "field")?;
        let value = required(&fields.value, "value")?;

        let mut tx = self.directory.begin(ws).await?;
        let labels = tx.labels().await?;
        let current = resolve(&labels, identifier)?.clone();
        let mut updated = current.clone();
        let (before, after) = match field {
            "name" => {
                if let Some(other) = labels
                    .iter()
                    .find(|l| l.id != current.id && fold(&l.name) == fold(value))
                {
                    return Err(ActionError::validation(
                        "value",
                        format!("label \"{}\" already exists", other.name),
                    ));
                }
                updated.name = value.to_string();
                (current.name.clone(), updated.name.clone())
            }
            "color" => {
                updated.color = normalize_color(value).map_err(as_value_error)?;
                (current.color.clone(), updated.color.clone())
            }
            other => {
                return Err(ActionError::validation(
                    "field",
                    format!("labels have no field '{other}' (name or color)"),
                ));
            }
        };

        if updated == current {
            return Err(ActionError::NoOp(format!(
                "Label \"{}\" already has {field} {after}",
                current.name
            )));
        }
        if !confirmed {
            return Err(ActionError::ConfirmationRequired(PendingConfirmation::new(
                Intent::LabelUpdate,
                format!("Update label \"{}\": {field} {before} -> {after}", current.name),
            )));
        }

        let stored = tx.save_label(updated).await?;
        let message = format!("Updated label \"{}\": {field} is now {after}", stored.name);
        let data = to_json(&stored);
        self.commit_and_verify(ws, tx, Expected::Label(stored), Intent::LabelUpdate, message, data)
            .await
    }

    pub(super) async fn delete_label(
        &self,
        ws: &str,
        fields: &TargetFields,
        confirmed: bool,
    ) -> Result<ActionOutcome, ActionError> {
        let identifier = required(&fields.identifier, "identifier")?;
        let mut tx = self.directory.begin(ws).await?;
        let labels = tx.labels().await?;
        let target = resolve(&labels, identifier)?.clone();

        if !confirmed {
            let holders = tx
                .users()
                .await?
                .iter()
                .filter(|u| u.label_ids.contains(&target.id))
                .count();
            let suffix = match holders {
                0 => String::new(),
                1 => " and detach it from 1 user".to_string(),
                n => format!(" and detach it from {n} users"),
            };
            return Err(ActionError::ConfirmationRequired(PendingConfirmation::new(
                Intent::LabelDelete,
                format!("Delete label \"{}\"{suffix}", target.name),
            )));
        }

        tx.delete_label(target.id).await?;
        let message = format!("Deleted label \"{}\"", target.name);
        let data = to_json(&target);
        self.verify_and_commit(ws, tx, Expected::LabelGone(target.id), Intent::LabelDelete, message, data)
            .await
    }
}
