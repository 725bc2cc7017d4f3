use super::resolve::resolve;
use super::verify::Expected;
use super::{ActionExecutor, required, show, to_json};
use crate::text::fold;
use crm_core::action::{ActionError, ActionOutcome, PendingConfirmation};
use crm_core::directory::Group;
use crm_core::intent::Intent;
use crm_core::slots::{GroupCreateFields, MembershipFields, TargetFields, UpdateFields};

impl ActionExecutor {
    pub(super) async fn create_group(
        &self,
        ws: &str,
        fields: &GroupCreateFields,
    ) -> Result<ActionOutcome, ActionError> {
        let name = required(&fields.name, "name")?.to_string();

        let mut tx = self.directory.begin(ws).await?;
        let groups = tx.groups().await?;
        if let Some(existing) = groups.iter().find(|g| fold(&g.name) == fold(&name)) {
            return Err(ActionError::NoOp(format!(
                "Group \"{}\" already exists",
                existing.name
            )));
        }

        let mut group = Group::new(name);
        group.description = fields.description.clone();
        let stored = tx.save_group(group).await?;
        let message = format!("Created group {}", stored.name);
        let data = to_json(&stored);
        self.commit_and_verify(ws, tx, Expected::Group(stored), Intent::GroupCreate, message, data)
            .await
    }

    pub(super) async fn update_group(
        &self,
        ws: &str,
        fields: &UpdateFields,
        confirmed: bool,
    ) -> Result<ActionOutcome, ActionError> {
        let identifier = required(&fields.identifier, "identifier")?;
        let field = required(&fields.field, "field")?;
        let value = required(&fields.value, "value")?;

        let mut tx = self.directory.begin(ws).await?;
        let groups = tx.groups().await?;
        let current = resolve(&groups, identifier)?.clone();
        let mut updated = current.clone();
        let (before, after) = match field {
            "name" => {
                updated.name = value.to_string();
                (current.name.clone(), updated.name.clone())
            }
            "description" => {
                updated.description = Some(value.to_string());
                (show(&current.description).to_string(), value.to_string())
            }
            other => {
                return Err(ActionError::validation(
                    "field",
                    format!("groups have no field '{other}' (name or description)"),
                ));
            }
        };

        if updated == current {
            return Err(ActionError::NoOp(format!(
                "Group \"{}\" already has {field} {after}",
                current.name
            )));
        }
        if !confirmed {
            return Err(ActionError::ConfirmationRequired(PendingConfirmation::new(
                Intent::GroupUpdate,
                format!("Update group \"{}\": {field} {before} -> {after}", current.name),
            )));
        }

        let stored = tx.save_group(updated).await?;
        let message = format!("Updated group \"{}\": {field} is now {after}", stored.name);
        let data = to_json(&stored);
        self.commit_and_verify(ws, tx, Expected::Group(stored), Intent::GroupUpdate, message, data)
            .await
    }

    pub(super) async fn delete_group(
        &self,
        ws: &str,
        fields: &TargetFields,
        confirmed: bool,
    ) -> Result<ActionOutcome, ActionError> {
        let identifier = required(&fields.identifier, "identifier")?;
        let mut tx = self.directory.begin(ws).await?;
        let groups = tx.groups().await?;
        let target = resolve(&groups, identifier)?.clone();

        if !confirmed {
            return Err(ActionError::ConfirmationRequired(PendingConfirmation::new(
                Intent::GroupDelete,
                format!(
                    "Delete group \"{}\" ({} members)",
                    target.name,
                    target.member_ids.len()
                ),
            )));
        }

        tx.delete_group(target.id).await?;
        let message = format!("Deleted group \"{}\"", target.name);
        let data = to_json(&target);
        self.verify_and_commit(ws, tx, Expected::GroupGone(target.id), Intent::GroupDelete, message, data)
            .await
    }

    pub(super) async fn add_member(
        &self,
        ws: &str,
        fields: &MembershipFields,
    ) -> Result<ActionOutcome, ActionError> {
        self.change_membership(ws, fields, true).await
    }

    pub(super) async fn remove_member(
        &self,
        ws: &str,
        fields: &MembershipFields,
    ) -> Result<ActionOutcome, ActionError> {
        self.change_membership(ws, fields, false).await
    }

    async fn change_membership(
        &self,
        ws: &str,
        fields: &MembershipFields,
        add: bool,
    ) -> Result<ActionOutcome, ActionError> {
        let group_id = required(&fields.group, "group")?;
        let user_id = required(&fields.user, "user")?;

        let mut tx = self.directory.begin(ws).await?;
        let groups = tx.groups().await?;
        let users = tx.users().await?;
        let group = resolve(&groups, group_id)?.clone();
        let user = resolve(&users, user_id)?;

        let mut updated = group.clone();
        let (intent, message) = if add {
            if !updated.member_ids.insert(user.id) {
                return Err(ActionError::NoOp(format!(
                    "\"{}\" is already a member of \"{}\"",
                    user.name, group.name
                )));
            }
            (
                Intent::GroupAddMember,
                format!("Added \"{}\" to group \"{}\"", user.name, group.name),
            )
        } else {
            if !updated.member_ids.remove(&user.id) {
                return Err(ActionError::NoOp(format!(
                    "\"{}\" is not a member of \"{}\"",
                    user.name, group.name
                )));
            }
            (
                Intent::GroupRemoveMember,
                format!("Removed \"{}\" from group \"{}\"", user.name, group.name),
            )
        };

        let stored = tx.save_group(updated).await?;
        let data = to_json(&stored);
        self.verify_and_commit(ws, tx, Expected::Group(stored), intent, message, data)
            .await
    }
}
