//! Read-only intents. These run against the committed state and never
//! need confirmation.

use super::resolve::resolve;
use super::{ActionExecutor, required, to_json};
use crate::text::fold;
use crm_core::action::{ActionError, ActionOutcome};
use crm_core::directory::{EntityId, Group, Label, User};
use crm_core::intent::Intent;
use crm_core::slots::{ListFields, TargetFields};
use serde_json::json;
use std::collections::HashMap;

impl ActionExecutor {
    pub(super) async fn list_users(
        &self,
        ws: &str,
        fields: &ListFields,
    ) -> Result<ActionOutcome, ActionError> {
        let reader = self.directory.reader(ws).await?;
        let labels = label_names(&reader.labels().await?);
        let users: Vec<User> = reader
            .users()
            .await?
            .into_iter()
            .filter(|u| {
                matches_query(
                    &fields.query,
                    [Some(u.name.as_str()), Some(u.phone.as_str()), u.email.as_deref()],
                )
            })
            .collect();

        let message = if users.is_empty() {
            "No users found.".to_string()
        } else {
            let lines: Vec<String> = users
                .iter()
                .map(|u| {
                    let tags = tags_of(u, &labels);
                    if tags.is_empty() {
                        format!("- {} ({})", u.name, u.phone)
                    } else {
                        format!("- {} ({}) [{}]", u.name, u.phone, tags.join(", "))
                    }
                })
                .collect();
            format!("Users ({}):\n{}", users.len(), lines.join("\n"))
        };
        Ok(read_outcome(Intent::UserList, message, to_json(&users)))
    }

    pub(super) async fn get_user(
        &self,
        ws: &str,
        fields: &TargetFields,
    ) -> Result<ActionOutcome, ActionError> {
        let identifier = required(&fields.identifier, "identifier")?;
        let reader = self.directory.reader(ws).await?;
        let users = reader.users().await?;
        let user = resolve(&users, identifier)?;
        let labels = label_names(&reader.labels().await?);
        let groups: Vec<String> = reader
            .groups()
            .await?
            .into_iter()
            .filter(|g| g.member_ids.contains(&user.id))
            .map(|g| g.name)
            .collect();

        let mut lines = vec![format!("{} (#{})", user.name, user.id), format!("Phone: {}", user.phone)];
        if let Some(email) = &user.email {
            lines.push(format!("Email: {email}"));
        }
        if let Some(role) = &user.role {
            lines.push(format!("Role: {role}"));
        }
        let tags = tags_of(user, &labels);
        if !tags.is_empty() {
            lines.push(format!("Labels: {}", tags.join(", ")));
        }
        if !groups.is_empty() {
            lines.push(format!("Groups: {}", groups.join(", ")));
        }

        let data = json!({ "user": user, "labels": tags, "groups": groups });
        Ok(read_outcome(Intent::UserGet, lines.join("\n"), data))
    }

    pub(super) async fn list_labels(
        &self,
        ws: &str,
        fields: &ListFields,
    ) -> Result<ActionOutcome, ActionError> {
        let reader = self.directory.reader(ws).await?;
        let labels: Vec<Label> = reader
            .labels()
            .await?
            .into_iter()
            .filter(|l| matches_query(&fields.query, [Some(l.name.as_str())]))
            .collect();

        let message = if labels.is_empty() {
            "No labels found.".to_string()
        } else {
            let lines: Vec<String> = labels
                .iter()
                .map(|l| format!("- {} {}", l.name, l.color))
                .collect();
            format!("Labels ({}):\n{}", labels.len(), lines.join("\n"))
        };
        Ok(read_outcome(Intent::LabelList, message, to_json(&labels)))
    }

    pub(super) async fn list_groups(
        &self,
        ws: &str,
        fields: &ListFields,
    ) -> Result<ActionOutcome, ActionError> {
        let reader = self.directory.reader(ws).await?;
        let groups: Vec<Group> = reader
            .groups()
            .await?
            .into_iter()
            .filter(|g| {
                matches_query(&fields.query, [Some(g.name.as_str()), g.description.as_deref()])
            })
            .collect();

        let message = if groups.is_empty() {
            "No groups found.".to_string()
        } else {
            let lines: Vec<String> = groups
                .iter()
                .map(|g| match g.member_ids.len() {
                    1 => format!("- {} (1 member)", g.name),
                    n => format!("- {} ({n} members)", g.name),
                })
                .collect();
            format!("Groups ({}):\n{}", groups.len(), lines.join("\n"))
        };
        Ok(read_outcome(Intent::GroupList, message, to_json(&groups)))
    }
}

fn read_outcome(intent: Intent, message: String, data: serde_json::Value) -> ActionOutcome {
    ActionOutcome {
        intent,
        message,
        data,
        verification_reads: 0,
    }
}

fn label_names(labels: &[Label]) -> HashMap<EntityId, String> {
    labels.iter().map(|l| (l.id, l.name.clone())).collect()
}

fn tags_of(user: &User, labels: &HashMap<EntityId, String>) -> Vec<String> {
    user.label_ids
        .iter()
        .filter_map(|id| labels.get(id).cloned())
        .collect()
}

/// An absent or blank query matches everything.
fn matches_query<const N: usize>(query: &Option<String>, haystacks: [Option<&str>; N]) -> bool {
    let Some(needle) = query.as_deref().map(fold).filter(|q| !q.is_empty()) else {
        return true;
    };
    haystacks
        .into_iter()
        .flatten()
        .any(|h| fold(h).contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_queries_match_everything() {
        assert!(matches_query(&None, [Some("Ali")]));
        assert!(matches_query(&Some("  ".into()), [Some("Ali")]));
    }

    #[test]
    fn queries_fold_case_and_skip_missing_fields() {
        assert!(matches_query(&Some("ALI".into()), [Some("Ali Rezaei"), None]));
        assert!(matches_query(&Some("example".into()), [Some("Sara"), Some("sara@example.com")]));
        assert!(!matches_query(&Some("zed".into()), [Some("Sara"), None]));
    }
}
