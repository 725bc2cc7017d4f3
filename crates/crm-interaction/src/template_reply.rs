//! Deterministic replies.
//!
//! Used when no Reply Generator is configured and as the fallback when the
//! remote one fails. Template replies only ever restate the action result.

use async_trait::async_trait;
use crm_core::action::QuickReply;
use crm_core::intent::Intent;
use crm_core::oracle::OracleError;
use crm_core::reply::{GeneratedReply, ReplyGenerator, ReplyRequest};

const HELP_TEXT: &str = "Sorry, I didn't catch that. I can create, update, delete, get and list users, labels and groups, set user labels and manage group members.";

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateReplyGenerator;

impl TemplateReplyGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, request: &ReplyRequest) -> GeneratedReply {
        if let Some(error) = &request.error {
            let mut reply = format!("Sorry, that didn't work: {error}");
            if let Some(field) = request.missing_fields.first() {
                reply.push('\n');
                reply.push_str(&field_prompt(request.intent, field));
            }
            return GeneratedReply::text(reply);
        }

        if request.needs_confirmation {
            let change = request.action_result.as_deref().unwrap_or("This change");
            return GeneratedReply {
                reply: format!("{change}\nShall I go ahead?"),
                quick_replies: QuickReply::confirm_cancel(),
            };
        }

        if let Some(field) = request.missing_fields.first() {
            let mut reply = field_prompt(request.intent, field);
            if request.missing_fields.len() > 1 {
                reply.push_str(&format!(" (still needed: {})", request.missing_fields.join(", ")));
            }
            return GeneratedReply::text(reply);
        }

        match &request.action_result {
            Some(result) => GeneratedReply::text(result.clone()),
            None => GeneratedReply::text(HELP_TEXT),
        }
    }
}

#[async_trait]
impl ReplyGenerator for TemplateReplyGenerator {
    async fn generate(&self, request: ReplyRequest) -> Result<GeneratedReply, OracleError> {
        Ok(self.render(&request))
    }
}

fn field_prompt(intent: Intent, field: &str) -> String {
    let noun = intent.entity_noun();
    match field {
        "name" => format!("What name should the {noun} have?"),
        "phone" => "What is the phone number?".to_string(),
        "email" => "What is the email address?".to_string(),
        "role" => "Which role?".to_string(),
        "color" => "Which color? A name like orange or a hex code like #f97316 works.".to_string(),
        "description" => format!("How would you describe the {noun}?"),
        "identifier" => format!("Which {noun}? Give its id or name."),
        "field" => format!("Which field of the {noun} should change?"),
        "value" => "What should the new value be?".to_string(),
        "labels" => "Which labels? Separate several with commas.".to_string(),
        "user" => "Which user?".to_string(),
        "group" => "Which group?".to_string(),
        other => format!("Please provide the {other}."),
    }
}
