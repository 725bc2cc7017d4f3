//! Reply composition.
//!
//! The external generator is trusted for phrasing only. Every sentence it
//! produces that names a workspace entity absent from the real action result
//! is dropped; when nothing survives, or the generator fails, the
//! deterministic template reply is used instead.

use crate::text::fold;
use crm_core::action::QuickReply;
use crm_core::directory::DirectoryStore;
use crm_core::reply::{GeneratedReply, ReplyGenerator, ReplyRequest};
use crm_interaction::TemplateReplyGenerator;
use std::sync::Arc;

pub struct ReplyComposer {
    generator: Option<Arc<dyn ReplyGenerator>>,
    template: TemplateReplyGenerator,
    directory: Arc<dyn DirectoryStore>,
}

impl ReplyComposer {
    /// Template replies only.
    pub fn new(directory: Arc<dyn DirectoryStore>) -> Self {
        Self {
            generator: None,
            template: TemplateReplyGenerator::new(),
            directory,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn ReplyGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub async fn compose(&self, workspace_id: &str, request: ReplyRequest) -> GeneratedReply {
        let mut reply = match &self.generator {
            Some(generator) => match generator.generate(request.clone()).await {
                Ok(generated) => {
                    let known = self.known_names(workspace_id).await;
                    match filter_reply(&generated.reply, &facts(&request), &known) {
                        Some(text) => GeneratedReply {
                            reply: text,
                            quick_replies: generated.quick_replies,
                        },
                        None => {
                            tracing::debug!(target: "conversation", "generated reply filtered out entirely");
                            self.template.render(&request)
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(target: "conversation", error = %e, "reply generator failed, using template");
                    self.template.render(&request)
                }
            },
            None => self.template.render(&request),
        };

        if request.needs_confirmation && reply.quick_replies.is_empty() {
            reply.quick_replies = QuickReply::confirm_cancel();
        } else if !request.missing_fields.is_empty() && reply.quick_replies.is_empty() {
            reply.quick_replies = vec![QuickReply::new("Cancel", "cancel").with_color("red")];
        }
        reply
    }

    async fn known_names(&self, workspace_id: &str) -> Vec<String> {
        let reader = match self.directory.reader(workspace_id).await {
            Ok(reader) => reader,
            Err(e) => {
                tracing::warn!(target: "conversation", error = %e, "could not read entity names for reply filtering");
                return Vec::new();
            }
        };
        let mut names = Vec::new();
        if let Ok(users) = reader.users().await {
            names.extend(users.into_iter().map(|u| u.name));
        }
        if let Ok(labels) = reader.labels().await {
            names.extend(labels.into_iter().map(|l| l.name));
        }
        if let Ok(groups) = reader.groups().await {
            names.extend(groups.into_iter().map(|g| g.name));
        }
        names
    }
}

fn facts(request: &ReplyRequest) -> String {
    let mut facts = String::new();
    for part in [&request.action_result, &request.error].into_iter().flatten() {
        facts.push_str(&fold(part));
        facts.push('\n');
    }
    facts
}

/// Keeps the sentences of `reply` that only name entities found in `facts`.
fn filter_reply(reply: &str, facts: &str, known_names: &[String]) -> Option<String> {
    let suspicious: Vec<String> = known_names
        .iter()
        .map(|n| fold(n))
        .filter(|n| n.chars().count() >= 2 && !facts.contains(n.as_str()))
        .collect();

    let kept: Vec<&str> = sentences(reply)
        .into_iter()
        .filter(|sentence| {
            let folded = fold(sentence);
            !suspicious.iter().any(|name| folded.contains(name.as_str()))
        })
        .collect();

    let text = kept.join(" ").trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Splits after `.`, `!`, `?` or `؟` followed by whitespace, and at newlines.
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '\n' => Some(i),
            '.' | '!' | '?' | '؟' => match chars.peek() {
                Some((_, next)) if next.is_whitespace() => Some(i + c.len_utf8()),
                None => Some(i + c.len_utf8()),
                _ => None,
            },
            _ => None,
        };
        if let Some(end) = boundary {
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                out.push(sentence);
            }
            start = if c == '\n' { i + 1 } else { end };
        }
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crm_core::directory::{DirectoryTransaction, User};
    use crm_core::intent::Intent;
    use crm_core::oracle::OracleError;
    use crm_infrastructure::InMemoryDirectory;

    #[test]
    fn splits_on_terminators_and_newlines() {
        assert_eq!(
            sentences("Done! Ali was created. Anything else?\nBye"),
            vec!["Done!", "Ali was created.", "Anything else?", "Bye"]
        );
        assert_eq!(sentences("Version 1.5 shipped"), vec!["Version 1.5 shipped"]);
    }

    #[test]
    fn drops_sentences_naming_entities_outside_the_facts() {
        let known = vec!["Ali".to_string(), "Sara".to_string(), "x".to_string()];
        let facts = fold("Created user Ali (09120000000)");
        let filtered = filter_reply("Ali is in. Sara was updated too. All good.", &facts, &known);
        assert_eq!(filtered.as_deref(), Some("Ali is in. All good."));
        assert_eq!(filter_reply("Sara is ready.", &facts, &known), None);
    }

    struct Scripted(Result<GeneratedReply, OracleError>);

    #[async_trait]
    impl ReplyGenerator for Scripted {
        async fn generate(&self, _request: ReplyRequest) -> Result<GeneratedReply, OracleError> {
            self.0.clone()
        }
    }

    async fn directory_with(names: &[&str]) -> Arc<InMemoryDirectory> {
        let directory = Arc::new(InMemoryDirectory::new());
        let mut tx = directory.begin("ws").await.unwrap();
        for (i, name) in names.iter().enumerate() {
            tx.save_user(User::new(*name, format!("0912000000{i}"))).await.unwrap();
        }
        tx.commit().await.unwrap();
        directory
    }

    #[tokio::test]
    async fn hallucinated_names_fall_back_to_the_template() {
        let directory = directory_with(&["Ali", "Sara"]).await;
        let composer = ReplyComposer::new(directory).with_generator(Arc::new(Scripted(Ok(
            GeneratedReply::text("Sara has been created."),
        ))));
        let request = ReplyRequest::new(Intent::UserCreate).with_result("Created user Ali (09120000000)");
        let reply = composer.compose("ws", request).await;
        assert_eq!(reply.reply, "Created user Ali (09120000000)");
    }

    #[tokio::test]
    async fn generator_failures_use_the_template() {
        let directory = directory_with(&[]).await;
        let composer = ReplyComposer::new(directory)
            .with_generator(Arc::new(Scripted(Err(OracleError::Timeout))));
        let reply = composer
            .compose("ws", ReplyRequest::new(Intent::UserCreate).with_missing(vec!["phone".into()]))
            .await;
        assert_eq!(reply.reply, "What is the phone number?");
        assert_eq!(reply.quick_replies[0].value, "cancel");
    }

    #[tokio::test]
    async fn confirmations_always_offer_confirm_and_cancel() {
        let directory = directory_with(&[]).await;
        let composer = ReplyComposer::new(directory).with_generator(Arc::new(Scripted(Ok(
            GeneratedReply::text("Are you sure?"),
        ))));
        let request = ReplyRequest::new(Intent::LabelDelete)
            .with_result("Delete label \"VIP\"")
            .needing_confirmation();
        let reply = composer.compose("ws", request).await;
        assert_eq!(reply.reply, "Are you sure?");
        assert_eq!(reply.quick_replies, QuickReply::confirm_cancel());
    }
}
