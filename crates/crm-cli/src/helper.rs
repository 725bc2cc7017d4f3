use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::borrow::Cow::{self, Borrowed, Owned};

/// Slash commands understood by the chat REPL.
pub const COMMANDS: [&str; 4] = ["/new", "/session", "/sessions", "/help"];

/// rustyline helper: completes slash commands and offered quick replies.
#[derive(Clone, Default)]
pub struct CliHelper {
    quick_replies: Vec<String>,
}

impl CliHelper {
    /// Replaces the quick-reply values offered by the last turn.
    pub fn set_quick_replies(&mut self, values: Vec<String>) {
        self.quick_replies = values;
    }

    fn candidates<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let commands = COMMANDS.iter().copied().filter(move |_| prefix.starts_with('/'));
        let replies = self
            .quick_replies
            .iter()
            .map(String::as_str)
            .filter(move |_| !prefix.starts_with('/'));
        commands
            .chain(replies)
            .filter(move |candidate| candidate.starts_with(prefix))
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        let candidates = self
            .candidates(line)
            .map(|candidate| Pair {
                display: candidate.to_string(),
                replacement: candidate.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.is_empty() || line.contains(' ') {
            return None;
        }
        self.candidates(line)
            .find(|candidate| candidate.len() > line.len())
            .map(|candidate| candidate[line.len()..].to_string())
    }
}

impl Validator for CliHelper {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_prefix_completes_commands_only() {
        let mut helper = CliHelper::default();
        helper.set_quick_replies(vec!["yes".into(), "no".into()]);
        let found: Vec<&str> = helper.candidates("/se").collect();
        assert_eq!(found, vec!["/session", "/sessions"]);
    }

    #[test]
    fn plain_prefix_completes_quick_replies() {
        let mut helper = CliHelper::default();
        helper.set_quick_replies(vec!["yes".into(), "no".into()]);
        let found: Vec<&str> = helper.candidates("y").collect();
        assert_eq!(found, vec!["yes"]);
        assert!(helper.candidates("/").all(|c| c.starts_with('/')));
    }
}
