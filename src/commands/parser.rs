//! Parsing of `/command` messages.
//!
//! Non-command text returns `Ok(None)` so ordinary chat messages are ignored.
//! A recognized command with bad arguments returns an error carrying the
//! usage line for the reply.

use thiserror::Error;

use crate::types::{EventFlags, RepoId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Bind,
    Unbind,
    Subscribe { repo: RepoId, flags: EventFlags },
    Unsubscribe { repo: RepoId },
    List,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("usage: /subscribe owner/repo commit,issue,pr")]
    SubscribeUsage,

    #[error("usage: /unsubscribe owner/repo")]
    UnsubscribeUsage,

    #[error("unknown event kind '{0}'; expected commit, issue, or pr")]
    UnknownEventKind(String),

    #[error("at least one event kind is required")]
    NoEventKinds,
}

/// Parses a comma-separated event list like `commit,pr`.
fn parse_event_flags(list: &str) -> Result<EventFlags, CommandParseError> {
    let mut flags = EventFlags::default();
    for part in list.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part {
            "commit" | "commits" | "push" => flags.commit = true,
            "issue" | "issues" => flags.issue = true,
            "pr" | "prs" | "pull_request" => flags.pr = true,
            other => return Err(CommandParseError::UnknownEventKind(other.to_string())),
        }
    }
    if !flags.any() {
        return Err(CommandParseError::NoEventKinds);
    }
    Ok(flags)
}

/// Parses a message into a command.
///
/// Commands may carry a `@botname` suffix as Telegram appends in groups; it
/// is stripped before matching.
pub fn parse_command(text: &str) -> Result<Option<Command>, CommandParseError> {
    let text = text.trim();
    if !text.starts_with('/') {
        return Ok(None);
    }

    let mut parts = text.split_whitespace();
    let head = parts.next().unwrap_or("");
    let name = head.split('@').next().unwrap_or(head);

    match name {
        "/bind" => Ok(Some(Command::Bind)),
        "/unbind" => Ok(Some(Command::Unbind)),
        "/list" => Ok(Some(Command::List)),
        "/help" | "/start" => Ok(Some(Command::Help)),
        "/subscribe" => {
            let repo = parts
                .next()
                .and_then(RepoId::parse)
                .ok_or(CommandParseError::SubscribeUsage)?;
            let events = parts.next().ok_or(CommandParseError::SubscribeUsage)?;
            let flags = parse_event_flags(events)?;
            Ok(Some(Command::Subscribe { repo, flags }))
        }
        "/unsubscribe" => {
            let repo = parts
                .next()
                .and_then(RepoId::parse)
                .ok_or(CommandParseError::UnsubscribeUsage)?;
            Ok(Some(Command::Unsubscribe { repo }))
        }
        _ => Ok(None),
    }
}
