//! Rendering webhook events as Telegram HTML messages.
//!
//! One message is rendered per event and shared by every subscriber, so the
//! renderer runs once per delivery regardless of fan-out width. All
//! user-controlled text is escaped for Telegram's HTML parse mode.

use crate::webhooks::events::{IssueAction, IssueEvent, PullRequestEvent, PushEvent};
use crate::webhooks::RepoEvent;

/// Escapes the three characters Telegram's HTML mode treats specially.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn short_sha(id: &str) -> &str {
    &id[..id.len().min(7)]
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or("")
}

fn render_push(event: &PushEvent) -> String {
    let mut out = format!(
        "📤 <b>New Push</b>\n\
         Repo: <b>{}</b>\n\
         Branch: <code>{}</code>\n\
         Commits: {}\n\
         By: {}",
        escape(&event.repo.to_string()),
        escape(&event.branch),
        event.commits.len(),
        escape(&event.sender),
    );
    if let Some(head) = &event.head_commit {
        out.push_str(&format!(
            "\n\nLatest: <a href=\"{}\">{}</a> {}",
            escape(&head.url),
            short_sha(&head.id),
            escape(first_line(&head.message)),
        ));
    }
    out
}

fn issue_emoji(action: IssueAction) -> &'static str {
    match action {
        IssueAction::Opened => "🟢",
        IssueAction::Closed => "🔴",
        IssueAction::Reopened => "🟠",
        IssueAction::Edited => "✏️",
    }
}

fn render_issue(event: &IssueEvent) -> String {
    format!(
        "{} <b>Issue {}</b>\n\
         Repo: <b>{}</b>\n\
         <a href=\"{}\">#{} {}</a>\n\
         By: {}",
        issue_emoji(event.action),
        event.action.as_str(),
        escape(&event.repo.to_string()),
        escape(&event.html_url),
        event.number,
        escape(&event.title),
        escape(&event.sender),
    )
}

fn render_pull_request(event: &PullRequestEvent) -> String {
    // A closed PR that was merged reads "merged", not "closed".
    let (emoji, verb) = if event.action == IssueAction::Closed && event.merged {
        ("🟣", "merged")
    } else {
        (issue_emoji(event.action), event.action.as_str())
    };
    format!(
        "{} <b>Pull Request {}</b>\n\
         Repo: <b>{}</b>\n\
         <a href=\"{}\">#{} {}</a>\n\
         By: {}",
        emoji,
        verb,
        escape(&event.repo.to_string()),
        escape(&event.html_url),
        event.number,
        escape(&event.title),
        escape(&event.sender),
    )
}

/// Renders a notification-bearing event. Returns `None` for events that never
/// produce messages (installation bookkeeping).
pub fn render_event(event: &RepoEvent) -> Option<String> {
    match event {
        RepoEvent::Push(e) => Some(render_push(e)),
        RepoEvent::Issue(e) => Some(render_issue(e)),
        RepoEvent::PullRequest(e) => Some(render_pull_request(e)),
        RepoEvent::Installation(_) | RepoEvent::InstallationRepositories(_) => None,
    }
}
