//! Rendering of a [`Notification`] into the chat message body.
//!
//! The format is fixed and covered by golden tests; any change here is
//! a user-visible change in the channel.

use std::fmt::Write as _;

use crate::notification::Notification;

/// At most this many commits are listed; the rest collapse into a
/// trailing "y N commits más" line.
pub const MAX_RENDERED_COMMITS: usize = 5;

/// Renders the complete message for one push notification.
///
/// Rendering is synchronous and atomic relative to the send call, so
/// the channel never sees a partially formed message.
pub fn render(notification: &Notification) -> String {
    let mut message = format!(
        "🔔 **Nuevo commit en {}**\n",
        notification.repository_name
    );
    let _ = writeln!(message, "📂 Branch: `{}`", notification.branch);
    let _ = writeln!(message, "👤 Autor: {}", notification.actor);
    let _ = writeln!(message, "📝 Commits ({}):\n", notification.commits.len());

    for commit in notification.commits.iter().take(MAX_RENDERED_COMMITS) {
        let _ = writeln!(
            message,
            "• `{}` - {} ({})",
            commit.short_id, commit.summary_line, commit.author_name
        );
    }

    if notification.commits.len() > MAX_RENDERED_COMMITS {
        let _ = write!(
            message,
            "\n... y {} commits más",
            notification.commits.len() - MAX_RENDERED_COMMITS
        );
    }

    // GitHub pushes always carry a compare link; GitLab ones never do.
    if let Some(compare_url) = &notification.compare_url {
        let _ = write!(message, "\n🔗 [Ver cambios]({})", compare_url);
    }

    message
}
