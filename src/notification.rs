//! Provider-agnostic notification model built from webhook payloads.

/// Which provider the push event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationSource {
    GitHubPush,
    GitLabPush,
}

/// Maximum length of a rendered commit summary line.
const MAX_SUMMARY_LEN: usize = 100;

/// Length of the abbreviated commit id.
const SHORT_ID_LEN: usize = 7;

/// A single commit as it appears in the rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    /// First 7 characters of the commit id (or the whole id if shorter).
    pub short_id: String,
    /// First line of the commit message, capped at 100 characters.
    pub summary_line: String,
    pub author_name: String,
}

impl CommitSummary {
    pub fn new(full_id: &str, message: &str, author_name: &str) -> Self {
        let short_id = full_id.chars().take(SHORT_ID_LEN).collect();
        let summary_line = message
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(MAX_SUMMARY_LEN)
            .collect();
        Self {
            short_id,
            summary_line,
            author_name: author_name.to_string(),
        }
    }
}

/// A normalized push notification, immutable once built.
///
/// `commits` keeps every commit in the order the provider delivered
/// them; capping the list at 5 entries is a rendering concern only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub source: NotificationSource,
    pub repository_name: String,
    pub branch: String,
    pub actor: String,
    pub commits: Vec<CommitSummary>,
    /// Present for GitHub pushes, absent for GitLab.
    pub compare_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_is_a_seven_char_prefix() {
        let commit = CommitSummary::new("0123456789abcdef", "msg", "ana");
        assert_eq!(commit.short_id, "0123456");
    }

    #[test]
    fn short_id_keeps_ids_shorter_than_seven() {
        let commit = CommitSummary::new("abc12", "msg", "ana");
        assert_eq!(commit.short_id, "abc12");
    }

    #[test]
    fn summary_takes_only_the_first_line() {
        let commit = CommitSummary::new("0123456", "fix bug\n\nlong body here", "ana");
        assert_eq!(commit.summary_line, "fix bug");
    }

    #[test]
    fn summary_is_capped_at_100_chars() {
        let long = "x".repeat(250);
        let commit = CommitSummary::new("0123456", &long, "ana");
        assert_eq!(commit.summary_line.chars().count(), 100);
        assert!(!commit.summary_line.contains('\n'));
    }
}
