//! Link classification for the assist export.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a pending link points at, judged from its text alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Private group invite (`t.me/+…`, `t.me/joinchat/…`).
    GroupInvite,
    /// A bot, which is started rather than joined.
    Bot,
    /// Public usernames and anything else not recognised.
    Unknown,
}

impl LinkKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GroupInvite => "group_invite",
            Self::Bot => "bot",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the link belongs in an export of groups to join by hand.
    #[must_use]
    pub const fn is_joinable(self) -> bool {
        matches!(self, Self::GroupInvite | Self::Unknown)
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a link by its text. Case and surrounding whitespace are ignored.
#[must_use]
pub fn classify_link(link: &str) -> LinkKind {
    let link = link.trim().to_lowercase();

    // A bare @username may be a group, channel, user or bot.
    if link.starts_with('@') {
        return LinkKind::Unknown;
    }
    if ["t.me/joinchat", "/+/", "t.me/+", "joinchat"]
        .iter()
        .any(|p| link.contains(p))
    {
        return LinkKind::GroupInvite;
    }
    if link.contains("t.me/") && link.contains("bot") {
        return LinkKind::Bot;
    }
    LinkKind::Unknown
}

/// Splits links into the joinable ones (in order) and the number skipped.
#[must_use]
pub fn joinable_links(links: Vec<String>) -> (Vec<String>, usize) {
    let total = links.len();
    let joinable: Vec<String> = links
        .into_iter()
        .filter(|l| classify_link(l).is_joinable())
        .collect();
    let skipped = total - joinable.len();
    (joinable, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_links() {
        assert_eq!(classify_link("https://t.me/+AbCdEf"), LinkKind::GroupInvite);
        assert_eq!(classify_link("t.me/joinchat/xyz"), LinkKind::GroupInvite);
        assert_eq!(classify_link("  HTTPS://T.ME/JOINCHAT/XYZ "), LinkKind::GroupInvite);
    }

    #[test]
    fn test_bot_links() {
        assert_eq!(classify_link("https://t.me/some_bot"), LinkKind::Bot);
        assert_eq!(classify_link("t.me/BotFather"), LinkKind::Bot);
    }

    #[test]
    fn test_usernames_and_other_links_are_unknown() {
        assert_eq!(classify_link("@name"), LinkKind::Unknown);
        assert_eq!(classify_link("@helper_bot"), LinkKind::Unknown);
        assert_eq!(classify_link("https://t.me/rust_chat"), LinkKind::Unknown);
        assert_eq!(classify_link("example.com/bot"), LinkKind::Unknown);
    }

    #[test]
    fn test_joinable_kinds() {
        assert!(LinkKind::GroupInvite.is_joinable());
        assert!(LinkKind::Unknown.is_joinable());
        assert!(!LinkKind::Bot.is_joinable());
    }

    #[test]
    fn test_joinable_links_drops_bots() {
        let links = vec![
            "https://t.me/+abc".to_owned(),
            "https://t.me/some_bot".to_owned(),
            "@name".to_owned(),
        ];
        let (kept, skipped) = joinable_links(links);
        assert_eq!(kept, ["https://t.me/+abc", "@name"]);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let out = serde_json::to_string(&LinkKind::GroupInvite).unwrap();
        assert_eq!(out, r#""group_invite""#);
    }
}
