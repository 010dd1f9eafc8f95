//! Approval/command scanner
//!
//! Privileged instructions arrive as ordinary comments addressed to the
//! bot (`@xen-git approved.`). A comment counts only when its author is
//! in the supplied authorized set; the remainder after the address is
//! split into sentence phrases and each phrase is tested against the
//! command pattern.

use crate::types::Comment;
use regex::Regex;
use std::sync::LazyLock;

static APPROVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^approved?$").expect("approve regex"));

static RECHECK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^recheck$").expect("recheck regex"));

/// Pattern matching an approval phrase
pub fn approve_pattern() -> &'static Regex {
    &APPROVE
}

/// Pattern matching a recheck phrase
pub fn recheck_pattern() -> &'static Regex {
    &RECHECK
}

/// Find the first command phrase addressed to the bot.
///
/// Scans `comments` in order for one authored by an identity in
/// `authorized`, whose body starts with `@<bot_name>`; the rest of the
/// body is split on `.`/`!` and each trimmed phrase is tested against
/// `pattern`. Returns the first matching phrase.
pub fn addressed_command(
    comments: &[Comment],
    bot_name: &str,
    authorized: &[String],
    pattern: &Regex,
) -> Option<String> {
    let address = format!("@{bot_name}");

    for comment in comments {
        if !authorized.iter().any(|a| a == &comment.author) {
            continue;
        }
        let Some(rest) = comment.body.trim().strip_prefix(&address) else {
            continue;
        };
        for phrase in rest.split(['.', '!']) {
            let phrase = phrase.trim();
            if !phrase.is_empty() && pattern.is_match(phrase) {
                return Some(phrase.to_string());
            }
        }
    }
    None
}
