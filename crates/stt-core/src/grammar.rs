//! English command grammar.
//!
//! Produces a [`CommandNode`] parse tree from command text. Each node exposes
//! its alternatives as optional children, at most one of which is set by the
//! parser. Interpretation of the tree lives in [`crate::command`].

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// A date-time token: starts and ends with a digit, digits and separators in between.
const DATE_TIME: &str = r"\d(?:[\d:./\-T ]*\d)?";

static FIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^\s*(?:fin|stop)(?:\s+at\s+(?P<at>{DATE_TIME}))?\s*$")).unwrap()
});

static RESUME_LAST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*resume\s+last\s*$").unwrap());

static AGO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)^(?P<comment>.*?)\s*\b(?:since\s+)?(?P<amount>\d+)\s*(?P<unit>hours?|hrs?|h|minutes?|mins?|m|seconds?|secs?|s)\s+ago\s*$",
    )
    .unwrap()
});

static SINCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)^(?P<comment>.*?)\s*\b(?:since|at)\s+(?P<start>{DATE_TIME})(?:\s+(?:until|to)\s+(?P<end>{DATE_TIME}))?\s*$"
    ))
    .unwrap()
});

static FROM_TO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)^(?P<comment>.*?)\s*\bfrom\s+(?P<start>{DATE_TIME})(?:\s+to\s+(?P<end>{DATE_TIME}))?\s*$"
    ))
    .unwrap()
});

/// Grammar errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// The command text was blank.
    #[error("command cannot be empty")]
    Empty,
}

/// Root of a parsed command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandNode {
    pub item_with_comment: Option<ItemWithCommentNode>,
    pub fin: Option<FinNode>,
    pub resume_last: Option<ResumeLastNode>,
}

/// `<comment> [time format]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemWithCommentNode {
    /// The comment exactly as matched, without the time expression.
    pub comment: String,
    pub time_format: Option<TimeFormatNode>,
}

/// `fin [at <date-time>]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinNode {
    pub at: Option<String>,
}

/// `resume last`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResumeLastNode;

/// The time expression attached to an item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeFormatNode {
    pub since: Option<RangeNode>,
    pub ago: Option<AgoNode>,
    pub from_to: Option<RangeNode>,
}

/// `since <start> [until <end>]` or `from <start> [to <end>]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeNode {
    pub start: String,
    pub end: Option<String>,
}

/// `<amount> <unit> ago`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgoNode {
    pub amount: u32,
    pub unit: String,
}

/// Parses command text into a parse tree.
pub fn parse(text: &str) -> Result<CommandNode, GrammarError> {
    if text.trim().is_empty() {
        return Err(GrammarError::Empty);
    }

    if let Some(caps) = FIN_RE.captures(text) {
        return Ok(CommandNode {
            fin: Some(FinNode {
                at: caps.name("at").map(|m| m.as_str().to_string()),
            }),
            ..CommandNode::default()
        });
    }

    if RESUME_LAST_RE.is_match(text) {
        return Ok(CommandNode {
            resume_last: Some(ResumeLastNode),
            ..CommandNode::default()
        });
    }

    Ok(CommandNode {
        item_with_comment: Some(parse_item(text)),
        ..CommandNode::default()
    })
}

fn parse_item(text: &str) -> ItemWithCommentNode {
    if let Some(caps) = AGO_RE.captures(text) {
        // The amount regex only admits digits; values past u32 fall through to a plain comment.
        if let Ok(amount) = caps["amount"].parse() {
            return ItemWithCommentNode {
                comment: caps["comment"].to_string(),
                time_format: Some(TimeFormatNode {
                    ago: Some(AgoNode {
                        amount,
                        unit: caps["unit"].to_string(),
                    }),
                    ..TimeFormatNode::default()
                }),
            };
        }
    }

    if let Some(caps) = SINCE_RE.captures(text) {
        return ItemWithCommentNode {
            comment: caps["comment"].to_string(),
            time_format: Some(TimeFormatNode {
                since: Some(range_node(&caps)),
                ..TimeFormatNode::default()
            }),
        };
    }

    if let Some(caps) = FROM_TO_RE.captures(text) {
        return ItemWithCommentNode {
            comment: caps["comment"].to_string(),
            time_format: Some(TimeFormatNode {
                from_to: Some(range_node(&caps)),
                ..TimeFormatNode::default()
            }),
        };
    }

    ItemWithCommentNode {
        comment: text.trim().to_string(),
        time_format: None,
    }
}

fn range_node(caps: &regex::Captures<'_>) -> RangeNode {
    RangeNode {
        start: caps["start"].to_string(),
        end: caps.name("end").map(|m| m.as_str().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(text: &str) -> ItemWithCommentNode {
        parse(text).unwrap().item_with_comment.unwrap()
    }

    #[test]
    fn empty_text_is_rejected() {
        assert_eq!(parse("   "), Err(GrammarError::Empty));
    }

    #[test]
    fn fin_with_and_without_time() {
        let node = parse("fin").unwrap();
        assert_eq!(node.fin, Some(FinNode { at: None }));
        assert!(node.item_with_comment.is_none());

        let node = parse("stop at 2020-01-01 10:00").unwrap();
        assert_eq!(node.fin.unwrap().at.as_deref(), Some("2020-01-01 10:00"));
    }

    #[test]
    fn resume_last_is_case_insensitive() {
        let node = parse("Resume  Last").unwrap();
        assert_eq!(node.resume_last, Some(ResumeLastNode));
    }

    #[test]
    fn plain_comment() {
        let node = item("  writing docs ");
        assert_eq!(node.comment, "writing docs");
        assert_eq!(node.time_format, None);
    }

    #[test]
    fn since_with_end() {
        let node = item("meeting since 10:00 until 11:30");
        assert_eq!(node.comment, "meeting");
        let since = node.time_format.unwrap().since.unwrap();
        assert_eq!(since.start, "10:00");
        assert_eq!(since.end.as_deref(), Some("11:30"));
    }

    #[test]
    fn since_accepts_datetime_with_space() {
        let node = item("coding since 2020-01-01 08:00");
        let since = node.time_format.unwrap().since.unwrap();
        assert_eq!(since.start, "2020-01-01 08:00");
        assert_eq!(since.end, None);
    }

    #[test]
    fn ago_form() {
        let node = item("lunch 2 hours ago");
        assert_eq!(node.comment, "lunch");
        let ago = node.time_format.unwrap().ago.unwrap();
        assert_eq!(ago, AgoNode { amount: 2, unit: "hours".to_string() });

        let node = item("lunch since 15min ago");
        let ago = node.time_format.unwrap().ago.unwrap();
        assert_eq!(ago, AgoNode { amount: 15, unit: "min".to_string() });
    }

    #[test]
    fn from_to_form() {
        let node = item("review from 09:00 to 09:30");
        assert_eq!(node.comment, "review");
        let from_to = node.time_format.unwrap().from_to.unwrap();
        assert_eq!(from_to.start, "09:00");
        assert_eq!(from_to.end.as_deref(), Some("09:30"));
    }

    #[test]
    fn words_after_keyword_stay_in_comment() {
        let node = item("reading since lunch");
        assert_eq!(node.comment, "reading since lunch");
        assert_eq!(node.time_format, None);

        let node = item("format disk 10:00");
        assert_eq!(node.time_format, None);
    }

    #[test]
    fn unknown_unit_stays_in_comment() {
        let node = item("holiday 3 days ago");
        assert_eq!(node.comment, "holiday 3 days ago");
        assert_eq!(node.time_format, None);
    }

    #[test]
    fn comment_may_be_empty() {
        let node = item("since 10:00");
        assert_eq!(node.comment, "");
        assert!(node.time_format.unwrap().since.is_some());
    }

    #[test]
    fn malformed_time_still_matches_grammar() {
        let node = item("work since 25:99");
        assert_eq!(node.time_format.unwrap().since.unwrap().start, "25:99");
    }
}
