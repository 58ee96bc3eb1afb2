//! Command interpretation.
//!
//! Walks a [`CommandNode`] and resolves its time expressions into a typed
//! [`Command`]. Alternatives are tried in a fixed order and the first one
//! present decides the result; the rest are never looked at.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::grammar::{self, AgoNode, CommandNode, FinNode, GrammarError, ItemWithCommentNode, RangeNode, TimeFormatNode};
use crate::time::{FormatError, TimeResolver, TimeUnit};
use crate::types::TimeRange;

/// A command ready to be applied to the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Track a new item.
    NewItem {
        comment: Option<String>,
        start: NaiveDateTime,
        end: Option<NaiveDateTime>,
    },
    /// Continue the last item's activity from `at`.
    ResumeLast { at: NaiveDateTime },
    /// Stop the ongoing item at `at`.
    EndCurrent { at: NaiveDateTime },
}

/// Errors while turning command text into a [`Command`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterpretError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Format(#[from] FormatError),
    /// The parse tree did not match any known alternative.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Turns parse trees into commands.
#[derive(Debug, Clone, Default)]
pub struct CommandInterpreter {
    resolver: TimeResolver,
}

impl CommandInterpreter {
    pub const fn new(resolver: TimeResolver) -> Self {
        Self { resolver }
    }

    pub const fn resolver(&self) -> &TimeResolver {
        &self.resolver
    }

    /// Parses and interprets command text.
    pub fn parse(&self, text: &str) -> Result<Command, InterpretError> {
        let node = grammar::parse(text)?;
        self.interpret(&node)
    }

    /// Interprets a parse tree.
    pub fn interpret(&self, node: &CommandNode) -> Result<Command, InterpretError> {
        if let Some(item) = &node.item_with_comment {
            return self.item_with_comment(item);
        }
        if let Some(fin) = &node.fin {
            return self.fin(fin);
        }
        if node.resume_last.is_some() {
            return Ok(Command::ResumeLast {
                at: self.resolver.now(),
            });
        }
        Err(InterpretError::Internal(format!(
            "command matched no known alternative: {node:?}"
        )))
    }

    fn item_with_comment(&self, node: &ItemWithCommentNode) -> Result<Command, InterpretError> {
        let range = node
            .time_format
            .as_ref()
            .map(|time_format| self.time_format(time_format))
            .transpose()?;
        let TimeRange { start, end } = self.resolver.resolve_bare_time(range);
        let comment = (!node.comment.is_empty()).then(|| node.comment.clone());
        Ok(Command::NewItem {
            comment,
            start,
            end,
        })
    }

    fn time_format(&self, node: &TimeFormatNode) -> Result<TimeRange, InterpretError> {
        if let Some(since) = &node.since {
            return self.range(since);
        }
        if let Some(ago) = &node.ago {
            return self.ago(ago);
        }
        if let Some(from_to) = &node.from_to {
            return self.range(from_to);
        }
        Err(InterpretError::Internal(format!(
            "time format matched no known alternative: {node:?}"
        )))
    }

    fn range(&self, node: &RangeNode) -> Result<TimeRange, InterpretError> {
        Ok(self
            .resolver
            .resolve_range(&node.start, node.end.as_deref())?)
    }

    fn ago(&self, node: &AgoNode) -> Result<TimeRange, InterpretError> {
        let unit = TimeUnit::from_token(&node.unit)
            .ok_or_else(|| InterpretError::Internal(format!("unknown ago unit: {}", node.unit)))?;
        let start = self.resolver.resolve_relative(node.amount, unit)?;
        Ok(TimeRange::open(start))
    }

    fn fin(&self, node: &FinNode) -> Result<Command, InterpretError> {
        let at = match &node.at {
            Some(at) => self.resolver.resolve_date_time(at)?,
            None => self.resolver.now(),
        };
        Ok(Command::EndCurrent { at })
    }
}
