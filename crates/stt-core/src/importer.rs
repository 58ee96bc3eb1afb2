//! Reader for the legacy plain-text journal format.
//!
//! One item per line: `<start> [<end>] [comment]`, timestamps written as
//! `YYYY-MM-DD_HH:MM:SS`. Line breaks inside comments are escaped as `\n` and `\r`.

use std::io::BufRead;

use chrono::NaiveDateTime;

use crate::source::{ItemReader, StorageError};
use crate::types::TimeTrackingItem;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// Streams items out of a plain-text journal.
#[derive(Debug)]
pub struct TiImporter<R> {
    lines: std::io::Lines<R>,
    line_number: usize,
}

impl<R: BufRead> TiImporter<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }

    fn parse_line(&self, line: &str) -> Result<TimeTrackingItem, StorageError> {
        let (start, rest) = split_token(line);
        let start = parse_timestamp(start).ok_or_else(|| {
            StorageError::new(format!(
                "line {}: invalid start time '{start}'",
                self.line_number
            ))
        })?;

        let (end, comment) = match rest {
            Some(rest) => {
                let (token, after) = split_token(rest);
                match parse_timestamp(token) {
                    Some(end) => (Some(end), after),
                    None => (None, Some(rest)),
                }
            }
            None => (None, None),
        };

        let comment = comment.filter(|c| !c.is_empty()).map(unescape);
        TimeTrackingItem::new(comment, start, end).map_err(|err| {
            StorageError::with_source(format!("line {}: invalid item", self.line_number), err)
        })
    }
}

impl<R: BufRead> ItemReader for TiImporter<R> {
    fn read(&mut self) -> Result<Option<TimeTrackingItem>, StorageError> {
        loop {
            let Some(line) = self.lines.next() else {
                return Ok(None);
            };
            self.line_number += 1;
            let line = line.map_err(|err| {
                StorageError::with_source(format!("failed to read line {}", self.line_number), err)
            })?;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }
            return self.parse_line(line).map(Some);
        }
    }
}

fn split_token(text: &str) -> (&str, Option<&str>) {
    match text.split_once(' ') {
        Some((token, rest)) => (token, Some(rest)),
        None => (text, None),
    }
}

fn parse_timestamp(token: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(token, TIMESTAMP_FORMAT).ok()
}

fn unescape(comment: &str) -> String {
    comment.replace("\\n", "\n").replace("\\r", "\r")
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::source::read_all;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn multi_line_comment_is_unescaped() {
        let input = r"2012-10-10_22:00:00 2012-11-10_22:00:01 this is\n a multiline\r string\r\n with different separators";
        let mut importer = TiImporter::new(Cursor::new(input));
        let item = importer.read().unwrap().unwrap();
        assert_eq!(
            item.comment(),
            Some("this is\n a multiline\r string\r\n with different separators")
        );
        assert_eq!(item.end(), Some(dt("2012-11-10 22:00:01")));
    }

    #[test]
    fn only_start_time_given() {
        let mut importer = TiImporter::new(Cursor::new("2012-10-10_22:00:00"));
        let item = importer.read().unwrap().unwrap();
        assert_eq!(item.start(), dt("2012-10-10 22:00:00"));
        assert_eq!(item.end(), None);
        assert_eq!(item.comment(), None);
        assert_eq!(importer.read().unwrap(), None);
    }

    #[test]
    fn start_and_comment_without_end() {
        let mut importer = TiImporter::new(Cursor::new("2012-10-10_22:00:00 still going"));
        let item = importer.read().unwrap().unwrap();
        assert_eq!(item.end(), None);
        assert_eq!(item.comment(), Some("still going"));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let input = "2012-10-10_08:00:00 2012-10-10_09:00:00 a\n\n  \n2012-10-10_09:00:00 b\n";
        let items = read_all(&mut TiImporter::new(Cursor::new(input))).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].comment(), Some("b"));
    }

    #[test]
    fn malformed_line_names_line_number() {
        let input = "2012-10-10_08:00:00 a\nyesterday b\n";
        let mut importer = TiImporter::new(Cursor::new(input));
        importer.read().unwrap();
        let err = importer.read().unwrap_err();
        assert_eq!(err.to_string(), "line 2: invalid start time 'yesterday'");
    }

    #[test]
    fn end_before_start_is_rejected() {
        let input = "2012-10-10_09:00:00 2012-10-10_08:00:00 backwards";
        let err = TiImporter::new(Cursor::new(input)).read().unwrap_err();
        assert_eq!(err.to_string(), "line 1: invalid item");
    }
}
