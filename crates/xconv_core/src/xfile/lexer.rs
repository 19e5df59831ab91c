//! Logical line source for the legacy grammar.
//!
//! Every physical line has its `//` comment removed and surrounding
//! whitespace trimmed; lines left empty are dropped. Productions that end
//! without a terminator look ahead with [`LineSource::peek`].

use std::collections::VecDeque;

/// One logical line and the 1-based physical line it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    pub number: usize,
    pub text: String,
}

impl Line {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Queue of logical lines with lookahead.
#[derive(Debug, Default)]
pub struct LineSource {
    lines: VecDeque<Line>,
    last_number: usize,
}

impl LineSource {
    /// Split file contents into logical lines.
    pub fn new(content: &str) -> Self {
        let lines = content
            .lines()
            .enumerate()
            .filter_map(|(i, raw)| {
                let text = strip_comment(raw).trim();
                (!text.is_empty()).then(|| Line::new(i + 1, text))
            })
            .collect();

        Self {
            lines,
            last_number: 0,
        }
    }

    /// Take the next logical line.
    pub fn next_line(&mut self) -> Option<Line> {
        let line = self.lines.pop_front()?;
        self.last_number = line.number;
        Some(line)
    }

    /// Look at the next logical line without consuming it.
    pub fn peek(&self) -> Option<&Line> {
        self.lines.front()
    }

    /// Physical line number of the last line taken (0 before the first).
    pub fn line_number(&self) -> usize {
        self.last_number
    }
}

impl Iterator for LineSource {
    type Item = Line;

    fn next(&mut self) -> Option<Line> {
        self.next_line()
    }
}

/// Text before the first `//`.
pub fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_and_blank_lines() {
        let mut source = LineSource::new("xof 0303txt 0032\n\n  // header\n\t1.0;2.0;3.0;, // mid-record\r\n}\n");

        assert_eq!(source.next_line(), Some(Line::new(1, "xof 0303txt 0032")));
        assert_eq!(source.next_line(), Some(Line::new(4, "1.0;2.0;3.0;,")));
        assert_eq!(source.line_number(), 4);
        assert_eq!(source.next_line().map(|l| l.text), Some("}".to_string()));
        assert!(source.next_line().is_none());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut source = LineSource::new("a\n// skipped\nb\n");
        assert_eq!(source.peek(), Some(&Line::new(1, "a")));
        assert_eq!(source.line_number(), 0);

        source.next_line();
        assert_eq!(source.peek(), Some(&Line::new(3, "b")));
        let texts: Vec<String> = source.map(|l| l.text).collect();
        assert_eq!(texts, vec!["b"]);
    }

    #[test]
    fn test_strip_comment() {
        assert_eq!(strip_comment("Frame A { // note"), "Frame A { ");
        assert_eq!(strip_comment("no comment"), "no comment");
    }
}
