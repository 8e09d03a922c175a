// method_locator.rs - Find Ruby method definitions near a cursor
//
// Line-oriented pattern matching over raw buffer text; there is no Ruby
// parser here. A line holds a definition when it contains `def <name>`
// (optionally `def self.<name>`). Minitest's declarative form
// `test "adds tax" do` is read as the method Rails generates for it,
// `test_adds_tax`.

use regex::Regex;
use std::sync::OnceLock;

/// Which part of the buffer to scan, relative to the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From the cursor line up to the top of the buffer
    Backward,
    /// From the cursor down to the end of the buffer
    Forward,
}

/// A method definition found in a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodLocation {
    pub name: String,
    /// Zero-based line index
    pub line: usize,
    /// Byte offset of the definition keyword
    pub offset: usize,
}

struct MethodPatterns {
    def: Regex,
    declarative_test: Regex,
    whitespace: Regex,
}

fn patterns() -> &'static MethodPatterns {
    static PATTERNS: OnceLock<MethodPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| MethodPatterns {
        def: Regex::new(r"\bdef\s+(?:self\.)?([A-Za-z_][A-Za-z0-9_]*[?!=]?)").unwrap(),
        declarative_test: Regex::new(r#"^\s*test\s*\(?\s*(?:"([^"]+)"|'([^']+)')"#).unwrap(),
        whitespace: Regex::new(r"\s+").unwrap(),
    })
}

/// Scans buffer text for method definitions
#[derive(Debug, Clone)]
pub struct MethodLocator {
    test_prefix: String,
}

impl Default for MethodLocator {
    fn default() -> Self {
        Self::new("test_")
    }
}

impl MethodLocator {
    pub fn new(test_prefix: &str) -> Self {
        Self {
            test_prefix: test_prefix.to_string(),
        }
    }

    /// Name of the first definition found scanning from `cursor` in `direction`.
    ///
    /// With `test_only`, definitions whose name lacks the test prefix are
    /// passed over.
    pub fn locate_method(
        &self,
        text: &str,
        cursor: usize,
        direction: Direction,
        test_only: bool,
    ) -> Option<String> {
        self.locate(text, cursor, direction, test_only)
            .map(|loc| loc.name)
    }

    /// Like [`MethodLocator::locate_method`], with the definition's position
    pub fn locate(
        &self,
        text: &str,
        cursor: usize,
        direction: Direction,
        test_only: bool,
    ) -> Option<MethodLocation> {
        let cursor = floor_char_boundary(text, cursor);
        let spans = line_spans(text);
        let cursor_line = spans
            .iter()
            .rposition(|(start, _)| *start <= cursor)
            .unwrap_or(0);

        let found = match direction {
            // Only text before the cursor counts. A definition on the cursor
            // line must begin before the cursor; its name is still read in
            // full when the cursor sits inside it.
            Direction::Backward => {
                let (line_start, line) = spans[cursor_line];
                let before = cursor - line_start;
                let first = self
                    .match_line(line, test_only)
                    .filter(|(_, col)| *col < before)
                    .map(|(name, col)| (cursor_line, line_start + col, name));
                first.or_else(|| {
                    spans[..cursor_line]
                        .iter()
                        .enumerate()
                        .rev()
                        .find_map(|(i, (start, line))| {
                            self.match_line(line, test_only)
                                .map(|(name, col)| (i, start + col, name))
                        })
                })
            }
            Direction::Forward => {
                let (line_start, line) = spans[cursor_line];
                let skip = cursor - line_start;
                let first = self
                    .match_line(&line[skip..], test_only)
                    .map(|(name, col)| (cursor_line, cursor + col, name));
                first.or_else(|| {
                    spans[cursor_line + 1..]
                        .iter()
                        .enumerate()
                        .find_map(|(i, (start, line))| {
                            self.match_line(line, test_only)
                                .map(|(name, col)| (cursor_line + 1 + i, start + col, name))
                        })
                })
            }
        };

        found.map(|(line, offset, name)| {
            log::trace!(
                "Located method '{}' on line {} scanning {:?} from offset {}",
                name,
                line,
                direction,
                cursor
            );
            MethodLocation { name, line, offset }
        })
    }

    /// Nearest definition: the enclosing/preceding one, else the first after the cursor
    pub fn locate_nearest(&self, text: &str, cursor: usize, test_only: bool) -> Option<String> {
        self.locate_method(text, cursor, Direction::Backward, test_only)
            .or_else(|| self.locate_method(text, cursor, Direction::Forward, test_only))
    }

    /// First definition of exactly `name`, scanning from the top
    pub fn find_definition(&self, text: &str, name: &str) -> Option<MethodLocation> {
        line_spans(text)
            .into_iter()
            .enumerate()
            .find_map(|(line, (start, content))| {
                self.match_line(content, false)
                    .filter(|(found, _)| found == name)
                    .map(|(name, col)| MethodLocation {
                        name,
                        line,
                        offset: start + col,
                    })
            })
    }

    /// Method defined on `line` and the column it starts at
    fn match_line(&self, line: &str, test_only: bool) -> Option<(String, usize)> {
        let patterns = patterns();

        if let Some(caps) = patterns.def.captures(line) {
            let name = caps.get(1)?.as_str();
            if !test_only || name.starts_with(self.test_prefix.as_str()) {
                let col = caps.get(0).map_or(0, |m| m.start());
                return Some((name.to_string(), col));
            }
            return None;
        }

        let caps = patterns.declarative_test.captures(line)?;
        let description = caps.get(1).or_else(|| caps.get(2))?.as_str().trim();
        if description.is_empty() {
            return None;
        }
        let name = format!(
            "{}{}",
            self.test_prefix,
            patterns.whitespace.replace_all(description, "_")
        );
        let col = line.len() - line.trim_start().len();
        Some((name, col))
    }
}

/// Start offset and text of every `\n`-separated line
fn line_spans(text: &str) -> Vec<(usize, &str)> {
    let mut spans = Vec::new();
    let mut start = 0;
    for line in text.split('\n') {
        spans.push((start, line));
        start += line.len() + 1;
    }
    spans
}

fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
