//! The tree descriptor: a restricted JSON-like document of nested objects.
//!
//! ```text
//! {"BepInEx": {"core": {"BepInEx.dll": "D:\\mods\\BepInEx\\core\\BepInEx.dll"}},
//!  "winhttp.dll": "D:\\mods\\winhttp.dll"}
//! ```
//!
//! Keys are always strings. A value is either an object (a folder) or a
//! string (a file and its backing path). Strings understand `\\`, `\"`,
//! `\t`, `\n` and `\r`; any other escaped character is dropped together
//! with its backslash.
//!
//! Error recovery: parsing stops at the first malformed token and keeps
//! every node created up to that point, including folders whose closing
//! brace was never reached. The stop reason is reported, never raised.

use std::iter::Peekable;
use std::str::CharIndices;

use diagnostics::log_warn;

use crate::node::NodeID;
use crate::tree::Tree;

/// Why parsing stopped early
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("unexpected {found:?} at offset {offset}")]
    UnexpectedToken { offset: usize, found: char },

    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("input ended inside {depth} unclosed folder(s)")]
    UnexpectedEnd { depth: usize },

    #[error("descriptor target is not a folder")]
    InvalidRoot,
}

/// What a parse produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub folders: usize,
    pub files: usize,
    pub error: Option<DescriptorError>,
}

impl ParseReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Clone, Copy)]
enum Expect {
    /// A key or the closing brace of the current folder
    Entry,
    /// A comma or the closing brace after a finished entry
    Separator,
}

struct Scanner<'a> {
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) {
        _ = self.chars.next();
    }

    /// Reads a string whose opening quote has already been consumed
    fn read_string(&mut self, start: usize) -> Result<String, DescriptorError> {
        let mut value = String::new();
        let mut escaped = false;
        for (_, c) in self.chars.by_ref() {
            if escaped {
                escaped = false;
                match c {
                    '\\' => value.push('\\'),
                    '"' => value.push('"'),
                    't' => value.push('\t'),
                    'n' => value.push('\n'),
                    'r' => value.push('\r'),
                    _ => {}
                }
                continue;
            }
            match c {
                '\\' => escaped = true,
                '"' => return Ok(value),
                _ => value.push(c),
            }
        }
        Err(DescriptorError::UnterminatedString { offset: start })
    }
}

/// Parses `input` into folders and files under `root`.
///
/// Anything before the first `{` and after the matching `}` is ignored.
/// Duplicate keys replace earlier entries.
pub fn parse(tree: &mut Tree, root: NodeID, input: &str) -> ParseReport {
    let mut report = ParseReport::default();
    if let Err(err) = parse_into(tree, root, input, &mut report) {
        log_warn!(
            "Descriptor parsing stopped early: {reason}",
            reason: err.to_string()
        );
        report.error = Some(err);
    }
    report
}

fn parse_into(
    tree: &mut Tree,
    root: NodeID,
    input: &str,
    report: &mut ParseReport,
) -> Result<(), DescriptorError> {
    if !tree.get(root).is_some_and(|node| node.is_folder()) {
        return Err(DescriptorError::InvalidRoot);
    }

    let mut scanner = Scanner::new(input);
    loop {
        match scanner.peek() {
            Some((_, '{')) => {
                scanner.bump();
                break;
            }
            Some(_) => scanner.bump(),
            None if input.trim().is_empty() => return Ok(()),
            None => return Err(DescriptorError::UnexpectedEnd { depth: 0 }),
        }
    }

    let mut stack = vec![root];
    let mut expect = Expect::Entry;

    while let Some(&current) = stack.last() {
        scanner.skip_whitespace();
        let Some((offset, c)) = scanner.peek() else {
            return Err(DescriptorError::UnexpectedEnd { depth: stack.len() });
        };

        match (expect, c) {
            (_, '}') => {
                scanner.bump();
                _ = stack.pop();
                expect = Expect::Separator;
            }
            (Expect::Separator, ',') => {
                scanner.bump();
                expect = Expect::Entry;
            }
            (Expect::Entry, '"') => {
                scanner.bump();
                let key = scanner.read_string(offset)?;

                scanner.skip_whitespace();
                match scanner.peek() {
                    Some((_, ':')) => scanner.bump(),
                    Some((offset, found)) => {
                        return Err(DescriptorError::UnexpectedToken { offset, found });
                    }
                    None => return Err(DescriptorError::UnexpectedEnd { depth: stack.len() }),
                }

                scanner.skip_whitespace();
                match scanner.peek() {
                    Some((_, '{')) => {
                        scanner.bump();
                        let folder = tree
                            .insert_folder(current, &key)
                            .map_err(|_| DescriptorError::InvalidRoot)?;
                        report.folders += 1;
                        stack.push(folder);
                        expect = Expect::Entry;
                    }
                    Some((start, '"')) => {
                        scanner.bump();
                        let backing_path = scanner.read_string(start)?;
                        _ = tree
                            .insert_file(current, &key, &backing_path)
                            .map_err(|_| DescriptorError::InvalidRoot)?;
                        report.files += 1;
                        expect = Expect::Separator;
                    }
                    Some((offset, found)) => {
                        return Err(DescriptorError::UnexpectedToken { offset, found });
                    }
                    None => return Err(DescriptorError::UnexpectedEnd { depth: stack.len() }),
                }
            }
            (_, found) => return Err(DescriptorError::UnexpectedToken { offset, found }),
        }
    }

    Ok(())
}

fn push_escaped(out: &mut String, value: &str) {
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
}

fn render_folder(tree: &Tree, folder: NodeID, out: &mut String) {
    out.push('{');
    let children = tree.get(folder).and_then(|node| node.children());
    for (index, entry) in children.into_iter().flat_map(|c| c.iter()).enumerate() {
        if index > 0 {
            out.push(',');
        }
        push_escaped(out, &entry.name);
        out.push(':');
        match tree.get(entry.id).and_then(|node| node.backing_path()) {
            Some(backing_path) => push_escaped(out, backing_path),
            None => render_folder(tree, entry.id, out),
        }
    }
    out.push('}');
}

/// Writes the tree back out in descriptor syntax
#[must_use]
pub fn render(tree: &Tree) -> String {
    let mut out = String::new();
    render_folder(tree, tree.root(), &mut out);
    out
}

/// Decodes descriptor bytes: UTF-16 when a byte order mark says so,
/// UTF-8 otherwise. Invalid sequences become U+FFFD.
#[must_use]
pub fn decode(bytes: &[u8]) -> String {
    fn utf16(bytes: &[u8], from: fn([u8; 2]) -> u16) -> String {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| from([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    }

    match bytes {
        [0xFF, 0xFE, rest @ ..] => utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => utf16(rest, u16::from_be_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}
