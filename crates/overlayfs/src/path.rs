//! Windows-style path helpers.
//!
//! The engine works on `\`-separated strings because that is what the
//! intercepted calls carry. `/` is accepted everywhere and normalized away.
//! Nothing in this module touches the real filesystem.

pub const SEPARATOR: char = '\\';

/// Lowercases one character at a time; the only case rule the engine uses
fn lower(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars().flat_map(char::to_lowercase)
}

/// Case-insensitive comparison of two characters
pub fn chars_eq(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Case-insensitive comparison of two names or paths.
///
/// Agrees with [`fold`]: `eq_ignore_case(a, b) == (fold(a) == fold(b))`.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    lower(a).eq(lower(b))
}

/// The key under which a name is stored in a folder
pub fn fold(name: &str) -> String {
    lower(name).collect()
}

/// Splits off the drive / root / UNC prefix, returning `(prefix, rest)`
fn split_prefix(path: &str) -> (&str, &str) {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        if bytes.len() >= 3 && bytes[2] == b'\\' {
            return path.split_at(3);
        }
        return path.split_at(2);
    }
    if path.starts_with("\\\\") {
        return path.split_at(2);
    }
    if path.starts_with(SEPARATOR) {
        return path.split_at(1);
    }
    ("", path)
}

/// True for `X:\...`, `\...` and UNC paths
pub fn is_absolute(path: &str) -> bool {
    let unified = path.replace('/', "\\");
    split_prefix(&unified).0.ends_with(SEPARATOR)
}

/// Lexically normalizes a path: unifies separators, drops empty and `.`
/// components, folds `..` into its parent, removes trailing separators.
///
/// `..` never climbs above the root of an absolute path.
pub fn normalize(path: &str) -> String {
    let unified = path.replace('/', "\\");
    let (prefix, rest) = split_prefix(&unified);

    let mut parts: Vec<&str> = Vec::new();
    for segment in rest.split(SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    _ = parts.pop();
                } else if prefix.is_empty() {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let mut normalized = String::with_capacity(unified.len());
    normalized.push_str(prefix);
    normalized.push_str(&parts.join("\\"));
    normalized
}

/// Joins two path fragments with exactly one separator between them
pub fn join(base: &str, rest: &str) -> String {
    let rest = rest.trim_start_matches(SEPARATOR);
    if base.is_empty() {
        return rest.to_string();
    }
    if rest.is_empty() {
        return base.to_string();
    }
    if base.ends_with(SEPARATOR) {
        format!("{base}{rest}")
    } else {
        format!("{base}{SEPARATOR}{rest}")
    }
}

/// Appends a separator unless the path already ends with one
pub fn with_trailing_separator(path: &str) -> String {
    if path.ends_with(SEPARATOR) {
        path.to_string()
    } else {
        format!("{path}{SEPARATOR}")
    }
}

/// Splits a relative path into its non-empty segments
pub fn split(path: &str) -> Vec<&str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty()).collect()
}

/// Splits a path at its last separator into `(parent, leaf)`.
///
/// A path without a separator is a leaf with an empty parent.
pub fn split_last(path: &str) -> (&str, &str) {
    match path.rfind(SEPARATOR) {
        Some(index) => (&path[..index], &path[index + 1..]),
        None => ("", path),
    }
}

/// The final component of a path, ignoring trailing separators
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches(SEPARATOR);
    split_last(trimmed).1
}

/// Case-insensitive removal of a directory prefix.
///
/// `prefix` is compared on whole components: `C:\game` strips from
/// `C:\game\a.txt` but not from `C:\gamedata`. The remainder carries no
/// leading or trailing separators; an exact match yields `""`.
pub fn strip_prefix_ci<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let base = prefix.trim_end_matches(SEPARATOR);
    if eq_ignore_case(path.trim_end_matches(SEPARATOR), base) {
        return Some("");
    }

    let mut chars = path.char_indices();
    for expected in base.chars().chain(std::iter::once(SEPARATOR)) {
        match chars.next() {
            Some((_, c)) if chars_eq(c, expected) => {}
            _ => return None,
        }
    }
    let offset = chars.next().map_or(path.len(), |(index, _)| index);
    Some(path[offset..].trim_matches(SEPARATOR))
}
