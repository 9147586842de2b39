use overlayfs::glob::matches;

/// Match command - tests names against a wildcard pattern the way directory
/// searches do
pub fn match_command<F>(pattern: &str, names: &[String], mut handler: F)
where
    F: FnMut(&str),
{
    handler(&match_command_as_string(pattern, names));
}

#[must_use]
pub fn match_command_as_string(pattern: &str, names: &[String]) -> String {
    names
        .iter()
        .map(|name| {
            let mark = if matches(pattern, name) { '+' } else { '-' };
            format!("{mark} {name}\n")
        })
        .collect()
}
