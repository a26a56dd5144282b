/// Splits a comma-separated list of names into trimmed, non-empty tokens.
///
/// Whitespace inside a token is kept, so `"my proj, x"` yields
/// `["my proj", "x"]`. Blank input yields an empty list.
pub fn parse_name_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
