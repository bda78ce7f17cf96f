/// Remove carriage-return debris. The upstream extractor leaves both real
/// `\r` characters and the two-character escape `\r` inside wrapped cells.
pub fn strip_carriage_returns(raw: &str) -> String {
    raw.replace("\\r", "").replace('\r', "")
}

/// Clean a body cell. Blank cells are absent, not empty strings.
pub fn clean_cell(raw: &str) -> Option<String> {
    let cleaned = strip_carriage_returns(raw);
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Clean a header cell. A blank header is named `Unnamed: <position>`,
/// which is how drop lists refer to unlabelled spacer columns.
pub fn clean_header(raw: &str, position: usize) -> String {
    match clean_cell(raw) {
        Some(name) => name,
        None => format!("Unnamed: {}", position),
    }
}
