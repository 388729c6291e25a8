use unicode_normalization::UnicodeNormalization;

/// Question text hygiene applied before a payload is built:
/// Unicode NFC normalization + BOM strip + CRLF -> LF + trim.
pub fn clean_question(s: &str) -> String {
    let mut t = s.nfc().collect::<String>();
    if t.starts_with('\u{FEFF}') {
        // Byte Order Mark
        t.remove(0);
    }
    if t.contains("\r\n") {
        t = t.replace("\r\n", "\n");
    }
    t.trim().to_string()
}

/// Folding used by the history matcher: trimmed, lowercased.
pub fn fold_for_match(s: &str) -> String {
    s.trim().to_lowercase()
}
