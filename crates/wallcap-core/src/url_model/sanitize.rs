//! File-stem sanitization for names derived from photo metadata.

/// Turns a display name into a safe file stem for Linux.
///
/// - Replaces NUL, `/`, `\`, control characters and whitespace with `_`
/// - Collapses consecutive underscores
/// - Trims leading/trailing dots and underscores (no hidden files)
/// - Limits length so that stem plus extension stays within NAME_MAX
pub fn sanitize_file_stem(name: &str) -> String {
    const STEM_MAX: usize = 240;

    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let unsafe_char = c == '\0' || c == '/' || c == '\\' || c.is_control() || c.is_whitespace();
        if unsafe_char || c == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');

    if trimmed.len() > STEM_MAX {
        let mut take = STEM_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_separators_and_spaces() {
        assert_eq!(sanitize_file_stem("Misty Morning/over\\hills"), "Misty_Morning_over_hills");
    }

    #[test]
    fn no_hidden_or_dotted_names() {
        assert_eq!(sanitize_file_stem("..hidden.."), "hidden");
        assert_eq!(sanitize_file_stem(" . "), "");
    }

    #[test]
    fn collapses_underscores_and_controls() {
        assert_eq!(sanitize_file_stem("a__b\x00\tc"), "a_b_c");
    }

    #[test]
    fn long_names_are_cut_on_char_boundary() {
        let long = "é".repeat(200);
        let out = sanitize_file_stem(&long);
        assert!(out.len() <= 240);
        assert!(out.chars().all(|c| c == 'é'));
    }
}
