//! Filename sanitization utilities

/// Characters Windows, macOS and Linux refuse (or mangle) in path components
const RESERVED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Sanitize a single path component for safe filesystem usage
///
/// Every reserved character and every control character becomes `_`. Leading
/// whitespace and trailing dots or whitespace are dropped, so `.` and `..`
/// never come back as a path component. The result may be empty; callers
/// supply their own fallback name in that case.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if RESERVED.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    replaced
        .trim_start()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

/// Sanitize a name, falling back to `fallback` when nothing usable is left
pub fn sanitize_or(name: &str, fallback: impl FnOnce() -> String) -> String {
    let cleaned = sanitize_filename(name);
    if cleaned.is_empty() { fallback() } else { cleaned }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_slashes() {
        assert_eq!(sanitize_filename("BOTHERED / UNBOTHERED"), "BOTHERED _ UNBOTHERED");
        assert_eq!(sanitize_filename("AC\\DC"), "AC_DC");
    }

    #[test]
    fn test_sanitize_colon() {
        assert_eq!(
            sanitize_filename("Transistor: Original Soundtrack"),
            "Transistor_ Original Soundtrack"
        );
    }

    #[test]
    fn test_sanitize_removes_every_reserved_char() {
        let cleaned = sanitize_filename("a<b>c:d\"e/f\\g|h?i*j");
        assert_eq!(cleaned, "a_b_c_d_e_f_g_h_i_j");
        assert!(!cleaned.chars().any(|c| RESERVED.contains(&c)));
    }

    #[test]
    fn test_sanitize_control_chars() {
        assert_eq!(sanitize_filename("line\nbreak\ttab\0"), "line_break_tab_");
    }

    #[test]
    fn test_no_changes_needed() {
        assert_eq!(sanitize_filename("Normal Album Name"), "Normal Album Name");
    }

    #[test]
    fn test_trim_whitespace() {
        assert_eq!(sanitize_filename("  Album Name  "), "Album Name");
    }

    #[test]
    fn test_dot_names_are_not_path_components() {
        assert_eq!(sanitize_filename("."), "");
        assert_eq!(sanitize_filename(".."), "");
        assert_eq!(sanitize_filename("..."), "");
        assert_eq!(sanitize_filename(" .. "), "");
        assert_eq!(sanitize_or("..", || "playlist_7".to_string()), "playlist_7");
    }

    #[test]
    fn test_trailing_dots_dropped() {
        assert_eq!(sanitize_filename("Greatest Hits Vol. 2..."), "Greatest Hits Vol. 2");
        assert_eq!(sanitize_filename(".hidden"), ".hidden");
        assert_eq!(sanitize_filename("Mr. Brightside"), "Mr. Brightside");
    }

    #[test]
    fn test_fallback_on_empty() {
        assert_eq!(sanitize_or("   ", || "item_42".to_string()), "item_42");
        assert_eq!(sanitize_or("Keep", || "unused".to_string()), "Keep");
    }
}
