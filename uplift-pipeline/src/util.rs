/// Extract a short type name from the full module path.
///
/// Given `"my_crate::some_module::MyType"`, returns `"MyType"`.
pub fn short_type_name(full: &str) -> &str {
    full.rsplit("::").next().unwrap_or(full)
}

/// Normalize an item identifier for joining.
///
/// Spreadsheet exports often render integer ids as floats (`1001.0`); those
/// collapse to `1001`. Returns `None` for blank cells.
pub fn normalize_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(int_part) = trimmed.strip_suffix(".0") {
        if !int_part.is_empty() && int_part.chars().all(|c| c.is_ascii_digit()) {
            return Some(int_part.to_string());
        }
    }
    Some(trimmed.to_string())
}

/// Round to `places` decimal places, ties to even.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_drop_float_suffix_and_whitespace() {
        assert_eq!(normalize_key(" 1001.0 ").as_deref(), Some("1001"));
        assert_eq!(normalize_key("1001").as_deref(), Some("1001"));
        assert_eq!(normalize_key("A-17.0").as_deref(), Some("A-17.0"));
        assert_eq!(normalize_key("  "), None);
    }

    #[test]
    fn halves_round_to_even() {
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(0.375, 2), 0.38);
        assert_eq!(round_to(-0.125, 2), -0.12);
        assert_eq!(round_to(0.1234, 2), 0.12);
        assert_eq!(round_to(2.5, 0), 2.0);
    }

    #[test]
    fn short_names() {
        assert_eq!(short_type_name("a::b::Registrar"), "Registrar");
        assert_eq!(short_type_name("Plain"), "Plain");
    }
}
