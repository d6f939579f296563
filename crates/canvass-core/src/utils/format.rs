/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a timestamp string to a more readable format
pub fn format_date(date: &str) -> String {
    // Backend timestamps are RFC 3339, or "YYYY-MM-DD HH:MM:SS" on older endpoints
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S") {
        dt.format("%b %d, %Y").to_string()
    } else if date.len() >= 10 && date.is_char_boundary(10) {
        date[..10].to_string()
    } else {
        date.to_string()
    }
}

/// Collapse runs of whitespace (including newlines) into single spaces
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("₵₵₵₵₵", 4), "₵...");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-05-01T10:00:00Z"), "May 01, 2024");
        assert_eq!(format_date("2024-05-01 10:00:00"), "May 01, 2024");
        assert_eq!(format_date("2024-05-01-garbage"), "2024-05-01");
        assert_eq!(format_date("soon"), "soon");
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("Rally at\n\n  noon "), "Rally at noon");
    }
}
