//! Display helpers shared by post and comment views.

use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[day padding:none] [month repr:long] [year], [hour]:[minute]");

const PREVIEW_CHARS: usize = 30;

/// Human-readable publication stamp, falling back to RFC 3339 on format failure.
pub fn format_human_datetime(at: OffsetDateTime) -> String {
    at.format(HUMAN_DATE_FORMAT)
        .unwrap_or_else(|_| at.to_string())
}

/// Short preview used in page titles and logs, truncated on a char boundary.
pub fn preview(text: &str) -> &str {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_text() {
        let text = "a".repeat(100);
        assert_eq!(preview(&text).len(), 30);
    }

    #[test]
    fn preview_keeps_short_text_whole() {
        assert_eq!(preview("короткий текст"), "короткий текст");
    }

    #[test]
    fn preview_respects_multibyte_boundaries() {
        let text = "ю".repeat(40);
        let cut = preview(&text);
        assert_eq!(cut.chars().count(), 30);
    }
}
