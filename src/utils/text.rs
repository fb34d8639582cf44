//! Вспомогательные функции для работы с текстом

/// Обрезать текст до `max_chars` символов.
///
/// Считаются символы, а не байты, поэтому многобайтовые названия
/// (например, на кириллице) не разрезаются посередине символа.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Обрезать текст и добавить `...`, если он был длиннее `max_chars`
pub fn preview(text: &str, max_chars: usize) -> String {
    let truncated = truncate_chars(text, max_chars);
    if truncated.len() < text.len() {
        format!("{}...", truncated)
    } else {
        truncated.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("Alpha", 10), "Alpha");
        assert_eq!(truncate_chars("Alpha", 3), "Alp");
        assert_eq!(truncate_chars("", 3), "");
        assert_eq!(truncate_chars("Университет", 4), "Унив");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("Alpha", 5), "Alpha");
        assert_eq!(preview("Alphabet", 5), "Alpha...");
    }
}
