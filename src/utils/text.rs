// Text helpers for model and search output

/// Truncate to at most `limit` characters without splitting a code point
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Pull a JSON object out of a model reply that may wrap it in prose or fences
pub fn extract_json_block(response: &str) -> &str {
    if response.contains("```json") {
        return response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(response)
            .trim();
    }
    if response.contains("```") {
        return response.split("```").nth(1).unwrap_or(response).trim();
    }

    match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => response.trim(),
    }
}

/// Remove HTML tags and decode the handful of entities search pages use
pub fn strip_html(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    out.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello world", 5), "hello");
        assert_eq!(truncate_chars("short", 800), "short");
        // multi-byte characters are kept whole
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_extract_json_block() {
        assert_eq!(extract_json_block("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(extract_json_block("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(extract_json_block("Sure! {\"a\": 1} Hope that helps"), "{\"a\": 1}");
        assert_eq!(extract_json_block("  no json  "), "no json");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("Fasting <b>improves</b> insulin &amp; glucose"),
            "Fasting improves insulin & glucose"
        );
        assert_eq!(strip_html("It&#x27;s   fine"), "It's fine");
    }
}
