//! Secret display helpers

/// Masks an API key for display: first 7 and last 4 characters with an
/// ellipsis between, or a fixed placeholder when the key is too short to
/// mask meaningfully.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 11 {
        let head: String = chars[..7].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "***masked***".to_string()
    }
}
