//! Validation utilities for API handlers

/// Validate a conversion source URL.
///
/// Only absolute http/https URLs with a host are accepted. The URL is handed
/// to an external fetcher process, so anything that does not look like a web
/// address is rejected before a job is created.
pub fn validate_source_url(url: &str) -> Result<(), String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err("URL must not be empty".to_string());
    }
    if trimmed.chars().any(|c| c.is_whitespace()) {
        return Err("URL must not contain whitespace".to_string());
    }

    let lowered = trimmed.to_ascii_lowercase();
    let rest = if let Some(rest) = lowered.strip_prefix("https://") {
        rest
    } else if let Some(rest) = lowered.strip_prefix("http://") {
        rest
    } else {
        return Err("URL must start with http:// or https://".to_string());
    };

    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    if host.is_empty() {
        return Err("URL must include a host".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_https_url() {
        assert!(validate_source_url("https://www.youtube.com/watch?v=abc123").is_ok());
    }

    #[test]
    fn test_accepts_http_with_port() {
        assert!(validate_source_url("http://localhost:8080/clip").is_ok());
    }

    #[test]
    fn test_rejects_empty_and_blank() {
        assert!(validate_source_url("").is_err());
        assert!(validate_source_url("   ").is_err());
    }

    #[test]
    fn test_rejects_non_http_schemes() {
        assert!(validate_source_url("ftp://example.com/song").is_err());
        assert!(validate_source_url("file:///etc/passwd").is_err());
        assert!(validate_source_url("youtube.com/watch?v=abc").is_err());
    }

    #[test]
    fn test_rejects_missing_host() {
        assert!(validate_source_url("https://").is_err());
        assert!(validate_source_url("https:///path-only").is_err());
    }

    #[test]
    fn test_rejects_embedded_whitespace() {
        assert!(validate_source_url("https://example.com/a b").is_err());
    }
}
