/// Utility Functions for Environment Access
///
/// Server settings and connection configuration are supplied through
/// environment variables. Empty variables are treated as set-but-empty so the
/// configuration validator can report them instead of silently defaulting.

/// Get an environment variable, or `None` when it is unset or not valid UTF-8.
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get environment variable value with a default fallback.
///
/// # Example
/// ```rust
/// let host = get_env_var("HOST", "0.0.0.0");
/// ```
pub fn get_env_var(key: &str, default: &str) -> String {
    env_var(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when it is unset
/// or does not parse.
pub fn parse_env_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env_var(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparsable environment variable");
            default
        }),
        None => default,
    }
}
