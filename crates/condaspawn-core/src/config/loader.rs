//! Environment variable loading.
//!
//! Keeps the blank-means-unset rule and `.env` handling in one place.

use std::env;
use std::path::Path;
use std::sync::Once;

/// Load `.env` from the current directory into the process environment,
/// once per process. Variables that are already set are never overridden.
pub fn load_dotenv() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        if let Ok(dir) = env::current_dir() {
            load_dotenv_from_dir(&dir);
        }
    });
}

/// Load `<dir>/.env` with the same rules as [`load_dotenv`].
pub fn load_dotenv_from_dir(dir: &Path) {
    let Ok(content) = std::fs::read_to_string(dir.join(".env")) else {
        return;
    };
    for (key, value) in parse_dotenv(&content) {
        if env::var_os(key).is_none() {
            env::set_var(key, value);
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    content.lines().filter_map(parse_dotenv_line).collect()
}

/// `KEY=value`, `KEY="quoted"`, `KEY=value # comment`.
fn parse_dotenv_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }
    let (key, raw) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let raw = raw.trim();
    let value = match raw.chars().next() {
        Some(q @ ('"' | '\'')) => raw[1..].split(q).next().unwrap_or_default(),
        _ => raw.split(" #").next().unwrap_or_default().trim_end(),
    };
    Some((key, value))
}

/// Set and non-blank, trimmed.
fn lookup(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read `key`, else `default`. Blank values count as unset.
pub fn env_or<F>(key: &str, default: F) -> String
where
    F: FnOnce() -> String,
{
    lookup(key).unwrap_or_else(default)
}

/// Read `key`; blank values are `None`.
pub fn env_optional(key: &str) -> Option<String> {
    lookup(key)
}

/// Boolean variable: `0/false/no/off` are false, anything else set is true.
pub fn env_bool(key: &str, default: bool) -> bool {
    lookup(key).map_or(default, |v| {
        let v = v.to_ascii_lowercase();
        !["0", "false", "no", "off"].contains(&v.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotenv_quotes_and_comments() {
        let content = "\
# comment
CONDASPAWN_HOME_ROOT=/srv/home   # trailing
CONDASPAWN_IPYTHON=\"/opt/conda/bin/ipython\"
EMPTY=
=novalue
CONDASPAWN_LOG_LEVEL='condaspawn=debug'
";
        let pairs = parse_dotenv(content);
        assert_eq!(
            pairs,
            vec![
                ("CONDASPAWN_HOME_ROOT", "/srv/home"),
                ("CONDASPAWN_IPYTHON", "/opt/conda/bin/ipython"),
                ("EMPTY", ""),
                ("CONDASPAWN_LOG_LEVEL", "condaspawn=debug"),
            ]
        );
    }

    #[test]
    fn test_env_bool_falsy_values() {
        let key = "CONDASPAWN_TEST_ENV_BOOL_FALSY";
        env::set_var(key, "off");
        assert!(!env_bool(key, true));
        env::set_var(key, "1");
        assert!(env_bool(key, false));
        env::remove_var(key);
        assert!(env_bool(key, true));
    }

    #[test]
    fn test_env_optional_trims_and_blank() {
        let key = "CONDASPAWN_TEST_OPTIONAL";
        env::set_var(key, " /opt/x ");
        assert_eq!(env_optional(key).as_deref(), Some("/opt/x"));
        env::set_var(key, "   ");
        assert_eq!(env_optional(key), None);
        assert_eq!(env_or(key, || "fallback".to_string()), "fallback");
        env::remove_var(key);
    }
}
