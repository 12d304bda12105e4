use std::env;
use std::path::PathBuf;

use dirs_next::{config_dir, home_dir};

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    let home = || home_dir().unwrap_or_else(|| PathBuf::from("~"));
    if trimmed == "~" {
        return home();
    }
    if let Some(rest) = trimmed.strip_prefix("~/").or_else(|| trimmed.strip_prefix("~\\")) {
        return home().join(rest);
    }
    PathBuf::from(trimmed)
}

/// Resolve a config file path: `env_var` wins when set and non-blank,
/// otherwise `<config dir>/rekog/<file_name>`.
pub fn resolve_config_path(env_var: &str, file_name: &str) -> PathBuf {
    if let Ok(path) = env::var(env_var)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rekog")
        .join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_untouched() {
        assert_eq!(expand_tilde(" /tmp/rekog.json "), PathBuf::from("/tmp/rekog.json"));
    }

    #[test]
    fn env_override_wins() {
        temp_env::with_var("REKOG_TEST_CONFIG_PATH", Some("/etc/rekog/custom.json"), || {
            assert_eq!(
                resolve_config_path("REKOG_TEST_CONFIG_PATH", "config.json"),
                PathBuf::from("/etc/rekog/custom.json")
            );
        });
    }

    #[test]
    fn blank_override_falls_back_to_config_dir() {
        temp_env::with_var("REKOG_TEST_CONFIG_PATH", Some("  "), || {
            let path = resolve_config_path("REKOG_TEST_CONFIG_PATH", "config.json");
            assert!(path.ends_with("rekog/config.json"), "unexpected path: {}", path.display());
        });
    }
}
