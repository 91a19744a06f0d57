use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

/// Flags that take a value, so their value is not mistaken for a command.
const VALUE_FLAGS: &[&str] = &["--config", "--xlsx"];

pub fn args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

/// Reads `--name=value` or `--name value`.
pub fn value_arg(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.clone());
        }
    }
    None
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// First argument that is neither a flag nor a flag's value.
pub fn command(args: &[String]) -> Option<String> {
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        return Some(arg.clone());
    }
    None
}

pub fn config_path(args: &[String]) -> PathBuf {
    value_arg(args, "--config")
        .or_else(|| std::env::var("FBK_CONFIG").ok().filter(|v| !v.trim().is_empty()))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn value_arg_accepts_both_forms() {
        assert_eq!(
            value_arg(&argv(&["--config=a.yml"]), "--config").as_deref(),
            Some("a.yml")
        );
        assert_eq!(
            value_arg(&argv(&["analyze", "--config", "b.yml"]), "--config").as_deref(),
            Some("b.yml")
        );
        assert_eq!(value_arg(&argv(&["--config"]), "--config"), None);
    }

    #[test]
    fn command_skips_flag_values() {
        assert_eq!(
            command(&argv(&["--config", "c.yml", "--fake", "download"])).as_deref(),
            Some("download")
        );
        assert_eq!(command(&argv(&["--fake"])), None);
    }

    #[test]
    fn explicit_config_path_wins() {
        assert_eq!(
            config_path(&argv(&["--config", "mine.yml"])),
            PathBuf::from("mine.yml")
        );
    }
}
