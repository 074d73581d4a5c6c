use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

const DEFAULT_CONFIG_NAME: &str = "teams-notify.toml";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable that overrides every other webhook source.
pub const WEBHOOK_ENV: &str = "MSTEAMS_WEBHOOK";

/// Defaults read from `teams-notify.toml`.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub webhook_url: Option<String>,
    pub title: Option<String>,
    pub msteams_emails: Option<String>,
    /// Request timeout for the webhook call
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from an explicit path, or search upward from the
    /// current dir and then the user config dir. No file means defaults.
    pub fn load(path_override: Option<PathBuf>) -> Result<Self> {
        let path = match path_override {
            Some(p) => p,
            None => match find_upwards(DEFAULT_CONFIG_NAME).or_else(user_config_path) {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Reading config file {}", path.display()))?;
        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Parsing TOML config {}", path.display()))?;
        if cfg.timeout_secs == Some(0) {
            bail!("timeout_secs must be greater than zero in {}", path.display());
        }
        Ok(cfg)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Resolve the webhook URL: `MSTEAMS_WEBHOOK`, then the CLI/action
    /// input, then this file. Blank values are skipped.
    pub fn webhook_url<F>(&self, input: Option<&str>, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        [
            lookup(WEBHOOK_ENV),
            input.map(str::to_owned),
            self.webhook_url.clone(),
        ]
        .into_iter()
        .flatten()
        .find(|u| !u.trim().is_empty())
    }
}

fn find_upwards(file_name: &str) -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        let candidate = dir.join(file_name);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

fn user_config_path() -> Option<PathBuf> {
    let candidate = dirs::config_dir()?.join("teams-notify").join("config.toml");
    candidate.exists().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_config_success() {
        let toml = r#"webhook_url = "https://example.webhook.office.com/abc"
title = "Nightly"
timeout_secs = 5
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let cfg = Config::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.title.as_deref(), Some("Nightly"));
        assert_eq!(cfg.timeout(), Duration::from_secs(5));
        assert_eq!(cfg.msteams_emails, None);
    }

    #[test]
    fn missing_explicit_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(Some(dir.path().join("nope.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn unknown_keys_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"webhook = \"typo\"\n").unwrap();
        assert!(Config::load(Some(file.path().to_path_buf())).is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"timeout_secs = 0\n").unwrap();
        let err = Config::load(Some(file.path().to_path_buf())).unwrap_err();
        assert!(err.to_string().starts_with("timeout_secs must be greater than zero"));
    }

    #[test]
    fn default_timeout() {
        assert_eq!(Config::default().timeout(), Duration::from_secs(30));
    }

    #[test]
    fn webhook_precedence() {
        let cfg = Config {
            webhook_url: Some("from-file".into()),
            ..Default::default()
        };
        let env = |name: &str| (name == WEBHOOK_ENV).then(|| "from-env".to_string());
        let no_env = |_: &str| None;
        let blank_env = |_: &str| Some(String::new());

        assert_eq!(cfg.webhook_url(Some("from-input"), env).as_deref(), Some("from-env"));
        assert_eq!(cfg.webhook_url(Some("from-input"), no_env).as_deref(), Some("from-input"));
        assert_eq!(cfg.webhook_url(Some("from-input"), blank_env).as_deref(), Some("from-input"));
        assert_eq!(cfg.webhook_url(Some(""), blank_env).as_deref(), Some("from-file"));
        assert_eq!(Config::default().webhook_url(None, no_env), None);
    }
}
