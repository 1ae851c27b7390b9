use std::path::{Path, PathBuf};
use std::time::Duration;

use parlor_memcache::LayoutKind;
use serde::{Deserialize, Serialize};

use crate::error::{ParlorError, ParlorResult};

/// Longest credential lifetime a configuration may ask for: ten years.
pub const MAX_CREDENTIAL_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Runtime settings, usually read from a `parlor.toml`.
///
/// Every field has a default, so an empty file is a valid configuration:
///
/// ```toml
/// data_dir = "/var/lib/parlor"
/// layout = "collections"
/// credential_ttl_secs = 86400
/// token_length = 32
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParlorConfig {
    /// Datastore root. `None` keeps all state in memory.
    pub data_dir: Option<PathBuf>,
    pub layout: LayoutKind,
    pub credential_ttl_secs: u64,
    pub token_length: usize,
}

impl Default for ParlorConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            layout: LayoutKind::Collections,
            credential_ttl_secs: 24 * 60 * 60,
            token_length: 32,
        }
    }
}

impl ParlorConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> ParlorResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> ParlorResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ParlorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> ParlorResult<()> {
        if self.token_length == 0 {
            return Err(ParlorError::Config("token_length must be at least 1".into()));
        }
        if self.credential_ttl_secs == 0 {
            return Err(ParlorError::Config(
                "credential_ttl_secs must be at least 1".into(),
            ));
        }
        if self.credential_ttl_secs > MAX_CREDENTIAL_TTL_SECS {
            return Err(ParlorError::Config(format!(
                "credential_ttl_secs must be at most {MAX_CREDENTIAL_TTL_SECS}"
            )));
        }
        Ok(())
    }

    pub fn credential_ttl(&self) -> Duration {
        Duration::from_secs(self.credential_ttl_secs)
    }

    pub fn to_toml_string(&self) -> ParlorResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ParlorConfig::default();
        assert!(c.data_dir.is_none());
        assert_eq!(c.layout, LayoutKind::Collections);
        assert_eq!(c.credential_ttl(), Duration::from_secs(86400));
        assert_eq!(c.token_length, 32);
        c.validate().unwrap();
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(ParlorConfig::from_toml_str("").unwrap(), ParlorConfig::default());
    }

    #[test]
    fn parses_all_fields() {
        let c = ParlorConfig::from_toml_str(
            r#"
            data_dir = "/tmp/parlor"
            layout = "documents"
            credential_ttl_secs = 60
            token_length = 48
            "#,
        )
        .unwrap();
        assert_eq!(c.data_dir, Some(PathBuf::from("/tmp/parlor")));
        assert_eq!(c.layout, LayoutKind::Documents);
        assert_eq!(c.credential_ttl_secs, 60);
        assert_eq!(c.token_length, 48);
    }

    #[test]
    fn rejects_zero_token_length() {
        let err = ParlorConfig::from_toml_str("token_length = 0").unwrap_err();
        assert!(matches!(err, ParlorError::Config(_)));
    }

    #[test]
    fn rejects_zero_ttl() {
        let err = ParlorConfig::from_toml_str("credential_ttl_secs = 0").unwrap_err();
        assert!(matches!(err, ParlorError::Config(_)));
    }

    #[test]
    fn rejects_ttl_beyond_ten_years() {
        let err = ParlorConfig::from_toml_str("credential_ttl_secs = 9223372036854775807")
            .unwrap_err();
        assert!(matches!(err, ParlorError::Config(_)));

        let at_limit = format!("credential_ttl_secs = {MAX_CREDENTIAL_TTL_SECS}");
        assert!(ParlorConfig::from_toml_str(&at_limit).is_ok());
    }

    #[test]
    fn rejects_unknown_layout_and_fields() {
        assert!(matches!(
            ParlorConfig::from_toml_str(r#"layout = "flat""#),
            Err(ParlorError::ParseConfig(_))
        ));
        assert!(matches!(
            ParlorConfig::from_toml_str("bind = 1"),
            Err(ParlorError::ParseConfig(_))
        ));
    }

    #[test]
    fn toml_round_trip() {
        let c = ParlorConfig {
            data_dir: Some(PathBuf::from("state")),
            layout: LayoutKind::Documents,
            ..ParlorConfig::default()
        };
        let text = c.to_toml_string().unwrap();
        assert_eq!(ParlorConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn load_reports_missing_file_path() {
        let err = ParlorConfig::load("/nonexistent/parlor.toml").unwrap_err();
        match err {
            ParlorError::Io { path, .. } => assert_eq!(path, PathBuf::from("/nonexistent/parlor.toml")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
