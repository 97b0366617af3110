use std::path::Path;
use std::time::Duration;

use sensorlink_core::Dialect;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_COMMAND_QUEUE_DEPTH: usize = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("the {0} dialect has no default device name; set device_name")]
    MissingDeviceName(Dialect),
    #[error("max_frame_len {max_frame_len} is below the {dialect} sample length {sample_len}")]
    MaxFrameLenTooSmall {
        dialect: Dialect,
        max_frame_len: u8,
        sample_len: usize,
    },
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub dialect: Dialect,
    /// Advertised name to connect to. Defaults to the dialect's peer name.
    pub device_name: Option<String>,
    /// How long a scan runs without a match before returning to idle.
    #[serde(with = "humantime_serde")]
    pub scan_timeout: Duration,
    /// Commands that may wait behind the one in flight.
    pub command_queue_depth: usize,
    /// Overrides the dialect's maximum declared frame length.
    pub max_frame_len: Option<u8>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::for_dialect(Dialect::Environmental)
    }
}

impl SessionConfig {
    pub fn for_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            device_name: None,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            command_queue_depth: DEFAULT_COMMAND_QUEUE_DEPTH,
            max_frame_len: None,
        }
    }

    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_queue_depth == 0 {
            return Err(ConfigError::Invalid("command_queue_depth must be at least 1"));
        }
        if self.scan_timeout.is_zero() {
            return Err(ConfigError::Invalid("scan_timeout must be non-zero"));
        }
        if self.max_frame_len == Some(0) {
            return Err(ConfigError::Invalid("max_frame_len must be non-zero"));
        }
        if let (Some(max_frame_len), Some(sample_len)) =
            (self.max_frame_len, self.dialect.sample_len())
        {
            if usize::from(max_frame_len) < sample_len {
                return Err(ConfigError::MaxFrameLenTooSmall {
                    dialect: self.dialect,
                    max_frame_len,
                    sample_len,
                });
            }
        }
        if self.expected_device_name().is_none() {
            return Err(ConfigError::MissingDeviceName(self.dialect));
        }
        Ok(())
    }

    /// Name a discovered device must advertise to be connected.
    pub fn expected_device_name(&self) -> Option<&str> {
        self.device_name.as_deref().or(self.dialect.default_device_name())
    }

    pub fn effective_max_frame_len(&self) -> u8 {
        self.max_frame_len.unwrap_or_else(|| self.dialect.max_frame_len())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{ConfigError, SessionConfig};
    use sensorlink_core::Dialect;

    #[test]
    fn defaults_match_the_stock_peers() {
        let cfg = SessionConfig::for_dialect(Dialect::Particulate);
        assert_eq!(cfg.scan_timeout, Duration::from_secs(5));
        assert_eq!(cfg.command_queue_depth, 8);
        assert_eq!(cfg.expected_device_name(), Some("Peripheral SPS30 BLE"));
        assert_eq!(cfg.effective_max_frame_len(), 64);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn toml_overrides_are_applied() {
        let cfg = SessionConfig::from_toml_str(
            r#"
            dialect = "generic_io"
            device_name = "Bench IO"
            scan_timeout = "750ms"
            command_queue_depth = 2
            "#,
        )
        .expect("config should parse");
        assert_eq!(cfg.dialect, Dialect::GenericIo);
        assert_eq!(cfg.expected_device_name(), Some("Bench IO"));
        assert_eq!(cfg.scan_timeout, Duration::from_millis(750));
        assert_eq!(cfg.command_queue_depth, 2);
    }

    #[test]
    fn generic_io_requires_a_device_name() {
        let err = SessionConfig::for_dialect(Dialect::GenericIo)
            .validate()
            .expect_err("no default i/o name");
        assert!(matches!(err, ConfigError::MissingDeviceName(Dialect::GenericIo)));
        assert!(SessionConfig::for_dialect(Dialect::GenericIo)
            .with_device_name("IO")
            .validate()
            .is_ok());
    }

    #[test]
    fn zero_values_are_rejected() {
        let cfg = SessionConfig {
            command_queue_depth: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        let err = SessionConfig::from_toml_str("scan_timeout = \"0s\"").expect_err("zero timeout");
        assert_eq!(
            err.to_string(),
            "invalid config: scan_timeout must be non-zero"
        );
    }

    #[test]
    fn frame_bound_below_the_sample_length_is_rejected() {
        let err = SessionConfig::from_toml_str("max_frame_len = 10").expect_err("too small");
        assert!(matches!(
            err,
            ConfigError::MaxFrameLenTooSmall {
                dialect: Dialect::Environmental,
                max_frame_len: 10,
                sample_len: 18,
            }
        ));
        assert_eq!(
            err.to_string(),
            "max_frame_len 10 is below the environmental sample length 18"
        );

        let cfg = SessionConfig::from_toml_str("dialect = \"particulate\"\nmax_frame_len = 41")
            .expect("exact sample length fits");
        assert_eq!(cfg.effective_max_frame_len(), 41);
    }

    #[test]
    fn unknown_keys_and_bad_durations_fail_to_parse() {
        assert!(matches!(
            SessionConfig::from_toml_str("scan_timout = \"5s\""),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            SessionConfig::from_toml_str("scan_timeout = \"soon\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn load_reads_a_file() {
        let path =
            std::env::temp_dir().join(format!("sensorlink-config-{}.toml", std::process::id()));
        std::fs::write(&path, "dialect = \"particulate\"\n").expect("write temp config");
        let cfg = SessionConfig::load(&path).expect("config should load");
        let _ = std::fs::remove_file(&path);
        assert_eq!(cfg.dialect, Dialect::Particulate);

        assert!(matches!(
            SessionConfig::load(path.with_extension("missing")),
            Err(ConfigError::Io(_))
        ));
    }
}
