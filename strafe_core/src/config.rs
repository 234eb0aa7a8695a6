use serde::Deserialize;
use std::path::PathBuf;

/// Canonical well-formed request used as the fitness reference target.
pub const DEFAULT_TARGET_REQUEST: &str =
    "GET / HTTP/1.1\r\nHost: localhost\r\nUser-Agent: Firefox\r\nAccept: */*\r\n";

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct FuzzerSettings {
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    #[serde(default = "default_max_generations")]
    pub max_generations: u64,
    #[serde(default = "default_target_request")]
    pub target_request: String,
}

pub fn default_population_size() -> usize {
    20
}
pub fn default_max_generations() -> u64 {
    1_000_000
}
fn default_target_request() -> String {
    DEFAULT_TARGET_REQUEST.to_string()
}

impl Default for FuzzerSettings {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            max_generations: default_max_generations(),
            target_request: default_target_request(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct TargetSettings {
    pub address: String,
    pub port: u16,
    /// Identifier the crash-event feed is filtered on.
    #[serde(default = "default_target_name")]
    pub name: String,
}

fn default_target_name() -> String {
    "http_server".to_string()
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct BufferSettings {
    #[serde(default = "default_buffer_capacity")]
    pub capacity: usize,
    #[serde(default = "default_retention_window_secs")]
    pub retention_window_secs: i64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
}

pub fn default_buffer_capacity() -> usize {
    10
}
pub fn default_retention_window_secs() -> i64 {
    10
}
pub fn default_poll_interval_ms() -> u64 {
    100
}
pub fn default_report_path() -> PathBuf {
    PathBuf::from("./crashes.log")
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            capacity: default_buffer_capacity(),
            retention_window_secs: default_retention_window_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            report_path: default_report_path(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct StrafeConfig {
    #[serde(default)]
    pub fuzzer: Option<FuzzerSettings>,
    pub target: TargetSettings,
    #[serde(default)]
    pub buffer: Option<BufferSettings>,
}

impl StrafeConfig {
    pub fn load_from_file(path: &PathBuf) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        let config: StrafeConfig = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })?;

        Ok(config)
    }

    pub fn fuzzer_settings(&self) -> FuzzerSettings {
        self.fuzzer.clone().unwrap_or_default()
    }

    pub fn buffer_settings(&self) -> BufferSettings {
        self.buffer.clone().unwrap_or_default()
    }
}

impl Default for StrafeConfig {
    fn default() -> Self {
        Self {
            fuzzer: Some(FuzzerSettings::default()),
            target: TargetSettings {
                address: "127.0.0.1".to_string(),
                port: 8080,
                name: default_target_name(),
            },
            buffer: Some(BufferSettings::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_applies_defaults() {
        let config: StrafeConfig = toml::from_str(
            r#"
            [target]
            address = "10.0.0.5"
            port = 8080
            "#,
        )
        .unwrap();

        assert_eq!(config.target.address, "10.0.0.5");
        assert_eq!(config.target.name, "http_server");

        let fuzzer = config.fuzzer_settings();
        assert_eq!(fuzzer.population_size, 20);
        assert_eq!(fuzzer.target_request, DEFAULT_TARGET_REQUEST);

        let buffer = config.buffer_settings();
        assert_eq!(buffer.capacity, 10);
        assert_eq!(buffer.retention_window_secs, 10);
        assert_eq!(buffer.poll_interval_ms, 100);
    }

    #[test]
    fn full_config_overrides_defaults() {
        let config: StrafeConfig = toml::from_str(
            r#"
            [fuzzer]
            population-size = 8
            max-generations = 42
            target-request = "GET /x HTTP/1.0\r\n"

            [target]
            address = "fuzz-target"
            port = 21
            name = "ftp_server"

            [buffer]
            capacity = 3
            retention-window-secs = 100
            poll-interval-ms = 250
            report-path = "/tmp/crashes.log"
            "#,
        )
        .unwrap();

        let fuzzer = config.fuzzer_settings();
        assert_eq!(fuzzer.population_size, 8);
        assert_eq!(fuzzer.max_generations, 42);
        assert_eq!(config.target.name, "ftp_server");
        assert_eq!(config.buffer_settings().capacity, 3);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<StrafeConfig, _> = toml::from_str(
            r#"
            [target]
            address = "x"
            port = 1
            bogus = true
            "#,
        );
        assert!(result.is_err());
    }
}
