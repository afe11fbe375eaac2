use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Controller configuration.
///
/// Every field has a default matching the behavior of the drives we run in
/// the lab, so an empty YAML document is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// CAN interface name handed to the link backend.
    #[serde(default = "default_interface")]
    pub interface: String,
    /// Sleep between axis-state polls while waiting for idle.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound on each wait-for-idle during calibration. `0` waits
    /// forever.
    #[serde(default = "default_calibration_timeout_ms")]
    pub calibration_timeout_ms: u64,
    /// Upper bound on a single telemetry read.
    #[serde(default = "default_recv_timeout_ms")]
    pub recv_timeout_ms: u64,
    /// When set, `set_input_torque` rejects setpoints with magnitude above
    /// this, in Nm.
    #[serde(default)]
    pub torque_limit_nm: Option<f32>,
    #[serde(default)]
    pub filter: FilterConfig,
}

/// Low-pass filter parameters for the filtered telemetry accessors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_cutoff_hz")]
    pub cutoff_hz: f32,
    #[serde(default = "default_sample_hz")]
    pub sample_hz: f32,
}

fn default_interface() -> String {
    "can0".to_string()
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_calibration_timeout_ms() -> u64 {
    30_000
}

fn default_recv_timeout_ms() -> u64 {
    200
}

fn default_cutoff_hz() -> f32 {
    200.0
}

fn default_sample_hz() -> f32 {
    1000.0
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            poll_interval_ms: default_poll_interval_ms(),
            calibration_timeout_ms: default_calibration_timeout_ms(),
            recv_timeout_ms: default_recv_timeout_ms(),
            torque_limit_nm: None,
            filter: FilterConfig::default(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            cutoff_hz: default_cutoff_hz(),
            sample_hz: default_sample_hz(),
        }
    }
}

impl DriveConfig {
    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(raw).context("decoding drive config")
    }
}

pub fn load_config_file(path: impl AsRef<Path>) -> anyhow::Result<DriveConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading drive config: {}", path.display()))?;
    DriveConfig::from_yaml_str(&raw).with_context(|| format!("parsing: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_original_rig() {
        let config = DriveConfig::default();
        assert_eq!(config.interface, "can0");
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.calibration_timeout_ms, 30_000);
        assert!(config.torque_limit_nm.is_none());
        assert_eq!(config.filter.cutoff_hz, 200.0);
        assert_eq!(config.filter.sample_hz, 1000.0);
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let config = DriveConfig::from_yaml_str(
            "interface: can1\ntorque_limit_nm: 2.5\nfilter:\n  cutoff_hz: 50.0\n",
        )
        .unwrap();
        assert_eq!(config.interface, "can1");
        assert_eq!(config.torque_limit_nm, Some(2.5));
        assert_eq!(config.filter.cutoff_hz, 50.0);
        // untouched fields keep defaults
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.filter.sample_hz, 1000.0);
    }

    #[test]
    fn rejects_malformed_yaml() {
        assert!(DriveConfig::from_yaml_str("interface: [oops").is_err());
    }
}
