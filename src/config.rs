//! Configuration loading.
//!
//! Settings come from a TOML file layered with `CARWATCH_*` environment
//! variables, where `__` separates nested keys:
//!
//! ```toml
//! [polling]
//! max_calls_per_hour = 100
//! cooldown = "15m"
//!
//! [export]
//! path = "fleet.json"
//! interval = "60s"
//!
//! [[vehicles]]
//! vin = "VF1AAAAA555777999"
//! model_id = "X071VE"
//! channels = ["battery", "cockpit", "lock"]
//! source = { kind = "replay", dir = "recordings/twingo" }
//!
//! [[defect_profiles]]
//! model_id = "X071VE"
//! battery_capacity_kwh = 22.0
//! max_charge_power_kw = 22.0
//! min_full_range_km = 170.0
//! ```
//!
//! `CARWATCH_POLLING__MAX_CALLS_PER_HOUR=50` overrides the budget above.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use carwatch_poller::{DefectProfile, PollSettings, VehicleSpec, DEFAULT_MAX_CALLS_PER_HOUR};
use carwatch_types::Channel;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::duration::parse_duration;

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "CARWATCH";

/// Everything the binary is configured with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub polling: PollingSection,
    #[serde(default)]
    pub export: ExportSection,
    #[serde(default)]
    pub vehicles: Vec<VehicleEntry>,
    #[serde(default)]
    pub defect_profiles: Vec<DefectProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingSection {
    #[serde(default = "default_max_calls")]
    pub max_calls_per_hour: u32,
    #[serde(default = "default_cooldown")]
    pub cooldown: String,
    /// Fixed interval replacing the one derived from the budget.
    #[serde(default)]
    pub interval: Option<String>,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            max_calls_per_hour: default_max_calls(),
            cooldown: default_cooldown(),
            interval: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportSection {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_export_interval")]
    pub interval: String,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            path: None,
            interval: default_export_interval(),
        }
    }
}

/// One `[[vehicles]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct VehicleEntry {
    pub vin: String,
    pub model_id: String,
    #[serde(default)]
    pub uses_fuel: bool,
    #[serde(default)]
    pub reports_charging_power_in_watts: bool,
    /// Channel names; every channel when absent.
    #[serde(default)]
    pub channels: Option<Vec<String>>,
    pub source: SourceConfig,
}

/// Where a vehicle's telemetry comes from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Recorded responses in a directory.
    Replay { dir: PathBuf },
    /// A live car adapter API.
    Http {
        endpoint: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default)]
        token: Option<String>,
        #[serde(default)]
        timeout: Option<String>,
    },
}

fn default_max_calls() -> u32 {
    DEFAULT_MAX_CALLS_PER_HOUR
}

fn default_cooldown() -> String {
    "15m".to_string()
}

fn default_export_interval() -> String {
    "60s".to_string()
}

impl Settings {
    /// Load settings from `path` and the process environment.
    ///
    /// A missing file is not an error; everything can come from the
    /// environment.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Load settings from `path`, reading overrides from `env` instead of the
    /// process environment when given.
    pub fn load_with_env(path: &Path, env: Option<HashMap<String, String>>) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(env),
            )
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;

        config
            .try_deserialize()
            .context("invalid configuration")
    }

    /// Poller settings, with configured defect profiles layered over the
    /// built-in ones.
    pub fn poll_settings(&self) -> Result<PollSettings> {
        let mut settings = PollSettings {
            max_calls_per_hour: self.polling.max_calls_per_hour,
            cooldown: parse_duration(&self.polling.cooldown).context("polling.cooldown")?,
            ..PollSettings::default()
        };

        if let Some(interval) = &self.polling.interval {
            settings.interval = Some(non_zero(interval, "polling.interval")?);
        }

        for profile in &self.defect_profiles {
            settings
                .defect_profiles
                .retain(|p| p.model_id != profile.model_id);
            settings.defect_profiles.push(profile.clone());
        }
        Ok(settings)
    }

    /// How often the read model is exported.
    pub fn export_interval(&self) -> Result<Duration> {
        non_zero(&self.export.interval, "export.interval")
    }
}

/// Parse an interval setting, which must be longer than zero.
fn non_zero(value: &str, key: &str) -> Result<Duration> {
    let interval = parse_duration(value).with_context(|| key.to_string())?;
    if interval.is_zero() {
        bail!("{key} must be longer than zero, got {value:?}");
    }
    Ok(interval)
}

impl VehicleEntry {
    /// The vehicle's identity and capabilities.
    pub fn spec(&self) -> Result<VehicleSpec> {
        let mut spec = VehicleSpec::new(&self.vin, &self.model_id)
            .uses_fuel(self.uses_fuel)
            .charging_power_in_watts(self.reports_charging_power_in_watts);

        if let Some(names) = &self.channels {
            let channels = names
                .iter()
                .map(|name| name.parse::<Channel>())
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("vehicle {}", self.vin))?;
            spec = spec.with_channels(channels);
        }
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn no_env() -> Option<HashMap<String, String>> {
        Some(HashMap::new())
    }

    const SAMPLE: &str = r#"
[polling]
max_calls_per_hour = 60
cooldown = "5m"

[export]
path = "fleet.json"

[[vehicles]]
vin = "VF1AAAAA555777999"
model_id = "X071VE"
channels = ["battery", "lock-status"]
source = { kind = "replay", dir = "recordings/twingo" }

[[vehicles]]
vin = "VF1BBBBB555777999"
model_id = "XBG1VE"
uses_fuel = true

[vehicles.source]
kind = "http"
endpoint = "https://api.example.com/car-adapter/v1"
api_key = "secret"
timeout = "5s"

[[defect_profiles]]
model_id = "X071VE"
battery_capacity_kwh = 21.0
max_charge_power_kw = 11.0
min_full_range_km = 150.0
"#;

    #[test]
    fn test_load_full_file() {
        let file = write_config(SAMPLE);
        let settings = Settings::load_with_env(file.path(), no_env()).unwrap();

        assert_eq!(settings.polling.max_calls_per_hour, 60);
        assert_eq!(settings.export.path, Some(PathBuf::from("fleet.json")));
        assert_eq!(settings.export_interval().unwrap(), Duration::from_secs(60));
        assert_eq!(settings.vehicles.len(), 2);
        assert_eq!(
            settings.vehicles[0].source,
            SourceConfig::Replay {
                dir: PathBuf::from("recordings/twingo")
            }
        );
        assert!(matches!(
            &settings.vehicles[1].source,
            SourceConfig::Http { api_key: Some(key), .. } if key == "secret"
        ));
    }

    #[test]
    fn test_vehicle_spec_channels() {
        let file = write_config(SAMPLE);
        let settings = Settings::load_with_env(file.path(), no_env()).unwrap();

        let twingo = settings.vehicles[0].spec().unwrap();
        assert_eq!(twingo.channels, vec![Channel::Battery, Channel::Lock]);

        let hybrid = settings.vehicles[1].spec().unwrap();
        assert!(hybrid.uses_fuel);
        assert_eq!(hybrid.channels.len(), Channel::ALL.len());
    }

    #[test]
    fn test_unknown_channel_is_rejected() {
        let entry = VehicleEntry {
            vin: "VF1".into(),
            model_id: "X071VE".into(),
            uses_fuel: false,
            reports_charging_power_in_watts: false,
            channels: Some(vec!["tyres".into()]),
            source: SourceConfig::Replay { dir: "x".into() },
        };
        assert!(entry.spec().is_err());
    }

    #[test]
    fn test_poll_settings_replace_builtin_profile() {
        let file = write_config(SAMPLE);
        let settings = Settings::load_with_env(file.path(), no_env()).unwrap();
        let poll = settings.poll_settings().unwrap();

        assert_eq!(poll.cooldown, Duration::from_secs(300));
        assert_eq!(poll.interval, None);
        assert_eq!(poll.defect_profiles.len(), 1);
        assert_eq!(poll.defect_profiles[0].max_charge_power_kw, 11.0);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings =
            Settings::load_with_env(&dir.path().join("absent.toml"), no_env()).unwrap();

        assert!(settings.vehicles.is_empty());
        let poll = settings.poll_settings().unwrap();
        assert_eq!(poll.max_calls_per_hour, 100);
        assert_eq!(poll.cooldown, Duration::from_secs(900));
        assert_eq!(poll.defect_profiles, vec![DefectProfile::twingo_iii()]);
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_config(SAMPLE);
        let env = HashMap::from([
            (
                "CARWATCH_POLLING__MAX_CALLS_PER_HOUR".to_string(),
                "30".to_string(),
            ),
            ("CARWATCH_POLLING__INTERVAL".to_string(), "10m".to_string()),
        ]);
        let settings = Settings::load_with_env(file.path(), Some(env)).unwrap();
        let poll = settings.poll_settings().unwrap();

        assert_eq!(poll.max_calls_per_hour, 30);
        assert_eq!(poll.interval, Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_zero_intervals_are_rejected() {
        let file = write_config("[polling]\ninterval = \"0s\"\n\n[export]\ninterval = \"0.1ns\"\n");
        let settings = Settings::load_with_env(file.path(), no_env()).unwrap();

        let err = settings.poll_settings().unwrap_err();
        assert!(err.to_string().contains("polling.interval"));
        let err = settings.export_interval().unwrap_err();
        assert!(err.to_string().contains("export.interval"));
    }

    #[test]
    fn test_bad_duration_is_reported() {
        let file = write_config("[polling]\ncooldown = \"soon\"\n");
        let settings = Settings::load_with_env(file.path(), no_env()).unwrap();
        let err = settings.poll_settings().unwrap_err();
        assert!(format!("{err:#}").contains("polling.cooldown"));
    }
}
