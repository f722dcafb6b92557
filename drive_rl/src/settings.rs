//! Process-wide settings.
//!
//! One optional JSON file with six sections. Every field has a default, so
//! `{}` is a valid file; unknown keys are rejected so typos surface early.
//!
//! ```json
//! {
//!   "model": { "learning_rate": 0.0003, "n_steps": 2048, "batch_size": 64 },
//!   "env": { "target_speed": 20.0, "goal": [400.0, 0.0, 0.5] },
//!   "paths": { "model_dir": "models/", "log_dir": "logs/" },
//!   "client": { "host": "localhost", "port": 2000, "timeout_secs": 10.0 },
//!   "simulator": { "lanes": 3, "lane_width": 3.5, "tick_mode": { "mode": "on_control" } },
//!   "training": { "total_timesteps": 100000, "run_name": "carla_ppo" }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use driving::EnvConfig;
use rl::PpoParams;
use serde::{Deserialize, Serialize};
use sim::{ClientConfig, HeadlessConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Paths {
    pub model_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self { model_dir: PathBuf::from("models/"), log_dir: PathBuf::from("logs/") }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingSettings {
    pub total_timesteps: usize,
    /// Prefix of the saved model file.
    pub run_name: String,
    pub seed: u64,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self { total_timesteps: 100_000, run_name: "carla_ppo".to_owned(), seed: 0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub model: PpoParams,
    pub env: EnvConfig,
    pub paths: Paths,
    pub client: ClientConfig,
    /// World used by the in-process simulator backend.
    pub simulator: HeadlessConfig,
    pub training: TrainingSettings,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub total_timesteps: Option<usize>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub seed: Option<u64>,
    pub run_name: Option<String>,
}

impl Settings {
    /// # Errors
    /// Fails if the file cannot be read or is not valid settings JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing settings file {}", path.display()))
    }

    /// Defaults when `path` is `None`.
    ///
    /// # Errors
    /// See [`load`](Self::load).
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(total) = overrides.total_timesteps {
            self.training.total_timesteps = total;
        }
        if let Some(host) = &overrides.host {
            self.client.host.clone_from(host);
        }
        if let Some(port) = overrides.port {
            self.client.port = port;
        }
        if let Some(seed) = overrides.seed {
            self.training.seed = seed;
        }
        if let Some(name) = &overrides.run_name {
            self.training.run_name.clone_from(name);
        }
    }

    /// # Errors
    /// Names the first invalid section or field.
    pub fn validate(&self) -> Result<()> {
        self.model.validate().context("model settings")?;
        self.env.validate().context("env settings")?;
        self.simulator.validate().context("simulator settings")?;
        if self.training.total_timesteps == 0 {
            bail!("training.total_timesteps must be > 0");
        }
        if self.training.run_name.trim().is_empty() {
            bail!("training.run_name must not be empty");
        }
        Ok(())
    }

    /// `<model_dir>/<run_name>_final.json`.
    #[must_use]
    pub fn final_model_path(&self) -> PathBuf {
        self.paths.model_dir.join(format!("{}_final.json", self.training.run_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_reference_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.model.n_steps, 2048);
        assert_eq!(settings.training.total_timesteps, 100_000);
        assert_eq!(settings.client.port, 2000);
        assert_eq!(settings.final_model_path(), PathBuf::from("models/carla_ppo_final.json"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn unknown_sections_are_rejected() {
        assert!(serde_json::from_str::<Settings>(r#"{"modle": {}}"#).is_err());
        assert!(serde_json::from_str::<Settings>(r#"{"paths": {"models": "x"}}"#).is_err());
    }

    #[test]
    fn misspelled_keys_in_any_section_are_rejected() {
        for text in [
            r#"{"env": {"target_sped": 5.0}}"#,
            r#"{"client": {"prot": 1}}"#,
            r#"{"simulator": {"lane_widht": 2.0}}"#,
            r#"{"simulator": {"obstacles": [{"location": [1.0, 0.0, 0.0], "radius": 1.0, "hieght": 2.0}]}}"#,
        ] {
            assert!(serde_json::from_str::<Settings>(text).is_err(), "{text} was accepted");
        }
        let settings: Settings = serde_json::from_str(r#"{"env": {"target_speed": 5.0}}"#).unwrap();
        assert_eq!(settings.env.params.target_speed, 5.0);
    }

    #[test]
    fn simulator_section_is_validated() {
        let mut settings = Settings::default();
        settings.simulator.wheelbase = 0.0;
        let err = settings.validate().unwrap_err();
        assert!(format!("{err:#}").starts_with("simulator settings"));
        assert!(format!("{err:#}").contains("wheelbase"));
    }

    #[test]
    fn dotted_run_names_keep_the_json_extension() {
        let mut settings = Settings::default();
        settings.training.run_name = "ppo.v2".to_owned();
        assert_eq!(settings.final_model_path(), PathBuf::from("models/ppo.v2_final.json"));
    }

    #[test]
    fn overrides_win() {
        let mut settings = Settings::default();
        settings.apply(&Overrides {
            total_timesteps: Some(64),
            host: Some("sim-host".into()),
            port: Some(2010),
            seed: None,
            run_name: None,
        });
        assert_eq!(settings.training.total_timesteps, 64);
        assert_eq!(settings.client.host, "sim-host");
        assert_eq!(settings.client.port, 2010);
        assert_eq!(settings.training.seed, 0);
    }

    #[test]
    fn validation_reports_section() {
        let mut settings = Settings::default();
        settings.model.batch_size = 0;
        let err = settings.validate().unwrap_err();
        assert!(format!("{err:#}").starts_with("model settings"));
    }
}
