use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PpoParams;
use crate::error::RlError;

pub const CHECKPOINT_VERSION: u32 = 1;

/// Saved training state. Written as pretty JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub algorithm: String,
    pub policy: String,
    pub num_timesteps: usize,
    pub params: PpoParams,
    pub policy_state: serde_json::Value,
    pub saved_at: String,
}

impl Checkpoint {
    /// Writes the checkpoint, creating parent directories. `.json` is appended
    /// unless the path already ends in it, so `ppo.v2_final` becomes
    /// `ppo.v2_final.json`. Returns the path written.
    ///
    /// # Errors
    /// Returns [`RlError`] on serialisation or filesystem failure.
    pub fn save(&self, path: &Path) -> Result<PathBuf, RlError> {
        let path = if path.extension().is_some_and(|ext| ext == "json") {
            path.to_path_buf()
        } else {
            let mut name = path.as_os_str().to_owned();
            name.push(".json");
            PathBuf::from(name)
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| RlError::io(parent, e))?;
        }
        let body = serde_json::to_string_pretty(self)?;
        fs::write(&path, body).map_err(|e| RlError::io(&path, e))?;
        info!(path = %path.display(), timesteps = self.num_timesteps, "checkpoint saved");
        Ok(path)
    }

    /// # Errors
    /// Returns [`RlError`] if the file is missing or malformed.
    pub fn load(path: &Path) -> Result<Self, RlError> {
        let body = fs::read_to_string(path).map_err(|e| RlError::io(path, e))?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_appends_extension_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = Checkpoint {
            version: CHECKPOINT_VERSION,
            algorithm: "PPO".into(),
            policy: "random".into(),
            num_timesteps: 42,
            params: PpoParams::default(),
            policy_state: serde_json::json!({ "seed": 1 }),
            saved_at: "2024-01-01T00:00:00Z".into(),
        };
        let written = checkpoint.save(&dir.path().join("models/final")).unwrap();
        assert_eq!(written, dir.path().join("models/final.json"));
        assert_eq!(Checkpoint::load(&written).unwrap(), checkpoint);

        let dotted = checkpoint.save(&dir.path().join("models/ppo.v2_final")).unwrap();
        assert_eq!(dotted, dir.path().join("models/ppo.v2_final.json"));
        let explicit = checkpoint.save(&dir.path().join("models/named.json")).unwrap();
        assert_eq!(explicit, dir.path().join("models/named.json"));
    }
}
