//! Snapshot persistence for funnel flows.
//!
//! Mirrors what the web client keeps in localStorage: one JSON document per
//! flow under the configured state directory. Loading tolerates a missing
//! file (fresh flow) and leaves schema repair to `FlowState::from_snapshot`.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::flow::state::FlowSnapshot;

/// Snapshot name for the registration flow.
pub const REGISTRATION: &str = "registration";
/// Snapshot name for the onboarding flow.
pub const ONBOARDING: &str = "onboarding";

pub struct FlowStore {
    dir: PathBuf,
}

impl FlowStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).context("Failed to create flow state directory")?;
        Ok(Self { dir })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Load a persisted snapshot, or `None` when the flow has no saved state.
    pub fn load(&self, name: &str) -> Result<Option<FlowSnapshot>> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).context("Failed to read flow snapshot")?;
        let snapshot =
            serde_json::from_str(&contents).context("Failed to parse flow snapshot")?;
        Ok(Some(snapshot))
    }

    pub fn save(&self, name: &str, snapshot: &FlowSnapshot) -> Result<()> {
        let contents = serde_json::to_string_pretty(snapshot)?;
        fs::write(self.path(name), contents).context("Failed to write flow snapshot")?;
        Ok(())
    }

    /// Remove the mirrored copy; called when a flow is reset or abandoned.
    pub fn clear(&self, name: &str) -> Result<()> {
        let path = self.path(name);
        if path.exists() {
            fs::remove_file(&path).context("Failed to remove flow snapshot")?;
        }
        Ok(())
    }
}
