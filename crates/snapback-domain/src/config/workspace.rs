use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Workspace confinement root and persistent state layout (§6, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Defaults to the process's working directory.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// `./.snapback/` relative to `root` by default.
    #[serde(default = "d_state_dir")]
    pub state_dir: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: None,
            state_dir: d_state_dir(),
        }
    }
}

fn d_state_dir() -> String {
    ".snapback".into()
}

impl WorkspaceConfig {
    /// Resolved workspace root: configured `root`, or the process cwd.
    pub fn resolved_root(&self) -> PathBuf {
        self.root
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// `./.snapback/` under the resolved workspace root.
    pub fn state_path(&self) -> PathBuf {
        self.resolved_root().join(&self.state_dir)
    }
}
