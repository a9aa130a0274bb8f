use serde::{Deserialize, Serialize};

pub const DEFAULT_HOME_DIR: &str = "/home/ec2-user";
pub const DEFAULT_ACTIVATION_DIR: &str = "/usr/local/bin";
pub const DEFAULT_ACTIVATION_OWNER: &str = "root:root";

const LANDING_DIR_NAME: &str = "bin";
const BACKUP_DIR_NAME: &str = "bin.old";
/// Hidden directory under `bin/` holding extraction scratch space. Artifact
/// names starting with `.` are rejected, so nothing can land here.
const SCRATCH_DIR_NAME: &str = ".extract";

/// Remote directory layout used by a run.
///
/// `bin/` under the home directory receives transferred artifacts and
/// extraction scratch space, `bin.old/` keeps displaced binaries, and the
/// activation directory is where installed binaries are run from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteWorkspace {
    pub home_dir: String,
    pub activation_dir: String,
    /// `owner:group` applied to activated binaries; `None` skips `chown`.
    pub activation_owner: Option<String>,
}

impl Default for RemoteWorkspace {
    fn default() -> Self {
        Self {
            home_dir: DEFAULT_HOME_DIR.to_string(),
            activation_dir: DEFAULT_ACTIVATION_DIR.to_string(),
            activation_owner: Some(DEFAULT_ACTIVATION_OWNER.to_string()),
        }
    }
}

impl RemoteWorkspace {
    pub fn new(home_dir: impl Into<String>, activation_dir: impl Into<String>) -> Self {
        Self {
            home_dir: home_dir.into(),
            activation_dir: activation_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_activation_owner(mut self, owner: Option<String>) -> Self {
        self.activation_owner = owner;
        self
    }

    pub fn landing_dir(&self) -> String {
        join_remote(&self.home_dir, LANDING_DIR_NAME)
    }

    pub fn backup_dir(&self) -> String {
        join_remote(&self.home_dir, BACKUP_DIR_NAME)
    }

    /// Where an artifact with the given file name lands.
    pub fn landed_path(&self, file_name: &str) -> String {
        join_remote(&self.landing_dir(), file_name)
    }

    pub fn scratch_dir(&self) -> String {
        join_remote(&self.landing_dir(), SCRATCH_DIR_NAME)
    }

    /// Scratch directory an archive with the given stem is extracted into.
    pub fn extract_dir(&self, stem: &str) -> String {
        join_remote(&self.scratch_dir(), stem)
    }
}

/// Join two POSIX path components without doubling the separator.
pub fn join_remote(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}
