use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const CLOUD_ENV: [&str; 5] = [
    "STRATUS_CONFIG_PATH",
    "OS_REGION_NAME",
    "OS_PROJECT_ID",
    "OS_AUTH_TOKEN",
    "OS_DOMAIN_NAME",
];

/// Isolated project directory with its own config and state
pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    /// Provider config picked up from ./.stratus/config.yaml
    #[allow(dead_code)]
    pub fn write_config(&self, content: &str) {
        let dir = self.root.path().join(".stratus");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.yaml"), content).unwrap();
    }

    pub fn write_json(&self, name: &str, value: &serde_json::Value) -> PathBuf {
        let path = self.root.path().join(name);
        fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        path
    }

    /// `stratus` running inside the project with no ambient cloud settings
    #[allow(deprecated)]
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("stratus").unwrap();
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join("xdg"))
            .env_remove("STRATUS_PROJECT")
            .env_remove("RUST_LOG");
        for key in CLOUD_ENV {
            cmd.env_remove(key);
        }
        cmd
    }
}
