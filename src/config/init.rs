// ABOUTME: Profile scaffolding.
// ABOUTME: Creates a remexec.yml template in a directory.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, Target};

/// Write a profile template to `dir`, returning its path.
pub fn init_profile(dir: &Path, target: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let target = match target {
        Some(t) => Target::parse(t).map_err(Error::InvalidConfig)?,
        None => Target {
            host: "server.example.com".to_string(),
            port: None,
            user: None,
        },
    };

    std::fs::write(&config_path, generate_template_yaml(&target))?;
    Ok(config_path)
}

fn generate_template_yaml(target: &Target) -> String {
    format!(
        r#"host: {}
port: {}
user: {}
# Private key path. Takes precedence over password when both are set.
identity: ~/.ssh/id_ed25519
# Or a password, read from the environment:
# password:
#   env: REMEXEC_PASSWORD
# Split output on complete lines (buffered) or per raw read (per-read)
# line_mode: buffered
# connect_timeout: 10s
# working_path: /var/log
"#,
        target.host,
        target.port.unwrap_or(22),
        target.user.as_deref().unwrap_or("root"),
    )
}
