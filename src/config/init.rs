// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates a commented slipway.yml template.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

const TEMPLATE: &str = r#"# Target host, as "user@host:port" or a mapping.
server:
  host: server.example.com
  port: 22
  user: deploy
  private_key: ~/.ssh/id_ed25519
  # passphrase: { env: SLIPWAY_KEY_PASSPHRASE }
  # password: { env: SLIPWAY_PASSWORD }
  # proxy: deploy@bastion.example.com:22
  # SSH host key verification: trust unknown hosts on first connection
  # trust_first_connection: true

deploy_path: /srv/app
local_path: build
# current_symlink: current
# keep: 5

# before_deploy: npm test
# after_deploy:
#   - sudo systemctl restart app

# dependencies:
#   dir: node_modules
#   update: false
#   install: npm install --production

# command_timeout: 5m
# transfer_timeout: 30m

# environments:
#   staging:
#     server: deploy@staging.example.com
"#;

pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, TEMPLATE)?;

    Ok(())
}
