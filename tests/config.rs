// ABOUTME: Integration tests for configuration parsing and validation.
// ABOUTME: Tests YAML parsing, secret indirection, credentials, and environment merging.

use slipway::config::*;
use slipway::deploy::DependencyPolicy;
use slipway::error::Error;
use slipway::ssh::{Credentials, KeySource};
use std::path::PathBuf;
use std::time::Duration;

mod parsing {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let yaml = r#"
server: example.com
deploy_path: /srv/app
password: secret
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let server = config.options.server.as_ref().unwrap();
        assert_eq!(server.host, "example.com");
        assert_eq!(server.port, 22);
        assert!(server.trust_first_connection);
    }

    #[test]
    fn parse_full_config() {
        let yaml = r#"
server:
  host: web.example.com
  port: 2222
  user: deploy
  private_key: /home/deploy/.ssh/id_ed25519
  passphrase:
    env: SLIPWAY_TEST_PASSPHRASE
    default: hunter2
  proxy: jump@bastion.example.com:2200
  trust_first_connection: false
  known_hosts: /etc/slipway/known_hosts

deploy_path: /srv/app
local_path: dist
current_symlink: live
version_label: v42
keep: 4
before_deploy:
  - npm test
  - npm run lint
after_deploy: sudo systemctl restart app
dependencies:
  dir: vendor
  update: true
  install: bundle install
delete_rolled_back: true
debug: true
command_timeout: 2m
transfer_timeout: 1h
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let options = &config.options;
        let server = options.server.as_ref().unwrap();

        assert_eq!(server.port, 2222);
        assert_eq!(server.known_hosts, Some(PathBuf::from("/etc/slipway/known_hosts")));
        assert_eq!(
            server.proxy,
            Some(ProxyConfig {
                host: "bastion.example.com".to_string(),
                port: 2200,
                user: Some("jump".to_string()),
            })
        );
        assert_eq!(options.current_symlink.as_ref().unwrap().as_str(), "live");
        assert_eq!(options.version_label.as_ref().unwrap().as_str(), "v42");
        assert_eq!(options.keep, Some(4));
        assert_eq!(options.before_deploy.as_ref().unwrap().commands().len(), 2);
        assert_eq!(options.command_timeout, Some(Duration::from_secs(120)));
        assert_eq!(options.transfer_timeout, Some(Duration::from_secs(3600)));

        let settings = config.settings(None).unwrap();
        assert_eq!(
            settings.dependencies,
            DependencyPolicy::Reinstall {
                dir: slipway::types::DirName::new("vendor").unwrap(),
                install: "bundle install".to_string(),
            }
        );
        assert!(settings.delete_rolled_back);
        assert!(settings.debug);
        assert_eq!(settings.connection.target.port, 2222);
        assert!(!settings.connection.target.trust_on_first_use);
        assert_eq!(settings.connection.proxy.as_ref().unwrap().user, "jump");
    }

    #[test]
    fn invalid_version_label_returns_error() {
        let yaml = "version_label: \"release 1\"\n";
        assert!(matches!(Config::from_yaml(yaml), Err(Error::Yaml(_))));
    }

    #[test]
    fn invalid_server_port_returns_error() {
        let yaml = "server: example.com:99999\n";
        assert!(Config::from_yaml(yaml).is_err());
    }
}

mod discovery {
    use super::*;

    #[test]
    fn discovers_primary_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "deploy_path: /srv/a\n").unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.options.deploy_path.as_deref(), Some("/srv/a"));
    }

    #[test]
    fn discovers_config_in_dot_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".slipway")).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME_DIR), "deploy_path: /srv/b\n").unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.options.deploy_path.as_deref(), Some("/srv/b"));
    }

    #[test]
    fn missing_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::discover(dir.path()),
            Err(Error::ConfigNotFound(_))
        ));
    }
}

mod credentials {
    use super::*;

    /// Test: Neither private_key nor password is configured.
    /// Expected: Resolution fails with MissingCredentials before anything connects.
    #[test]
    fn missing_credentials_fail_before_connecting() {
        let yaml = r#"
server: deploy@example.com
deploy_path: /srv/app
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let err = config.settings(None).unwrap_err();
        assert!(matches!(err, Error::MissingCredentials(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn password_from_environment() {
        let yaml = r#"
server: example.com
deploy_path: /srv/app
password:
  env: SLIPWAY_TEST_PASSWORD
"#;
        let config = Config::from_yaml(yaml).unwrap();

        temp_env::with_var("SLIPWAY_TEST_PASSWORD", Some("from_environment"), || {
            let settings = config.settings(None).unwrap();
            assert_eq!(
                settings.connection.target.credentials,
                Credentials::password("from_environment")
            );
        });

        temp_env::with_var_unset("SLIPWAY_TEST_PASSWORD", || {
            assert!(matches!(
                config.settings(None),
                Err(Error::MissingEnvVar(var)) if var == "SLIPWAY_TEST_PASSWORD"
            ));
        });
    }

    #[test]
    fn key_path_expands_home() {
        let yaml = r#"
server: example.com
deploy_path: /srv/app
private_key: ~/.ssh/deploy_key
"#;
        let config = Config::from_yaml(yaml).unwrap();

        temp_env::with_var("HOME", Some("/home/ci"), || {
            let settings = config.settings(None).unwrap();
            match &settings.connection.target.credentials {
                Credentials::PrivateKey {
                    key: KeySource::Path(path),
                    ..
                } => assert_eq!(path, &PathBuf::from("/home/ci/.ssh/deploy_key")),
                other => panic!("Expected key file credentials, got {:?}", other),
            }
        });
    }

    #[test]
    fn user_defaults_to_environment() {
        let yaml = r#"
server: example.com
deploy_path: /srv/app
password: pw
"#;
        let config = Config::from_yaml(yaml).unwrap();
        temp_env::with_var("USER", Some("ci-runner"), || {
            let settings = config.settings(None).unwrap();
            assert_eq!(settings.connection.target.user, "ci-runner");
        });
    }
}

mod environments {
    use super::*;

    const YAML: &str = r#"
server: deploy@prod.example.com
deploy_path: /srv/app
password: pw
keep: 5
environments:
  staging:
    server: deploy@staging.example.com
    deploy_path: /srv/staging
  scratch:
    keep: 0
"#;

    #[test]
    fn environment_overrides_server_and_path() {
        let config = Config::from_yaml(YAML).unwrap();
        let settings = config.settings(Some("staging")).unwrap();

        assert_eq!(settings.connection.target.host, "staging.example.com");
        assert_eq!(settings.layout.deploy_path(), "/srv/staging");
        assert_eq!(settings.keep, Some(5));
    }

    #[test]
    fn environment_inherits_everything_else() {
        let config = Config::from_yaml(YAML).unwrap();
        let settings = config.settings(Some("scratch")).unwrap();

        assert_eq!(settings.connection.target.host, "prod.example.com");
        assert_eq!(settings.keep, Some(0));
    }

    #[test]
    fn unknown_environment_returns_error() {
        let config = Config::from_yaml(YAML).unwrap();
        assert!(matches!(
            config.settings(Some("production")),
            Err(Error::UnknownEnvironment(name)) if name == "production"
        ));
    }
}
