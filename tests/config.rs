// ABOUTME: Integration tests for profile parsing and settings resolution.
// ABOUTME: Tests YAML parsing, env var passwords, discovery, and CLI overrides.

use remexec::config::*;
use remexec::error::Error;
use remexec::ssh::{Credential, LineMode};
use std::path::PathBuf;
use std::time::Duration;

mod parsing {
    use super::*;

    #[test]
    fn parse_minimal_profile() {
        let profile = Profile::from_yaml("host: example.com\n").unwrap();
        assert_eq!(profile.host.host, "example.com");
        assert_eq!(profile.port, None);
        assert_eq!(profile.line_mode, LineMode::Buffered);
        assert_eq!(profile.connect_timeout, None);
    }

    #[test]
    fn parse_full_profile() {
        let yaml = r#"
host: deploy@web1.example.com:2222
identity: /home/deploy/.ssh/id_ed25519
line_mode: per-read
connect_timeout: 15s
working_path: /srv/app
"#;
        let profile = Profile::from_yaml(yaml).unwrap();
        assert_eq!(profile.host.host, "web1.example.com");
        assert_eq!(profile.host.port, Some(2222));
        assert_eq!(profile.host.user.as_deref(), Some("deploy"));
        assert_eq!(profile.line_mode, LineMode::PerRead);
        assert_eq!(profile.connect_timeout, Some(Duration::from_secs(15)));
        assert_eq!(profile.working_path.as_deref(), Some("/srv/app"));
    }

    #[test]
    fn invalid_port_in_host_is_rejected() {
        let err = Profile::from_yaml("host: web1:notaport\n").unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }

    #[test]
    fn missing_host_is_rejected() {
        assert!(Profile::from_yaml("port: 22\n").is_err());
    }
}

mod passwords {
    use super::*;

    #[test]
    fn literal_password() {
        let profile = Profile::from_yaml("host: h\npassword: hunter2\n").unwrap();
        let settings = Settings::from_profile(&profile).unwrap();
        assert_eq!(settings.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn password_from_environment() {
        let yaml = "host: h\npassword:\n  env: REMEXEC_TEST_PASSWORD\n";
        temp_env::with_var("REMEXEC_TEST_PASSWORD", Some("from_env"), || {
            let profile = Profile::from_yaml(yaml).unwrap();
            let settings = Settings::from_profile(&profile).unwrap();
            assert_eq!(settings.password.as_deref(), Some("from_env"));
        });
    }

    #[test]
    fn missing_password_variable_is_an_error() {
        let yaml = "host: h\npassword:\n  env: REMEXEC_TEST_UNSET\n";
        temp_env::with_var_unset("REMEXEC_TEST_UNSET", || {
            let profile = Profile::from_yaml(yaml).unwrap();
            let err = Settings::from_profile(&profile).unwrap_err();
            assert!(matches!(err, Error::MissingEnvVar(ref v) if v == "REMEXEC_TEST_UNSET"));
        });
    }

    #[test]
    fn password_env_override() {
        temp_env::with_var("REMEXEC_TEST_CLI_PW", Some("cli"), || {
            let settings = Settings::default()
                .apply(Overrides {
                    target: Some(Target::parse("h").unwrap()),
                    password_env: Some("REMEXEC_TEST_CLI_PW".to_string()),
                    ..Default::default()
                })
                .unwrap();
            let config = settings.connection_config().unwrap();
            assert_eq!(
                config.credential().unwrap(),
                Credential::Password("cli".to_string())
            );
        });
    }
}

mod resolution {
    use super::*;

    #[test]
    fn cli_target_replaces_profile_host() {
        let profile = Profile::from_yaml("host: ops@old.example.com:2200\n").unwrap();
        let settings = Settings::from_profile(&profile)
            .unwrap()
            .apply(Overrides {
                target: Some(Target::parse("new.example.com").unwrap()),
                ..Default::default()
            })
            .unwrap();

        let config = settings.connection_config().unwrap();
        assert_eq!(config.host, "new.example.com");
        // Port and user embedded in the profile survive a bare host override.
        assert_eq!(config.port, 2200);
        assert_eq!(config.user, "ops");
    }

    #[test]
    fn explicit_port_beats_embedded_port() {
        let profile = Profile::from_yaml("host: h:2200\nport: 2222\n").unwrap();
        let settings = Settings::from_profile(&profile).unwrap();
        assert_eq!(settings.connection_config().unwrap().port, 2222);
    }

    #[test]
    fn default_port_is_22() {
        let settings = Settings::default()
            .apply(Overrides {
                target: Some(Target::parse("h").unwrap()),
                user: Some("me".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(settings.connection_config().unwrap().port, 22);
    }

    #[test]
    fn identity_override_wins_over_profile_password() {
        let profile = Profile::from_yaml("host: h\npassword: pw\n").unwrap();
        let settings = Settings::from_profile(&profile)
            .unwrap()
            .apply(Overrides {
                identity: Some(PathBuf::from("/keys/id_rsa")),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(
            settings.connection_config().unwrap().credential().unwrap(),
            Credential::PrivateKeyPath(PathBuf::from("/keys/id_rsa"))
        );
    }

    #[test]
    fn missing_host_is_invalid_config() {
        let err = Settings::default().connection_config().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn debug_output_hides_password() {
        let settings = Settings {
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        assert!(!format!("{:?}", settings).contains("hunter2"));
    }
}

mod discovery {
    use super::*;

    #[test]
    fn discovers_profile_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "host: found.example.com\n").unwrap();

        let profile = Profile::discover(dir.path()).unwrap().unwrap();
        assert_eq!(profile.host.host, "found.example.com");
    }

    #[test]
    fn discovers_nested_profile() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".remexec")).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME_DIR), "host: nested\n").unwrap();

        let profile = Profile::discover(dir.path()).unwrap().unwrap();
        assert_eq!(profile.host.host, "nested");
    }

    #[test]
    fn no_profile_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Profile::discover(dir.path()).unwrap().is_none());
    }

    #[test]
    fn explicit_missing_profile_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Profile::load(&dir.path().join("nope.yml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }
}
