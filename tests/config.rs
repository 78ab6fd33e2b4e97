// ABOUTME: Integration tests for configuration parsing and discovery.
// ABOUTME: Tests YAML parsing, defaults, env var resolution, and file discovery.

use dropship::config::*;
use dropship::error::Error;
use dropship::hooks::ConversionPhase;
use dropship::transport::Framing;
use dropship::types::ScriptVersion;
use std::path::Path;
use std::time::Duration;

mod parsing {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let yaml = r#"
integrity_key: s3cret
base_update_path: /srv/releases
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.base_update_path, Path::new("/srv/releases"));
        assert!(config.listen.is_none());
        assert_eq!(config.transport.framing(), Framing::length_prefixed());
        assert_eq!(config.transport.queue_depth, 16);
        assert_eq!(config.transport.shutdown_grace, Duration::from_secs(30));
        assert_eq!(config.migrations.scripts_dir, Path::new("Database"));
        assert_eq!(
            config.hosts.service_util.program,
            Path::new("dropship-svc")
        );
    }

    #[test]
    fn parse_full_config() {
        let yaml = r#"
listen:
  address: 0.0.0.0
  port: 9000
push:
  address: deploy.internal
integrity_key:
  env: SHOP_KEY
  default: fallback
base_update_path: /srv/releases
transport:
  framing: short_read
  buffer_size: 4096
  queue_depth: 4
  shutdown_grace: 2m
hosts:
  service_util:
    program: /usr/local/bin/svcctl
    args: ["--system"]
  web_util:
    program: /usr/local/bin/webctl
migrations:
  scripts_dir: /srv/sql
  conversions:
    - name: split-addresses
      version: 2.5
      phase: before
      program: ./convert
      args: ["--dry"]
    - name: rebuild-search
      version: 3
      program: ./rebuild
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.listen_endpoint().unwrap().port, 9000);
        assert_eq!(config.push_endpoint().unwrap().port, DEFAULT_PORT);
        assert_eq!(
            config.transport.framing(),
            Framing::ShortRead { buffer_size: 4096 }
        );
        assert_eq!(config.transport.shutdown_grace, Duration::from_secs(120));
        assert_eq!(config.hosts.service_util.args, vec!["--system"]);

        let conversions = &config.migrations.conversions;
        assert_eq!(conversions.len(), 2);
        assert_eq!(conversions[0].version, ScriptVersion::new(2.5).unwrap());
        assert_eq!(conversions[0].phase, ConversionPhase::Before);
        assert_eq!(conversions[1].phase, ConversionPhase::After);
        assert_eq!(config.conversions().len(), 2);
        assert_eq!(config.scripts_dir(Path::new("/anywhere")), Path::new("/srv/sql"));
    }

    #[test]
    fn length_prefixed_respects_max_message_size() {
        let yaml = r#"
integrity_key: k
base_update_path: /srv
transport:
  max_message_size: 1024
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(
            config.transport.framing(),
            Framing::LengthPrefixed {
                max_message_size: 1024
            }
        );
    }

    #[test]
    fn relative_scripts_dir_resolves_against_release_root() {
        let config = Config::from_yaml("integrity_key: k\nbase_update_path: /srv\n").unwrap();
        assert_eq!(
            config.scripts_dir(Path::new("/srv/Shop_2.0")),
            Path::new("/srv/Shop_2.0/Database")
        );
    }

    #[test]
    fn missing_integrity_key_returns_error() {
        let result = Config::from_yaml("base_update_path: /srv\n");
        assert!(matches!(result, Err(Error::Yaml(_))));
    }

    #[test]
    fn empty_literal_key_is_invalid() {
        let result = Config::from_yaml("integrity_key: ''\nbase_update_path: /srv\n");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn zero_queue_depth_is_invalid() {
        let yaml = "integrity_key: k\nbase_update_path: /srv\ntransport:\n  queue_depth: 0\n";
        assert!(matches!(Config::from_yaml(yaml), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn unknown_framing_is_rejected() {
        let yaml = "integrity_key: k\nbase_update_path: /srv\ntransport:\n  framing: chunked\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn negative_conversion_version_is_rejected() {
        let yaml = r#"
integrity_key: k
base_update_path: /srv
migrations:
  conversions:
    - name: bad
      version: -1
      program: ./x
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }
}

mod env_values {
    use super::*;

    #[test]
    fn integrity_key_is_read_from_the_environment() {
        let yaml = "integrity_key:\n  env: DROPSHIP_TEST_KEY\nbase_update_path: /srv\n";
        let config = Config::from_yaml(yaml).unwrap();

        temp_env::with_var("DROPSHIP_TEST_KEY", Some("from_environment"), || {
            assert_eq!(config.integrity_key.resolve().unwrap(), "from_environment");
        });
        temp_env::with_var_unset("DROPSHIP_TEST_KEY", || {
            assert!(matches!(
                config.integrity_key.resolve(),
                Err(Error::MissingEnvVar(_))
            ));
        });
    }
}

mod discovery {
    use super::*;

    const MINIMAL: &str = "integrity_key: k\nbase_update_path: /srv\n";

    #[test]
    fn finds_each_supported_file_name() {
        for name in [CONFIG_FILENAME, CONFIG_FILENAME_ALT, CONFIG_FILENAME_DIR] {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, MINIMAL).unwrap();
            assert!(Config::discover(dir.path()).is_ok(), "{name}");
        }
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::discover(dir.path()),
            Err(Error::ConfigNotFound(_))
        ));
    }

    #[test]
    fn upward_search_finds_config_above_a_release() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), MINIMAL).unwrap();
        let nested = dir.path().join("releases/Shop_2.0/tools");
        std::fs::create_dir_all(&nested).unwrap();

        assert!(Config::discover(&nested).is_err());
        assert!(Config::discover_upwards(&nested).is_ok());
    }

    #[test]
    fn upward_search_stops_at_a_broken_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), MINIMAL).unwrap();
        let nested = dir.path().join("child");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join(CONFIG_FILENAME), "integrity_key: [").unwrap();

        assert!(matches!(
            Config::discover_upwards(&nested),
            Err(Error::Yaml(_))
        ));
    }
}
