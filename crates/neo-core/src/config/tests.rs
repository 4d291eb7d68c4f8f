//! Tests for loading and validating configuration

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::errors::ConfigError;
    use serial_test::serial;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn clear_env() {
        std::env::remove_var(ENV_ARM_DEVICE);
        std::env::remove_var(ENV_SIMULATE);
        std::env::remove_var(ENV_LOG_LEVEL);
    }

    #[test]
    #[serial]
    fn test_empty_document_gives_defaults() {
        clear_env();
        let config = ConfigLoader::from_str("").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.execution.run_timeout_secs, 30);
        assert_eq!(config.hardware.command_timeout_ms, 2000);
        assert_eq!(config.hardware.handshake_timeout_ms, 3000);
        assert_eq!(config.sandbox.recursion_limit, 64);
        assert_eq!(config.sandbox.arm_binding, "arm");
        assert!(!config.hardware.simulate);
        assert!(config.hardware.device.is_none());
    }

    #[test]
    #[serial]
    fn test_partial_document() {
        clear_env();
        let yaml = r#"
hardware:
  device: /dev/ttyACM0
  pins:
    hand: 6
execution:
  run_timeout_secs: 5
logging:
  level: debug
  colored: false
"#;
        let config = ConfigLoader::from_str(yaml).unwrap();
        assert_eq!(config.hardware.device, Some(PathBuf::from("/dev/ttyACM0")));
        assert_eq!(config.hardware.pins.hand, 6);
        assert_eq!(config.hardware.pins.upper_arm, 9);
        assert_eq!(config.execution.run_timeout().as_secs(), 5);
        assert_eq!(config.logging.level_filter(), Some(log::LevelFilter::Debug));
        assert!(!config.logging.colored);
    }

    #[test]
    #[serial]
    fn test_malformed_yaml() {
        clear_env();
        let err = ConfigLoader::from_str("execution: [not, a, map").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    #[serial]
    fn test_validation_rejects_nonsense() {
        clear_env();
        let cases = [
            "execution:\n  run_timeout_secs: 0\n",
            "hardware:\n  command_timeout_ms: 0\n",
            "hardware:\n  handshake_timeout_ms: 0\n",
            "hardware:\n  pins:\n    upper_arm: 10\n",
            "hardware:\n  pins:\n    hand: 64\n",
            "sandbox:\n  recursion_limit: 0\n",
            "sandbox:\n  arm_binding: print\n",
            "sandbox:\n  arm_binding: while\n",
            "sandbox:\n  arm_binding: 2arm\n",
            "logging:\n  level: loud\n",
        ];
        for yaml in cases {
            match ConfigLoader::from_str(yaml) {
                Err(ConfigError::Invalid(_)) => {}
                other => panic!("expected a validation error for {:?}, got {:?}", yaml, other),
            }
        }
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        clear_env();
        std::env::set_var(ENV_ARM_DEVICE, "/dev/ttyUSB1");
        std::env::set_var(ENV_SIMULATE, "yes");
        std::env::set_var(ENV_LOG_LEVEL, "warn");

        let config = ConfigLoader::from_str("hardware:\n  simulate: false\n").unwrap();
        assert_eq!(config.hardware.device, Some(PathBuf::from("/dev/ttyUSB1")));
        assert!(config.hardware.simulate);
        assert_eq!(config.logging.level, "warn");

        std::env::set_var(ENV_SIMULATE, "maybe");
        assert!(matches!(ConfigLoader::from_env(), Err(ConfigError::Invalid(_))));
        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn test_load_from_file() {
        clear_env();
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "hardware:\n  simulate: true\nsandbox:\n  recursion_limit: 20").unwrap();

        let config = load_config(file.path()).await.unwrap();
        assert!(config.hardware.simulate);
        assert_eq!(config.sandbox.recursion_limit, 20);
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_file() {
        clear_env();
        let err = ConfigLoader::from_file("/nonexistent/neo.yaml").await.unwrap_err();
        match err {
            ConfigError::Read { path, .. } => assert_eq!(path, PathBuf::from("/nonexistent/neo.yaml")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
