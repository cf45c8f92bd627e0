use notegrab_config::{AuthStyle, NotegrabConfigLoader};
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

const FILE_YAML: &str = r#"
instance_host: misskey.example
api_key: "${NOTEGRAB_TEST_TOKEN}"
username: alice
collect:
  page_size: 50
  page_delay_ms: 250
  auth_style: bearer
  output: out/notes.json
"#;

#[test]
#[serial]
fn file_values_with_expansion() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "notegrab.yaml", FILE_YAML);

    temp_env::with_vars(
        [
            ("NOTEGRAB_TEST_TOKEN", Some("from-placeholder")),
            ("MISSKEY_API_KEY", None),
            ("MISSKEY_INSTANCE_HOST", None),
            ("MISSKEY_COLLECT__PAGE_SIZE", None),
        ],
        || {
            let cfg = NotegrabConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load config");

            assert_eq!(cfg.instance_host, "misskey.example");
            assert_eq!(cfg.api_key, "from-placeholder");
            assert_eq!(cfg.username, "alice");
            assert_eq!(cfg.collect.page_size, 50);
            assert_eq!(cfg.collect.page_delay_ms, 250);
            assert_eq!(cfg.collect.auth_style, AuthStyle::Bearer);
            assert_eq!(cfg.collect.output, PathBuf::from("out/notes.json"));
            assert!(cfg.collect.local_only);
        },
    );
}

#[test]
#[serial]
fn environment_wins_over_file() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "notegrab.yaml", FILE_YAML);

    temp_env::with_vars(
        [
            ("NOTEGRAB_TEST_TOKEN", Some("from-placeholder")),
            ("MISSKEY_API_KEY", Some("from-env")),
            ("MISSKEY_INSTANCE_HOST", Some("other.example")),
            ("MISSKEY_COLLECT__PAGE_SIZE", Some("20")),
            ("MISSKEY_COLLECT__LOCAL_ONLY", Some("false")),
        ],
        || {
            let cfg = NotegrabConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load config");

            assert_eq!(cfg.api_key, "from-env");
            assert_eq!(cfg.instance_host, "other.example");
            assert_eq!(cfg.collect.page_size, 20);
            assert!(!cfg.collect.local_only);
            // untouched by env
            assert_eq!(cfg.username, "alice");
        },
    );
}

#[test]
#[serial]
fn missing_api_key_is_an_error() {
    temp_env::with_var("MISSKEY_API_KEY", None::<&str>, || {
        let err = NotegrabConfigLoader::new()
            .with_yaml_str("username: alice")
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("MISSKEY_API_KEY"));
    });
}

#[test]
#[serial]
fn missing_optional_file_is_skipped() {
    let tmp = TempDir::new().unwrap();
    temp_env::with_vars(
        [
            ("MISSKEY_API_KEY", Some("k")),
            ("MISSKEY_INSTANCE_HOST", None),
        ],
        || {
            let cfg = NotegrabConfigLoader::new()
                .with_optional_file(tmp.path().join("absent.yaml"))
                .load()
                .expect("optional file may be absent");
            assert_eq!(cfg.instance_host, "voskey.icalo.net");
            assert_eq!(cfg.origin(), "https://voskey.icalo.net");
        },
    );
}

#[test]
#[serial]
fn offline_load_tolerates_missing_api_key() {
    temp_env::with_var("MISSKEY_API_KEY", None::<&str>, || {
        let cfg = NotegrabConfigLoader::new()
            .with_yaml_str("markov:\n  max_depth: 3")
            .require_api_key(false)
            .load()
            .expect("offline config");
        assert!(cfg.api_key.is_empty());
        assert_eq!(cfg.markov.max_depth, 3);
    });
}
