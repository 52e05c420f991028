use dealdesk_app::{AppConfig, ConfigError, init_tracing};
use dealdesk_cloud::CloudConfig;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

#[test]
fn sample_file_parses() {
    let config = AppConfig::parse(include_str!("../dealdesk.toml")).unwrap();

    assert_eq!(config.database_path, "data/dealdesk.db");
    assert_eq!(
        config.remote,
        Some(CloudConfig {
            base_url: "https://example.supabase.co".into(),
            api_key: "public-anon-key".into(),
            timeout_secs: 15,
        })
    );
    assert!(config.sync.auto_sync_on_reconnect);
    assert_eq!(config.currency.rates.get("KWD"), Some(&dec!(163)));
}

#[test]
fn empty_file_gives_defaults() {
    let config = AppConfig::parse("").unwrap();

    assert_eq!(config, AppConfig::default());
    assert!(config.remote.is_none());
    assert_eq!(config.currency.reference, "EGP");
}

#[test]
fn partial_sections_keep_other_defaults() {
    let config = AppConfig::parse(
        r#"
        [sync]
        sync_on_start = false
        "#,
    )
    .unwrap();

    assert!(!config.sync.sync_on_start);
    assert!(config.sync.auto_sync_on_reconnect);
    assert_eq!(config.sync.command_buffer, 32);
}

#[test]
fn unknown_keys_are_rejected() {
    let err = AppConfig::parse("databse_path = \"x.db\"").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)), "{err}");

    let err = AppConfig::parse("[sync]\nretry = 3").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)), "{err}");
}

#[test]
fn invalid_values_are_rejected() {
    for toml in [
        "database_path = \"  \"",
        "[sync]\ncommand_buffer = 0",
        "[remote]\nbase_url = \"\"",
        "[remote]\ntimeout_secs = 0",
        "[currency]\nreference = \"XYZ\"",
        "[currency.rates]\nUSD = -2.0",
    ] {
        let err = AppConfig::parse(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{toml}: {err}");
    }
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AppConfig::load(dir.path().join("nope.toml")).unwrap_err();

    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("nope.toml"));
}

#[test]
fn written_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dealdesk.toml");
    let config = AppConfig {
        database_path: "custom.db".into(),
        remote: Some(CloudConfig::new("http://localhost:9999", "key")),
        ..AppConfig::default()
    };

    std::fs::write(&path, config.to_toml().unwrap()).unwrap();

    assert_eq!(AppConfig::load(&path).unwrap(), config);
}

#[test]
fn tracing_init_is_repeatable() {
    init_tracing("debug");
    init_tracing("not a [valid filter");
}
