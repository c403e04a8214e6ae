use std::io::Write;
use std::time::Duration;

use kaiwa::config::{KaiwaConfig, LearnerLevel, PracticeMode, Voice};
use kaiwa::error::KaiwaError;
use pretty_assertions::assert_eq;

const FILE: &str = r#"
api_base_url = "http://127.0.0.1:4000"
model = "gpt-4o-mini-realtime-preview"
turn_detection = false
open_timeout_secs = 3

[speech]
mode = "business"
level = "advanced"
voice = "sage"
"#;

#[test]
fn load_reads_toml_file_over_defaults() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file should be created");
    file.write_all(FILE.as_bytes()).expect("config should be written");

    let config = KaiwaConfig::load(Some(file.path())).expect("config should load");

    assert_eq!(config.api_base_url, "http://127.0.0.1:4000");
    assert_eq!(config.realtime.model, "gpt-4o-mini-realtime-preview");
    assert!(!config.realtime.turn_detection);
    assert_eq!(config.realtime.open_timeout, Duration::from_secs(3));
    assert_eq!(config.realtime.request_timeout, Duration::from_secs(30));
    assert_eq!(config.speech.mode, PracticeMode::Business);
    assert_eq!(config.speech.level, LearnerLevel::Advanced);
    assert_eq!(config.realtime.voice, Voice::Sage);
    assert!(config.instructions().contains("keigo"));
}

#[test]
fn load_reports_missing_file_as_io_error() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let err = KaiwaConfig::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
    assert!(matches!(err, KaiwaError::Io(_)));
}

#[test]
fn unknown_keys_are_rejected() {
    let err = KaiwaConfig::from_toml_str("realtime_modle = \"typo\"").unwrap_err();
    assert!(matches!(err, KaiwaError::Configuration(ref message) if message.contains("Invalid config file")));
}

#[test]
fn explicit_instructions_override_speech_settings() {
    let config = KaiwaConfig::from_toml_str("instructions = \"Only speak Osaka-ben.\"")
        .expect("config should parse");
    assert_eq!(config.instructions(), "Only speak Osaka-ben.");
}

#[test]
fn environment_overrides_file_values() {
    let mut config = KaiwaConfig::from_toml_str(FILE).expect("config should parse");
    config
        .apply_env_with(|key| match key {
            "KAIWA_API_BASE_URL" => Some("https://kaiwa.example".into()),
            "KAIWA_VOICE" => Some("verse".into()),
            "OPENAI_API_KEY" => Some("sk-test".into()),
            _ => None,
        })
        .expect("env should apply");

    assert_eq!(config.api_base_url, "https://kaiwa.example");
    assert_eq!(config.realtime.voice, Voice::Verse);
    assert_eq!(config.api_key.as_deref(), Some("sk-test"));
    assert!(!format!("{config:?}").contains("sk-test"));
}

#[test]
fn unknown_voice_in_environment_is_a_configuration_error() {
    let mut config = KaiwaConfig::default();
    let err = config
        .apply_env_with(|key| (key == "KAIWA_VOICE").then(|| "robot".to_string()))
        .unwrap_err();
    assert!(matches!(err, KaiwaError::Configuration(_)));
}
