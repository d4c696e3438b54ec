//! Config file round-trip and defaults.

use chrono::Weekday;
use standup_nudge::NudgeConfig;

#[test]
fn partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[watch]
max_reminders = 5
working_days = ["Mon", "Wed"]

[telegram]
bot_token = "123:abc"
"#,
    )
    .unwrap();

    let config = NudgeConfig::from_file(&path).expect("load config");
    assert_eq!(config.watch.max_reminders, 5);
    assert_eq!(config.watch.working_days, vec![Weekday::Mon, Weekday::Wed]);
    assert_eq!(config.watch.escalation_interval_mins, 30);
    assert_eq!(config.telegram.bot_token, "123:abc");
    assert_eq!(config.telegram.api_base_url, "https://api.telegram.org");
    assert_eq!(config.locale.default_language, "en");
}

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("sub").join("config.toml");
    let mut config = NudgeConfig::default();
    config.watch.warn_lead_mins = 15;
    config.logging.file = true;

    config.save_to_file(&path).expect("save config");
    let loaded = NudgeConfig::from_file(&path).expect("load config");
    assert_eq!(loaded.watch.warn_lead_mins, 15);
    assert!(loaded.logging.file);
}

#[test]
fn zero_tick_interval_is_rejected() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[watch]\ntick_interval_secs = 0\n").unwrap();
    assert!(NudgeConfig::from_file(&path).is_err());
}
