use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_settings_file(contents: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("form_client_settings_test_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("form.toml");
    fs::write(&path, contents).expect("write settings");
    path
}

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn defaults_point_at_demo_endpoint() {
    let settings = load_settings_with_env(None, no_env).expect("defaults");
    assert_eq!(settings.endpoint_url.as_str(), DEFAULT_ENDPOINT);
    assert_eq!(settings.request_timeout, Duration::from_secs(30));
    assert!(settings.enforce_validation);
}

#[test]
fn file_values_override_defaults() {
    let path = temp_settings_file(
        r#"
endpoint_url = "http://127.0.0.1:9000/forms"
request_timeout_secs = 5
enforce_validation = false
"#,
    );

    let settings = load_settings_with_env(Some(&path), no_env).expect("load");
    assert_eq!(settings.endpoint_url.as_str(), "http://127.0.0.1:9000/forms");
    assert_eq!(settings.request_timeout, Duration::from_secs(5));
    assert!(!settings.enforce_validation);

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn env_overrides_file() {
    let path = temp_settings_file("endpoint_url = \"http://file.example/forms\"\n");
    let vars: HashMap<&str, &str> = HashMap::from([
        ("FORM_ENDPOINT_URL", "http://form.example/submit"),
        ("APP__ENDPOINT_URL", "https://app.example/submit"),
        ("APP__REQUEST_TIMEOUT_SECS", "12"),
        ("APP__ENFORCE_VALIDATION", "off"),
    ]);

    let settings =
        load_settings_with_env(Some(&path), |key| vars.get(key).map(|v| v.to_string()))
            .expect("load");
    assert_eq!(settings.endpoint_url.as_str(), "https://app.example/submit");
    assert_eq!(settings.request_timeout, Duration::from_secs(12));
    assert!(!settings.enforce_validation);

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn explicit_missing_file_is_an_error() {
    let missing = env::temp_dir().join("form_client_settings_test_missing/form.toml");
    let err = load_settings_with_env(Some(&missing), no_env).expect_err("must fail");
    assert!(matches!(err, SettingsError::Read { .. }), "unexpected: {err}");
}

#[test]
fn unknown_keys_are_rejected() {
    let path = temp_settings_file("endpoint = \"http://typo.example\"\n");
    let err = load_settings_with_env(Some(&path), no_env).expect_err("must fail");
    assert!(matches!(err, SettingsError::Parse { .. }), "unexpected: {err}");
    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn rejects_bad_endpoints_and_values() {
    assert!(matches!(
        parse_endpoint("not a url"),
        Err(SettingsError::InvalidEndpoint { .. })
    ));
    assert!(matches!(
        parse_endpoint("ftp://files.example/upload"),
        Err(SettingsError::UnsupportedScheme(_))
    ));
    assert!(timeout_from_secs(0).is_err());

    let err = load_settings_with_env(None, |key| {
        (key == "APP__ENFORCE_VALIDATION").then(|| "sometimes".to_string())
    })
    .expect_err("must fail");
    assert!(matches!(
        err,
        SettingsError::InvalidValue {
            key: "APP__ENFORCE_VALIDATION",
            ..
        }
    ));
}
