use std::collections::HashMap;

use super::*;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn toml_overrides_only_what_it_names() {
    let mut settings = Settings::default();
    settings
        .apply_toml(
            r#"
            api_base_url = "https://dna.example.org/api"
            page_size = 50
            allowed_mime_types = ["application/pdf", "text/plain"]
            "#,
        )
        .unwrap();

    assert_eq!(settings.api_base_url, "https://dna.example.org/api");
    assert_eq!(settings.page_size, 50);
    assert_eq!(settings.allowed_mime_types.len(), 2);
    assert_eq!(settings.poll_interval_ms, Settings::default().poll_interval_ms);
}

#[test]
fn malformed_toml_is_an_error() {
    let mut settings = Settings::default();
    assert!(settings.apply_toml("page_size = \"many\"").is_err());
}

#[test]
fn app_prefix_wins_over_dna_admin_prefix() {
    let mut settings = Settings::default();
    settings.apply_env(env(&[
        ("DNA_ADMIN_API_URL", "http://a/api/"),
        ("APP__API_URL", "http://b/api/"),
        ("DNA_ADMIN_PAGE_SIZE", "5"),
        ("DNA_ADMIN_POLL_INTERVAL_MS", "not-a-number"),
    ]));

    assert_eq!(settings.api_base_url, "http://b/api/");
    assert_eq!(settings.page_size, 5);
    assert_eq!(settings.poll_interval_ms, 2_000);
}

#[test]
fn upload_policy_mirrors_settings() {
    let settings = Settings {
        max_file_bytes: 42,
        max_files_match: 2,
        ..Settings::default()
    };
    let policy = settings.upload_policy();
    assert_eq!(policy.max_file_bytes, 42);
    assert_eq!(policy.max_files_match, 2);
    assert_eq!(policy.allowed_mime_types, vec!["application/pdf".to_string()]);
    assert_eq!(settings.poll_timeout(), Duration::from_secs(300));
}

#[test]
fn explicit_settings_file_must_exist() {
    let missing = std::env::temp_dir().join("dna-admin-missing-settings.toml");
    let _ = fs::remove_file(&missing);
    assert!(load_settings(Some(&missing)).is_err());
}

#[test]
fn explicit_settings_file_is_loaded() {
    let path = std::env::temp_dir().join(format!("dna-admin-settings-{}.toml", std::process::id()));
    fs::write(&path, "page_size = 7\nlog_filter = \"debug\"\n").unwrap();

    let settings = load_settings(Some(&path)).unwrap();
    let _ = fs::remove_file(&path);
    assert_eq!(settings.log_filter, "debug");
    assert_eq!(settings.page_size, 7);
}
