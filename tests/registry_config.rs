// tests/registry_config.rs
use outreach_aggregator::config::AggregatorConfig;
use outreach_aggregator::external::registry::{AdapterKind, ProviderRegistry};
use std::{env, fs};

const SAMPLE: &str = r#"
[[countries.Cyprus.jobs]]
name = "Jooble"
kind = "jooble"
endpoint = "https://jooble.org/api"
credential_env = "T_JOOBLE"
query_params = { location = "{city}, Cyprus" }

[[countries.Cyprus.services]]
name = "Welfare"
kind = "open_referral"
endpoint = "https://welfare.example"
active = false

[[countries.Global.jobs]]
name = "Jooble"
kind = "jooble"
endpoint = "https://jooble.org/api"
credential_env = "T_JOOBLE"
"#;

#[test]
fn toml_table_parses_with_lookup() {
    let r = ProviderRegistry::parse_toml(SAMPLE, |k| (k == "T_JOOBLE").then(|| "abc".into()))
        .expect("parse");
    assert_eq!(r.countries(), vec!["Cyprus"]);

    let cy = r.providers_for("Cyprus");
    assert_eq!(cy.job_providers[0].kind, AdapterKind::Jooble);
    assert_eq!(cy.job_providers[0].credential.as_deref(), Some("abc"));
    assert!(cy.job_providers[0].active, "active defaults to true");
    assert!(!cy.service_providers[0].active);
    assert!(cy.service_providers[0].credential.is_none());

    assert!(r.providers_for("Greece").service_providers.is_empty());
}

#[test]
fn shipped_example_file_is_valid() {
    let content = include_str!("../config/providers.example.toml");
    let r = ProviderRegistry::parse_toml(content, |_| None).expect("example parses");
    assert_eq!(r.countries(), vec!["Cyprus", "United Kingdom"]);
    assert_eq!(r.providers_for("United Kingdom").job_providers.len(), 2);
}

#[test]
fn registry_without_global_is_rejected() {
    let toml = r#"
[countries.Cyprus]
jobs = []
"#;
    let err = ProviderRegistry::parse_toml(toml, |_| None).unwrap_err();
    assert!(err.to_string().contains("Global"), "got: {err}");
}

#[test]
fn duplicate_provider_names_are_rejected() {
    let toml = r#"
[countries.Global]
jobs = [
  { name = "Jooble", kind = "jooble", endpoint = "a" },
  { name = "Jooble", kind = "jooble", endpoint = "b" },
]
"#;
    assert!(ProviderRegistry::parse_toml(toml, |_| None).is_err());
}

#[test]
fn unknown_adapter_kind_is_a_parse_error() {
    let toml = r#"
[countries.Global]
jobs = [{ name = "X", kind = "monster", endpoint = "a" }]
"#;
    assert!(ProviderRegistry::parse_toml(toml, |_| None).is_err());
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_file_then_seed() {
    // Isolate CWD so the test never reads the repo's config/.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var("PROVIDER_REGISTRY_PATH");

    // 1) nothing on disk -> built-in seed
    let seed = ProviderRegistry::load_default().unwrap();
    assert!(seed.countries().contains(&"United States"));

    // 2) ./config/providers.toml
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("providers.toml"), SAMPLE).unwrap();
    let from_file = ProviderRegistry::load_default().unwrap();
    assert_eq!(from_file.countries(), vec!["Cyprus"]);

    // 3) env path wins
    let p_env = tmp.path().join("other.toml");
    fs::write(
        &p_env,
        r#"
[countries.Greece]
jobs = []
[countries.Global]
jobs = []
"#,
    )
    .unwrap();
    env::set_var("PROVIDER_REGISTRY_PATH", p_env.display().to_string());
    let from_env = ProviderRegistry::load_default().unwrap();
    assert_eq!(from_env.countries(), vec!["Greece"]);

    // 4) env pointing nowhere is an error, not a silent fallback
    env::set_var("PROVIDER_REGISTRY_PATH", tmp.path().join("missing.toml").display().to_string());
    assert!(ProviderRegistry::load_default().is_err());

    env::remove_var("PROVIDER_REGISTRY_PATH");
    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn aggregator_config_reads_process_env() {
    env::set_var("RATE_LIMIT_COOLDOWN_MS", "250");
    env::set_var("SERVICES_MOCK_FLOOR", "4");
    env::set_var("MIN_PROVIDER_RESULTS", "oops");

    let cfg = AggregatorConfig::from_env();
    assert_eq!(cfg.rate_limit_cooldown_ms, 250);
    assert_eq!(cfg.services_mock_floor, 4);
    assert_eq!(cfg.min_provider_results, 1);

    env::remove_var("RATE_LIMIT_COOLDOWN_MS");
    env::remove_var("SERVICES_MOCK_FLOOR");
    env::remove_var("MIN_PROVIDER_RESULTS");
}
