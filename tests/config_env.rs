// tests/config_env.rs
use std::env;
use webcad_mqtt::AppConfig;

const KEYS: &[&str] = &["TARGET_FILTERS", "MQTT_TOPIC", "POLL_INTERVAL"];

fn clear_env() {
    for k in KEYS {
        env::remove_var(k);
    }
}

#[serial_test::serial]
#[test]
fn process_env_overrides_defaults() {
    clear_env();
    let cfg = AppConfig::from_env().unwrap();
    assert!(cfg.filters.is_empty());
    assert_eq!(cfg.poll_interval.as_secs(), 60);

    env::set_var("TARGET_FILTERS", "East Caln,West Chester");
    env::set_var("MQTT_TOPIC", "cad/elsewhere");
    env::set_var("POLL_INTERVAL", "120");
    let cfg = AppConfig::from_env().unwrap();
    assert_eq!(
        cfg.filters,
        vec!["East Caln".to_string(), "West Chester".to_string()]
    );
    assert_eq!(cfg.mqtt.topic, "cad/elsewhere");
    assert_eq!(cfg.poll_interval.as_secs(), 120);

    clear_env();
}

#[serial_test::serial]
#[test]
fn unparsable_interval_is_a_startup_error() {
    clear_env();
    env::set_var("POLL_INTERVAL", "soon");
    let err = AppConfig::from_env().unwrap_err();
    assert!(format!("{err:#}").contains("POLL_INTERVAL"));
    clear_env();
}

#[serial_test::serial]
#[test]
fn zero_interval_is_a_startup_error() {
    clear_env();
    env::set_var("POLL_INTERVAL", "0");
    let err = AppConfig::from_env().unwrap_err();
    assert!(format!("{err:#}").contains("POLL_INTERVAL"));
    clear_env();
}
