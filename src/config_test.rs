use super::*;

#[test]
fn env_parse_falls_back_on_missing_key() {
    let parsed: u64 = env_parse("MURAL_TEST_KEY_THAT_IS_NEVER_SET", 42u64);
    assert_eq!(parsed, 42);
}

#[test]
fn from_env_uses_defaults_when_unset() {
    let config = Config::from_env();
    assert_eq!(config.width, 500);
    assert_eq!(config.height, 500);
    assert_eq!(config.canvas_ttl, Duration::from_secs(60));
    assert_eq!(config.counter_ttl, Duration::from_secs(300));
    assert_eq!(config.pixel_batch_size, 20);
    assert_eq!(config.pixel_batch_delay, Duration::from_millis(100));
}
