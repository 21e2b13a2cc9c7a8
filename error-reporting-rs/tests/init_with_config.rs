use std::sync::Arc;
use std::time::Duration;

use error_reporting_rs::admission::INTERNAL_ERROR_KIND;
use error_reporting_rs::{
    init_with_config, report_failure, FailureError, FailureEvent, MemorySink, NoSecrets,
    RequestDescriptor,
};
use serde_json::json;

fn config() -> config::Config {
    config::Config::builder()
        .set_override("sentry.dsn", "https://key@errors.example.com/1")
        .unwrap()
        .set_override("sentry.environment", "integration")
        .unwrap()
        .set_override("sentry.enabled", true)
        .unwrap()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_configured_reporter_dispatches_in_background() {
    let sink = Arc::new(MemorySink::new());
    let first = init_with_config(config(), sink.clone(), &NoSecrets).unwrap();
    assert!(first.state().is_ready());
    assert_eq!(sink.options().unwrap().environment.as_deref(), Some("integration"));

    report_failure(&FailureEvent::new(
        FailureError::new(INTERNAL_ERROR_KIND),
        RequestDescriptor::new(json!({"controller": "auth", "action": "login"}), json!({})),
    ));

    for _ in 0..100 {
        if !sink.events().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(sink.events().len(), 1);

    // the existing reporter is returned and no second worker is wired up
    let other = Arc::new(MemorySink::new());
    let second = init_with_config(config(), other.clone(), &NoSecrets).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(other.options().is_none());
}
