//! Concurrent identical misses.

mod common;

use common::{Harness, RecordingBackend};
use std::time::Duration;
use textorm_orm::OrmOptions;

const SELECT_SETTINGS: &str = "SELECT * FROM setting ORDER BY id";

#[tokio::test]
async fn test_concurrent_misses_generate_once() {
    let backend = RecordingBackend::ready(SELECT_SETTINGS).with_delay(Duration::from_millis(200));
    let h = Harness::new(backend).await;

    let first = h.orm.clone();
    let second = h.orm.clone();
    let (a, b) = tokio::join!(
        async move {
            first
                .make_sql_request("List of settings", &["setting"], false)
                .await
        },
        async move {
            second
                .make_sql_request("List of settings", &["setting"], false)
                .await
        },
    );

    assert_eq!(a.unwrap().query, SELECT_SETTINGS);
    assert_eq!(b.unwrap().query, SELECT_SETTINGS);
    assert_eq!(h.backend.calls(), 1);
    assert_eq!(h.cache.writes(), 1);
}

#[tokio::test]
async fn test_waiter_generates_when_first_attempt_fails() {
    let backend =
        RecordingBackend::ready("DELETE FROM setting").with_delay(Duration::from_millis(200));
    let h = Harness::new(backend).await;

    let (a, b) = tokio::join!(
        h.orm.make_sql_request("List of settings", &["setting"], false),
        h.orm.make_sql_request("List of settings", &["setting"], false),
    );

    assert!(a.is_err());
    assert!(b.is_err());
    // Nothing was cached by the first attempt, so the waiter tried too.
    assert_eq!(h.backend.calls(), 2);
}

#[tokio::test]
async fn test_coalescing_can_be_disabled() {
    let backend = RecordingBackend::ready(SELECT_SETTINGS).with_delay(Duration::from_millis(200));
    let options = OrmOptions {
        coalesce_misses: false,
        ..OrmOptions::default()
    };
    let h = Harness::with_options(backend, options).await;

    let (a, b) = tokio::join!(
        h.orm.make_sql_request("List of settings", &["setting"], false),
        h.orm.make_sql_request("List of settings", &["setting"], false),
    );

    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(h.backend.calls(), 2);
    // Identical writes; last one wins.
    assert_eq!(h.cache.writes(), 2);
    assert_eq!(h.cache.inner.len(), 1);
}
