//! Single-result lookup through the first working proxy

mod common;

use common::{closed_address, standard_response, MockProxy, MockResponse, GEO_URL, TARGET_URL};
use proxy_verifier::{
    GeoErrorKind, LocateError, ProbeConfig, ProxyChecker, Verifier, VerifyOptions,
};
use std::time::Duration;

fn verifier() -> Verifier {
    Verifier::new(ProxyChecker::with_config(
        ProbeConfig::new()
            .with_target_url(TARGET_URL)
            .with_geo_url(GEO_URL)
            .with_timeout(Duration::from_secs(5))
            .with_geo_timeout(Duration::from_secs(5)),
    ))
}

#[tokio::test]
async fn test_locate_uses_the_only_working_proxy() {
    let working = MockProxy::exit_ip("203.0.113.5", "Tokyo").await;
    let working_input = format!("http://{}", working.address());
    let inputs = vec![
        closed_address().await,
        "garbage".to_string(),
        working_input.clone(),
    ];

    let result = verifier()
        .locate(&inputs, None, VerifyOptions::default())
        .await
        .unwrap();

    assert_eq!(result.proxy_used, working_input);
    assert_eq!(result.queried_ip, "203.0.113.5");
    assert_eq!(result.city.as_deref(), Some("Tokyo"));
    assert_eq!(result.location_data["countryCode"], "JP");
    assert!(working.requested("http://geo.test/json/203.0.113.5"));
}

#[tokio::test]
async fn test_locate_target_ip_goes_through_chosen_proxy() {
    let working = MockProxy::exit_ip("203.0.113.5", "Tokyo").await;
    let inputs = vec![working.address()];

    let result = verifier()
        .locate(&inputs, Some("192.0.2.44"), VerifyOptions::default())
        .await
        .unwrap();

    assert_eq!(result.queried_ip, "192.0.2.44");
    assert_eq!(result.location_data["query"], "192.0.2.44");
    assert!(working.requested("http://geo.test/json/192.0.2.44"));
    assert!(!working.requested("http://geo.test/json/203.0.113.5"));
}

#[tokio::test]
async fn test_locate_picks_first_by_input_order() {
    let slow = MockProxy::start(Duration::from_millis(300), |target| {
        standard_response(target, "198.51.100.1", "Osaka")
    })
    .await;
    let fast = MockProxy::exit_ip("198.51.100.2", "Kyoto").await;
    let inputs = vec![slow.address(), fast.address()];

    let result = verifier()
        .locate(&inputs, None, VerifyOptions::default())
        .await
        .unwrap();

    assert_eq!(result.proxy_used, slow.address());
    assert_eq!(result.city.as_deref(), Some("Osaka"));
    assert!(!fast.requested("http://geo.test/json/198.51.100.2"));
}

#[tokio::test]
async fn test_locate_without_working_proxy() {
    let inputs = vec![closed_address().await, "bad".to_string()];

    let err = verifier()
        .locate(&inputs, None, VerifyOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, LocateError::NoWorkingProxy));
}

#[tokio::test]
async fn test_locate_without_resolvable_ip() {
    let proxy = MockProxy::start(Duration::ZERO, |_| MockResponse::ok("{}")).await;
    let inputs = vec![proxy.address()];

    let err = verifier()
        .locate(&inputs, None, VerifyOptions::default())
        .await
        .unwrap_err();

    match err {
        LocateError::NoQueryIp { proxy_used } => assert_eq!(proxy_used, proxy.address()),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_locate_remote_failure_is_request_level_error() {
    let proxy = MockProxy::start(Duration::ZERO, |target| {
        if target == TARGET_URL {
            MockResponse::ok(r#"{"ip":"203.0.113.5"}"#)
        } else {
            MockResponse::ok(r#"{"status":"fail","message":"invalid query"}"#)
        }
    })
    .await;
    let inputs = vec![proxy.address()];

    let err = verifier()
        .locate(&inputs, None, VerifyOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.proxy_used(), Some(proxy.address().as_str()));
    match err {
        LocateError::Lookup { source, .. } => {
            assert_eq!(source.kind, GeoErrorKind::Remote);
            assert!(source.message.contains("invalid query"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_locate_accepts_zero_ceiling() {
    let first = MockProxy::start(Duration::from_millis(200), |target| {
        standard_response(target, "198.51.100.1", "Osaka")
    })
    .await;
    let second = MockProxy::start(Duration::from_millis(200), |target| {
        standard_response(target, "198.51.100.2", "Kyoto")
    })
    .await;
    let inputs = vec![first.address(), second.address()];
    let options = VerifyOptions {
        max_concurrency: 0,
        resolve_geo: true,
    };

    let result = verifier().locate(&inputs, None, options).await.unwrap();

    assert_eq!(result.proxy_used, first.address());
    assert_eq!(result.city.as_deref(), Some("Osaka"));
    // Geolocation is only requested for the chosen proxy
    assert!(!second.requested("http://geo.test/json/198.51.100.2"));
    assert_eq!(second.requests().len(), 1);
}
