#![allow(clippy::unwrap_used, clippy::float_cmp)]
// Integration tests for `WiserClient` against a wiremock hub.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wiser_core::{
    CoreError, HubConfig, Light, LightCommand, RetryPolicy, SecretFn, ShutterCommand, WiserClient,
    WiserDevice,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup(configure: impl FnOnce(HubConfig) -> HubConfig) -> (MockServer, WiserClient) {
    let server = MockServer::start().await;
    let config = configure(HubConfig::new(server.address().to_string()));
    let client = WiserClient::new(config).unwrap();
    (server, client)
}

fn fast_retry(config: HubConfig) -> HubConfig {
    config.with_retry(RetryPolicy {
        delay: Duration::from_millis(10),
        max_attempts: Some(5),
    })
}

fn hub_body(target_percentage: u8) -> Value {
    json!({
        "Device": [{
            "id": 5,
            "NodeId": 1,
            "ProductType": "DimmableLight",
            "ProductIdentifier": "P",
            "ActiveFirmwareVersion": "1",
            "ModelIdentifier": "M"
        }],
        "Light": [{
            "id": 5,
            "DeviceId": 5,
            "Endpoint": 0,
            "Name": "Hall",
            "IsDimmable": true,
            "TargetState": "On",
            "TargetPercentage": target_percentage
        }],
        "Shutter": []
    })
}

async fn mount_snapshot(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/data/v2/domain/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_device_end_to_end() {
    let (server, client) = setup(|c| c).await;
    mount_snapshot(&server, hub_body(80)).await;

    let record = client.get_device("Light", "5").await.unwrap();
    let light = record.as_light().unwrap();

    assert_eq!(light.base.device_id, 5);
    assert_eq!(light.target_percentage, 80.0);
    assert!(light.is_dimmable);
}

#[tokio::test]
async fn test_get_device_not_found() {
    let (server, client) = setup(|c| c).await;
    mount_snapshot(&server, hub_body(80)).await;

    let err = client.get_device("Light", "42").await.unwrap_err();
    assert_eq!(err.to_string(), "Cannot find device (Light) 42");

    let err = client.get_device("Shutter", "5").await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));

    let err = client.get_device("Light", "five").await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn test_get_family_typed() {
    let (server, client) = setup(|c| c).await;
    mount_snapshot(&server, hub_body(60)).await;

    let light: wiser_core::LightRecord = client.get_family(5).await.unwrap();
    assert_eq!(light.base.name, "Hall");
    assert_eq!(light.target_percentage, 60.0);
}

#[tokio::test]
async fn test_concurrent_snapshot_calls_issue_one_get() {
    let (server, client) = setup(|c| c).await;

    Mock::given(method("GET"))
        .and(path("/data/v2/domain/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(hub_body(80))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let results = futures_util::future::join_all((0..8).map(|_| client.get_hub_snapshot())).await;

    for result in results {
        assert_eq!(result.unwrap().lights.len(), 1);
    }
}

#[tokio::test]
async fn test_invalid_snapshot_reports_field() {
    let (server, client) = setup(|c| c).await;

    let mut body = hub_body(80);
    body["Light"][0]
        .as_object_mut()
        .unwrap()
        .remove("TargetPercentage");
    body["Light"][0]["Colour"] = json!("warm");
    mount_snapshot(&server, body).await;

    let err = client.get_hub_snapshot().await.unwrap_err();
    assert!(
        matches!(err, CoreError::Validation { ref field, .. } if field == "TargetPercentage"),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_discover_pairs_devices_with_records() {
    let (server, client) = setup(|c| c).await;
    mount_snapshot(&server, hub_body(80)).await;

    let accessories = client.discover().await.unwrap();

    assert_eq!(accessories.len(), 1);
    assert_eq!(accessories[0].kind, "Light");
    assert_eq!(accessories[0].name(), "Hall");
    assert_eq!(accessories[0].uuid_seed(), "5");
}

#[tokio::test]
async fn test_bound_device_follows_snapshots() {
    let (server, client) =
        setup(|c| c.with_refresh_interval(Duration::from_millis(100))).await;

    Mock::given(method("GET"))
        .and(path("/data/v2/domain/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hub_body(80)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_snapshot(&server, hub_body(30)).await;

    let record = client.get_family::<wiser_core::LightRecord>(5).await.unwrap();
    let light = Arc::new(Light::from_record(&record));
    let binding = client.bind(Arc::clone(&light)).unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while light.target_percentage.get() != 30.0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    assert!(binding.is_active());
    binding.cancel();
}

#[test]
fn test_bind_outside_runtime_is_an_error() {
    let client = WiserClient::new(HubConfig::new("hub.local")).unwrap();
    let light = Light::from_record(&wiser_core::LightRecord {
        base: wiser_core::WiserDeviceBase {
            id: 5,
            device_id: 5,
            endpoint: 0,
            name: "Hall".into(),
        },
        is_dimmable: false,
        current_state: None,
        current_percentage: None,
        current_level: None,
        target_state: "Off".into(),
        target_percentage: 0.0,
    });

    let err = client.bind(Arc::new(light)).err().unwrap();
    assert!(matches!(err, CoreError::Configuration { .. }));
    assert!(matches!(
        client.subscribe().err().unwrap(),
        CoreError::Configuration { .. }
    ));
}

// ── Writes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_request_action_sends_one_patch() {
    let (server, client) = setup(|c| c).await;
    let body = json!({ "Action": "LiftTo", "Percentage": 50 });

    Mock::given(method("PATCH"))
        .and(path("/data/v2/domain/Shutter/3/RequestAction"))
        .and(body_json(&body))
        .and(header("content-type", "application/json"))
        .and(header("accept", "*/*"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.request_action("Shutter", 3, body).await.unwrap();
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let (server, client) = setup(move |c| {
        fast_retry(c).with_secret_provider(SecretFn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Some(SecretString::from("s3cret".to_string())) }
        }))
    })
    .await;

    Mock::given(method("PATCH"))
        .and(path("/data/v2/domain/Light/5/RequestOverride"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/data/v2/domain/Light/5/RequestOverride"))
        .and(header("secret", "s3cret"))
        .and(body_json(json!({ "State": "On", "Percentage": 40 })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .send(LightCommand::Brightness(40).into_command(5))
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_rejected_command_is_not_retried() {
    let (server, client) = setup(fast_retry).await;

    Mock::given(method("PATCH"))
        .and(path("/data/v2/domain/Shutter/3/RequestAction"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .send(ShutterCommand::LiftTo(10).into_command(3))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Network { transient: false, .. }));
}

#[tokio::test]
async fn test_retries_stop_at_max_attempts() {
    let (server, client) = setup(fast_retry).await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(500))
        .expect(5)
        .mount(&server)
        .await;

    let err = client
        .send_override("Light", 1, json!({ "State": "Off" }))
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_unknown_family_is_rejected_locally() {
    let (server, client) = setup(|c| c).await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client
        .send_action("Thermostat", 1, json!({}))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CoreError::UnknownFamily {
            tag: "Thermostat".into()
        }
    );
}

#[tokio::test]
async fn test_newer_override_cancels_retrying_one() {
    let (server, client) = setup(|c| {
        c.with_retry(RetryPolicy {
            delay: Duration::from_millis(20),
            max_attempts: None,
        })
    })
    .await;

    let stale = json!({ "State": "On", "Percentage": 10 });
    let fresh = json!({ "State": "On", "Percentage": 40 });
    Mock::given(method("PATCH"))
        .and(path("/data/v2/domain/Light/5/RequestOverride"))
        .and(body_json(&stale))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/data/v2/domain/Light/5/RequestOverride"))
        .and(body_json(&fresh))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let first = client.request_override("Light", 5, stale);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = client.request_override("Light", 5, fresh);

    assert!(first.await.unwrap_err().is_cancelled());
    second.await.unwrap();
    assert_eq!(client.in_flight_commands(), 0);

    let attempts = server.received_requests().await.unwrap().len();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), attempts);
}

#[tokio::test]
async fn test_different_targets_do_not_cancel_each_other() {
    let (server, client) = setup(|c| c).await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(50)))
        .expect(3)
        .mount(&server)
        .await;

    let handles = [
        client.request_override("Light", 5, json!({ "State": "On" })),
        client.request_override("Light", 6, json!({ "State": "On" })),
        client.request_action("Light", 5, json!({ "Action": "Identify" })),
    ];
    assert_eq!(client.in_flight_commands(), 3);

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(client.in_flight_commands(), 0);
}

// ── Process-wide instance ───────────────────────────────────────────

#[test]
fn test_global_instance_lifecycle() {
    assert!(matches!(
        wiser_core::instance(),
        Err(CoreError::Configuration { .. })
    ));

    wiser_core::init(HubConfig::new("first.local")).unwrap();
    let err = wiser_core::init(HubConfig::new("second.local")).err().unwrap();

    assert!(matches!(err, CoreError::Configuration { .. }));
    assert_eq!(wiser_core::instance().unwrap().config().endpoint, "first.local");
}
