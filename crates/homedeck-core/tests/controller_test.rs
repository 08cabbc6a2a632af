#![allow(clippy::unwrap_used)]
// End-to-end tests: `Controller` over the real HTTP client, against wiremock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use homedeck_core::{
    ControlInput, Controller, ControllerConfig, CoreError, DeviceId, Fragment, InputValue,
    MountPoint, MountStatus, Widget,
};

// ── Helpers ─────────────────────────────────────────────────────────

#[derive(Default)]
struct Surface {
    presented: Mutex<Vec<Fragment>>,
    notices: Mutex<Vec<String>>,
}

impl MountPoint for Surface {
    fn present(&self, fragment: &Fragment) {
        self.presented.lock().unwrap().push(fragment.clone());
    }

    fn notice(&self, _device: &DeviceId, message: &str) {
        self.notices.lock().unwrap().push(message.to_owned());
    }
}

fn lamp_payload() -> serde_json::Value {
    json!({
        "uniqueId": "lamp-1",
        "type": "Lightbulb",
        "serviceName": "Desk Lamp",
        "values": { "On": 1, "Brightness": 40 },
        "serviceCharacteristics": [
            { "type": "On", "value": 1, "format": "bool", "canRead": true, "canWrite": true },
            { "type": "Brightness", "value": 40, "format": "int", "canRead": true,
              "canWrite": true, "minValue": 0, "maxValue": 100, "minStep": 1 },
            { "type": "CharacteristicValueActiveTransitionCount", "value": 0, "canWrite": false }
        ]
    })
}

async fn setup() -> (MockServer, Controller) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/device/lamp-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lamp_payload()))
        .mount(&server)
        .await;

    let mut config = ControllerConfig::new(Url::parse(&server.uri()).unwrap());
    config.debounce = Duration::from_millis(50);
    config.poll_interval = Duration::from_secs(60);
    let controller = Controller::new(config).unwrap();
    (server, controller)
}

// ── Write path ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_edits_are_sent_as_one_merged_post() {
    let (server, controller) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/device/lamp-1"))
        .and(body_json(json!({ "On": 0, "Brightness": 80 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "updatedCharacteristics": [
                { "type": "On", "value": 0, "description": "On" },
                { "type": "Brightness", "value": 80, "description": "Brightness" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = DeviceId::from("lamp-1");
    let descriptor = controller.load_device(&id).await.unwrap();
    assert!(descriptor.characteristic("CharacteristicValueActiveTransitionCount").is_none());

    let surface = Arc::new(Surface::default());
    let status = controller
        .mount_device(descriptor, Arc::clone(&surface) as Arc<dyn MountPoint>)
        .unwrap();
    assert_eq!(status, MountStatus::Bound);

    controller
        .handle_input(&id, &ControlInput::new("on", InputValue::Toggle { on: false }))
        .unwrap();
    controller
        .handle_input(&id, &ControlInput::new("brightness", InputValue::Number { value: 80.0 }))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;
    server.verify().await;
    assert!(controller.suppressed_fields(&id).is_empty());

    controller.shutdown().await;
}

#[tokio::test]
async fn test_invalid_edit_never_reaches_server() {
    let (server, controller) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/device/lamp-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .expect(0)
        .mount(&server)
        .await;

    let id = DeviceId::from("lamp-1");
    let descriptor = controller.load_device(&id).await.unwrap();
    let surface = Arc::new(Surface::default());
    controller
        .mount_device(descriptor, Arc::clone(&surface) as Arc<dyn MountPoint>)
        .unwrap();

    let err = controller
        .handle_input(&id, &ControlInput::new("brightness", InputValue::Number { value: 150.0 }))
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert_eq!(surface.notices.lock().unwrap().len(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    server.verify().await;
    controller.shutdown().await;
}

#[tokio::test]
async fn test_server_rejection_is_reported_on_mount_point() {
    let (server, controller) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/device/lamp-1"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "status": "error",
            "message": "Characteristic Brightness is not writable."
        })))
        .mount(&server)
        .await;

    let id = DeviceId::from("lamp-1");
    let descriptor = controller.load_device(&id).await.unwrap();
    let surface = Arc::new(Surface::default());
    controller
        .mount_device(descriptor, Arc::clone(&surface) as Arc<dyn MountPoint>)
        .unwrap();
    controller
        .handle_input(&id, &ControlInput::new("brightness", InputValue::Number { value: 20.0 }))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;
    let notices = surface.notices.lock().unwrap().clone();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].contains("not writable"), "notice: {}", notices[0]);
    controller.shutdown().await;
}

// ── Read path ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_mount_renders_initial_state() {
    let (_server, controller) = setup().await;
    let id = DeviceId::from("lamp-1");
    let descriptor = controller.load_device(&id).await.unwrap();
    let surface = Arc::new(Surface::default());
    controller
        .mount_device(descriptor, Arc::clone(&surface) as Arc<dyn MountPoint>)
        .unwrap();

    let fragment = controller.fragment(&id).unwrap();
    assert_eq!(fragment.title, "Desk Lamp");
    match &fragment.control("brightness").unwrap().widget {
        Widget::Slider { value, max, .. } => {
            assert!((value - 40.0).abs() < f64::EPSILON);
            assert!((max - 100.0).abs() < f64::EPSILON);
        }
        other => panic!("unexpected widget {other:?}"),
    }
    assert!(controller.unmount_device(&id).await);
    assert!(controller.mounted().is_empty());
}

#[tokio::test]
async fn test_unknown_device_is_not_found() {
    let (server, controller) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/device/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let err = controller.load_device(&"ghost".into()).await.unwrap_err();
    assert!(
        matches!(err, CoreError::DeviceNotFound { ref identifier } if identifier == "ghost"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_rooms_are_listed() {
    let (server, controller) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/rooms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "Office", "services": [{ "uniqueId": "lamp-1" }] }
        ])))
        .mount(&server)
        .await;

    let rooms = controller.list_rooms().await.unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].devices, vec![DeviceId::from("lamp-1")]);
}
