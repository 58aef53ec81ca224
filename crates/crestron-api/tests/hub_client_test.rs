#![allow(clippy::unwrap_used)]
// Integration tests for `HubClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crestron_api::{Error, HubApi, HubClient, Room};

const TOKEN: &str = "web-api-token";

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, HubClient) {
    let server = MockServer::start().await;
    let base = Url::parse(&format!("{}/cws/api/", server.uri())).unwrap();
    let client = HubClient::with_client(reqwest::Client::new(), base, SecretString::from(TOKEN.to_owned()));
    (server, client)
}

async fn mount_login(server: &MockServer, key: &str) {
    Mock::given(method("GET"))
        .and(path("/cws/api/login"))
        .and(header("Crestron-RestAPI-AuthToken", TOKEN))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "authkey": key, "version": "3.0" })),
        )
        .mount(server)
        .await;
}

async fn mount_rooms(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/cws/api/rooms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rooms": [
                { "id": 1, "name": "Kitchen" },
                { "id": 2, "name": "Den" },
            ]
        })))
        .mount(server)
        .await;
}

// ── Session ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_caches_rooms() {
    let (server, client) = setup().await;
    mount_login(&server, "key-1").await;
    mount_rooms(&server).await;

    assert!(client.rooms().is_empty());
    client.login().await.unwrap();

    assert_eq!(
        client.rooms(),
        vec![
            Room {
                id: 1,
                name: "Kitchen".into()
            },
            Room {
                id: 2,
                name: "Den".into()
            },
        ]
    );
}

#[tokio::test]
async fn test_rejected_token_is_auth_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/cws/api/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.login().await.unwrap_err();
    assert!(err.is_auth(), "expected auth error, got {err:?}");
}

#[tokio::test]
async fn test_login_without_authkey_is_auth_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/cws/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "3.0" })))
        .mount(&server)
        .await;

    let err = client.get_thermostats().await.unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
}

#[tokio::test]
async fn test_expired_key_triggers_single_relogin() {
    let (server, client) = setup().await;

    // First login hands out a key the hub later rejects.
    Mock::given(method("GET"))
        .and(path("/cws/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "authkey": "stale" })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cws/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "authkey": "fresh" })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cws/api/sensors"))
        .and(header("Crestron-RestAPI-AuthKey", "stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cws/api/sensors"))
        .and(header("Crestron-RestAPI-AuthKey", "fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sensors": [{ "id": 7, "subType": "OccupancySensor", "presence": "Occupied" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sensors = client.get_sensors(&[]).await.unwrap();
    assert_eq!(sensors.len(), 1);
    assert_eq!(sensors[0]["presence"], "Occupied");
}

// ── Collections ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_devices_merges_scenes_and_room_names() {
    let (server, client) = setup().await;
    mount_login(&server, "key-1").await;
    mount_rooms(&server).await;

    Mock::given(method("GET"))
        .and(path("/cws/api/devices"))
        .and(header("Crestron-RestAPI-AuthKey", "key-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "devices": [
                { "id": 10, "name": "Island", "subType": "Dimmer", "roomId": 1, "level": 32768 },
                { "id": 11, "name": "Lamp", "subType": "Switch", "roomId": 2, "roomName": "Study" },
                "garbage",
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cws/api/scenes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "scenes": [{ "id": 10, "name": "Movie", "roomId": 2 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let enabled = vec!["light".to_owned(), "scene".to_owned()];
    let records = client.get_devices(&enabled, &[]).await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["roomName"], "Kitchen");
    // An embedded room name wins over the lookup.
    assert_eq!(records[1]["roomName"], "Study");
    assert_eq!(records[2]["type"], "Scene");
    assert_eq!(records[2]["roomName"], "Den");
}

#[tokio::test]
async fn test_get_devices_skips_scenes_when_disabled() {
    let (server, client) = setup().await;
    mount_login(&server, "key-1").await;
    mount_rooms(&server).await;

    Mock::given(method("GET"))
        .and(path("/cws/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "devices": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cws/api/scenes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "scenes": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let records = client.get_devices(&["light".to_owned()], &[]).await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_get_shade_state_picks_matching_record() {
    let (server, client) = setup().await;
    mount_login(&server, "key-1").await;

    Mock::given(method("GET"))
        .and(path("/cws/api/shades/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "shades": [{ "id": 4, "position": 1200 }]
        })))
        .mount(&server)
        .await;

    let shade = client.get_shade_state(4).await.unwrap();
    assert_eq!(shade["position"], 1200);
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_set_light_state_body() {
    let (server, client) = setup().await;
    mount_login(&server, "key-1").await;

    Mock::given(method("POST"))
        .and(path("/cws/api/lights/SetState"))
        .and(body_json(json!({ "lights": [{ "id": 5, "level": 65535, "time": 2 }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .expect(1)
        .mount(&server)
        .await;

    client.set_light_state(5, 65_535, 2).await.unwrap();
}

#[tokio::test]
async fn test_thermostat_setpoint_body() {
    let (server, client) = setup().await;
    mount_login(&server, "key-1").await;

    Mock::given(method("POST"))
        .and(path("/cws/api/thermostats/SetPoint"))
        .and(body_json(json!({
            "id": 3,
            "setpoints": [{ "type": "Heat", "temperature": 215 }]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.set_thermostat_setpoint(3, "Heat", 215).await.unwrap();
}

#[tokio::test]
async fn test_recall_scene_posts_without_body() {
    let (server, client) = setup().await;
    mount_login(&server, "key-1").await;

    Mock::given(method("POST"))
        .and(path("/cws/api/scenes/recall/12"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.recall_scene(12).await.unwrap();
}

// ── Error handling ──────────────────────────────────────────────────

#[tokio::test]
async fn test_server_error_maps_to_api_error() {
    let (server, client) = setup().await;
    mount_login(&server, "key-1").await;

    Mock::given(method("GET"))
        .and(path("/cws/api/thermostats"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    match client.get_thermostats().await.unwrap_err() {
        Error::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;
    mount_login(&server, "key-1").await;

    Mock::given(method("GET"))
        .and(path("/cws/api/sensors"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client.get_sensors(&[]).await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { ref body, .. } if body == "not json"));
}
