//! End-to-end tests: real Socket.IO sessions against a relay on loopback.

use pad_test_client::PadSession;
use pocketpad_relay::{ConnectionState, PlayerIdentity, RelayConfig, RelayServer};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration, Instant};

const STEP: Duration = Duration::from_secs(5);

async fn start_server(ping_interval_ms: u64) -> (Arc<RelayServer>, SocketAddr) {
    let config = RelayConfig {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        ping_interval_ms,
        static_dir: None,
        ..Default::default()
    };
    let server = Arc::new(RelayServer::new(config).unwrap());
    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();

    let serving = server.clone();
    tokio::spawn(async move { serving.serve(listener).await });
    (server, addr)
}

async fn connect(addr: SocketAddr) -> PadSession {
    PadSession::connect(&format!("http://{addr}")).await.unwrap()
}

async fn expect_event(session: &mut PadSession, name: &str) -> Value {
    timeout(STEP, async {
        loop {
            match session.next_event().await {
                Some((event, data)) if event == name => return data,
                Some(_) => {}
                None => panic!("connection closed while waiting for {name}"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {name} within {STEP:?}"))
}

/// Asserts no `name` event arrives within `window`.
async fn expect_no_event(session: &mut PadSession, name: &str, window: Duration) {
    let deadline = Instant::now() + window;
    while let Ok(next) = tokio::time::timeout_at(deadline, session.next_event()).await {
        if let Some((event, data)) = next {
            assert_ne!(event, name, "unexpected {event}: {data}");
        }
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + STEP;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_two_players_axis_then_disconnect() {
    let (server, addr) = start_server(60_000).await;
    let relay = server.relay().clone();

    let mut one = connect(addr).await;
    let mut two = connect(addr).await;
    one.emit("register-player", json!(1)).await.unwrap();
    two.emit("register-player", json!(2)).await.unwrap();
    wait_until(|| relay.registry().len() == 2).await;

    let event = json!({"player": 1, "type": "AXIS", "axis": "LX", "value": 0.5});
    one.emit("controller-input", event.clone()).await.unwrap();
    assert_eq!(expect_event(&mut one, "controller-input").await, event);
    assert_eq!(expect_event(&mut two, "controller-input").await, event);

    two.close().await.unwrap();
    wait_until(|| relay.registry().len() == 1 && relay.hub().len() == 1).await;

    let second = json!({"player": 1, "type": "BUTTON", "button": "A", "value": 1});
    one.emit("controller-input", second.clone()).await.unwrap();
    assert_eq!(expect_event(&mut one, "controller-input").await, second);

    let players: Vec<PlayerIdentity> = relay.registry().snapshot().into_iter().map(|p| p.player).collect();
    assert_eq!(players, vec![PlayerIdentity::Number(1)]);

    one.close().await.unwrap();
    server.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fallback_registration_over_socket() {
    let (server, addr) = start_server(60_000).await;
    let relay = server.relay().clone();

    let mut session = connect(addr).await;
    wait_until(|| relay.hub().len() == 1).await;
    let id = relay.hub().connection_ids().remove(0);
    assert_eq!(relay.state(&id), ConnectionState::Connected);

    session
        .emit("controller-input", json!({"player": "p7", "type": "BUTTON", "button": "START", "value": 1}))
        .await
        .unwrap();
    expect_event(&mut session, "controller-input").await;
    assert_eq!(relay.registry().lookup(&id), Some(PlayerIdentity::from("p7")));
    assert_eq!(relay.state(&id), ConnectionState::Registered);

    session.close().await.unwrap();
    wait_until(|| relay.state(&id) == ConnectionState::Disconnected).await;
    assert!(relay.registry().is_empty());
    server.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_input_is_dropped_and_unknown_shapes_pass() {
    let (server, addr) = start_server(60_000).await;

    let mut session = connect(addr).await;
    session.emit("controller-input", json!("BUTTON A")).await.unwrap();
    expect_no_event(&mut session, "controller-input", Duration::from_millis(200)).await;

    let legacy = json!({"type": "BUTTON_PRESS", "button": "A"});
    session.emit("controller-input", legacy.clone()).await.unwrap();
    assert_eq!(expect_event(&mut session, "controller-input").await, legacy);

    session.close().await.unwrap();
    server.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ping_pong_reports_latency_for_registered_player() {
    let (server, addr) = start_server(100).await;
    let mut samples = server.prober().subscribe();
    let relay = server.relay().clone();

    // sessions answer pings themselves
    let mut anonymous = connect(addr).await;
    let mut player = connect(addr).await;
    player.emit("register-player", json!(3)).await.unwrap();
    wait_until(|| relay.registry().len() == 1).await;

    let ping = expect_event(&mut player, "ping").await;
    assert!(ping["t"].as_u64().is_some());
    expect_event(&mut anonymous, "ping").await;

    let sample = timeout(STEP, samples.recv()).await.unwrap().unwrap();
    assert_eq!(sample.player, PlayerIdentity::Number(3));
    assert!(sample.latency_ms < 5_000);

    anonymous.close().await.unwrap();
    player.close().await.unwrap();
    server.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_join_room_and_alias_track_membership() {
    let (server, addr) = start_server(60_000).await;
    let relay = server.relay().clone();

    let first = connect(addr).await;
    let second = connect(addr).await;
    first.emit("join-room", json!("couch")).await.unwrap();
    second.emit("channel-join", json!("couch")).await.unwrap();
    wait_until(|| relay.channels().members("couch").len() == 2).await;

    second.emit("leave-room", json!("couch")).await.unwrap();
    wait_until(|| relay.channels().members("couch").len() == 1).await;

    first.close().await.unwrap();
    wait_until(|| relay.channels().channel_count() == 0).await;

    second.close().await.unwrap();
    server.shutdown();
}
