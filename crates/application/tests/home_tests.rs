mod common;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use application::floor_heating::HeatingLoops;
use application::home::{Controller, HouseSummary, room_serial};
use common::{CallLog, GatedRelay, RecordingRelay};
use domain::{Features, HomeTopology, Humidity, Level, Relay, RelayGroup, RoomLoops, SensorAddress, Temperature};
use infrastructure::sensors::SensorRegistry;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const LIVING_SENSOR: SensorAddress = SensorAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01]);
const KITCHEN_SENSOR: SensorAddress = SensorAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x02]);

fn topology() -> HomeTopology {
    HomeTopology {
        server_port: 0,
        tick: Duration::from_millis(50),
        valve: "127.0.0.1:1".parse().unwrap(),
        levels: vec![Level {
            kind: "ground".to_string(),
            manifold: "127.0.0.1:2".parse().unwrap(),
            pump: 7,
            rooms: vec![
                RoomLoops {
                    name: "living".to_string(),
                    sensor: LIVING_SENSOR,
                    loops: vec![0, 1],
                },
                RoomLoops {
                    name: "kitchen".to_string(),
                    sensor: KITCHEN_SENSOR,
                    loops: vec![2],
                },
            ],
        }],
    }
}

async fn loops(log: &CallLog) -> HeatingLoops {
    let group = RelayGroup {
        pump: RecordingRelay::new("pump", log),
        rooms: vec![
            ("living".to_string(), RecordingRelay::new("living", log) as Arc<dyn Relay>),
            ("kitchen".to_string(), RecordingRelay::new("kitchen", log) as Arc<dyn Relay>),
        ],
    };
    HeatingLoops::build(RecordingRelay::new("valve", log), vec![group]).await
}

async fn read_line(address: SocketAddr) -> (String, Option<String>) {
    let stream = TcpStream::connect(address).await.unwrap();
    let mut lines = BufReader::new(stream).lines();
    let first = lines.next_line().await.unwrap().unwrap();
    let rest = lines.next_line().await.unwrap();
    (first, rest)
}

#[tokio::test]
async fn test_discovery_lists_rooms_then_closes() {
    let log = CallLog::default();
    let loops = loops(&log).await;
    let sensors = SensorRegistry::new();
    let controller = Controller::build(&topology(), &loops, &sensors, LOCALHOST)
        .await
        .unwrap();
    let port = controller.discovery_port().unwrap();

    let token = CancellationToken::new();
    let task = tokio::spawn(controller.run(token.clone()));

    let (line, rest) = read_line(SocketAddr::new(LOCALHOST, port)).await;
    assert_eq!(rest, None);

    let summary: HouseSummary = serde_json::from_str(&line).unwrap();
    assert_eq!(summary.version, env!("CARGO_PKG_VERSION"));
    let names: Vec<_> = summary.rooms.iter().map(|room| room.name.as_str()).collect();
    assert_eq!(names, vec!["living", "kitchen"]);
    for room in &summary.rooms {
        assert_eq!(room.features, Features::FLOOR_HEATING);
        assert_eq!(room.serial, room_serial(&room.name, Features::FLOOR_HEATING));
        assert_ne!(room.port, 0);
    }

    // a second client gets the identical summary
    let (again, _) = read_line(SocketAddr::new(LOCALHOST, port)).await;
    assert_eq!(again, line);

    token.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_room_endpoint_serves_live_status() {
    let log = CallLog::default();
    let loops = loops(&log).await;
    let sensors = SensorRegistry::new();
    sensors
        .sensor(LIVING_SENSOR)
        .update(Temperature::from_tenths(195), Humidity::from_percent(41))
        .await;

    let controller = Controller::build(&topology(), &loops, &sensors, LOCALHOST)
        .await
        .unwrap();
    let living = controller
        .discovery()
        .summary()
        .rooms
        .iter()
        .find(|room| room.name == "living")
        .unwrap()
        .port;

    let token = CancellationToken::new();
    let task = tokio::spawn(controller.run(token.clone()));

    // let the thermostats initialize
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stream = TcpStream::connect(SocketAddr::new(LOCALHOST, living)).await.unwrap();
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    write.write_all(b"{\"type\":\"set_control\",\"target_temperature\":22.0,\"target_state\":\"heat\"}\n").await.unwrap();
    let response: serde_json::Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(response["success"], true);

    // the next tick switches the heating on and pushes a notification
    let notification = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let line = lines.next_line().await.unwrap().unwrap();
            let message: serde_json::Value = serde_json::from_str(&line).unwrap();
            if message["type"] == "notify_status" && message["status"]["current_state"] == "heat" {
                return message;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(notification["status"]["current_temperature"], 19.5);
    assert_eq!(notification["status"]["target_temperature"], 22.0);

    let calls = log.calls().await;
    assert!(calls.contains(&"living on".to_string()));
    assert!(calls.contains(&"pump on".to_string()));
    assert!(calls.contains(&"valve on".to_string()));

    token.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_missing_room_loop_is_a_configuration_error() {
    let log = CallLog::default();
    let loops = HeatingLoops::build(RecordingRelay::new("valve", &log), Vec::new()).await;
    let sensors = SensorRegistry::new();

    let result = Controller::build(&topology(), &loops, &sensors, LOCALHOST).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_discovery_waits_for_every_room_to_be_ready() {
    let log = CallLog::default();
    let living = GatedRelay::new("living", &log);
    let group = RelayGroup {
        pump: RecordingRelay::new("pump", &log),
        rooms: vec![
            ("living".to_string(), living.clone() as Arc<dyn Relay>),
            ("kitchen".to_string(), RecordingRelay::new("kitchen", &log) as Arc<dyn Relay>),
        ],
    };
    let loops = HeatingLoops::build(RecordingRelay::new("valve", &log), vec![group]).await;
    let sensors = SensorRegistry::new();
    let controller = Controller::build(&topology(), &loops, &sensors, LOCALHOST)
        .await
        .unwrap();
    let port = controller.discovery_port().unwrap();

    let token = CancellationToken::new();
    let task = tokio::spawn(controller.run(token.clone()));

    let stream = TcpStream::connect(SocketAddr::new(LOCALHOST, port)).await.unwrap();
    let mut lines = BufReader::new(stream).lines();

    // living is still switching its loop off
    let early = tokio::time::timeout(Duration::from_millis(300), lines.next_line()).await;
    assert!(early.is_err());
    assert!(log.calls().await.contains(&"kitchen off".to_string()));
    assert!(!log.calls().await.contains(&"living off".to_string()));

    living.open();
    let line = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let summary: HouseSummary = serde_json::from_str(&line).unwrap();
    assert_eq!(summary.rooms.len(), 2);

    token.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_cancel_while_waiting_for_rooms() {
    let log = CallLog::default();
    let group = RelayGroup {
        pump: RecordingRelay::new("pump", &log),
        rooms: vec![
            ("living".to_string(), GatedRelay::new("living", &log) as Arc<dyn Relay>),
            ("kitchen".to_string(), RecordingRelay::new("kitchen", &log) as Arc<dyn Relay>),
        ],
    };
    let loops = HeatingLoops::build(RecordingRelay::new("valve", &log), vec![group]).await;
    let sensors = SensorRegistry::new();
    let controller = Controller::build(&topology(), &loops, &sensors, LOCALHOST)
        .await
        .unwrap();

    let token = CancellationToken::new();
    let task = tokio::spawn(controller.run(token.clone()));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!task.is_finished());

    token.cancel();
    let stopped = tokio::time::timeout(Duration::from_secs(2), task).await;
    assert!(matches!(stopped, Ok(Ok(Ok(())))));
}
