//! End-to-end tests: a real proxy in front of an in-process fake cluster
//! node that owns all 16384 slots.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use shardgate::config::ProxyConfig;
use shardgate::proto::codec::{Decoder, Encoder};
use shardgate::proto::frame::Frame;
use shardgate::proxy::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

type Store = Arc<Mutex<HashMap<String, Bytes>>>;

fn text(frame: &Frame) -> String {
    frame
        .string_payload()
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default()
}

fn matches_pattern(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => pattern == key,
    }
}

fn handle(store: &Store, port: u16, parts: &[Frame]) -> Frame {
    let args: Vec<String> = parts.iter().map(text).collect();
    let mut data = store.lock().unwrap();
    match args[0].to_uppercase().as_str() {
        "CLUSTER" => Frame::Array(vec![Frame::Array(vec![
            Frame::Integer(0),
            Frame::Integer(16383),
            Frame::Array(vec![
                Frame::bulk("127.0.0.1"),
                Frame::Integer(port as i64),
                Frame::bulk("fake-node"),
            ]),
        ])]),
        "PING" => Frame::SimpleString(b"PONG".to_vec()),
        "GET" | "MGET" => match data.get(&args[1]) {
            Some(v) if args[0].eq_ignore_ascii_case("get") => Frame::BulkString(Some(v.clone())),
            Some(v) => Frame::Array(vec![Frame::BulkString(Some(v.clone()))]),
            None if args[0].eq_ignore_ascii_case("get") => Frame::Null,
            None => Frame::Array(vec![Frame::Null]),
        },
        "SET" | "MSET" => {
            data.insert(args[1].clone(), Bytes::from(args[2].clone()));
            Frame::ok()
        }
        "DEL" => Frame::Integer(data.remove(&args[1]).map_or(0, |_| 1)),
        "KEYS" => {
            let mut keys: Vec<&String> = data.keys().filter(|k| matches_pattern(&args[1], k)).collect();
            keys.sort();
            Frame::Array(keys.into_iter().map(|k| Frame::bulk(k.clone())).collect())
        }
        "FLUSHALL" => {
            data.clear();
            Frame::ok()
        }
        "SELECT" => Frame::ok(),
        _ => Frame::Error(format!("ERR unknown command '{}'", args[0]).into_bytes()),
    }
}

async fn spawn_fake_node(store: Store) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let store = store.clone();
            tokio::spawn(async move {
                let mut decoder = Decoder::new();
                let mut encoder = Encoder::new();
                let mut buf = [0u8; 4096];
                loop {
                    let n = match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => n,
                    };
                    decoder.append(&buf[..n]);
                    while let Ok(Some(Frame::Array(parts))) = decoder.decode() {
                        encoder.encode(&handle(&store, addr.port(), &parts));
                    }
                    if socket.write_all(&encoder.take()).await.is_err() {
                        return;
                    }
                }
            });
        }
    });
    addr
}

async fn spawn_proxy(upstream: SocketAddr) -> SocketAddr {
    let config = ProxyConfig::builder()
        .listen("127.0.0.1:0")
        .upstreams(upstream.to_string())
        .build()
        .unwrap();
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

struct TestClient {
    stream: TcpStream,
    decoder: Decoder,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.unwrap(),
            decoder: Decoder::new(),
        }
    }

    async fn send(&mut self, parts: &[&str]) {
        let mut encoder = Encoder::new();
        encoder.encode(&Frame::Array(parts.iter().map(|p| Frame::bulk(p.to_string())).collect()));
        self.stream.write_all(&encoder.take()).await.unwrap();
    }

    async fn read(&mut self) -> Option<Frame> {
        let mut buf = [0u8; 4096];
        loop {
            if let Some(frame) = self.decoder.decode().unwrap() {
                return Some(frame);
            }
            let n = self.stream.read(&mut buf).await.unwrap();
            if n == 0 {
                return None;
            }
            self.decoder.append(&buf[..n]);
        }
    }

    async fn call(&mut self, parts: &[&str]) -> Frame {
        self.send(parts).await;
        self.read().await.expect("connection closed")
    }
}

fn simple(s: &str) -> Frame {
    Frame::SimpleString(s.as_bytes().to_vec())
}

#[tokio::test]
async fn test_get_set_through_proxy() {
    let store = Store::default();
    let node = spawn_fake_node(store.clone()).await;
    let proxy = spawn_proxy(node).await;
    let mut client = TestClient::connect(proxy).await;

    assert_eq!(client.call(&["PING"]).await, simple("PONG"));
    assert_eq!(client.call(&["SET", "foo", "bar"]).await, simple("OK"));
    assert_eq!(client.call(&["GET", "foo"]).await, simple("bar"));
    assert!(client.call(&["GET", "missing"]).await.is_null());
    assert_eq!(store.lock().unwrap().get("foo"), Some(&Bytes::from("bar")));
}

#[tokio::test]
async fn test_pipelined_replies_keep_order() {
    let node = spawn_fake_node(Store::default()).await;
    let proxy = spawn_proxy(node).await;
    let mut client = TestClient::connect(proxy).await;

    for i in 0..50 {
        let key = format!("k{}", i);
        let value = i.to_string();
        client.send(&["SET", key.as_str(), value.as_str()]).await;
        client.send(&["GET", key.as_str()]).await;
    }
    for i in 0..50 {
        assert_eq!(client.read().await, Some(simple("OK")));
        assert_eq!(client.read().await, Some(simple(i.to_string().as_str())));
    }
}

#[tokio::test]
async fn test_aggregated_commands() {
    let node = spawn_fake_node(Store::default()).await;
    let proxy = spawn_proxy(node).await;
    let mut client = TestClient::connect(proxy).await;

    assert_eq!(client.call(&["MSET", "a", "1", "b", "2"]).await, simple("OK"));
    assert_eq!(
        client.call(&["MGET", "a", "nope", "b"]).await,
        Frame::Array(vec![simple("1"), Frame::BulkString(None), simple("2")])
    );
    assert_eq!(
        client.call(&["KEYS", "*"]).await,
        Frame::Array(vec![simple("a"), simple("b")])
    );
    assert_eq!(
        client.call(&["SCAN", "0", "MATCH", "a*"]).await,
        Frame::Array(vec![simple("0"), Frame::Array(vec![simple("a")])])
    );
    assert_eq!(client.call(&["DEL", "a", "b", "c"]).await, Frame::Integer(2));
    assert_eq!(client.call(&["SELECT", "3"]).await, simple("OK"));
    assert_eq!(client.call(&["FLUSHALL"]).await, simple("OK"));
    assert_eq!(client.call(&["KEYS", "*"]).await, Frame::Array(vec![]));
}

#[tokio::test]
async fn test_errors_are_forwarded() {
    let node = spawn_fake_node(Store::default()).await;
    let proxy = spawn_proxy(node).await;
    let mut client = TestClient::connect(proxy).await;

    assert_eq!(
        client.call(&["BOGUS"]).await,
        Frame::Error(b"ERR unknown command 'BOGUS'".to_vec())
    );
    assert!(matches!(client.call(&["KEYS"]).await, Frame::Error(_)));
    assert_eq!(client.call(&["PING"]).await, simple("PONG"));
}

#[tokio::test]
async fn test_quit_closes_connection() {
    let node = spawn_fake_node(Store::default()).await;
    let proxy = spawn_proxy(node).await;
    let mut client = TestClient::connect(proxy).await;

    client.send(&["SET", "x", "1"]).await;
    client.send(&["QUIT"]).await;
    assert_eq!(client.read().await, Some(simple("OK")));
    assert_eq!(client.read().await, Some(simple("OK")));
    assert_eq!(client.read().await, None);
}

#[tokio::test]
async fn test_unreachable_cluster_answers_with_errors() {
    let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = dead.local_addr().unwrap();
    drop(dead);

    let proxy = spawn_proxy(dead_addr).await;
    let mut client = TestClient::connect(proxy).await;

    assert!(matches!(client.call(&["GET", "foo"]).await, Frame::Error(_)));
    assert!(matches!(client.call(&["PING"]).await, Frame::Error(_)));
}

#[tokio::test]
async fn test_clients_are_independent() {
    let node = spawn_fake_node(Store::default()).await;
    let proxy = spawn_proxy(node).await;
    let mut first = TestClient::connect(proxy).await;
    let mut second = TestClient::connect(proxy).await;

    assert_eq!(first.call(&["SET", "shared", "v"]).await, simple("OK"));
    drop(first);
    assert_eq!(second.call(&["GET", "shared"]).await, simple("v"));
}
