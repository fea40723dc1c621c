use shrike_proxy::{ProxyRoute, RelayServer};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const ESTABLISHED: &[u8] = b"HTTP/1.1 200 Connection Established\r\n\r\n";

async fn read_header_block(conn: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    while !buf.ends_with(b"\r\n\r\n") {
        conn.read_exact(&mut byte).await.unwrap();
        buf.push(byte[0]);
    }
    String::from_utf8(buf).unwrap()
}

/// Mock upstream proxy: accepts one connection, returns the header block
/// it saw, then echoes one 5-byte payload back to the client.
fn spawn_echo_upstream(
    listener: TcpListener,
) -> tokio::task::JoinHandle<(String, [u8; 5])> {
    tokio::spawn(async move {
        let (mut conn, _) = listener.accept().await.unwrap();
        let header = read_header_block(&mut conn).await;
        conn.write_all(ESTABLISHED).await.unwrap();

        let mut payload = [0u8; 5];
        conn.read_exact(&mut payload).await.unwrap();
        conn.write_all(&payload).await.unwrap();
        (header, payload)
    })
}

#[tokio::test]
async fn test_connect_arrives_with_injected_basic_auth() {
    let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_port = upstream.local_addr().unwrap().port();
    let upstream_task = spawn_echo_upstream(upstream);

    let route = ProxyRoute::parse(&format!("http://u:p@127.0.0.1:{upstream_port}")).unwrap();
    let mut relay = RelayServer::new(route);
    let port = relay.start().await.unwrap();

    let mut client = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    client
        .write_all(b"CONNECT example.test:443 HTTP/1.1\r\nHost: example.test:443\r\n\r\n")
        .await
        .unwrap();

    let mut reply = vec![0u8; ESTABLISHED.len()];
    client.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, ESTABLISHED);

    // Post-header bytes must relay unchanged in both directions.
    client.write_all(b"hello").await.unwrap();
    let mut echoed = [0u8; 5];
    client.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"hello");

    let (header, payload) = upstream_task.await.unwrap();
    assert!(header.starts_with("CONNECT example.test:443 HTTP/1.1\r\n"));
    assert!(header.contains("Host: example.test:443\r\n"));
    assert!(header.contains("Proxy-Authorization: Basic dTpw\r\n"));
    assert_eq!(&payload, b"hello");

    relay.stop();
}

#[tokio::test]
async fn test_credential_free_route_forwards_header_unchanged() {
    let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_port = upstream.local_addr().unwrap().port();
    let upstream_task = spawn_echo_upstream(upstream);

    let route = ProxyRoute::parse(&format!("http://127.0.0.1:{upstream_port}")).unwrap();
    let mut relay = RelayServer::new(route);
    let port = relay.start().await.unwrap();

    let sent = b"CONNECT example.test:443 HTTP/1.1\r\nHost: example.test:443\r\n\r\n";
    let mut client = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    client.write_all(sent).await.unwrap();

    let mut reply = vec![0u8; ESTABLISHED.len()];
    client.read_exact(&mut reply).await.unwrap();
    client.write_all(b"12345").await.unwrap();

    let (header, _) = upstream_task.await.unwrap();
    assert_eq!(header.as_bytes(), sent);
    assert!(!header.contains("Proxy-Authorization"));

    relay.stop();
}

#[tokio::test]
async fn test_failed_session_leaves_listener_accepting() {
    let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_port = upstream.local_addr().unwrap().port();

    // First connection is dropped without a byte; second one is served.
    let upstream_task = tokio::spawn(async move {
        let (conn, _) = upstream.accept().await.unwrap();
        drop(conn);

        let (mut conn, _) = upstream.accept().await.unwrap();
        let header = read_header_block(&mut conn).await;
        conn.write_all(ESTABLISHED).await.unwrap();
        header
    });

    let route = ProxyRoute::parse(&format!("http://u:p@127.0.0.1:{upstream_port}")).unwrap();
    let mut relay = RelayServer::new(route);
    let port = relay.start().await.unwrap();

    let request = b"CONNECT a.test:443 HTTP/1.1\r\n\r\n";

    let mut first = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let _ = first.write_all(request).await;
    // The dropped upstream ends this session; the relay must survive it.
    let mut sink = Vec::new();
    let _ = first.read_to_end(&mut sink).await;

    let mut second = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    second.write_all(request).await.unwrap();
    let mut reply = vec![0u8; ESTABLISHED.len()];
    second.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, ESTABLISHED);

    let header = upstream_task.await.unwrap();
    assert!(header.contains("Proxy-Authorization: Basic dTpw\r\n"));

    relay.stop();
}

#[tokio::test]
async fn test_stop_refuses_new_connections() {
    let route = ProxyRoute::parse("http://u:p@127.0.0.1:1").unwrap();
    let mut relay = RelayServer::new(route);
    let port = relay.start().await.unwrap();
    assert_eq!(relay.local_port(), Some(port));

    relay.stop();
    assert_eq!(relay.local_port(), None);

    // Give the accept loop a moment to observe the shutdown signal.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let refused = TcpStream::connect(("127.0.0.1", port)).await;
    assert!(refused.is_err());
}
