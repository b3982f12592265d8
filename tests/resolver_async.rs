//! Async surface tests: scheduler offload and cancellation, against a
//! mock DNS server on the loopback interface.

use maildns::{AsyncDnsService, Error, Resolver, ServerSource};
use pretty_assertions::assert_eq;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Spawns a UDP server answering each request via `reply`; `None`
/// simulates a resolver that never answers.
fn spawn_server<F>(reply: F) -> SocketAddr
where
    F: Fn(&[u8]) -> Option<Vec<u8>> + Send + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").expect("failed to bind mock server");
    let addr = socket.local_addr().unwrap();

    thread::spawn(move || {
        let mut buf = [0; 4096];
        while let Ok((len, peer)) = socket.recv_from(&mut buf) {
            if let Some(datagram) = reply(&buf[..len]) {
                socket.send_to(&datagram, peer).unwrap();
            }
        }
    });

    addr
}

fn source(addr: SocketAddr) -> ServerSource {
    Arc::new(move || vec![addr])
}

/// NOERROR response to `req` with one MX answer: preference 10, exchange
/// pointing back at the QNAME.
fn mx_response(req: &[u8]) -> Vec<u8> {
    let mut qname_end = 12;
    while req[qname_end] != 0 {
        qname_end += 1 + req[qname_end] as usize;
    }
    let question = &req[12..qname_end + 5];

    let mut resp = Vec::new();
    resp.extend_from_slice(&req[0..2]);
    resp.extend_from_slice(&[0x81, 0x80]);
    resp.extend_from_slice(&[0, 1, 0, 1, 0, 0, 0, 0]);
    resp.extend_from_slice(question);
    resp.extend_from_slice(&[0xC0, 0x0C]); // owner = qname
    resp.extend_from_slice(&[0, 15, 0, 1, 0, 0, 0, 60, 0, 4]); // MX IN 60 rdlen 4
    resp.extend_from_slice(&[0, 10, 0xC0, 0x0C]); // preference 10, exchange = qname
    resp
}

#[tokio::test]
async fn async_lookup() {
    init_logging();
    let addr = spawn_server(|req| Some(mx_response(req)));

    let resolver = Resolver::new(source(addr));
    let cancel = CancellationToken::new();

    let records = resolver
        .get_mx_records("example.com", &cancel)
        .await
        .expect("lookup failed");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].preference, 10);
    assert_eq!(records[0].exchange, "example.com");
}

#[tokio::test]
async fn async_try_lookup_reports_absence_as_none() {
    init_logging();
    // No server listening: connect/send may succeed but the source yields
    // an unencodable name first, so the failure is pre-transport.
    let resolver = Resolver::new(Arc::new(Vec::new));
    let cancel = CancellationToken::new();

    let domain = format!("{}.com", "x".repeat(64));
    let got = resolver.try_get_mx_records(&domain, &cancel).await;

    assert!(matches!(got, Ok(None)));
}

#[tokio::test]
async fn cancellation_is_always_surfaced() {
    init_logging();
    let addr = spawn_server(|_| None); // never answers

    let resolver = Resolver::new(source(addr));
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let got = resolver.get_mx_records("example.com", &cancel).await;
    assert!(matches!(got, Err(Error::Cancelled)));

    // The non-throwing shape swallows lookup failures, but never
    // cancellation.
    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let got = resolver.try_get_mx_records("example.com", &cancelled).await;
    assert!(matches!(got, Err(Error::Cancelled)));
}
