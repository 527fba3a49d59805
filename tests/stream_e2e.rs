//! End-to-end tests over loopback sockets.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use spineml_client::{wire, Client, Role};
use spineml_net::config::{PreloadConfig, RelayRoute};
use spineml_net::host::DataDestination;

mod common;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn target_client_receives_host_data_in_batches() {
    let running = common::start_server(common::test_config()).await;
    let addr = running.local_addr();
    let host = running.host().clone();

    let mut client = tokio::task::spawn_blocking(move || {
        let client = Client::connect(addr, Role::Target, 3, "out").unwrap();
        client.set_read_timeout(Some(WAIT)).unwrap();
        client
    })
    .await
    .unwrap();

    assert!(common::eventually(|| host.find("out").is_some(), WAIT).await);
    let destination = host.add_data("out", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert!(matches!(destination, DataDestination::Connection(_)));

    let batches = tokio::task::spawn_blocking(move || {
        let first = client.recv_batch().unwrap();
        let second = client.recv_batch().unwrap();
        (first, second)
    })
    .await
    .unwrap();

    assert_eq!(batches.0, vec![1.0, 2.0, 3.0]);
    assert_eq!(batches.1, vec![4.0, 5.0, 6.0]);
    assert!(running.stop(WAIT).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn source_client_batches_reach_the_host() {
    let running = common::start_server(common::test_config()).await;
    let addr = running.local_addr();
    let host = running.host().clone();

    tokio::task::spawn_blocking(move || {
        let mut client = Client::connect(addr, Role::Source, 2, "in").unwrap();
        client.send_batch(&[0.25, 0.5]).unwrap();
        client.send_batch(&[0.75, 1.0]).unwrap();
        client.close().unwrap();
    })
    .await
    .unwrap();

    // values are collected whether the worker is still running or has parked them
    let mut collected = Vec::new();
    let deadline = tokio::time::Instant::now() + WAIT;
    while collected.len() < 4 && tokio::time::Instant::now() < deadline {
        collected.extend(host.take_data("in"));
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(collected, vec![0.25, 0.5, 0.75, 1.0]);
    assert!(running.stop(WAIT).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn preloaded_values_are_adopted_on_connect() {
    let mut config = common::test_config();
    config.preload.push(PreloadConfig {
        name: "pop1".into(),
        values: vec![9.9],
    });
    let running = common::start_server(config).await;
    let addr = running.local_addr();

    let batch = tokio::task::spawn_blocking(move || {
        let mut client = Client::connect(addr, Role::Target, 1, "pop1").unwrap();
        client.set_read_timeout(Some(WAIT)).unwrap();
        client.recv_batch().unwrap()
    })
    .await
    .unwrap();

    assert_eq!(batch, vec![9.9]);
    assert!(!running.host().registry().contains("pop1"));
    assert!(running.stop(WAIT).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn spike_streams_are_refused() {
    let running = common::start_server(common::test_config()).await;
    let addr = running.local_addr();

    let (hello, after) = tokio::task::spawn_blocking(move || {
        let mut socket = TcpStream::connect(addr).unwrap();
        socket.set_read_timeout(Some(WAIT)).unwrap();
        socket.write_all(&[wire::AM_SOURCE]).unwrap();
        let mut hello = [0u8; 1];
        socket.read_exact(&mut hello).unwrap();

        socket.write_all(&[wire::RESP_DATA_SPIKES]).unwrap();
        let mut rest = [0u8; 1];
        // the server closes without replying
        let after = socket.read(&mut rest).unwrap_or(0);
        (hello[0], after)
    })
    .await
    .unwrap();

    assert_eq!(hello, wire::RESP_HELLO);
    assert_eq!(after, 0);
    assert!(common::eventually(|| running.tracker().active_count() == 0, WAIT).await);
    assert!(running.stop(WAIT).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn relay_forwards_source_to_target() {
    let mut config = common::test_config();
    config.relay.push(RelayRoute {
        from: "a_out".into(),
        to: "b_in".into(),
    });
    let running = common::start_server(config).await;
    let addr = running.local_addr();

    let source = tokio::task::spawn_blocking(move || {
        let mut source = Client::connect(addr, Role::Source, 2, "a_out").unwrap();
        source.send_batch(&[3.0, 4.0]).unwrap();
        source
    })
    .await
    .unwrap();

    // no target yet, so the relay parks the values in the registry
    let registry = running.host().registry().clone();
    assert!(common::eventually(|| registry.pending("b_in") == 2, WAIT).await);

    let received = tokio::task::spawn_blocking(move || {
        let mut target = Client::connect(addr, Role::Target, 2, "b_in").unwrap();
        target.set_read_timeout(Some(WAIT)).unwrap();
        target.recv_batch().unwrap()
    })
    .await
    .unwrap();
    drop(source);

    assert_eq!(received, vec![3.0, 4.0]);
    assert!(running.stop(WAIT).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_client_with_a_live_name_is_refused() {
    let running = common::start_server(common::test_config()).await;
    let addr = running.local_addr();
    let host = running.host().clone();

    let first = tokio::task::spawn_blocking(move || Client::connect(addr, Role::Target, 1, "dup").unwrap())
        .await
        .unwrap();
    assert!(common::eventually(|| host.find("dup").is_some(), WAIT).await);

    let second = tokio::task::spawn_blocking(move || {
        let mut socket = TcpStream::connect(addr).unwrap();
        socket.set_read_timeout(Some(WAIT)).unwrap();
        socket.write_all(&[wire::AM_TARGET]).unwrap();
        let mut reply = [0u8; 1];
        socket.read_exact(&mut reply).unwrap();
        socket.write_all(&[wire::RESP_DATA_NUMS]).unwrap();
        socket.read_exact(&mut reply).unwrap();
        socket.write_all(&1u32.to_le_bytes()).unwrap();
        socket.read_exact(&mut reply).unwrap();
        socket.write_all(&3u32.to_le_bytes()).unwrap();
        socket.write_all(b"dup").unwrap();
        // the name is refused: the server closes instead of acknowledging
        socket.read(&mut reply).unwrap_or(0)
    })
    .await
    .unwrap();

    assert_eq!(second, 0);
    assert_eq!(host.active_count(), 1);
    drop(first);
    assert!(running.stop(WAIT).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_closes_idle_connections() {
    let running = common::start_server(common::test_config()).await;
    let addr = running.local_addr();
    let host = running.host().clone();

    let idle = tokio::task::spawn_blocking(move || Client::connect(addr, Role::Source, 1, "quiet").unwrap())
        .await
        .unwrap();
    assert!(common::eventually(|| host.active_count() == 1, WAIT).await);

    let tracker = running.tracker().clone();
    assert!(running.stop(WAIT).await);
    assert_eq!(tracker.active_count(), 0);
    assert!(host.find("quiet").is_none());
    drop(idle);
}
