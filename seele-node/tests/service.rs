//! Node-level tests over real TCP connections on localhost.

use std::time::Duration;

use num_bigint::BigUint;
use seele_node::chain::GENESIS_HASH;
use seele_node::config::{random_node_id, NodeConfig};
use seele_node::{Node, NodeError};
use seele_p2p::PeerEvent;
use tokio::sync::broadcast::Receiver;
use tokio::time::timeout;

/// Timeout for any single expected event.
const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

fn test_config(network_id: u64) -> NodeConfig {
    NodeConfig {
        listen: "127.0.0.1:0".parse().unwrap(),
        network_id,
        node_id: random_node_id(),
        handshake_timeout: Duration::from_secs(2),
        ..NodeConfig::default()
    }
}

fn events(node: &Node) -> Receiver<PeerEvent> {
    node.service().protocol().subscribe()
}

/// Wait for the first event matching `pred`, skipping others.
async fn wait_for<F>(rx: &mut Receiver<PeerEvent>, pred: F) -> PeerEvent
where
    F: Fn(&PeerEvent) -> bool,
{
    timeout(EVENT_TIMEOUT, async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for peer event")
}

fn is_registered(event: &PeerEvent) -> bool {
    matches!(event, PeerEvent::Registered { .. })
}

#[tokio::test]
async fn test_two_nodes_connect() {
    let a = Node::new(test_config(1));
    let b = Node::new(test_config(1));
    let mut events_a = events(&a);
    let mut events_b = events(&b);

    a.start().await.unwrap();
    let addr_b = b.start().await.unwrap();

    let remote = a.connect(addr_b).await.unwrap();
    assert_eq!(remote, b.config().node_id);

    wait_for(&mut events_a, is_registered).await;
    wait_for(&mut events_b, is_registered).await;

    let api = &a.service().apis()[0].service;
    assert_eq!(api.peer_count(), 1);
    assert_eq!(api.net_version(), 1);

    let json = api.peer_infos_json().unwrap();
    assert_eq!(json[0]["version"], seele_p2p::PROTOCOL_VERSION);
    assert_eq!(json[0]["difficulty"], "1");
    assert_eq!(json[0]["head"], hex::encode(GENESIS_HASH));

    a.stop().await;
    b.stop().await;
}

#[tokio::test]
async fn test_network_mismatch_leaves_no_peers() {
    let a = Node::new(test_config(1));
    let c = Node::new(test_config(2));
    let mut events_a = events(&a);

    a.start().await.unwrap();
    let addr_c = c.start().await.unwrap();

    a.connect(addr_c).await.unwrap();
    wait_for(&mut events_a, |e| matches!(e, PeerEvent::HandshakeFailed { .. })).await;

    assert_eq!(a.service().protocol().peer_count(), 0);
    assert_eq!(c.service().protocol().peer_count(), 0);

    a.stop().await;
    c.stop().await;
}

#[tokio::test]
async fn test_self_dial_rejected() {
    let a = Node::new(test_config(1));
    let addr = a.start().await.unwrap();

    let result = a.connect(addr).await;
    assert!(matches!(result, Err(NodeError::SelfConnection(_))));
    assert_eq!(a.service().protocol().peer_count(), 0);

    a.stop().await;
}

#[tokio::test]
async fn test_block_relayed_across_hops() {
    let a = Node::new(test_config(1));
    let b = Node::new(test_config(1));
    let c = Node::new(test_config(1));
    let mut events_a = events(&a);
    let mut events_b = events(&b);
    let mut events_c = events(&c);

    a.start().await.unwrap();
    let addr_b = b.start().await.unwrap();
    let addr_c = c.start().await.unwrap();

    // A - B - C
    a.connect(addr_b).await.unwrap();
    wait_for(&mut events_a, is_registered).await;
    wait_for(&mut events_b, is_registered).await;
    b.connect(addr_c).await.unwrap();
    wait_for(&mut events_b, is_registered).await;
    wait_for(&mut events_c, is_registered).await;

    let block = [0x42; 32];
    let sent = a
        .service()
        .protocol()
        .broadcast_block(block, BigUint::from(10u32), vec![0xAB; 8])
        .unwrap();
    assert_eq!(sent, 1);

    let event = wait_for(&mut events_c, |e| matches!(e, PeerEvent::NewBlock { .. })).await;
    match event {
        PeerEvent::NewBlock { hash, total_difficulty, payload, .. } => {
            assert_eq!(hash, block);
            assert_eq!(total_difficulty, BigUint::from(10u32));
            assert_eq!(payload, vec![0xAB; 8]);
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert_eq!(b.service().block_chain().tip(), (block, BigUint::from(10u32)));

    a.stop().await;
    b.stop().await;
    c.stop().await;
}

#[tokio::test]
async fn test_transaction_relayed_into_pool() {
    let a = Node::new(test_config(1));
    let b = Node::new(test_config(1));
    let mut events_a = events(&a);
    let mut events_b = events(&b);

    a.start().await.unwrap();
    let addr_b = b.start().await.unwrap();
    a.connect(addr_b).await.unwrap();
    wait_for(&mut events_a, is_registered).await;

    let tx = [0x77; 32];
    assert_eq!(a.service().protocol().broadcast_transaction(tx, vec![1, 2]).unwrap(), 1);
    wait_for(&mut events_b, |e| matches!(e, PeerEvent::NewTransaction { .. })).await;

    // The relay task runs on its own; give it a moment to land the transaction.
    timeout(EVENT_TIMEOUT, async {
        while !b.service().tx_pool().contains(&tx) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("transaction never reached the pool");

    a.stop().await;
    b.stop().await;
}

#[tokio::test]
async fn test_stop_disconnects_remote() {
    let a = Node::new(test_config(1));
    let b = Node::new(test_config(1));
    let mut events_a = events(&a);
    let mut events_b = events(&b);

    a.start().await.unwrap();
    let addr_b = b.start().await.unwrap();
    a.connect(addr_b).await.unwrap();
    wait_for(&mut events_a, is_registered).await;
    wait_for(&mut events_b, is_registered).await;

    a.stop().await;

    let event = wait_for(&mut events_b, |e| matches!(e, PeerEvent::Unregistered { .. })).await;
    assert!(matches!(
        event,
        PeerEvent::Unregistered { reason: seele_p2p::DisconnectReason::Shutdown, .. }
    ));
    assert_eq!(b.service().protocol().peer_count(), 0);

    b.stop().await;
}
