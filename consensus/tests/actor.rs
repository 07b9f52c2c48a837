//! The engine driven through its owning task.

use snowstorm_consensus::{spawn, ConsensusError, EngineConfig};
use snowstorm_nullables::{NullTransitionGraph, NullTx};
use snowstorm_types::{Bag, Parameters, Status, Tx};
use std::collections::HashSet;

fn config() -> EngineConfig {
    EngineConfig {
        command_buffer: 8,
        parameters: Parameters::new(3, 2, 1, 2),
        ..EngineConfig::default()
    }
}

fn votes(name: &str) -> Bag {
    Bag::new()
        .with_vote("peer1", NullTx::id_of(name))
        .with_vote("peer2", NullTx::id_of(name))
}

#[tokio::test]
async fn handle_drives_engine_to_finality() {
    let _ = config().init_logging();
    let graph = NullTransitionGraph::new();
    let engine = config().build::<NullTx, _>(graph.clone()).unwrap();
    let (handle, task) = spawn(engine, config().command_buffer);

    handle.add(NullTx::new("x").spending("u")).await.unwrap();
    handle.add(NullTx::new("y").spending("u")).await.unwrap();
    assert_eq!(
        handle.conflicts(NullTx::id_of("x")).await.unwrap(),
        HashSet::from([NullTx::id_of("y")])
    );
    assert!(handle.virtuous().await.unwrap().is_empty());
    assert!(handle.quiesce().await.unwrap());

    handle.record_poll(votes("y")).await.unwrap();
    let result = handle.record_poll(votes("y")).await.unwrap();
    let accepted: Vec<_> = result.accepted.iter().map(Tx::id).collect();
    assert_eq!(accepted, vec![NullTx::id_of("y")]);

    assert_eq!(handle.status(NullTx::id_of("x")).await.unwrap(), Status::Rejected);
    assert!(handle.finalized().await.unwrap());

    drop(handle);
    let engine = task.await.unwrap();
    assert_eq!(engine.stats().get("accepted"), 1);
}

#[tokio::test]
async fn clones_share_one_engine() {
    let engine = config().build::<NullTx, _>(NullTransitionGraph::new()).unwrap();
    let (handle, _task) = spawn(engine, 8);
    let other = handle.clone();

    other.add(NullTx::new("x").spending("u")).await.unwrap();
    let tx = handle.get(NullTx::id_of("x")).await.unwrap();
    assert_eq!(tx.id(), NullTx::id_of("x"));
    assert_eq!(
        handle
            .processing_txs(NullTx::transition_of("x"))
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(handle.is_virtuous(NullTx::new("z").spending("w")).await.unwrap());
    assert_eq!(
        handle.preferences().await.unwrap(),
        HashSet::from([NullTx::id_of("x")])
    );
    assert!(handle
        .describe()
        .await
        .unwrap()
        .starts_with("SS(NumSets = 1, Processing = 1, Pending = 0)"));
}

#[tokio::test]
async fn membership_queries_cross_the_channel() {
    let engine = config().build::<NullTx, _>(NullTransitionGraph::new()).unwrap();
    let (handle, _task) = spawn(engine, 8);
    let x = NullTx::id_of("x");

    assert!(!handle.issued(x).await.unwrap());
    handle.add(NullTx::new("x").spending("u")).await.unwrap();
    assert!(handle.issued(x).await.unwrap());
    assert!(handle.is_processing(x).await.unwrap());
    assert!(handle.processing(NullTx::transition_of("x")).await.unwrap());
    assert!(!handle.processing(NullTx::transition_of("y")).await.unwrap());
    assert_eq!(handle.confidence(x).await.unwrap(), Some(0));
    assert_eq!(handle.parameters().await.unwrap(), Parameters::new(3, 2, 1, 2));

    handle.record_poll(votes("x")).await.unwrap();
    assert!(handle.issued(x).await.unwrap());
    assert!(!handle.is_processing(x).await.unwrap());
    assert!(!handle.processing(NullTx::transition_of("x")).await.unwrap());
    assert_eq!(handle.confidence(x).await.unwrap(), None);
}

#[tokio::test]
async fn errors_cross_the_channel() {
    let engine = config().build::<NullTx, _>(NullTransitionGraph::new()).unwrap();
    let (handle, _task) = spawn(engine, 8);

    assert!(matches!(
        handle.get(NullTx::id_of("missing")).await,
        Err(ConsensusError::NotFound(_))
    ));
    let err = handle.add(NullTx::new("f").faulty()).await.unwrap_err();
    assert!(err.is_critical());
}

#[tokio::test]
async fn stopped_task_reports_closed_channel() {
    let engine = config().build::<NullTx, _>(NullTransitionGraph::new()).unwrap();
    let (handle, task) = spawn(engine, 8);
    task.abort();
    let _ = task.await;

    assert!(matches!(
        handle.finalized().await,
        Err(ConsensusError::ChannelClosed)
    ));
}
