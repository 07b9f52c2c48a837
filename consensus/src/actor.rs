//! Owning task for a [`Snowstorm`] engine.
//!
//! The engine is not internally synchronized. [`spawn`] moves it into a
//! tokio task that applies [`Command`]s one at a time from an `mpsc`
//! channel, which serializes every mutation and query. [`EngineHandle`] is
//! the cloneable async facade callers hold; each call sends a command and
//! awaits the `oneshot` reply. The task ends once every handle is dropped
//! and yields the engine back through its `JoinHandle`.

use crate::error::ConsensusError;
use crate::snowstorm::{PollResult, Snowstorm};
use snowstorm_types::{Bag, Parameters, Status, TransitionGraph, TransitionId, Tx, TxId};
use std::collections::HashSet;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

type Reply<R> = oneshot::Sender<R>;

/// Requests understood by the engine task.
pub enum Command<T> {
    Add {
        tx: T,
        reply: Reply<Result<(), ConsensusError>>,
    },
    RecordPoll {
        bag: Bag,
        reply: Reply<Result<PollResult<T>, ConsensusError>>,
    },
    IsVirtuous {
        tx: T,
        reply: Reply<Result<bool, ConsensusError>>,
    },
    Conflicts {
        id: TxId,
        reply: Reply<Result<HashSet<TxId>, ConsensusError>>,
    },
    Get {
        id: TxId,
        reply: Reply<Result<T, ConsensusError>>,
    },
    Status {
        id: TxId,
        reply: Reply<Status>,
    },
    Issued {
        id: TxId,
        reply: Reply<bool>,
    },
    IsProcessing {
        id: TxId,
        reply: Reply<bool>,
    },
    Processing {
        transition: TransitionId,
        reply: Reply<bool>,
    },
    Confidence {
        id: TxId,
        reply: Reply<Option<u32>>,
    },
    Parameters {
        reply: Reply<Parameters>,
    },
    ProcessingTxs {
        transition: TransitionId,
        reply: Reply<Vec<T>>,
    },
    Virtuous {
        reply: Reply<HashSet<TxId>>,
    },
    Preferences {
        reply: Reply<HashSet<TxId>>,
    },
    Quiesce {
        reply: Reply<bool>,
    },
    Finalized {
        reply: Reply<bool>,
    },
    Describe {
        reply: Reply<String>,
    },
}

/// Move `engine` into its own task.
pub fn spawn<T, G>(
    engine: Snowstorm<T, G>,
    buffer: usize,
) -> (EngineHandle<T>, JoinHandle<Snowstorm<T, G>>)
where
    T: Tx + Clone + Send + 'static,
    G: TransitionGraph + Send + 'static,
{
    let (commands, mut rx) = mpsc::channel(buffer.max(1));
    let task = tokio::spawn(async move {
        let mut engine = engine;
        while let Some(command) = rx.recv().await {
            dispatch(&mut engine, command);
        }
        tracing::debug!(stats = %engine.stats(), "engine task stopped");
        engine
    });
    (EngineHandle { commands }, task)
}

// Replies to callers that stopped waiting are dropped.
fn dispatch<T, G>(engine: &mut Snowstorm<T, G>, command: Command<T>)
where
    T: Tx + Clone,
    G: TransitionGraph,
{
    match command {
        Command::Add { tx, reply } => {
            let _ = reply.send(engine.add(tx));
        }
        Command::RecordPoll { bag, reply } => {
            let _ = reply.send(engine.record_poll(&bag));
        }
        Command::IsVirtuous { tx, reply } => {
            let _ = reply.send(engine.is_virtuous(&tx));
        }
        Command::Conflicts { id, reply } => {
            let _ = reply.send(engine.conflicts(&id));
        }
        Command::Get { id, reply } => {
            let _ = reply.send(engine.get(&id).cloned());
        }
        Command::Status { id, reply } => {
            let _ = reply.send(engine.status(&id));
        }
        Command::Issued { id, reply } => {
            let _ = reply.send(engine.issued(&id));
        }
        Command::IsProcessing { id, reply } => {
            let _ = reply.send(engine.is_processing(&id));
        }
        Command::Processing { transition, reply } => {
            let _ = reply.send(engine.processing(&transition));
        }
        Command::Confidence { id, reply } => {
            let _ = reply.send(engine.confidence(&id));
        }
        Command::Parameters { reply } => {
            let _ = reply.send(*engine.parameters());
        }
        Command::ProcessingTxs { transition, reply } => {
            let txs = engine.processing_txs(&transition).into_iter().cloned().collect();
            let _ = reply.send(txs);
        }
        Command::Virtuous { reply } => {
            let _ = reply.send(engine.virtuous());
        }
        Command::Preferences { reply } => {
            let _ = reply.send(engine.preferences());
        }
        Command::Quiesce { reply } => {
            let _ = reply.send(engine.quiesce());
        }
        Command::Finalized { reply } => {
            let _ = reply.send(engine.finalized());
        }
        Command::Describe { reply } => {
            let _ = reply.send(engine.to_string());
        }
    }
}

/// Async access to an engine owned by its task.
pub struct EngineHandle<T> {
    commands: mpsc::Sender<Command<T>>,
}

impl<T> Clone for EngineHandle<T> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
        }
    }
}

impl<T> EngineHandle<T> {
    async fn request<R>(
        &self,
        command: impl FnOnce(Reply<R>) -> Command<T>,
    ) -> Result<R, ConsensusError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| ConsensusError::ChannelClosed)?;
        response.await.map_err(|_| ConsensusError::ChannelClosed)
    }

    pub async fn add(&self, tx: T) -> Result<(), ConsensusError> {
        self.request(|reply| Command::Add { tx, reply }).await?
    }

    pub async fn record_poll(&self, bag: Bag) -> Result<PollResult<T>, ConsensusError> {
        self.request(|reply| Command::RecordPoll { bag, reply }).await?
    }

    pub async fn is_virtuous(&self, tx: T) -> Result<bool, ConsensusError> {
        self.request(|reply| Command::IsVirtuous { tx, reply }).await?
    }

    pub async fn conflicts(&self, id: TxId) -> Result<HashSet<TxId>, ConsensusError> {
        self.request(|reply| Command::Conflicts { id, reply }).await?
    }

    pub async fn get(&self, id: TxId) -> Result<T, ConsensusError> {
        self.request(|reply| Command::Get { id, reply }).await?
    }

    pub async fn status(&self, id: TxId) -> Result<Status, ConsensusError> {
        self.request(|reply| Command::Status { id, reply }).await
    }

    pub async fn issued(&self, id: TxId) -> Result<bool, ConsensusError> {
        self.request(|reply| Command::Issued { id, reply }).await
    }

    pub async fn is_processing(&self, id: TxId) -> Result<bool, ConsensusError> {
        self.request(|reply| Command::IsProcessing { id, reply }).await
    }

    /// Whether a processing transaction carries `transition`.
    pub async fn processing(&self, transition: TransitionId) -> Result<bool, ConsensusError> {
        self.request(|reply| Command::Processing { transition, reply })
            .await
    }

    pub async fn confidence(&self, id: TxId) -> Result<Option<u32>, ConsensusError> {
        self.request(|reply| Command::Confidence { id, reply }).await
    }

    pub async fn parameters(&self) -> Result<Parameters, ConsensusError> {
        self.request(|reply| Command::Parameters { reply }).await
    }

    pub async fn processing_txs(&self, transition: TransitionId) -> Result<Vec<T>, ConsensusError> {
        self.request(|reply| Command::ProcessingTxs { transition, reply })
            .await
    }

    pub async fn virtuous(&self) -> Result<HashSet<TxId>, ConsensusError> {
        self.request(|reply| Command::Virtuous { reply }).await
    }

    pub async fn preferences(&self) -> Result<HashSet<TxId>, ConsensusError> {
        self.request(|reply| Command::Preferences { reply }).await
    }

    pub async fn quiesce(&self) -> Result<bool, ConsensusError> {
        self.request(|reply| Command::Quiesce { reply }).await
    }

    pub async fn finalized(&self) -> Result<bool, ConsensusError> {
        self.request(|reply| Command::Finalized { reply }).await
    }

    /// Diagnostic dump of the engine state.
    pub async fn describe(&self) -> Result<String, ConsensusError> {
        self.request(|reply| Command::Describe { reply }).await
    }
}
