//! Message surface of a stage agent.
//!
//! A [`Mailbox`] accepts `(sender, input)` envelopes over a bounded channel
//! and replies on a oneshot. Each message goes through the same
//! [`StageAgent::handle`] as the REST handler, so both surfaces give
//! identical results, and identical rejections, for identical input.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use boardroom_core::{InputError, StageInput, StageResult};

use crate::agents::StageAgent;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailboxError {
    #[error("stage mailbox is closed")]
    Closed,

    #[error("stage dropped the reply")]
    NoReply,

    #[error("stage rejected the input: {0}")]
    Rejected(#[from] InputError),
}

struct Envelope {
    sender: String,
    input: StageInput,
    reply: oneshot::Sender<Result<StageResult, InputError>>,
}

/// Handle for sending inputs to a running stage agent.
#[derive(Clone)]
pub struct Mailbox {
    tx: mpsc::Sender<Envelope>,
}

impl Mailbox {
    /// Start the agent's receive loop. The loop ends when every handle is dropped.
    pub fn spawn(agent: Arc<StageAgent>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Envelope>(capacity.max(1));
        let handle = tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let agent = Arc::clone(&agent);
                // Messages from different runs proceed concurrently.
                tokio::spawn(async move {
                    tracing::debug!(stage = agent.name(), sender = %envelope.sender, "Message received");
                    let result = agent.handle(&envelope.input).await;
                    if envelope.reply.send(result).is_err() {
                        tracing::debug!(stage = agent.name(), sender = %envelope.sender, "Sender went away before reply");
                    }
                });
            }
            tracing::debug!(stage = agent.name(), "Mailbox closed");
        });
        (Self { tx }, handle)
    }

    /// Send `input` on behalf of `sender` and wait for the stage result.
    pub async fn send(&self, sender: &str, input: StageInput) -> Result<StageResult, MailboxError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                sender: sender.to_string(),
                input,
                reply,
            })
            .await
            .map_err(|_| MailboxError::Closed)?;
        let reply = rx.await.map_err(|_| MailboxError::NoReply)?;
        Ok(reply?)
    }
}
