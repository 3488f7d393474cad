//! Scripted providers and stage transports for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use boardroom_core::{StageInput, StageResult};

use crate::coordinator::{StageEndpoint, StageTransport, TransportError};
use crate::providers::{
    CompletionRequest, CompletionResponse, LlmProvider, ProviderCause, ProviderError, TokenUsage,
};

/// Shared record of which provider or stage was called, in order.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Upcast scripted providers into a chain's provider list.
pub fn chain_of(providers: &[&Arc<ScriptedProvider>]) -> Vec<Arc<dyn LlmProvider>> {
    providers
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn LlmProvider>)
        .collect()
}

enum Reply {
    Text(String),
    Fail(ProviderCause),
    Hang,
}

/// Provider that always gives the same answer.
pub struct ScriptedProvider {
    id: String,
    reply: Reply,
    timeout: Duration,
    max_tokens: u32,
    calls: AtomicUsize,
    budgets: Mutex<Vec<u32>>,
    prompts: Mutex<Vec<String>>,
    log: Option<CallLog>,
    ready: bool,
}

impl ScriptedProvider {
    fn new(id: &str, reply: Reply) -> Self {
        Self {
            id: id.to_string(),
            reply,
            timeout: Duration::from_secs(5),
            max_tokens: u32::MAX,
            calls: AtomicUsize::new(0),
            budgets: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            log: None,
            ready: true,
        }
    }

    pub fn answering(id: &str, text: &str) -> Self {
        Self::new(id, Reply::Text(text.to_string()))
    }

    pub fn failing(id: &str, cause: ProviderCause) -> Self {
        Self::new(id, Reply::Fail(cause))
    }

    /// Never answers within `timeout`.
    pub fn hanging(id: &str, timeout: Duration) -> Self {
        let mut provider = Self::new(id, Reply::Hang);
        provider.timeout = timeout;
        provider
    }

    pub fn logged(mut self, log: &CallLog) -> Self {
        self.log = Some(Arc::clone(log));
        self
    }

    /// Fails its health check, as a provider without a key would.
    pub fn unready(mut self) -> Self {
        self.ready = false;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Token budgets received, one per call.
    pub fn budgets(&self) -> Vec<u32> {
        self.budgets.lock().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.budgets.lock().push(request.max_tokens);
        self.prompts.lock().push(request.prompt.clone());
        if let Some(log) = &self.log {
            log.lock().push(self.id.clone());
        }

        match &self.reply {
            Reply::Text(text) => Ok(CompletionResponse {
                content: text.clone(),
                usage: TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                },
                model: format!("{}-model", self.id),
            }),
            Reply::Fail(cause) => Err(ProviderError::new(self.id.as_str(), cause.clone())),
            Reply::Hang => {
                tokio::time::sleep(self.timeout * 100).await;
                Err(ProviderError::new(self.id.as_str(), ProviderCause::EmptyContent))
            }
        }
    }

    async fn health_check(&self) -> bool {
        self.ready
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// How a scripted stage answers.
#[derive(Clone)]
pub enum StageReply {
    Produced(serde_json::Value),
    Fallback(serde_json::Value),
    Unreachable(TransportError),
}

/// Stage transport with canned replies and a call log.
///
/// Stages without a canned reply produce `{"stage": <name>, "user_input": <input>}`.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: HashMap<String, StageReply>,
    log: Mutex<Vec<String>>,
    inputs: Mutex<Vec<StageInput>>,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, stage: &str, reply: StageReply) -> Self {
        self.replies.insert(stage.to_string(), reply);
        self
    }

    /// Sleep before every reply so concurrent runs interleave.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Stage names in call order.
    pub fn calls(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn call_count(&self, stage: &str) -> usize {
        self.log.lock().iter().filter(|s| *s == stage).count()
    }

    /// Inputs received, in call order.
    pub fn inputs(&self) -> Vec<StageInput> {
        self.inputs.lock().clone()
    }
}

#[async_trait]
impl StageTransport for ScriptedTransport {
    async fn call(
        &self,
        endpoint: &StageEndpoint,
        input: &StageInput,
    ) -> Result<StageResult, TransportError> {
        self.log.lock().push(endpoint.name.clone());
        self.inputs.lock().push(input.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.replies.get(&endpoint.name) {
            Some(StageReply::Produced(output)) => {
                Ok(StageResult::produced(endpoint.name.as_str(), output.clone()))
            }
            Some(StageReply::Fallback(output)) => {
                Ok(StageResult::fallback(endpoint.name.as_str(), output.clone()))
            }
            Some(StageReply::Unreachable(error)) => Err(error.clone()),
            None => Ok(StageResult::produced(
                endpoint.name.as_str(),
                serde_json::json!({ "stage": endpoint.name, "user_input": input.user_input }),
            )),
        }
    }
}
