//! Scripted transport for tests and offline runs
//!
//! Replays queued replies or errors in order and records every prompt it saw.

use super::ProviderTransport;
use crate::completion::{ModelReply, Prompt};
use crate::credential::ProviderCredential;
use crate::error::ProviderError;

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A transport that returns queued results, or a fixed text reply when empty
pub struct ScriptedTransport {
    script: Mutex<VecDeque<std::result::Result<ModelReply, ProviderError>>>,
    seen: Mutex<Vec<(Prompt, String)>>,
    delay: Option<Duration>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    /// Create an empty script
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            seen: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering each call
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a reply
    pub fn push_reply(&self, reply: ModelReply) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(reply));
    }

    /// Queue a failure
    pub fn push_error(&self, error: ProviderError) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(error));
    }

    /// Number of calls received so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Prompts received so far, with the model each was addressed to
    #[must_use]
    pub fn prompts(&self) -> Vec<(Prompt, String)> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait::async_trait]
impl ProviderTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(
        &self,
        prompt: &Prompt,
        credential: &ProviderCredential,
    ) -> std::result::Result<ModelReply, ProviderError> {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((prompt.clone(), credential.model.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        next.unwrap_or_else(|| Ok(ModelReply::text("mock response").with_model(&credential.model)))
    }
}
