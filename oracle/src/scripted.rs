//! Canned oracle for tests and offline play.

use crate::{Completion, CompletionRequest, Oracle, OracleError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// One scripted turn: a canned completion or a canned failure.
#[derive(Debug)]
pub enum ScriptedResponse {
    Text(String),
    Fail(OracleError),
}

impl ScriptedResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

impl From<&str> for ScriptedResponse {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

/// Replays a fixed response sequence and records every prompt it receives.
///
/// Once the script runs dry, calls repeat the configured fallback text, or
/// fail with [`OracleError::ScriptExhausted`] when there is none.
#[derive(Debug)]
pub struct ScriptedOracle {
    script: Mutex<VecDeque<ScriptedResponse>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = ScriptedResponse>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Convenience constructor for text-only scripts.
    #[must_use]
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(|t| ScriptedResponse::Text(t.into())))
    }

    /// An oracle that answers every call with the same text.
    #[must_use]
    pub fn repeating(text: impl Into<String>) -> Self {
        Self::new([]).with_fallback(text)
    }

    /// Text replayed forever after the script is exhausted.
    #[must_use]
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }

    /// Every prompt received so far, in call order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Unplayed responses left in the script.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, OracleError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.prompt);

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match next {
            Some(ScriptedResponse::Text(text)) => Ok(Completion { text }),
            Some(ScriptedResponse::Fail(err)) => Err(err),
            None => match &self.fallback {
                Some(text) => Ok(Completion { text: text.clone() }),
                None => Err(OracleError::ScriptExhausted),
            },
        }
    }
}
