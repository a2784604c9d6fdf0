//! Scripted judgment capability for tests and offline runs.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{JudgmentCapability, JudgmentRequest, JudgmentTask};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    /// Simulate the backing model being unreachable.
    Unavailable(String),
}

/// Judgment capability that replays scripted replies per task.
///
/// Replies for a task are consumed in order; the last one repeats. Tasks
/// with no script use the default reply, or fail as unavailable when no
/// default is set.
#[derive(Default)]
pub struct MockJudgment {
    scripts: Mutex<HashMap<JudgmentTask, VecDeque<MockReply>>>,
    default_reply: Option<String>,
    latency: Option<Duration>,
    calls: Mutex<Vec<JudgmentRequest>>,
}

impl MockJudgment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply used for tasks without a script.
    pub fn with_default(mut self, text: impl Into<String>) -> Self {
        self.default_reply = Some(text.into());
        self
    }

    /// Delay every reply, to simulate a slow backing model.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a text reply for a task.
    pub fn respond(self, task: JudgmentTask, text: impl Into<String>) -> Self {
        self.push(task, MockReply::Text(text.into()));
        self
    }

    /// Queue several text replies for a task, in order.
    pub fn respond_many<I, S>(self, task: JudgmentTask, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for text in texts {
            self.push(task, MockReply::Text(text.into()));
        }
        self
    }

    /// Queue an unavailability failure for a task.
    pub fn fail(self, task: JudgmentTask, message: impl Into<String>) -> Self {
        self.push(task, MockReply::Unavailable(message.into()));
        self
    }

    fn push(&self, task: JudgmentTask, reply: MockReply) {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(task)
            .or_default()
            .push_back(reply);
    }

    /// Every request received so far.
    pub fn calls(&self) -> Vec<JudgmentRequest> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of requests received for one task.
    pub fn calls_for(&self, task: JudgmentTask) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.task == task)
            .count()
    }

    fn next_reply(&self, task: JudgmentTask) -> Option<MockReply> {
        let mut scripts = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = scripts.get_mut(&task)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl JudgmentCapability for MockJudgment {
    async fn judge(&self, request: JudgmentRequest) -> DomainResult<String> {
        let task = request.task;
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.next_reply(task) {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Unavailable(message)) => Err(DomainError::JudgmentUnavailable(message)),
            None => self.default_reply.clone().ok_or_else(|| {
                DomainError::JudgmentUnavailable(format!("no scripted reply for {}", task.as_str()))
            }),
        }
    }
}
