use async_trait::async_trait;
use atlas_rs_core::{Answer, AskClient, AskMode, ClientError, Outcome};
use atlas_rs_protocol::{MatchRecord, ServiceHealth};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// Successful outcome carrying one plain-named record per name.
pub fn answer_with_matches(names: &[&str]) -> Outcome {
    Outcome::Answered(Answer {
        matches: names.iter().map(|name| MatchRecord::named(*name)).collect(),
        elapsed_ms: 1,
        ..Answer::default()
    })
}

/// Replays queued outcomes in order and records every request.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAskClient {
    outcomes: Arc<Mutex<VecDeque<Outcome>>>,
    requests: Arc<Mutex<Vec<(AskMode, String)>>>,
    health: Option<ServiceHealth>,
}

impl ScriptedAskClient {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes.into())),
            ..Self::default()
        }
    }

    pub fn with_health(mut self, health: ServiceHealth) -> Self {
        self.health = Some(health);
        self
    }

    pub fn push(&self, outcome: Outcome) {
        self.outcomes.lock().push_back(outcome);
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<(AskMode, String)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl AskClient for ScriptedAskClient {
    async fn request(&self, mode: AskMode, question: &str) -> Outcome {
        self.requests.lock().push((mode, question.to_string()));
        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Outcome::Answered(Answer::default()))
    }

    async fn health(&self) -> Result<ServiceHealth, ClientError> {
        self.health.clone().ok_or(ClientError::Status(503))
    }
}

/// Never answers; requests only end through cancellation.
#[derive(Debug, Clone, Default)]
pub struct StallingAskClient {
    calls: Arc<AtomicUsize>,
}

impl StallingAskClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AskClient for StallingAskClient {
    async fn request(&self, _mode: AskMode, _question: &str) -> Outcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<Outcome>().await
    }

    async fn health(&self) -> Result<ServiceHealth, ClientError> {
        Ok(ServiceHealth::default())
    }
}

/// Answers each request with the next outcome released through the gate.
#[derive(Debug, Clone)]
pub struct GatedAskClient {
    releases: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Outcome>>>,
}

impl GatedAskClient {
    /// Client plus the sender used to release outcomes.
    pub fn new() -> (Self, mpsc::UnboundedSender<Outcome>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                releases: Arc::new(tokio::sync::Mutex::new(receiver)),
            },
            sender,
        )
    }
}

#[async_trait]
impl AskClient for GatedAskClient {
    async fn request(&self, _mode: AskMode, _question: &str) -> Outcome {
        match self.releases.lock().await.recv().await {
            Some(outcome) => outcome,
            None => std::future::pending::<Outcome>().await,
        }
    }

    async fn health(&self) -> Result<ServiceHealth, ClientError> {
        Ok(ServiceHealth::default())
    }
}

/// Panics inside every request, standing in for a buggy client.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanickingAskClient;

#[async_trait]
impl AskClient for PanickingAskClient {
    async fn request(&self, _mode: AskMode, question: &str) -> Outcome {
        panic!("client failed on {question:?}")
    }

    async fn health(&self) -> Result<ServiceHealth, ClientError> {
        Ok(ServiceHealth::default())
    }
}
