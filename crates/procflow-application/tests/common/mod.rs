//! Hand-written collaborators shared by the scenario tests.

#![allow(dead_code)]

use async_trait::async_trait;
use procflow_application::ConversationService;
use procflow_core::error::{ProcflowError, Result};
use procflow_core::generation::{AudioInput, ProcessGenerator, Transcriber};
use procflow_core::process_model::{AgentResponse, ProcessModel, ProcessStep, StepType};
use procflow_infrastructure::InMemoryHistoryStore;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

pub type Gate = oneshot::Sender<Result<AgentResponse>>;

/// Generator whose calls block until the test releases them.
///
/// Each call takes the next gate queued with [`GatedGenerator::expect_call`]
/// and announces its prompt on the `calls` channel. Without a queued gate the
/// call never resolves.
pub struct GatedGenerator {
    gates: Mutex<VecDeque<oneshot::Receiver<Result<AgentResponse>>>>,
    calls: mpsc::UnboundedSender<String>,
}

impl GatedGenerator {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let generator = Arc::new(Self {
            gates: Mutex::new(VecDeque::new()),
            calls: tx,
        });
        (generator, rx)
    }

    pub fn expect_call(&self) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push_back(rx);
        tx
    }
}

#[async_trait]
impl ProcessGenerator for GatedGenerator {
    async fn generate(&self, prompt: &str) -> Result<AgentResponse> {
        let gate = self.gates.lock().unwrap().pop_front();
        let _ = self.calls.send(prompt.to_string());
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ProcflowError::generation("gate dropped"))),
            None => std::future::pending().await,
        }
    }
}

/// Transcriber whose calls block until the test releases them.
///
/// Announces each file name on the `calls` channel. Without a queued gate
/// the call never resolves.
pub struct GatedTranscriber {
    gates: Mutex<VecDeque<oneshot::Receiver<Result<String>>>>,
    calls: mpsc::UnboundedSender<String>,
}

impl GatedTranscriber {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transcriber = Arc::new(Self {
            gates: Mutex::new(VecDeque::new()),
            calls: tx,
        });
        (transcriber, rx)
    }

    pub fn expect_call(&self) -> oneshot::Sender<Result<String>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push_back(rx);
        tx
    }
}

#[async_trait]
impl Transcriber for GatedTranscriber {
    async fn transcribe(&self, audio: &AudioInput) -> Result<String> {
        let gate = self.gates.lock().unwrap().pop_front();
        let _ = self.calls.send(audio.file_name.clone());
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ProcflowError::transcription("gate dropped"))),
            None => std::future::pending().await,
        }
    }
}

/// Generator answering every prompt with the same result.
pub struct StaticGenerator(pub Result<AgentResponse>);

#[async_trait]
impl ProcessGenerator for StaticGenerator {
    async fn generate(&self, _prompt: &str) -> Result<AgentResponse> {
        self.0.clone()
    }
}

/// Transcriber returning the same result for every file.
pub struct StaticTranscriber(pub Result<String>);

#[async_trait]
impl Transcriber for StaticTranscriber {
    async fn transcribe(&self, _audio: &AudioInput) -> Result<String> {
        self.0.clone()
    }
}

pub fn flight_model() -> ProcessModel {
    ProcessModel {
        process_name: "Book a flight".to_string(),
        actors: vec!["Traveler".to_string()],
        steps: vec![
            ProcessStep {
                id: "s1".to_string(),
                step_type: StepType::Start,
                actor: Some("Traveler".to_string()),
                description: "Search flights".to_string(),
                next: vec!["s2".to_string()],
            },
            ProcessStep {
                id: "s2".to_string(),
                step_type: StepType::End,
                actor: Some("Traveler".to_string()),
                description: "Pay".to_string(),
                next: Vec::new(),
            },
        ],
    }
}

pub fn flight_response() -> AgentResponse {
    AgentResponse::process("Booking flow", flight_model())
}

pub fn service(
    store: Arc<InMemoryHistoryStore>,
    generator: Arc<dyn ProcessGenerator>,
) -> ConversationService {
    service_with_transcriber(
        store,
        generator,
        Arc::new(StaticTranscriber(Ok("unused".to_string()))),
    )
}

pub fn service_with_transcriber(
    store: Arc<InMemoryHistoryStore>,
    generator: Arc<dyn ProcessGenerator>,
    transcriber: Arc<dyn Transcriber>,
) -> ConversationService {
    ConversationService::new(store, generator, transcriber, Duration::from_secs(60))
}
