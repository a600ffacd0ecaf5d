//! Shared fixtures for application tests.

use crate::dispatcher::{ResponseDispatcher, TurnRunner};
use crate::payment::{ActionMediator, PaymentBridgeOrchestrator};
use crate::ui::{UiEvent, UiNotifier};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use polyagent_core::agent::{AgentRequest, AgentRouter, AgentTransport};
use polyagent_core::config::GuardConfig;
use polyagent_core::conversation::{ConversationManager, TurnBinding};
use polyagent_core::error::{PolyError, Result};
use polyagent_core::stream::{ByteStream, StreamError};
use polyagent_infrastructure::MemoryKeyValueStore;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, mpsc};

pub const BASE_URL: &str = "http://agents.test";

/// A canned agent response.
pub enum Reply {
    Chunks(Vec<&'static str>),
    /// Chunks released only once the notify fires.
    Gated(Arc<Notify>, Vec<&'static str>),
    /// Some chunks, then a read error.
    BrokenAfter(Vec<&'static str>),
    Fail(PolyError),
    NoBody,
}

#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockTransport {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(endpoint, message)` for every request made.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

fn chunks_of(chunks: Vec<&'static str>) -> Vec<std::result::Result<Bytes, StreamError>> {
    chunks
        .into_iter()
        .map(|c| Ok(Bytes::from_static(c.as_bytes())))
        .collect()
}

#[async_trait]
impl AgentTransport for MockTransport {
    async fn post(&self, endpoint: &str, request: &AgentRequest) -> Result<Option<ByteStream>> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), request.message.clone()));
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected agent request");

        match reply {
            Reply::Chunks(chunks) => Ok(Some(futures::stream::iter(chunks_of(chunks)).boxed())),
            Reply::Gated(gate, chunks) => {
                let items = chunks_of(chunks);
                let body = futures::stream::once(async move { gate.notified().await })
                    .flat_map(move |_| futures::stream::iter(items.clone()))
                    .boxed();
                Ok(Some(body))
            }
            Reply::BrokenAfter(chunks) => {
                let mut items = chunks_of(chunks);
                items.push(Err(StreamError::Read("connection reset".into())));
                Ok(Some(futures::stream::iter(items).boxed()))
            }
            Reply::Fail(error) => Err(error),
            Reply::NoBody => Ok(None),
        }
    }
}

pub struct Harness {
    pub manager: Arc<ConversationManager>,
    pub transport: Arc<MockTransport>,
    pub payments: Arc<PaymentBridgeOrchestrator>,
    pub dispatcher: Arc<ResponseDispatcher>,
    pub mediator: ActionMediator,
    pub events: mpsc::UnboundedReceiver<UiEvent>,
}

impl Harness {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self::with_binding(TurnBinding::Captured, replies)
    }

    pub fn with_binding(binding: TurnBinding, replies: Vec<Reply>) -> Self {
        let manager = Arc::new(ConversationManager::new(Arc::new(MemoryKeyValueStore::new())));
        let transport = Arc::new(MockTransport::new(replies));
        let (notifier, events) = UiNotifier::channel();

        let runner = Arc::new(TurnRunner::new(
            manager.clone(),
            AgentRouter::new(BASE_URL),
            transport.clone(),
            notifier.clone(),
            binding,
        ));
        let payments = Arc::new(
            PaymentBridgeOrchestrator::new(runner.clone(), notifier, binding, &GuardConfig::default())
                .unwrap(),
        );
        let dispatcher = Arc::new(ResponseDispatcher::new(runner, payments.clone()));
        let mediator = ActionMediator::new(payments.clone());

        Self {
            manager,
            transport,
            payments,
            dispatcher,
            mediator,
            events,
        }
    }

    /// Drains every UI event emitted so far.
    pub fn drain_events(&mut self) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
