//! Turn controller — orchestrates one chat turn end to end.
//!
//! Per-turn lifecycle: `Received → (Retrieving) → Assembling → Streaming →
//! {Completed | Failed}`. Retrieval is entered only when the request opts
//! in, and its failure is absorbed: the turn proceeds with empty context
//! rather than aborting. Events are forwarded to the caller as the adapter
//! produces them — push-as-produced, never buffer-then-send.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use hudgate_core::message::TurnRequest;
use hudgate_core::retrieval::{Passage, PassageStore};
use hudgate_core::upstream::{ChatStream, StreamEvent};

use crate::assembler::assemble;

/// States a turn passes through. Transitions are traced per turn id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Received,
    Retrieving,
    Assembling,
    Streaming,
    Completed,
    Failed,
}

/// Drives chat turns against one upstream adapter and one passage store.
///
/// Cheap to clone pieces are taken by `Arc`; the controller itself holds no
/// per-turn state, so one instance serves all in-flight turns.
pub struct TurnController {
    adapter: Arc<dyn ChatStream>,
    store: Arc<dyn PassageStore>,
    personality: String,
    retrieval_limit: usize,
}

impl TurnController {
    pub fn new(
        adapter: Arc<dyn ChatStream>,
        store: Arc<dyn PassageStore>,
        personality: impl Into<String>,
        retrieval_limit: usize,
    ) -> Self {
        Self {
            adapter,
            store,
            personality: personality.into(),
            retrieval_limit: retrieval_limit.max(1),
        }
    }

    /// Run one turn, returning the caller-facing event receiver.
    ///
    /// The receiver yields canonical events in production order and always
    /// ends with a terminal `Done` or `Error`. Dropping the receiver cancels
    /// the upstream read promptly.
    pub async fn run(&self, request: TurnRequest) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel::<StreamEvent>(64);

        let adapter = self.adapter.clone();
        let store = self.store.clone();
        let personality = self.personality.clone();
        let retrieval_limit = self.retrieval_limit;

        tokio::spawn(async move {
            run_turn(adapter, store, personality, retrieval_limit, request, tx).await;
        });

        rx
    }
}

async fn run_turn(
    adapter: Arc<dyn ChatStream>,
    store: Arc<dyn PassageStore>,
    personality: String,
    retrieval_limit: usize,
    request: TurnRequest,
    tx: mpsc::Sender<StreamEvent>,
) {
    let turn_id = Uuid::new_v4();
    debug!(turn = %turn_id, provider = adapter.name(), state = ?TurnState::Received, "Turn received");

    // ── Retrieval (opt-in; failure degrades to empty context) ──
    let passages: Vec<Passage> = if request.use_retrieval {
        debug!(turn = %turn_id, state = ?TurnState::Retrieving, "Retrieving context");
        store.retrieve(&request.message, retrieval_limit).await
    } else {
        Vec::new()
    };

    // ── Assembly ──
    debug!(
        turn = %turn_id,
        state = ?TurnState::Assembling,
        passages = passages.len(),
        "Assembling prompt"
    );
    let prompt = assemble(
        &personality,
        &passages,
        &request.history,
        &request.message,
        adapter.prompt_shape(),
    );

    // ── Streaming ──
    debug!(turn = %turn_id, state = ?TurnState::Streaming, "Opening upstream stream");
    let mut upstream = match adapter.stream_chat(prompt).await {
        Ok(rx) => rx,
        Err(e) => {
            // Connect-stage failure: the turn's single terminal event.
            warn!(turn = %turn_id, error = %e, state = ?TurnState::Failed, "Upstream connect failed");
            let _ = tx.send(StreamEvent::Error(e.to_string())).await;
            return;
        }
    };

    let mut completed = false;
    while let Some(event) = upstream.recv().await {
        if matches!(event, StreamEvent::Done) {
            completed = true;
        }
        if tx.send(event).await.is_err() {
            // Caller disconnected. Returning drops `upstream`, which makes
            // the adapter task's next send fail and release its connection.
            debug!(turn = %turn_id, "Caller disconnected; cancelling upstream read");
            return;
        }
    }

    let state = if completed {
        TurnState::Completed
    } else {
        TurnState::Failed
    };
    debug!(turn = %turn_id, state = ?state, "Turn finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hudgate_core::error::UpstreamError;
    use hudgate_core::message::HistoryMessage;
    use hudgate_core::upstream::{AssembledPrompt, PromptShape};
    use hudgate_retrieval::InMemoryPassageStore;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// A scripted upstream: replays a fixed event sequence and records the
    /// prompt it was handed.
    struct ScriptedAdapter {
        shape: PromptShape,
        events: Vec<StreamEvent>,
        connect_error: Option<UpstreamError>,
        seen_prompt: Mutex<Option<AssembledPrompt>>,
        cancelled: Arc<AtomicBool>,
    }

    impl ScriptedAdapter {
        fn replaying(events: Vec<StreamEvent>) -> Self {
            Self {
                shape: PromptShape::FlatText,
                events,
                connect_error: None,
                seen_prompt: Mutex::new(None),
                cancelled: Arc::new(AtomicBool::new(false)),
            }
        }

        fn failing(error: UpstreamError) -> Self {
            Self {
                shape: PromptShape::FlatText,
                events: Vec::new(),
                connect_error: Some(error),
                seen_prompt: Mutex::new(None),
                cancelled: Arc::new(AtomicBool::new(false)),
            }
        }

        fn prompt_text(&self) -> String {
            match self.seen_prompt.lock().unwrap().clone() {
                Some(prompt) => prompt.into_flat_text(),
                None => panic!("adapter was never called"),
            }
        }
    }

    #[async_trait]
    impl ChatStream for ScriptedAdapter {
        fn name(&self) -> &str {
            "scripted"
        }

        fn prompt_shape(&self) -> PromptShape {
            self.shape
        }

        async fn stream_chat(
            &self,
            prompt: AssembledPrompt,
        ) -> Result<mpsc::Receiver<StreamEvent>, UpstreamError> {
            *self.seen_prompt.lock().unwrap() = Some(prompt);
            if let Some(err) = &self.connect_error {
                return Err(err.clone());
            }

            let (tx, rx) = mpsc::channel(4);
            let events = self.events.clone();
            let cancelled = self.cancelled.clone();
            tokio::spawn(async move {
                for event in events {
                    if tx.send(event).await.is_err() {
                        cancelled.store(true, Ordering::SeqCst);
                        return;
                    }
                }
            });
            Ok(rx)
        }
    }

    async fn collect(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn controller(adapter: Arc<ScriptedAdapter>) -> TurnController {
        TurnController::new(
            adapter,
            Arc::new(InMemoryPassageStore::with_seed_corpus()),
            "You are a helpful AI assistant.",
            2,
        )
    }

    #[tokio::test]
    async fn forwards_events_in_order_with_single_terminal() {
        let adapter = Arc::new(ScriptedAdapter::replaying(vec![
            StreamEvent::TextDelta("Hel".into()),
            StreamEvent::TextDelta("lo".into()),
            StreamEvent::Done,
        ]));
        let rx = controller(adapter).run(TurnRequest::new("hi")).await;

        let events = collect(rx).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta("Hel".into()),
                StreamEvent::TextDelta("lo".into()),
                StreamEvent::Done,
            ]
        );
        let terminals = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::Done))
            .count();
        assert_eq!(terminals, 1);
    }

    #[tokio::test]
    async fn connect_failure_yields_exactly_one_error_event() {
        let adapter = Arc::new(ScriptedAdapter::failing(UpstreamError::Connect {
            status: 502,
            message: "Ollama API error: 502".into(),
        }));
        let rx = controller(adapter).run(TurnRequest::new("hi")).await;

        let events = collect(rx).await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::Error(msg) => assert!(msg.contains("502")),
            other => panic!("expected error event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn nonfatal_error_passes_through_mid_stream() {
        let adapter = Arc::new(ScriptedAdapter::replaying(vec![
            StreamEvent::TextDelta("a".into()),
            StreamEvent::Error("Failed to parse Ollama response".into()),
            StreamEvent::TextDelta("b".into()),
            StreamEvent::Done,
        ]));
        let rx = controller(adapter).run(TurnRequest::new("hi")).await;

        let events = collect(rx).await;
        assert_eq!(events.len(), 4);
        assert_eq!(events.last(), Some(&StreamEvent::Done));
    }

    #[tokio::test]
    async fn retrieval_opt_in_injects_context() {
        let adapter = Arc::new(ScriptedAdapter::replaying(vec![StreamEvent::Done]));
        let ctrl = controller(adapter.clone());

        let request = TurnRequest {
            message: "tell me about the deepseek model".into(),
            history: vec![],
            use_retrieval: true,
        };
        collect(ctrl.run(request).await).await;

        let prompt = adapter.prompt_text();
        assert!(prompt.contains("RELEVANT CONTEXT"));
        assert!(prompt.contains("deepseek_info.txt"));
    }

    #[tokio::test]
    async fn no_retrieval_means_no_context_block() {
        let adapter = Arc::new(ScriptedAdapter::replaying(vec![StreamEvent::Done]));
        let ctrl = controller(adapter.clone());

        collect(ctrl.run(TurnRequest::new("tell me about deepseek")).await).await;

        assert!(!adapter.prompt_text().contains("RELEVANT CONTEXT"));
    }

    #[tokio::test]
    async fn empty_retrieval_still_streams() {
        let adapter = Arc::new(ScriptedAdapter::replaying(vec![
            StreamEvent::TextDelta("ok".into()),
            StreamEvent::Done,
        ]));
        // Empty store: retrieval comes back with nothing.
        let ctrl = TurnController::new(
            adapter.clone(),
            Arc::new(InMemoryPassageStore::new()),
            "P",
            2,
        );

        let request = TurnRequest {
            message: "anything".into(),
            history: vec![],
            use_retrieval: true,
        };
        let events = collect(ctrl.run(request).await).await;

        assert_eq!(events.last(), Some(&StreamEvent::Done));
        assert!(!adapter.prompt_text().contains("RELEVANT CONTEXT"));
    }

    #[tokio::test]
    async fn history_flows_into_prompt() {
        let adapter = Arc::new(ScriptedAdapter::replaying(vec![StreamEvent::Done]));
        let ctrl = controller(adapter.clone());

        let request = TurnRequest {
            message: "third".into(),
            history: vec![
                HistoryMessage::user("first"),
                HistoryMessage::assistant("second"),
            ],
            use_retrieval: false,
        };
        collect(ctrl.run(request).await).await;

        let prompt = adapter.prompt_text();
        assert!(prompt.contains("USER: first"));
        assert!(prompt.contains("ASSISTANT: second"));
        assert!(prompt.ends_with("USER: third\nASSISTANT:"));
    }

    #[tokio::test]
    async fn caller_disconnect_cancels_upstream_read() {
        let many_deltas: Vec<StreamEvent> = (0..100)
            .map(|i| StreamEvent::TextDelta(format!("chunk {i}")))
            .chain(std::iter::once(StreamEvent::Done))
            .collect();
        let adapter = Arc::new(ScriptedAdapter::replaying(many_deltas));
        let cancelled = adapter.cancelled.clone();

        let mut rx = controller(adapter).run(TurnRequest::new("hi")).await;
        let first = rx.recv().await;
        assert!(matches!(first, Some(StreamEvent::TextDelta(_))));
        drop(rx);

        // Give the forwarding task a moment to observe the closed channel.
        for _ in 0..50 {
            if cancelled.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("upstream read was not cancelled after caller disconnect");
    }
}
