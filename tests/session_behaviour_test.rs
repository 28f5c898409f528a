//! ChatSession behaviour over in-process transports.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use swarmlab_chat::backend::ScriptedBackend;
use swarmlab_chat::consumer::{ByteStream, ChatSession, ChatTransport, LocalTransport};
use swarmlab_chat::producer::StreamProducer;
use swarmlab_chat::types::{ChatStreamRequest, SimulationResults, SwarmMode};
use swarmlab_chat::ChatError;

/// Serves a fixed body split at the given byte offsets.
struct SplitBodyTransport {
    body: Vec<u8>,
    cuts: Vec<usize>,
    opened: AtomicUsize,
}

impl SplitBodyTransport {
    fn new(body: impl Into<Vec<u8>>, cuts: &[usize]) -> Self {
        Self {
            body: body.into(),
            cuts: cuts.to_vec(),
            opened: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChatTransport for SplitBodyTransport {
    async fn open_stream(&self, _: &ChatStreamRequest) -> Result<ByteStream, ChatError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let mut pieces = Vec::new();
        let mut start = 0;
        for &cut in self.cuts.iter().chain(std::iter::once(&self.body.len())) {
            let cut = cut.clamp(start, self.body.len());
            pieces.push(Ok(Bytes::copy_from_slice(&self.body[start..cut])));
            start = cut;
        }
        Ok(Box::pin(futures_util::stream::iter(pieces)))
    }

    async fn complete(&self, _: &ChatStreamRequest) -> Result<String, ChatError> {
        Err(ChatError::Transport("not supported".into()))
    }
}

fn chunk_frame(text: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({"type": "chunk", "data": text})
    )
}

async fn send_over(transport: SplitBodyTransport) -> (ChatSession, Result<String, ChatError>) {
    let session = ChatSession::new(Arc::new(transport));
    let result = session
        .send("Explain results", SimulationResults::default(), SwarmMode::Both)
        .await;
    (session, result)
}

#[tokio::test]
async fn multibyte_characters_split_across_reads() {
    let body = format!("{}{}", chunk_frame("Pengoptimalan "), chunk_frame("蚁群算法 ✓"));
    let bytes = body.as_bytes().to_vec();
    // Cut inside the first CJK character.
    let cjk = body.find('蚁').unwrap();
    let (_, unsplit) = send_over(SplitBodyTransport::new(bytes.clone(), &[])).await;
    let (_, split) = send_over(SplitBodyTransport::new(bytes, &[cjk + 1, cjk + 2])).await;
    assert_eq!(unsplit.unwrap(), "Pengoptimalan 蚁群算法 ✓");
    assert_eq!(split.unwrap(), "Pengoptimalan 蚁群算法 ✓");
}

#[tokio::test]
async fn malformed_frame_between_chunks_is_skipped() {
    let clean = format!("{}{}", chunk_frame("a"), chunk_frame("b"));
    let dirty = format!(
        "{}data: {{\"type\":\"chunk\",\"data\":\n\n: keep-alive\n\n{}",
        chunk_frame("a"),
        chunk_frame("b")
    );
    let (_, clean) = send_over(SplitBodyTransport::new(clean, &[])).await;
    let (_, dirty) = send_over(SplitBodyTransport::new(dirty, &[7, 40])).await;
    assert_eq!(clean.unwrap(), "ab");
    assert_eq!(dirty.unwrap(), "ab");
}

#[tokio::test]
async fn frame_split_at_every_byte() {
    let body = format!(
        "data: {{\"type\":\"start\",\"data\":\"Starting response...\"}}\n\n{}{}data: {{\"type\":\"done\",\"data\":\"Response complete\"}}\n\n",
        chunk_frame("The ACO "),
        chunk_frame("algorithm performed better.")
    );
    let cuts: Vec<usize> = (1..body.len()).collect();
    let (session, reply) = send_over(SplitBodyTransport::new(body, &cuts)).await;
    assert_eq!(reply.unwrap(), "The ACO algorithm performed better.");
    assert_eq!(session.snapshot().streaming_count(), 0);
}

#[tokio::test]
async fn blank_input_makes_no_call() {
    let transport = Arc::new(SplitBodyTransport::new(chunk_frame("x"), &[]));
    let session = ChatSession::new(transport.clone());
    for input in ["", "   ", "\n\t"] {
        assert_eq!(
            session
                .send_lenient(input, SimulationResults::default(), SwarmMode::Both)
                .await,
            Err(ChatError::EmptyInput)
        );
    }
    assert!(session.snapshot().messages.is_empty());
    assert_eq!(transport.opened.load(Ordering::SeqCst), 0);
}

fn slow_session(chunks: &[&str]) -> Arc<ChatSession> {
    let backend = ScriptedBackend::new(chunks.iter().copied()).with_delay(Duration::from_millis(30));
    let producer = StreamProducer::new(Arc::new(backend));
    Arc::new(ChatSession::new(Arc::new(LocalTransport::new(producer))))
}

#[tokio::test]
async fn overlapping_send_is_rejected() {
    let session = slow_session(&["one ", "two"]);
    let (first, second) = tokio::join!(
        session.send("first", SimulationResults::default(), SwarmMode::Both),
        session.send("second", SimulationResults::default(), SwarmMode::Both),
    );
    assert_eq!(first.unwrap(), "one two");
    assert_eq!(second, Err(ChatError::Busy));

    let state = session.snapshot();
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[0].content, "first");
}

#[tokio::test]
async fn exactly_one_streaming_message_while_busy() {
    let session = slow_session(&["a", "b", "c", "d"]);
    let mut updates = session.subscribe();

    let watcher = tokio::spawn(async move {
        let mut observed = 0;
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            if state.busy {
                assert_eq!(state.streaming_count(), 1);
            } else {
                assert_eq!(state.streaming_count(), 0);
            }
            observed += 1;
            if !state.busy && state.messages.len() == 2 {
                break;
            }
        }
        observed
    });

    session
        .send("go", SimulationResults::default(), SwarmMode::Both)
        .await
        .unwrap();
    let observed = watcher.await.unwrap();
    assert!(observed >= 2);
}

#[tokio::test]
async fn cancel_keeps_partial_reply() {
    let session = slow_session(&["Result: ", "never ", "seen"]);
    let mut updates = session.subscribe();

    let sender = {
        let session = session.clone();
        tokio::spawn(async move {
            session
                .send("go", SimulationResults::default(), SwarmMode::Both)
                .await
        })
    };

    updates
        .wait_for(|s| s.messages.get(1).is_some_and(|m| !m.content.is_empty()))
        .await
        .unwrap();
    session.cancel();

    let reply = sender.await.unwrap().unwrap();
    assert_eq!(reply, "Result: ");
    let state = session.snapshot();
    assert!(!state.busy);
    assert_eq!(state.streaming_count(), 0);
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn clear_after_settled_send_empties_transcript() {
    let session = slow_session(&["ok"]);
    session
        .send("one", SimulationResults::default(), SwarmMode::Both)
        .await
        .unwrap();
    let failing = ScriptedBackend::new(["x"]).fail_after(0, "model overloaded");
    let other = ChatSession::new(Arc::new(LocalTransport::new(StreamProducer::new(Arc::new(
        failing,
    )))));
    let _ = other
        .send("two", SimulationResults::default(), SwarmMode::Both)
        .await;
    assert_eq!(
        other.snapshot().messages[1].content,
        "Error: model overloaded"
    );

    for s in [&*session, &other] {
        s.clear();
        let state = s.snapshot();
        assert!(state.messages.is_empty());
        assert!(!state.busy);
        assert!(state.last_error.is_none());
    }

    // The session stays usable after a reset.
    assert_eq!(
        session
            .send("again", SimulationResults::default(), SwarmMode::Both)
            .await
            .unwrap(),
        "ok"
    );
}

#[tokio::test]
async fn clear_mid_stream_accepts_next_send_at_once() {
    let session = slow_session(&["slow ", "reply ", "text"]);
    let mut updates = session.subscribe();

    let first = {
        let session = session.clone();
        tokio::spawn(async move {
            session
                .send("first", SimulationResults::default(), SwarmMode::Both)
                .await
        })
    };

    updates.wait_for(|s| s.busy).await.unwrap();
    session.clear();
    assert_eq!(session.snapshot().messages.len(), 0);
    assert!(!session.snapshot().busy);

    let second = session
        .send("second", SimulationResults::default(), SwarmMode::Both)
        .await
        .unwrap();
    assert_eq!(second, "slow reply text");
    first.await.unwrap().unwrap();

    let state = session.snapshot();
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[0].content, "second");
    assert_eq!(state.messages[1].content, "slow reply text");
    assert_eq!(state.streaming_count(), 0);
    assert!(!state.busy);
}

#[tokio::test]
async fn surrounding_whitespace_reaches_the_transcript() {
    let session = slow_session(&["ok"]);
    session
        .send("  x\n", SimulationResults::default(), SwarmMode::Both)
        .await
        .unwrap();
    assert_eq!(session.snapshot().messages[0].content, "  x\n");
}

#[tokio::test]
async fn sessions_are_independent() {
    let a = slow_session(&["A"]);
    let b = slow_session(&["B"]);
    let (ra, rb) = tokio::join!(
        a.send("x", SimulationResults::default(), SwarmMode::Aco),
        b.send("y", SimulationResults::default(), SwarmMode::Pso),
    );
    assert_eq!(ra.unwrap(), "A");
    assert_eq!(rb.unwrap(), "B");
    assert_eq!(a.snapshot().messages.len(), 2);
    assert_eq!(b.snapshot().messages.len(), 2);
}
