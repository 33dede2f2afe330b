//! Conversation controller — sequences user turns against a [`ChatTransport`].
//!
//! Each turn follows the same state machine:
//!
//! ```text
//! Idle --submit--> Pending --(transport settles: ok | error)--> Idle
//! ```
//!
//! The user message is appended before the network call, and exactly one bot
//! message (answer or error) is appended when the call settles. While a turn
//! is pending every further submission is rejected, so at most one exchange
//! is in flight per conversation and bot replies can never interleave.
//!
//! If the caller drops a `submit` future while the transport call is still
//! running, the turn settles with a network error so the conversation never
//! stays pending.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use cedarbot_core::error::{TransportError, ValidationError};
use cedarbot_core::session::SessionManager;
use cedarbot_core::types::{AttachmentRef, Message, Session};
use cedarbot_transport::ChatTransport;

use crate::draft::Draft;

// ─────────────────────────────────────────────
// Public types
// ─────────────────────────────────────────────

/// Read-only view of the conversation, published after every mutation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversationSnapshot {
    pub session: Option<Session>,
    pub messages: Vec<Message>,
    pub pending: bool,
}

/// Why a submission was refused without touching the history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// `start` has not been called, or the session was reset.
    NoSession,
    /// A previous turn is still waiting for the transport.
    AwaitingResponse,
}

/// Result of a call to [`ConversationController::submit`].
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// The endpoint answered; a bot message with the answer was appended.
    Answered,
    /// The exchange failed; a bot message describing the error was appended.
    Failed(TransportError),
    /// Blank text and no attachments — nothing happened.
    Ignored,
    /// Refused before anything was appended.
    Rejected(RejectReason),
    /// The conversation was reset while the turn was in flight; its result
    /// was dropped.
    Discarded,
}

// ─────────────────────────────────────────────
// Internal state
// ─────────────────────────────────────────────

#[derive(Debug, Default)]
struct ConversationState {
    sessions: SessionManager,
    messages: Vec<Message>,
    pending: bool,
    /// Last message sequence number handed out in this conversation.
    seq: u64,
    /// Bumped by `start` and `reset`; turns from an older epoch are orphaned.
    epoch: u64,
}

impl ConversationState {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn clear(&mut self) {
        self.messages.clear();
        self.pending = false;
        self.seq = 0;
        self.epoch += 1;
    }

    fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            session: self.sessions.current().cloned(),
            messages: self.messages.clone(),
            pending: self.pending,
        }
    }
}

/// A turn that has been accepted and is waiting on the transport.
#[derive(Debug)]
struct PendingTurn {
    session: Session,
    content: String,
    epoch: u64,
}

/// Settles a turn whose `submit` future was dropped before the transport
/// answered. Disarmed once the turn completes normally.
struct SettleOnDrop<'a> {
    controller: &'a ConversationController,
    epoch: u64,
    armed: bool,
}

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.controller.abandon_turn(self.epoch);
        }
    }
}

// ─────────────────────────────────────────────
// ConversationController
// ─────────────────────────────────────────────

/// Owns the message history and pending flag of one conversation.
///
/// Cheap to share behind an `Arc`. The internal lock is only held for short
/// synchronous sections and never across the transport call.
pub struct ConversationController {
    transport: Arc<dyn ChatTransport>,
    state: Mutex<ConversationState>,
    updates: watch::Sender<ConversationSnapshot>,
}

impl std::fmt::Debug for ConversationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationController")
            .field("transport", &self.transport.display_name())
            .field("state", &*self.lock())
            .finish()
    }
}

impl ConversationController {
    /// Create a controller with no session, an empty history, and nothing pending.
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        let (updates, _) = watch::channel(ConversationSnapshot::default());
        ConversationController {
            transport,
            state: Mutex::new(ConversationState::default()),
            updates,
        }
    }

    /// Start a session, replacing any previous conversation with an empty one.
    ///
    /// On a validation error the previous conversation is left as it was.
    pub fn start(
        &self,
        user_id: &str,
        session_id_hint: Option<&str>,
    ) -> Result<Session, ValidationError> {
        let mut state = self.lock();
        let session = state.sessions.start(user_id, session_id_hint)?;
        state.clear();
        self.publish(&state);
        info!(user = %session.user_id, session = %session.session_id, "conversation started");
        Ok(session)
    }

    /// Clear the history and pending flag, and end the session.
    pub fn reset(&self) {
        let mut state = self.lock();
        if state.pending {
            debug!("reset while a turn is pending; its result will be dropped");
        }
        state.clear();
        state.sessions.reset();
        self.publish(&state);
    }

    /// Run one turn: append the user message, ask the transport, append the reply.
    ///
    /// Transport failures never escape; they become a bot message and
    /// [`SubmitOutcome::Failed`].
    pub async fn submit(&self, text: &str, attachments: &[AttachmentRef]) -> SubmitOutcome {
        match self.begin_turn(text, attachments) {
            Ok(turn) => self.complete_turn(turn).await,
            Err(outcome) => outcome,
        }
    }

    /// Submit the contents of `draft`, clearing it once the turn is accepted.
    ///
    /// A rejected or ignored submission leaves the draft untouched.
    pub async fn submit_draft(&self, draft: &mut Draft) -> SubmitOutcome {
        let turn = match self.begin_turn(draft.text(), draft.attachments()) {
            Ok(turn) => turn,
            Err(outcome) => return outcome,
        };
        draft.clear();
        self.complete_turn(turn).await
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        self.lock().snapshot()
    }

    /// Observe the conversation; the receiver sees a new snapshot after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.updates.subscribe()
    }

    pub fn session(&self) -> Option<Session> {
        self.lock().sessions.current().cloned()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().pending
    }

    // ── Turn state machine ──

    /// Idle → Pending. Appends the user message synchronously.
    fn begin_turn(
        &self,
        text: &str,
        attachments: &[AttachmentRef],
    ) -> Result<PendingTurn, SubmitOutcome> {
        let mut state = self.lock();

        let session = state
            .sessions
            .current()
            .cloned()
            .ok_or(SubmitOutcome::Rejected(RejectReason::NoSession))?;
        if state.pending {
            debug!(session = %session.session_id, "submission rejected: turn pending");
            return Err(SubmitOutcome::Rejected(RejectReason::AwaitingResponse));
        }
        if text.trim().is_empty() && attachments.is_empty() {
            return Err(SubmitOutcome::Ignored);
        }

        let seq = state.next_seq();
        let message = Message::user(seq, text, attachments.to_vec());
        let content = message.content.clone();
        debug!(
            session = %session.session_id,
            id = %message.id,
            attachments = attachments.len(),
            "user message appended"
        );
        state.messages.push(message);
        state.pending = true;
        self.publish(&state);

        Ok(PendingTurn {
            session,
            content,
            epoch: state.epoch,
        })
    }

    /// Pending → Idle. Awaits the transport and appends exactly one bot message.
    async fn complete_turn(&self, turn: PendingTurn) -> SubmitOutcome {
        let mut guard = SettleOnDrop {
            controller: self,
            epoch: turn.epoch,
            armed: true,
        };
        let result = self
            .transport
            .send(&turn.session.user_id, &turn.session.session_id, &turn.content)
            .await;
        guard.armed = false;

        let mut state = self.lock();
        if state.epoch != turn.epoch {
            debug!(session = %turn.session.session_id, "dropping reply for a reset conversation");
            return SubmitOutcome::Discarded;
        }

        let seq = state.next_seq();
        let outcome = match result {
            Ok(answer) => {
                state.messages.push(Message::bot(seq, answer));
                SubmitOutcome::Answered
            }
            Err(e) => {
                warn!(
                    transport = self.transport.display_name(),
                    kind = %e.kind,
                    status = ?e.status,
                    detail = %e.detail,
                    "turn failed"
                );
                state.messages.push(Message::error(seq, e.clone()));
                SubmitOutcome::Failed(e)
            }
        };
        state.pending = false;
        self.publish(&state);
        outcome
    }

    /// Pending → Idle for a turn cancelled mid-flight.
    fn abandon_turn(&self, epoch: u64) {
        let mut state = self.lock();
        if state.epoch != epoch || !state.pending {
            return;
        }
        let seq = state.next_seq();
        let failure = TransportError::network("request cancelled before the endpoint answered");
        warn!(detail = %failure.detail, "turn cancelled");
        state.messages.push(Message::error(seq, failure));
        state.pending = false;
        self.publish(&state);
    }

    fn lock(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &ConversationState) {
        self.updates.send_replace(state.snapshot());
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cedarbot_core::error::TransportErrorKind;
    use cedarbot_core::types::{Sender, ATTACHMENT_PLACEHOLDER};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// A transport that returns canned results in sequence and records calls.
    struct MockTransport {
        replies: std::sync::Mutex<Vec<Result<String, TransportError>>>,
        calls: std::sync::Mutex<Vec<(String, String, String)>>,
    }

    impl MockTransport {
        fn new(replies: Vec<Result<String, TransportError>>) -> Self {
            Self {
                replies: std::sync::Mutex::new(replies),
                calls: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn simple(answer: &str) -> Self {
            Self::new(vec![Ok(answer.to_string())])
        }

        fn calls(&self) -> Vec<(String, String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatTransport for MockTransport {
        async fn send(
            &self,
            user_id: &str,
            session_id: &str,
            message: &str,
        ) -> Result<String, TransportError> {
            self.calls.lock().unwrap().push((
                user_id.to_string(),
                session_id.to_string(),
                message.to_string(),
            ));
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Ok("(no more replies)".to_string())
            } else {
                replies.remove(0)
            }
        }

        fn display_name(&self) -> &str {
            "MockTransport"
        }
    }

    /// A transport that blocks until the test opens the gate.
    struct GatedTransport {
        gate: Arc<Notify>,
        answer: String,
    }

    #[async_trait]
    impl ChatTransport for GatedTransport {
        async fn send(
            &self,
            _user_id: &str,
            _session_id: &str,
            _message: &str,
        ) -> Result<String, TransportError> {
            self.gate.notified().await;
            Ok(self.answer.clone())
        }

        fn display_name(&self) -> &str {
            "GatedTransport"
        }
    }

    fn controller_with(transport: Arc<MockTransport>) -> ConversationController {
        ConversationController::new(transport)
    }

    fn gated(answer: &str) -> (Arc<ConversationController>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(GatedTransport {
            gate: gate.clone(),
            answer: answer.to_string(),
        });
        (Arc::new(ConversationController::new(transport)), gate)
    }

    async fn wait_until_pending(controller: &ConversationController) {
        let mut rx = controller.subscribe();
        rx.wait_for(|s| s.pending).await.unwrap();
    }

    // ── Lifecycle ──

    #[test]
    fn test_initial_state() {
        let controller = controller_with(Arc::new(MockTransport::simple("x")));
        let snap = controller.snapshot();
        assert!(snap.session.is_none());
        assert!(snap.messages.is_empty());
        assert!(!snap.pending);
    }

    #[test]
    fn test_start_rejects_blank_user() {
        let controller = controller_with(Arc::new(MockTransport::simple("x")));
        assert_eq!(controller.start("", None), Err(ValidationError::EmptyUserId));
        assert_eq!(controller.start("   ", None), Err(ValidationError::EmptyUserId));
        assert!(controller.session().is_none());
    }

    #[tokio::test]
    async fn test_submit_without_session_is_rejected() {
        let transport = Arc::new(MockTransport::simple("x"));
        let controller = controller_with(transport.clone());

        let outcome = controller.submit("hello", &[]).await;

        assert_eq!(outcome, SubmitOutcome::Rejected(RejectReason::NoSession));
        assert!(controller.messages().is_empty());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_submit_is_noop() {
        let transport = Arc::new(MockTransport::simple("x"));
        let controller = controller_with(transport.clone());
        controller.start("alice", None).unwrap();

        assert_eq!(controller.submit("", &[]).await, SubmitOutcome::Ignored);
        assert_eq!(controller.submit("   \n", &[]).await, SubmitOutcome::Ignored);

        assert!(controller.messages().is_empty());
        assert!(!controller.is_pending());
        assert!(transport.calls().is_empty());
    }

    // ── Turns ──

    #[tokio::test]
    async fn test_successful_turn() {
        let transport = Arc::new(MockTransport::simple("You get 15 days."));
        let controller = controller_with(transport.clone());
        let session = controller.start("alice", None).unwrap();

        let outcome = controller.submit("What is the PTO policy?", &[]).await;
        assert_eq!(outcome, SubmitOutcome::Answered);

        let snap = controller.snapshot();
        assert_eq!(snap.messages.len(), 2);
        assert_eq!(snap.messages[0].sender, Sender::User);
        assert_eq!(snap.messages[0].content, "What is the PTO policy?");
        assert_eq!(snap.messages[1].sender, Sender::Bot);
        assert_eq!(snap.messages[1].content, "You get 15 days.");
        assert!(!snap.pending);

        assert_eq!(
            transport.calls(),
            vec![(
                "alice".to_string(),
                session.session_id,
                "What is the PTO policy?".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_failed_turns_append_one_bot_message() {
        let failures = [
            TransportError::network("connection refused"),
            TransportError::protocol(500, "Internal Server Error"),
            TransportError::malformed("missing `answer` field"),
        ];

        for failure in failures {
            let kind = failure.kind;
            let transport = Arc::new(MockTransport::new(vec![Err(failure)]));
            let controller = controller_with(transport);
            controller.start("alice", None).unwrap();

            let outcome = controller.submit("hi", &[]).await;
            assert!(matches!(outcome, SubmitOutcome::Failed(ref e) if e.kind == kind));

            let messages = controller.messages();
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[1].sender, Sender::Bot);
            assert!(!messages[1].content.is_empty());
            assert_eq!(messages[1].failure.as_ref().map(|f| f.kind), Some(kind));
            assert!(!controller.is_pending());
        }
    }

    #[tokio::test]
    async fn test_protocol_error_scenario() {
        let transport = Arc::new(MockTransport::new(vec![Err(TransportError::protocol(
            500, "oops",
        ))]));
        let controller = controller_with(transport);
        controller.start("alice", None).unwrap();

        controller.submit("What is the PTO policy?", &[]).await;

        let messages = controller.messages();
        assert_eq!(messages[0].content, "What is the PTO policy?");
        assert!(messages[1].content.contains("error"));
        assert!(messages[1].content.contains("500"));
    }

    #[tokio::test]
    async fn test_session_usable_after_failure() {
        let transport = Arc::new(MockTransport::new(vec![
            Err(TransportError::network("timed out")),
            Ok("Second time lucky.".to_string()),
        ]));
        let controller = controller_with(transport);
        controller.start("alice", None).unwrap();

        controller.submit("first", &[]).await;
        let outcome = controller.submit("second", &[]).await;

        assert_eq!(outcome, SubmitOutcome::Answered);
        let messages = controller.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[3].content, "Second time lucky.");
    }

    #[tokio::test]
    async fn test_attachment_only_sends_placeholder() {
        let transport = Arc::new(MockTransport::simple("Got it."));
        let controller = controller_with(transport.clone());
        controller.start("alice", None).unwrap();

        let attachments = vec![AttachmentRef::new("scan.png", "image/png", 2048)];
        controller.submit("  ", &attachments).await;

        let messages = controller.messages();
        assert_eq!(messages[0].content, ATTACHMENT_PLACEHOLDER);
        assert_eq!(messages[0].attachments, attachments);
        assert_eq!(transport.calls()[0].2, ATTACHMENT_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_message_ids_unique_and_ordered() {
        let transport = Arc::new(MockTransport::new(vec![
            Ok("a".to_string()),
            Err(TransportError::network("down")),
        ]));
        let controller = controller_with(transport);
        controller.start("alice", None).unwrap();

        controller.submit("one", &[]).await;
        controller.submit("two", &[]).await;

        let ids: Vec<String> = controller.messages().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["user_1", "bot_2", "user_3", "error_4"]);
    }

    // ── Drafts ──

    #[tokio::test]
    async fn test_submit_draft_clears_draft_and_snapshots_attachments() {
        let transport = Arc::new(MockTransport::simple("ok"));
        let controller = controller_with(transport);
        controller.start("alice", None).unwrap();

        let mut draft = Draft::new();
        draft.set_text("see attached");
        draft.add_attachment(AttachmentRef::new("a.pdf", "application/pdf", 1));

        assert_eq!(controller.submit_draft(&mut draft).await, SubmitOutcome::Answered);
        assert!(draft.is_empty());

        draft.add_attachment(AttachmentRef::new("b.pdf", "application/pdf", 2));
        let messages = controller.messages();
        assert_eq!(messages[0].attachments.len(), 1);
        assert_eq!(messages[0].attachments[0].name, "a.pdf");
    }

    #[tokio::test]
    async fn test_rejected_draft_is_kept() {
        let controller = controller_with(Arc::new(MockTransport::simple("ok")));

        let mut draft = Draft::new();
        draft.set_text("hello?");

        let outcome = controller.submit_draft(&mut draft).await;
        assert_eq!(outcome, SubmitOutcome::Rejected(RejectReason::NoSession));
        assert_eq!(draft.text(), "hello?");
    }

    // ── Single-flight ──

    #[tokio::test]
    async fn test_second_submit_while_pending_is_rejected() {
        let (controller, gate) = gated("done");
        controller.start("alice", None).unwrap();

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.submit("first", &[]).await })
        };
        wait_until_pending(&controller).await;

        let before = controller.snapshot();
        let second = controller.submit("second", &[]).await;
        assert_eq!(second, SubmitOutcome::Rejected(RejectReason::AwaitingResponse));
        assert_eq!(controller.snapshot(), before);

        gate.notify_one();
        assert_eq!(first.await.unwrap(), SubmitOutcome::Answered);

        let messages = controller.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].content, "done");
        assert!(!controller.is_pending());
    }

    #[tokio::test]
    async fn test_dropped_submit_settles_turn() {
        let (controller, gate) = gated("late");
        controller.start("alice", None).unwrap();

        let timed_out =
            tokio::time::timeout(Duration::from_millis(50), controller.submit("hi", &[])).await;
        assert!(timed_out.is_err());

        let snap = controller.snapshot();
        assert!(!snap.pending);
        assert_eq!(snap.messages.len(), 2);
        assert_eq!(snap.messages[1].sender, Sender::Bot);
        assert_eq!(
            snap.messages[1].failure.as_ref().map(|f| f.kind),
            Some(TransportErrorKind::Network)
        );

        gate.notify_one();
        assert_eq!(controller.submit("again", &[]).await, SubmitOutcome::Answered);
        let messages = controller.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[3].content, "late");
    }

    #[tokio::test]
    async fn test_dropped_submit_after_reset_leaves_new_conversation_alone() {
        let (controller, _gate) = gated("never");
        controller.start("alice", None).unwrap();

        let turn = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.submit("hello", &[]).await })
        };
        wait_until_pending(&controller).await;

        controller.start("bob", Some("fresh")).unwrap();
        turn.abort();
        assert!(turn.await.unwrap_err().is_cancelled());

        let snap = controller.snapshot();
        assert!(snap.messages.is_empty());
        assert!(!snap.pending);
    }

    #[tokio::test]
    async fn test_subscriber_observes_pending_transitions() {
        let (controller, gate) = gated("done");
        controller.start("alice", None).unwrap();
        let mut rx = controller.subscribe();

        let turn = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.submit("hi", &[]).await })
        };

        let snap = rx.wait_for(|s| s.pending).await.unwrap().clone();
        assert_eq!(snap.messages.len(), 1);

        gate.notify_one();
        let snap = rx.wait_for(|s| !s.pending).await.unwrap().clone();
        assert_eq!(snap.messages.len(), 2);
        turn.await.unwrap();
    }

    // ── Reset ──

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let transport = Arc::new(MockTransport::new(vec![
            Ok("a".to_string()),
            Err(TransportError::malformed("{}")),
        ]));
        let controller = controller_with(transport);
        controller.start("alice", None).unwrap();
        controller.submit("one", &[]).await;
        controller.submit("two", &[]).await;

        controller.reset();

        let snap = controller.snapshot();
        assert!(snap.messages.is_empty());
        assert!(!snap.pending);
        assert!(snap.session.is_none());

        // Idempotent
        controller.reset();
        assert!(controller.session().is_none());
    }

    #[tokio::test]
    async fn test_reply_after_reset_is_discarded() {
        let (controller, gate) = gated("stale answer");
        controller.start("alice", None).unwrap();

        let turn = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.submit("hello", &[]).await })
        };
        wait_until_pending(&controller).await;

        controller.reset();
        controller.start("bob", Some("fresh")).unwrap();
        gate.notify_one();

        assert_eq!(turn.await.unwrap(), SubmitOutcome::Discarded);
        let snap = controller.snapshot();
        assert!(snap.messages.is_empty());
        assert!(!snap.pending);
        assert_eq!(snap.session.unwrap().user_id, "bob");
    }

    #[tokio::test]
    async fn test_start_replaces_conversation() {
        let transport = Arc::new(MockTransport::simple("a"));
        let controller = controller_with(transport);
        controller.start("alice", Some("s1")).unwrap();
        controller.submit("one", &[]).await;

        let session = controller.start("alice", Some("s2")).unwrap();

        assert_eq!(session.session_id, "s2");
        assert!(controller.messages().is_empty());
    }

    #[test]
    fn test_kind_is_preserved_for_diagnostics() {
        let msg = Message::error(1, TransportError::protocol(502, "bad gateway"));
        let failure = msg.failure.unwrap();
        assert_eq!(failure.kind, TransportErrorKind::Protocol);
        assert!(failure.detail.contains("bad gateway"));
    }
}
