// libs/chat-cell/src/services/session.rs
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_models::auth::PortalUser;

use crate::models::{
    AssistantReply, ChatError, ChatRequest, ConversationTurn, HistoryEntry,
    SessionSnapshot, SessionState, CHAT_ERROR_MESSAGE,
};
use crate::services::backend::AssistantBackend;

struct Inner {
    state: SessionState,
    history: Vec<HistoryEntry>,
    display: Vec<ConversationTurn>,
    /// Bumped by every submit and every clear. A reply is applied only if
    /// the epoch it was sent under is still current.
    epoch: u64,
}

/// Turn-by-turn exchange with the assistant.
///
/// Keeps two lists: the canonical `history`, only ever replaced wholesale by
/// what the server returns, and the `display` log, which also carries the
/// optimistic user turn and error annotations. At most one turn is in flight.
pub struct ConversationSession {
    id: Uuid,
    backend: Arc<dyn AssistantBackend>,
    user: Option<PortalUser>,
    inner: Mutex<Inner>,
}

impl ConversationSession {
    pub fn new(backend: Arc<dyn AssistantBackend>, user: Option<PortalUser>) -> Self {
        Self {
            id: Uuid::new_v4(),
            backend,
            user,
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                history: Vec::new(),
                display: Vec::new(),
                epoch: 0,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn submit_turn(&self, text: &str) -> Result<AssistantReply, ChatError> {
        let prompt = text.trim();
        if prompt.is_empty() {
            return Err(ChatError::EmptyInput);
        }

        let (epoch, request) = {
            let mut inner = self.lock();

            if inner.state == SessionState::AwaitingResponse {
                warn!("Session {}: rejecting turn while another is awaiting a reply", self.id);
                return Err(ChatError::Busy);
            }

            inner.epoch += 1;
            inner.state = SessionState::AwaitingResponse;
            inner.display.push(ConversationTurn::user(prompt));

            let mut conversation_history = inner.history.clone();
            conversation_history.push(HistoryEntry::user(prompt));

            let request = ChatRequest {
                prompt: prompt.to_string(),
                conversation_history,
                user_id: self.user.as_ref().map(|u| u.id),
                role: self.user.as_ref().map(|u| u.role),
            };

            (inner.epoch, request)
        };

        let prior_len = request.conversation_history.len() - 1;
        debug!("Session {}: sending turn {} ({} prior entries)", self.id, epoch, prior_len);

        let pending = PendingTurn { session: self, epoch, settled: false };
        let result = self.backend.send(request).await;
        pending.settle();

        let mut inner = self.lock();

        if inner.epoch != epoch {
            debug!("Session {}: discarding reply for turn {} (current {})", self.id, epoch, inner.epoch);
            return Err(ChatError::Superseded);
        }

        match result {
            Ok(response) => {
                if response.conversation_history.len() != prior_len + 2 {
                    warn!(
                        "Session {}: server history has {} entries, expected {}",
                        self.id,
                        response.conversation_history.len(),
                        prior_len + 2
                    );
                }

                inner.history = response.conversation_history;
                inner.display.push(ConversationTurn::assistant(response.response.clone()));
                inner.state = SessionState::Idle;

                info!("Session {}: turn {} completed, history now {}", self.id, epoch, inner.history.len());
                Ok(AssistantReply { content: response.response })
            }
            Err(e) => {
                error!("Session {}: turn {} failed: {}", self.id, epoch, e);

                inner.display.push(ConversationTurn::error(CHAT_ERROR_MESSAGE));
                inner.state = SessionState::Error;
                Err(ChatError::Api(e))
            }
        }
    }

    /// Resets both lists and returns to `Idle`, even mid-flight. Any reply
    /// still outstanding is dropped when it lands.
    pub fn clear_session(&self) {
        let mut inner = self.lock();
        inner.epoch += 1;
        inner.history.clear();
        inner.display.clear();
        inner.state = SessionState::Idle;

        info!("Session {}: cleared", self.id);
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.lock().history.clone()
    }

    pub fn display(&self) -> Vec<ConversationTurn> {
        self.lock().display.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        SessionSnapshot {
            state: inner.state,
            history: inner.history.clone(),
            display: inner.display.clone(),
        }
    }
}

/// Returns the session to `Idle` if the submitting future is dropped before
/// the backend answers. The unanswered user turn gets an error annotation.
struct PendingTurn<'a> {
    session: &'a ConversationSession,
    epoch: u64,
    settled: bool,
}

impl PendingTurn<'_> {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let mut inner = self.session.lock();
        if inner.epoch == self.epoch && inner.state == SessionState::AwaitingResponse {
            debug!("Session {}: turn {} abandoned before reply", self.session.id, self.epoch);
            inner.display.push(ConversationTurn::error(CHAT_ERROR_MESSAGE));
            inner.state = SessionState::Idle;
        }
    }
}
