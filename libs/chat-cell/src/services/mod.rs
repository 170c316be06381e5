pub mod backend;
pub mod session;

pub use backend::{AssistantBackend, RemoteAssistant};
pub use session::ConversationSession;
