pub mod client;
pub mod session;

pub use client::PortalClient;
pub use session::SessionContext;
