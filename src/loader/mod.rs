//! Session loader: module synthesis, UI composition and session orchestration.

pub mod composer;
pub mod dispatch;
pub mod hooks;
pub mod output;
pub mod registry;
pub mod session;
pub mod synthesizer;

pub use session::SessionManager;
