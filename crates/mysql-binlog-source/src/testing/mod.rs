//! In-memory doubles for driving a session without a MySQL server.

mod diagnostics;
mod scripted;

pub use diagnostics::RecordingDiagnostics;
pub use scripted::ScriptedClient;
