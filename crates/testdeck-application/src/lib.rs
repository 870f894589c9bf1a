//! Application layer: the generation orchestrator and the per-session
//! context that ties it to an artifact tree and a log.

pub mod orchestrator;
pub mod session;

pub use orchestrator::{Completion, GenerationOrchestrator, OrchestratorSettings, SelectionContext};
pub use session::{Session, SessionRegistry, SessionView};
