pub mod session;
pub mod turn;

use std::sync::Arc;
use std::time::Duration;

use snaplearn_ledger::Ledger;
use snaplearn_llm::VisionModel;
use tokio::sync::Mutex;

pub use session::SessionState;
pub use turn::{CompletedTurn, TurnError, run_turn};

pub type Error = anyhow::Error;

/// Shared handles for every page request, built once at startup.
#[derive(Clone, Debug)]
pub struct Data {
    pub ledger: Ledger,
    pub llm: Arc<dyn VisionModel>,
    /// Fixed instruction sent ahead of every image.
    pub instruction: Arc<str>,
    /// Cosmetic pause between receiving the answer and showing it.
    pub reveal_delay: Duration,
    turn_gate: Arc<Mutex<()>>,
}

impl Data {
    pub fn new(
        ledger: Ledger,
        llm: Arc<dyn VisionModel>,
        instruction: impl Into<Arc<str>>,
        reveal_delay: Duration,
    ) -> Self {
        Self {
            ledger,
            llm,
            instruction: instruction.into(),
            reveal_delay,
            turn_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Serializes turns so only one submission is processed at a time.
    pub(crate) fn turn_gate(&self) -> &Mutex<()> {
        &self.turn_gate
    }
}
