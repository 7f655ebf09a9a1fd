pub mod ledger;
pub mod model;

pub use ledger::{History, LEDGER_HEADER, Ledger};
pub use model::ChatTurn;
