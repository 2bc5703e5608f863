//! # arbiter-ledger
//!
//! Append-only record of agent decisions and the outcomes attached to them
//! later. There is no update or delete path.

mod ledger;

pub use ledger::DecisionLedger;
