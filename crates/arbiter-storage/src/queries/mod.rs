//! SQL for each table. Functions take a `&Connection` so the engine decides
//! which connection (writer or reader) and which transaction they run in.

pub mod approval_ops;
pub mod audit_ops;
pub mod decision_ops;
pub mod experiment_ops;
pub mod insight_ops;
pub mod review_ops;
pub mod snapshot_ops;
pub mod version_ops;

mod codec;
