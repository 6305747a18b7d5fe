pub mod baseline;
pub mod cost;
pub mod grouping;
pub mod reconciliation;
pub mod session;
pub mod submission;
