//! Specialist agent implementations.
//!
//! Each agent handles one task category: event logging, general chat, or
//! multi-step planning.

pub mod chat;
pub mod event;
pub mod planner;

pub use chat::ChatAgent;
pub use event::EventAgent;
pub use planner::PlannerAgent;
