//! Workflow execution runtime
//!
//! This crate provides the handler registry, preflight graph validation,
//! the traversal engine, the execution store, and the engine facade that
//! accepts trigger events.

mod engine;
mod registry;
mod store;
mod traversal;
mod validate;

pub use engine::{Engine, EngineConfig, RunHandle, RunPolicy};
pub use registry::HandlerRegistry;
pub use store::ExecutionStore;
pub use traversal::Traverser;
pub use validate::{check_acyclic, preflight};
