//! Request orchestration: load tasks, the task registry, and the manager.

mod loader;
mod registry;
mod task;

pub use loader::LoadManager;
pub use registry::TaskRegistry;
pub use task::LoadTask;
