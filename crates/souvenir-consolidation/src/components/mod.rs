mod durable;
mod task;

pub use durable::DurableComponent;
pub use task::TaskComponent;
