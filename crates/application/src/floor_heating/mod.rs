mod dependent;
mod loops;

pub use dependent::{ChildId, DependentRelay, SignalingRelay};
pub use loops::HeatingLoops;
