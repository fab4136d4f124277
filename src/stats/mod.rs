mod classify;
mod correlate;

pub use classify::CorrelationClass;
pub use correlate::{correlate, correlate_with_min};
