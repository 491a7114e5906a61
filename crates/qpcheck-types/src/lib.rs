mod instance;
mod error;

pub use instance::{ConstraintBlock, InstanceView, QpInstance};
pub use error::{QpCheckError, Result};

#[cfg(test)]
mod tests;
