//! Data models

pub mod alert;
pub mod feedback;

pub use alert::*;
pub use feedback::*;
