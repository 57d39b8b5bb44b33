// Utility functions
pub mod cache;
pub mod error;
pub mod thread_pool;  // pool dedicado para PDF

pub use cache::*;
pub use error::*;
