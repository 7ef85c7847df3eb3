pub mod chunking;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod traits;
pub mod types;

pub use error::{Error, ErrorKind, Result};
