pub mod config;
pub mod error;
pub mod report;
pub mod transport;

pub use config::ReportConfig;
pub use error::{ReportError, Result};
