pub mod error;
pub mod resolve;
pub mod workers;
