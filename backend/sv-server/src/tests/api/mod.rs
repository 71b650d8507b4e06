mod error;
mod resolve;
