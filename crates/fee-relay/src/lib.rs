pub mod calculator;
pub mod client;
pub mod context;
pub mod context_manager;
mod error;
pub mod fee;
pub mod network;
pub mod preparer;
pub mod program;
pub mod service;
pub mod settings;
pub mod swap;
pub mod token;
pub mod top_up;
pub mod transaction;

pub use error::{Error, Result};
