//! Web request handlers

pub mod proxy;

pub use proxy::forward;
