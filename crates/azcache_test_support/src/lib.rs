#![allow(clippy::result_large_err)]

pub mod containers;
pub mod fake_executor;
pub mod fixtures;

pub use fake_executor::{FakeCommand, FakeExecutor, FakeReply};
