#![doc = include_str!("../README.md")]

pub mod build;
pub mod command;
pub mod config;
pub mod output;
pub mod target;

pub use tokio_util::sync::CancellationToken;
