pub mod assistant;
pub mod cli;
pub mod config;
pub mod controller;
pub mod distribute;
pub mod inventory;
pub mod llm;
pub mod onboard;
pub mod pipeline;
pub mod publish;
pub mod task;

pub use cli::{run, Cli, Commands};
