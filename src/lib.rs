//! Reinforcement-learning environment for exploring a live web page through
//! Chrome, plus a small HTTP service that rewrites dungeon-game events with a
//! hosted language model.

pub mod brain;
pub mod config;
mod dom;
pub mod driver;
pub mod env;
pub mod error;
pub mod face;
pub mod hands;
pub mod reward;
pub mod spaces;
pub mod types;

pub use config::{EnvConfig, RenderMode};
pub use driver::BrowserDriver;
pub use env::{Environment, WebExplorationEnvironment};
pub use error::{ConfigError, EnvError, NarratorError};
pub use reward::{InfoWeighting, RewardTable};
pub use spaces::{ActionSpace, ExplorationAction, ObservationSpace};
pub use types::{ClickOutcome, ElementSummary, Info, LogCounts, Observation, Severity, Transition};
