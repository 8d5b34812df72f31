//! Chains of options.
mod base;
mod config;
mod rollout;
pub use base::{OptionChain, GLOBAL_OPTION_NAME};
pub use config::OptionChainConfig;
pub use rollout::RolloutOutcome;
