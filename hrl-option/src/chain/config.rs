//! Configuration of [`OptionChain`](super::OptionChain).
use crate::OptionConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`OptionChain`](super::OptionChain).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct OptionChainConfig {
    /// Configuration shared by every option of the chain.
    pub option: OptionConfig,

    /// Random seed of goal sampling and exploration.
    pub seed: u64,

    /// If given, rewards are clipped to `[-clip_reward, clip_reward]` during rollouts.
    #[serde(default)]
    pub clip_reward: Option<f32>,

    /// The maximum number of environment steps before [`OptionChain::train`](super::OptionChain::train)
    /// resets the environment.
    pub max_episode_steps: usize,
}

impl Default for OptionChainConfig {
    fn default() -> Self {
        Self {
            option: OptionConfig::default(),
            seed: 42,
            clip_reward: None,
            max_episode_steps: 1000,
        }
    }
}

impl OptionChainConfig {
    /// Sets the configuration of options.
    pub fn option(mut self, v: OptionConfig) -> Self {
        self.option = v;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Sets the reward clipping bound.
    pub fn clip_reward(mut self, v: f32) -> Self {
        self.clip_reward = Some(v);
        self
    }

    /// Sets the maximum number of steps in an episode.
    pub fn max_episode_steps(mut self, v: usize) -> Self {
        self.max_episode_steps = v;
        self
    }

    /// Constructs [`OptionChainConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`OptionChainConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_option_chain_config() -> Result<()> {
        let config = OptionChainConfig::default()
            .seed(7)
            .clip_reward(1.0)
            .max_episode_steps(500)
            .option(OptionConfig::default().timeout(50));

        let dir = TempDir::new("option_chain_config")?;
        let path = dir.path().join("option_chain_config.yaml");
        config.save(&path)?;
        let config_ = OptionChainConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }
}
