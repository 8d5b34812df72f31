//! Configuration of [`ModelBasedOption`](super::ModelBasedOption).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Configuration of [`ModelBasedOption`](super::ModelBasedOption).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct OptionConfig {
    /// Capacity of the example buffers, the effect set and the success curve,
    /// and the number of trailing states kept in a positive example.
    pub buffer_length: usize,

    /// Number of goal hits after which initiation is gated by classifiers.
    pub gestation_period: usize,

    /// The maximum number of steps of a rollout.
    pub timeout: usize,

    /// If `true`, the goal-conditioned value function is learned.
    pub use_vf: bool,

    /// If `true`, the option uses the value learner of the global option.
    pub use_global_vf: bool,

    /// If `true`, actions are selected by a model-based planner.
    pub use_model: bool,

    /// If `true`, the environment gives dense rewards.
    pub dense_reward: bool,

    /// Number of leading goal features appended to augmented states.
    pub goal_dim: usize,

    /// The maximum number of children of the option.
    pub max_num_children: usize,

    /// Outlier fraction of the pessimistic one-class classifier.
    pub nu: f32,

    /// Path of a dynamics model loaded into the planner.
    #[serde(default)]
    pub path_to_model: Option<PathBuf>,
}

impl Default for OptionConfig {
    fn default() -> Self {
        Self {
            buffer_length: 50,
            gestation_period: 3,
            timeout: 200,
            use_vf: true,
            use_global_vf: false,
            use_model: false,
            dense_reward: false,
            goal_dim: 2,
            max_num_children: 2,
            nu: 0.1,
            path_to_model: None,
        }
    }
}

impl OptionConfig {
    /// Sets the capacity of buffers.
    pub fn buffer_length(mut self, v: usize) -> Self {
        self.buffer_length = v;
        self
    }

    /// Sets the gestation period in goal hits.
    pub fn gestation_period(mut self, v: usize) -> Self {
        self.gestation_period = v;
        self
    }

    /// Sets the maximum number of steps of a rollout.
    pub fn timeout(mut self, v: usize) -> Self {
        self.timeout = v;
        self
    }

    /// Sets if the value function is learned.
    pub fn use_vf(mut self, v: bool) -> Self {
        self.use_vf = v;
        self
    }

    /// Sets if the global value learner is used.
    pub fn use_global_vf(mut self, v: bool) -> Self {
        self.use_global_vf = v;
        self
    }

    /// Sets if a model-based planner selects actions.
    pub fn use_model(mut self, v: bool) -> Self {
        self.use_model = v;
        self
    }

    /// Sets if rewards are dense.
    pub fn dense_reward(mut self, v: bool) -> Self {
        self.dense_reward = v;
        self
    }

    /// Sets the number of goal features in augmented states.
    pub fn goal_dim(mut self, v: usize) -> Self {
        self.goal_dim = v;
        self
    }

    /// Sets the maximum number of children.
    pub fn max_num_children(mut self, v: usize) -> Self {
        self.max_num_children = v;
        self
    }

    /// Sets the outlier fraction of the pessimistic classifier.
    pub fn nu(mut self, v: f32) -> Self {
        self.nu = v;
        self
    }

    /// Sets the path of the dynamics model.
    pub fn path_to_model(mut self, v: impl Into<PathBuf>) -> Self {
        self.path_to_model = Some(v.into());
        self
    }

    /// Constructs [`OptionConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`OptionConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
