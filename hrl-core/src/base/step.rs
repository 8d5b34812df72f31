//! Environment step.
use super::GoalEnv;

/// Additional information to `Obs` and `Act`.
pub trait Info {}

impl Info for () {}

/// Represents an action, observation and reward tuple `(a_t, o_t+1, r_t)`
/// with some additional information.
///
/// A [`GoalEnv`] emits a [`Step`] object at every interaction step.
pub struct Step<E: GoalEnv> {
    /// Action.
    pub act: E::Act,

    /// Observation after the action.
    pub obs: E::Obs,

    /// Reward.
    pub reward: f32,

    /// Flag denoting if the episode is terminated.
    pub is_terminated: bool,

    /// Flag denoting if the episode is truncated, i.e. the environment needs a reset.
    pub is_truncated: bool,

    /// Flag denoting if the agent failed (e.g. died).
    ///
    /// An agent that has failed is never at its goal.
    pub is_dead: bool,

    /// Information defined by user.
    pub info: E::Info,
}

impl<E: GoalEnv> Step<E> {
    /// Constructs a [`Step`] object.
    pub fn new(
        obs: E::Obs,
        act: E::Act,
        reward: f32,
        is_terminated: bool,
        is_truncated: bool,
        is_dead: bool,
        info: E::Info,
    ) -> Self {
        Step {
            act,
            obs,
            reward,
            is_terminated,
            is_truncated,
            is_dead,
            info,
        }
    }

    #[inline]
    /// Terminated, truncated or dead.
    pub fn is_done(&self) -> bool {
        self.is_terminated || self.is_truncated || self.is_dead
    }
}
