//! Salient events.
use ndarray::{Array1, ArrayView1};
use rand::Rng;
use std::{collections::VecDeque, fmt};

/// Capacity of the effect set of a [`SalientEvent`].
pub const EFFECT_SET_CAPACITY: usize = 20;

/// A region of the state space treated as a meaningful subgoal.
///
/// The region is a box of half-width `tolerance` around the target position;
/// every axis is tested independently. The target never changes after
/// construction. The effect set keeps the latest observations confirmed to
/// reach the event and serves as an alternative goal distribution.
#[derive(Clone, Debug)]
pub struct SalientEvent<O> {
    target_obs: O,
    target_pos: Array1<f32>,
    tolerance: f32,
    effect_set: VecDeque<(O, Array1<f32>)>,
}

impl<O: Clone> SalientEvent<O> {
    /// Creates a salient event. The effect set starts with the target itself.
    pub fn new(target_obs: O, target_pos: Array1<f32>, tolerance: f32) -> Self {
        assert!(
            tolerance.is_finite() && tolerance >= 0.0,
            "Tolerance of a salient event must be non-negative, got {}",
            tolerance
        );

        let mut effect_set = VecDeque::with_capacity(EFFECT_SET_CAPACITY);
        effect_set.push_back((target_obs.clone(), target_pos.clone()));

        Self {
            target_obs,
            target_pos,
            tolerance,
            effect_set,
        }
    }

    /// Returns `true` if `pos` lies within `tolerance` of the target on every axis.
    pub fn contains(&self, pos: ArrayView1<f32>) -> bool {
        pos.len() >= self.target_pos.len()
            && self
                .target_pos
                .iter()
                .zip(pos.iter())
                .all(|(t, p)| (p - t).abs() <= self.tolerance)
    }

    /// Adds an observation confirmed to reach the event; the oldest one is
    /// evicted when the effect set is full.
    pub fn add_to_effect_set(&mut self, obs: O, pos: Array1<f32>) {
        if self.effect_set.len() == EFFECT_SET_CAPACITY {
            self.effect_set.pop_front();
        }
        self.effect_set.push_back((obs, pos));
    }

    /// Samples an observation and its position from the effect set.
    pub fn sample(&self, rng: &mut impl Rng) -> (O, Array1<f32>) {
        if self.effect_set.is_empty() {
            return (self.target_obs.clone(), self.target_pos.clone());
        }
        let ix = rng.gen_range(0..self.effect_set.len());
        self.effect_set[ix].clone()
    }

    /// Target position.
    pub fn target_position(&self) -> &Array1<f32> {
        &self.target_pos
    }

    /// Target observation.
    pub fn target_obs(&self) -> &O {
        &self.target_obs
    }

    /// Half-width of the region on every axis.
    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Returns an iterator over the effect set, oldest first.
    pub fn effect_set(&self) -> impl Iterator<Item = &(O, Array1<f32>)> {
        self.effect_set.iter()
    }

    /// Number of entries in the effect set.
    pub fn effect_set_len(&self) -> usize {
        self.effect_set.len()
    }
}

impl<O> fmt::Display for SalientEvent<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SE({:?})", self.target_pos.to_vec())
    }
}
