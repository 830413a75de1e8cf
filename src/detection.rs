//! Perception of the target: three heuristic cues OR'ed into a yes/no gate on the true
//! target position, plus running precision/recall over those decisions.

use crate::{
    agents::{Pursuer, Target},
    config::Config,
};
use rand::Rng;
use rapier2d::{na::distance, prelude::*};
use ringbuffer::RingBuffer;

/// Upper bound on the adaptive-threshold cue's firing probability.
pub const MAX_ADAPTIVE_PROBABILITY: Real = 0.9;
/// Upper bound on the acceleration cue's firing probability.
pub const MAX_CENTROID_PROBABILITY: Real = 0.8;

/// Which cues fired on one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cues {
    pub motion: bool,
    pub adaptive: bool,
    pub centroid: bool,
}

impl Cues {
    pub fn any(&self) -> bool {
        self.motion || self.adaptive || self.centroid
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Detector {
    base_threshold: Real,
    motion_threshold: Real,
    max_speed: Real,
    arena_width: Real,
}

impl Detector {
    pub fn new(config: &Config) -> Self {
        Self {
            base_threshold: config.detection.base_threshold,
            motion_threshold: config.detection.motion_threshold,
            max_speed: config.target.max_speed,
            arena_width: config.arena.width,
        }
    }

    /// The target's exact position if any cue fires this frame.
    pub fn detect_target(
        &self,
        target: &Target,
        pursuer: &Pursuer,
        frame: u64,
        rng: &mut impl Rng,
    ) -> Option<Point<Real>> {
        let cues = self.cues(target, pursuer, rng);
        log::trace!("frame {}: {:?}", frame, cues);
        cues.any().then(|| target.position())
    }

    /// Evaluates every cue. None of them short-circuit, so each call makes the same number of
    /// random draws for a given history length.
    pub fn cues(&self, target: &Target, pursuer: &Pursuer, rng: &mut impl Rng) -> Cues {
        Cues {
            motion: self.frame_difference(target),
            adaptive: self.adaptive_threshold(target, pursuer, rng),
            centroid: centroid(target, rng),
        }
    }

    /// Fires when the target moved further than the motion threshold across its history.
    pub fn frame_difference(&self, target: &Target) -> bool {
        let history = target.history();
        if history.len() < 2 {
            return false;
        }
        match (history.front(), history.back()) {
            (Some(oldest), Some(newest)) => distance(oldest, newest) > self.motion_threshold,
            _ => false,
        }
    }

    /// Probability of the adaptive-threshold cue firing. Faster targets are harder to see, and
    /// once the pursuer already holds the target, so are distant ones.
    ///
    /// Reads the pursuer's detection flag from the previous frame.
    pub fn adaptive_probability(&self, target: &Target, pursuer: &Pursuer) -> Real {
        let visibility = (target.speed() / self.max_speed).min(1.0);
        let distance_factor = if pursuer.target_detected() {
            let d = distance(&target.position(), &pursuer.position());
            (1.0 - d / (self.arena_width / 2.0)).max(0.0)
        } else {
            1.0
        };
        let threshold = self.base_threshold * (1.0 - visibility * 0.5) * distance_factor;
        (threshold / 50.0).min(MAX_ADAPTIVE_PROBABILITY)
    }

    fn adaptive_threshold(&self, target: &Target, pursuer: &Pursuer, rng: &mut impl Rng) -> bool {
        rng.gen::<Real>() < self.adaptive_probability(target, pursuer)
    }
}

/// Probability of the acceleration cue firing, from the last three history samples.
pub fn centroid_probability(target: &Target) -> Option<Real> {
    let history = target.history();
    let n = history.len();
    if n < 3 {
        return None;
    }
    let (p1, p2, p3) = (history.get(n - 3)?, history.get(n - 2)?, history.get(n - 1)?);
    let acceleration = ((p3 - p2) - (p2 - p1)).norm();
    Some((acceleration / 10.0).min(MAX_CENTROID_PROBABILITY))
}

fn centroid(target: &Target, rng: &mut impl Rng) -> bool {
    match centroid_probability(target) {
        Some(probability) => rng.gen::<Real>() < probability,
        None => false,
    }
}

/// Confusion counts over (detected, target present) pairs.
///
/// The target always exists while the simulation runs, so there is no true negative
/// count and false positives only arise from callers passing no ground truth.
#[derive(Debug, Clone, Default)]
pub struct DetectionMetrics {
    pub true_positives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    history: Vec<(bool, Option<Point<Real>>)>,
}

/// Precision, recall and F1, each 0 when undefined.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Scores {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
}

impl DetectionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, detected: bool, actual_position: Option<Point<Real>>) {
        self.history.push((detected, actual_position));
        match (detected, actual_position.is_some()) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_positives += 1,
            (false, true) => self.false_negatives += 1,
            (false, false) => {}
        }
    }

    pub fn metrics(&self) -> Scores {
        let tp = self.true_positives as f32;
        let ratio = |num: f32, den: f32| if den > 0.0 { num / den } else { 0.0 };
        let precision = ratio(tp, tp + self.false_positives as f32);
        let recall = ratio(tp, tp + self.false_negatives as f32);
        let f1 = ratio(2.0 * precision * recall, precision + recall);
        Scores {
            precision,
            recall,
            f1,
        }
    }

    /// Every recorded (detected, actual position) pair, in order.
    pub fn history(&self) -> &[(bool, Option<Point<Real>>)] {
        &self.history
    }
}
