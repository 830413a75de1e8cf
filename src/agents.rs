use crate::{config::Config, strategy::Strategy};
use rand::Rng;
use rapier2d::prelude::*;
use ringbuffer::{ConstGenericRingBuffer, RingBuffer};
use std::f32::consts::FRAC_PI_4;

/// Number of past target positions kept for motion detection.
pub const HISTORY_LEN: usize = 10;

/// Recent target positions, oldest first.
pub type History = ConstGenericRingBuffer<Point<Real>, HISTORY_LEN>;

/// Sprite heading in degrees for a motion vector, with "up" as 0.
pub fn heading_degrees(motion: &Vector<Real>) -> Real {
    (-motion.y).atan2(motion.x).to_degrees() - 90.0
}

/// The evader. Moves in a straight line and reflects off the arena walls.
#[derive(Debug, Clone)]
pub struct Target {
    position: Point<Real>,
    velocity: Vector<Real>,
    speed: Real,
    angle: Real,
    size: Real,
    width: Real,
    height: Real,
    min_speed: Real,
    max_speed: Real,
    history: History,
}

impl Target {
    pub fn new(config: &Config, rng: &mut impl Rng) -> Self {
        let mut target = Self {
            position: point![0.0, 0.0],
            velocity: Vector::zeros(),
            speed: 0.0,
            angle: 0.0,
            size: config.target.size,
            width: config.arena.width,
            height: config.arena.height,
            min_speed: config.target.min_speed,
            max_speed: config.target.max_speed,
            history: History::new(),
        };
        target.reset(rng);
        target
    }

    /// Respawns on a random edge, heading roughly toward the center at a fresh random speed.
    pub fn reset(&mut self, rng: &mut impl Rng) {
        let (w, h) = (self.width, self.height);
        self.position = match rng.gen_range(0..4) {
            0 => point![rng.gen_range(0.0..=w), 0.0],
            1 => point![rng.gen_range(0.0..=w), h],
            2 => point![0.0, rng.gen_range(0.0..=h)],
            _ => point![w, rng.gen_range(0.0..=h)],
        };

        let to_center = point![w / 2.0, h / 2.0] - self.position;
        let heading = to_center.y.atan2(to_center.x) + rng.gen_range(-FRAC_PI_4..=FRAC_PI_4);
        self.speed = rng.gen_range(self.min_speed..=self.max_speed);
        let (sin, cos) = heading.sin_cos();
        self.velocity = vector![cos, sin] * self.speed;
        self.angle = heading_degrees(&self.velocity);
        self.history.clear();
        log::trace!(
            "Target spawned at ({}, {}) heading {} at speed {}",
            self.position.x,
            self.position.y,
            heading,
            self.speed
        );
    }

    /// Places the target at a known state, clearing its history. Speed follows the velocity.
    pub fn place(&mut self, position: Point<Real>, velocity: Vector<Real>) {
        self.position = point![
            position.x.clamp(0.0, self.width),
            position.y.clamp(0.0, self.height)
        ];
        self.velocity = velocity;
        self.speed = velocity.norm();
        if velocity != Vector::zeros() {
            self.angle = heading_degrees(&velocity);
        }
        self.history.clear();
    }

    pub fn update(&mut self) {
        self.position += self.velocity;

        // Reaching a wall counts as hitting it.
        if self.position.x <= 0.0 || self.position.x >= self.width {
            self.velocity.x = -self.velocity.x;
            self.position.x = self.position.x.clamp(0.0, self.width);
        }
        if self.position.y <= 0.0 || self.position.y >= self.height {
            self.velocity.y = -self.velocity.y;
            self.position.y = self.position.y.clamp(0.0, self.height);
        }

        if self.velocity != Vector::zeros() {
            self.angle = heading_degrees(&self.velocity);
        }
        self.history.push(self.position);
    }

    pub fn position(&self) -> Point<Real> {
        self.position
    }

    pub fn velocity(&self) -> Vector<Real> {
        self.velocity
    }

    pub fn speed(&self) -> Real {
        self.speed
    }

    pub fn angle(&self) -> Real {
        self.angle
    }

    pub fn size(&self) -> Real {
        self.size
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}

/// The seeker. Holds still until it has seen the target for `reaction_time` frames, then
/// takes one strategy step.
#[derive(Debug, Clone)]
pub struct Pursuer {
    position: Point<Real>,
    speed: Real,
    size: Real,
    angle: Real,
    reaction_time: u32,
    reaction_counter: u32,
    last_known_position: Option<Point<Real>>,
    target_detected: bool,
}

impl Pursuer {
    /// A fresh pursuer in the middle of the arena.
    pub fn new(config: &Config) -> Self {
        let (x, y) = config.center();
        Self::at(config, point![x, y])
    }

    pub fn at(config: &Config, position: Point<Real>) -> Self {
        Self {
            position,
            speed: config.pursuer.speed,
            size: config.pursuer.size,
            angle: 0.0,
            reaction_time: config.pursuer.reaction_time,
            reaction_counter: 0,
            last_known_position: None,
            target_detected: false,
        }
    }

    /// Feeds one frame of perception. Returns whether the pursuer moved.
    ///
    /// A frame without a detection leaves the reaction counter alone. `None` as the
    /// strategy still consumes reaction time but never moves.
    pub fn update(
        &mut self,
        target_position: Option<Point<Real>>,
        strategy: Option<Strategy>,
        rng: &mut impl Rng,
    ) -> bool {
        let Some(observed) = target_position else {
            self.target_detected = false;
            return false;
        };

        self.target_detected = true;
        self.last_known_position = Some(observed);

        if self.reaction_counter < self.reaction_time {
            self.reaction_counter += 1;
            return false;
        }
        self.reaction_counter = 0;

        let Some(strategy) = strategy else {
            return false;
        };
        let step = strategy.displacement(&self.position, &observed, self.speed, rng);
        if step == Vector::zeros() {
            return false;
        }
        self.position += step;
        self.angle = heading_degrees(&step);
        true
    }

    pub fn position(&self) -> Point<Real> {
        self.position
    }

    pub fn speed(&self) -> Real {
        self.speed
    }

    pub fn angle(&self) -> Real {
        self.angle
    }

    pub fn size(&self) -> Real {
        self.size
    }

    pub fn target_detected(&self) -> bool {
        self.target_detected
    }

    pub fn last_known_position(&self) -> Option<Point<Real>> {
        self.last_known_position
    }

    pub fn reaction_counter(&self) -> u32 {
        self.reaction_counter
    }
}
