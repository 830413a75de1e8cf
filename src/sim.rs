use crate::{
    agents::{Pursuer, Target},
    config::Config,
    detection::{DetectionMetrics, Detector, Scores},
    strategy::Strategy,
};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use rapier2d::{na::distance, prelude::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Paused,
    Captured,
}

/// One pursuit session: a sequence of episodes sharing cumulative statistics.
pub struct Simulation {
    config: Config,
    rng: Pcg64,
    target: Target,
    pursuer: Pursuer,
    detector: Detector,
    metrics: DetectionMetrics,
    strategy_id: String,
    strategy: Option<Strategy>,
    frame_count: u64,
    capture_count: u64,
    total_capture_time: u64,
    episode_start_frame: u64,
    paused: bool,
    captured: bool,
    capture_display_time: u32,
}

impl Simulation {
    /// Seeds from `config.seed` when set, otherwise from entropy.
    pub fn new(config: Config) -> Self {
        let rng = match config.seed {
            Some(seed) => Pcg64::seed_from_u64(seed),
            None => Pcg64::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    pub fn with_rng(config: Config, mut rng: Pcg64) -> Self {
        let target = Target::new(&config, &mut rng);
        let pursuer = Pursuer::new(&config);
        let detector = Detector::new(&config);
        let strategy_id = config.strategy.clone();
        let strategy = parse_strategy(&strategy_id);
        Self {
            config,
            rng,
            target,
            pursuer,
            detector,
            metrics: DetectionMetrics::new(),
            strategy_id,
            strategy,
            frame_count: 0,
            capture_count: 0,
            total_capture_time: 0,
            episode_start_frame: 0,
            paused: false,
            captured: false,
            capture_display_time: 0,
        }
    }

    /// Advances one frame.
    pub fn tick(&mut self) -> Phase {
        if self.paused {
            return Phase::Paused;
        }

        if self.captured {
            self.capture_display_time += 1;
            if self.capture_display_time >= self.config.capture_display_frames {
                self.reset();
                return Phase::Running;
            }
            return Phase::Captured;
        }

        self.frame_count += 1;
        self.target.update();

        let observed =
            self.detector
                .detect_target(&self.target, &self.pursuer, self.frame_count, &mut self.rng);
        self.metrics
            .update(observed.is_some(), Some(self.target.position()));
        self.pursuer.update(observed, self.strategy, &mut self.rng);

        if self.distance() < self.config.capture_distance {
            self.captured = true;
            self.capture_count += 1;
            let capture_time = self.frame_count - self.episode_start_frame;
            self.total_capture_time += capture_time;
            self.capture_display_time = 0;
            log::info!(
                "Captured on frame {} after {} frames ({} captures)",
                self.frame_count,
                capture_time,
                self.capture_count
            );
            return Phase::Captured;
        }
        Phase::Running
    }

    /// Starts a new episode, keeping cumulative statistics.
    pub fn reset(&mut self) {
        self.target.reset(&mut self.rng);
        self.pursuer = Pursuer::new(&self.config);
        self.captured = false;
        self.capture_display_time = 0;
        self.episode_start_frame = self.frame_count;
        log::debug!("New episode from frame {}", self.frame_count);
    }

    /// Starts over with zeroed statistics and a fresh metrics log.
    pub fn reset_complete(&mut self) {
        self.reset();
        self.frame_count = 0;
        self.capture_count = 0;
        self.total_capture_time = 0;
        self.episode_start_frame = 0;
        self.paused = false;
        self.metrics = DetectionMetrics::new();
        log::debug!("Simulation fully reset");
    }

    /// Switches to a new configuration and fully resets. The random source is kept.
    pub fn reconfigure(&mut self, config: Config) {
        self.detector = Detector::new(&config);
        self.target = Target::new(&config, &mut self.rng);
        self.strategy_id = config.strategy.clone();
        self.strategy = parse_strategy(&self.strategy_id);
        self.config = config;
        self.reset_complete();
    }

    /// Selects the pursuit strategy by id. Unknown ids are kept but never move the pursuer.
    /// Returns whether the id was recognized.
    pub fn set_strategy(&mut self, id: &str) -> bool {
        self.strategy_id = id.to_string();
        self.strategy = parse_strategy(id);
        log::debug!("Strategy set to {}", id);
        self.strategy.is_some()
    }

    /// Selects the `index`-th configured strategy. Out of range indices change nothing.
    pub fn select_strategy(&mut self, index: usize) -> bool {
        match self.config.strategies.get(index).cloned() {
            Some(id) => {
                self.set_strategy(&id);
                true
            }
            None => false,
        }
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn phase(&self) -> Phase {
        if self.paused {
            Phase::Paused
        } else if self.captured {
            Phase::Captured
        } else {
            Phase::Running
        }
    }

    pub fn distance(&self) -> Real {
        distance(&self.target.position(), &self.pursuer.position())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn pursuer(&self) -> &Pursuer {
        &self.pursuer
    }

    pub fn metrics(&self) -> &DetectionMetrics {
        &self.metrics
    }

    pub fn scores(&self) -> Scores {
        self.metrics.metrics()
    }

    pub fn strategy_id(&self) -> &str {
        &self.strategy_id
    }

    pub fn strategy(&self) -> Option<Strategy> {
        self.strategy
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn capture_count(&self) -> u64 {
        self.capture_count
    }

    pub fn total_capture_time(&self) -> u64 {
        self.total_capture_time
    }

    /// Mean frames per capture, 0 before the first capture.
    pub fn average_capture_time(&self) -> f32 {
        if self.capture_count == 0 {
            0.0
        } else {
            self.total_capture_time as f32 / self.capture_count as f32
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    pub fn capture_display_time(&self) -> u32 {
        self.capture_display_time
    }
}

fn parse_strategy(id: &str) -> Option<Strategy> {
    let strategy = Strategy::from_id(id);
    if strategy.is_none() {
        log::warn!("Unknown strategy {:?}, the pursuer will not move", id);
    }
    strategy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(config: Config) -> Simulation {
        Simulation::with_rng(config, Pcg64::seed_from_u64(99))
    }

    #[test]
    fn starts_running_with_zeroed_stats() {
        let sim = seeded(Config::default());
        assert_eq!(sim.phase(), Phase::Running);
        assert_eq!(sim.frame_count(), 0);
        assert_eq!(sim.capture_count(), 0);
        assert_eq!(sim.average_capture_time(), 0.0);
        assert_eq!(sim.scores(), Scores::default());
        assert_eq!(sim.pursuer().position(), point![400.0, 300.0]);
        assert_eq!(sim.strategy(), Some(Strategy::Direct));
    }

    #[test]
    fn paused_ticks_change_nothing() {
        let mut sim = seeded(Config::default());
        sim.tick();
        let target = sim.target().position();
        sim.toggle_pause();
        assert!(sim.is_paused());
        for _ in 0..10 {
            assert_eq!(sim.tick(), Phase::Paused);
        }
        assert_eq!(sim.frame_count(), 1);
        assert_eq!(sim.target().position(), target);
        sim.toggle_pause();
        assert!(!sim.is_paused());
        assert_eq!(sim.phase(), Phase::Running);
    }

    #[test]
    fn every_frame_is_scored_once() {
        let mut sim = seeded(Config::default());
        for _ in 0..50 {
            if sim.tick() == Phase::Captured {
                break;
            }
        }
        let m = sim.metrics();
        assert_eq!(m.history().len() as u64, sim.frame_count());
        assert_eq!(m.true_positives + m.false_negatives, sim.frame_count());
        assert_eq!(m.false_positives, 0);
    }

    #[test]
    fn capture_holds_then_starts_a_new_episode() {
        let mut config = Config::default();
        // Anything inside the arena counts as caught.
        config.capture_distance = 10_000.0;
        config.capture_display_frames = 3;
        let mut sim = seeded(config);

        assert_eq!(sim.tick(), Phase::Captured);
        assert_eq!(sim.capture_count(), 1);
        assert_eq!(sim.total_capture_time(), 1);
        let frozen = sim.target().position();
        assert_eq!(sim.capture_display_time(), 0);

        assert_eq!(sim.tick(), Phase::Captured);
        assert_eq!(sim.capture_display_time(), 1);
        assert_eq!(sim.tick(), Phase::Captured);
        assert_eq!(sim.capture_display_time(), 2);
        assert_eq!(sim.target().position(), frozen);
        assert_eq!(sim.frame_count(), 1);

        assert_eq!(sim.tick(), Phase::Running);
        assert!(!sim.is_captured());
        assert_eq!(sim.capture_display_time(), 0);
        assert_eq!(sim.pursuer().reaction_counter(), 0);
        assert!(!sim.pursuer().target_detected());

        assert_eq!(sim.tick(), Phase::Captured);
        assert_eq!(sim.capture_count(), 2);
        assert_eq!(sim.frame_count(), 2);
        assert_eq!(sim.total_capture_time(), 2);
        assert_eq!(sim.average_capture_time(), 1.0);
    }

    #[test]
    fn zero_capture_distance_never_captures() {
        let mut config = Config::default();
        config.capture_distance = 0.0;
        let mut sim = seeded(config);
        for _ in 0..200 {
            assert_ne!(sim.tick(), Phase::Captured);
        }
    }

    /// A still target and a pursuer that never moves, `gap` apart along x.
    fn standoff(gap: Real) -> Simulation {
        let mut sim = seeded(Config::default());
        sim.strategy = None;
        sim.target.place(point![100.0, 300.0], Vector::zeros());
        sim.pursuer = Pursuer::at(&sim.config, point![100.0 + gap, 300.0]);
        sim
    }

    #[test]
    fn capture_needs_to_be_strictly_inside_distance() {
        let mut sim = standoff(20.0);
        assert_eq!(sim.distance(), sim.config().capture_distance);
        for _ in 0..10 {
            assert_eq!(sim.tick(), Phase::Running);
        }
        assert_eq!(sim.capture_count(), 0);

        let mut sim = standoff(19.9);
        assert!(sim.distance() < sim.config().capture_distance);
        assert_eq!(sim.tick(), Phase::Captured);
        assert_eq!(sim.capture_count(), 1);
    }

    #[test]
    fn reset_complete_clears_statistics() {
        let mut config = Config::default();
        config.capture_distance = 10_000.0;
        config.capture_display_frames = 1;
        let mut sim = seeded(config);
        for _ in 0..6 {
            sim.tick();
        }
        assert_eq!(sim.capture_count(), 3);
        sim.toggle_pause();
        sim.reset_complete();
        assert_eq!(sim.phase(), Phase::Running);
        assert_eq!(sim.frame_count(), 0);
        assert_eq!(sim.capture_count(), 0);
        assert_eq!(sim.total_capture_time(), 0);
        assert_eq!(sim.metrics().true_positives, 0);
        assert_eq!(sim.metrics().false_negatives, 0);
        assert!(sim.metrics().history().is_empty());
    }

    #[test]
    fn unknown_strategy_is_accepted() {
        let mut sim = seeded(Config::default());
        assert!(!sim.set_strategy("zigzag"));
        assert_eq!(sim.strategy_id(), "zigzag");
        assert_eq!(sim.strategy(), None);
        let start = sim.pursuer().position();
        for _ in 0..100 {
            sim.tick();
        }
        assert_eq!(sim.pursuer().position(), start);
    }

    #[test]
    fn selects_strategies_by_index() {
        let mut sim = seeded(Config::default());
        assert!(sim.select_strategy(2));
        assert_eq!(sim.strategy(), Some(Strategy::Proportional));
        assert!(!sim.select_strategy(3));
        assert_eq!(sim.strategy(), Some(Strategy::Proportional));
    }

    #[test]
    fn reconfigure_applies_new_arena() {
        let mut sim = seeded(Config::default());
        for _ in 0..20 {
            sim.tick();
        }
        let mut config = Config::default();
        config.arena.width = 200.0;
        config.arena.height = 100.0;
        config.strategy = "intercept".to_string();
        sim.reconfigure(config);
        assert_eq!(sim.frame_count(), 0);
        assert_eq!(sim.strategy(), Some(Strategy::Intercept));
        assert_eq!(sim.pursuer().position(), point![100.0, 50.0]);
        let p = sim.target().position();
        assert!(p.x <= 200.0 && p.y <= 100.0, "target outside new arena: {:?}", p);
    }
}
