use rand::Rng;
use rapier2d::prelude::*;

/// Max random deviation, in radians, added to the line of sight by proportional navigation.
pub const PROPORTIONAL_JITTER: Real = 0.1;

/// How the pursuer turns an observed target position into one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Direct,
    Intercept,
    Proportional,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Direct, Strategy::Intercept, Strategy::Proportional];

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "direct" => Some(Strategy::Direct),
            "intercept" => Some(Strategy::Intercept),
            "proportional" => Some(Strategy::Proportional),
            _ => None,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::Intercept => "intercept",
            Strategy::Proportional => "proportional",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Strategy::Direct => "Direct Pursuit",
            Strategy::Intercept => "Predictive Intercept",
            Strategy::Proportional => "Proportional Navigation",
        }
    }

    /// Displacement for one move of a pursuer at `from` that sees the target at `observed`.
    pub fn displacement(
        self,
        from: &Point<Real>,
        observed: &Point<Real>,
        speed: Real,
        rng: &mut impl Rng,
    ) -> Vector<Real> {
        match self {
            Strategy::Direct => step_toward(from, observed, speed),
            Strategy::Intercept => step_toward(from, &intercept_point(observed), speed),
            Strategy::Proportional => {
                let line_of_sight = observed - from;
                if line_of_sight.norm() == 0.0 {
                    return Vector::zeros();
                }
                let angle = line_of_sight.y.atan2(line_of_sight.x)
                    + rng.gen_range(-PROPORTIONAL_JITTER..=PROPORTIONAL_JITTER);
                let (sin, cos) = angle.sin_cos();
                vector![cos, sin] * speed
            }
        }
    }
}

/// Display name for any strategy id, falling back to the id itself.
pub fn display_name(id: &str) -> &str {
    match Strategy::from_id(id) {
        Some(strategy) => strategy.display_name(),
        None => id,
    }
}

/// Predicted meeting point. There is no lead term: the observed position is the prediction.
pub fn intercept_point(observed: &Point<Real>) -> Point<Real> {
    *observed
}

fn step_toward(from: &Point<Real>, to: &Point<Real>, speed: Real) -> Vector<Real> {
    let delta = to - from;
    let distance = delta.norm();
    if distance > 0.0 {
        delta / distance * speed
    } else {
        Vector::zeros()
    }
}
