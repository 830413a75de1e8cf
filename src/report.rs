use crate::{
    error::{Error, Result},
    sim::Simulation,
};
use std::{fmt, io::Write, path::Path};

/// End-of-run summary, written as `key: value` lines.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    /// Captures per simulated second at the configured frame rate.
    pub capture_rate: f32,
    /// Mean frames per capture, infinite when nothing was caught.
    pub avg_capture_time: f32,
    pub detection_precision: f32,
    pub detection_recall: f32,
    pub detection_f1: f32,
    pub total_captures: u64,
    pub total_frames: u64,
    pub current_strategy: String,
}

impl PerformanceReport {
    pub fn from_simulation(sim: &Simulation) -> Self {
        let frames = sim.frame_count();
        let captures = sim.capture_count();
        let seconds = frames as f32 / sim.config().target_fps as f32;
        let scores = sim.scores();
        Self {
            capture_rate: if frames > 0 {
                captures as f32 / seconds
            } else {
                0.0
            },
            avg_capture_time: if captures > 0 {
                sim.total_capture_time() as f32 / captures as f32
            } else {
                f32::INFINITY
            },
            detection_precision: scores.precision,
            detection_recall: scores.recall,
            detection_f1: scores.f1,
            total_captures: captures,
            total_frames: frames,
            current_strategy: sim.strategy_id().to_string(),
        }
    }

    pub fn write_to(&self, mut out: impl Write) -> std::io::Result<()> {
        write!(out, "{}", self)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let io_err = |source| Error::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = std::fs::File::create(path).map_err(io_err)?;
        let mut out = std::io::BufWriter::new(file);
        self.write_to(&mut out)
            .and_then(|()| out.flush())
            .map_err(io_err)?;
        log::info!("Saved results to {}", path.display());
        Ok(())
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "capture_rate: {}", self.capture_rate)?;
        writeln!(f, "avg_capture_time: {}", self.avg_capture_time)?;
        writeln!(f, "detection_precision: {}", self.detection_precision)?;
        writeln!(f, "detection_recall: {}", self.detection_recall)?;
        writeln!(f, "detection_f1: {}", self.detection_f1)?;
        writeln!(f, "total_captures: {}", self.total_captures)?;
        writeln!(f, "total_frames: {}", self.total_frames)?;
        writeln!(f, "current_strategy: {}", self.current_strategy)
    }
}
