use crate::error::{Error, Result};
use notify::{
    event::{AccessKind, AccessMode, EventKind, ModifyKind},
    RecommendedWatcher,
    RecursiveMode::NonRecursive,
    Watcher,
};
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

pub const CONFIG_PATH: &str = "config.toml";

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub arena: Arena,
    pub target_fps: u32,
    pub target: Target,
    pub pursuer: Pursuer,
    pub detection: Detection,
    /// Captures happen strictly below this center-to-center distance.
    pub capture_distance: f32,
    /// Frames the captured banner stays up before the next episode starts.
    pub capture_display_frames: u32,
    /// Initial strategy id. Unknown ids are allowed and never move the pursuer.
    pub strategy: String,
    /// Strategy ids selectable by index (keys 1, 2, 3 in the viewer).
    pub strategies: Vec<String>,
    pub rotate_sprites: bool,
    pub seed: Option<u64>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Target {
    pub size: f32,
    pub min_speed: f32,
    pub max_speed: f32,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Pursuer {
    pub size: f32,
    pub speed: f32,
    /// Frames of held detection before each strategy move.
    pub reaction_time: u32,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Detection {
    pub base_threshold: f32,
    pub motion_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            arena: Arena::default(),
            target_fps: 60,
            target: Target::default(),
            pursuer: Pursuer::default(),
            detection: Detection::default(),
            capture_distance: 20.0,
            capture_display_frames: 60,
            strategy: "direct".to_string(),
            strategies: vec![
                "direct".to_string(),
                "intercept".to_string(),
                "proportional".to_string(),
            ],
            rotate_sprites: true,
            seed: None,
        }
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Self {
            size: 20.0,
            min_speed: 8.0,
            max_speed: 15.0,
        }
    }
}

impl Default for Pursuer {
    fn default() -> Self {
        Self {
            size: 45.0,
            speed: 10.0,
            reaction_time: 5,
        }
    }
}

impl Default for Detection {
    fn default() -> Self {
        Self {
            base_threshold: 30.0,
            motion_threshold: 5.0,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&contents)?;
        log::debug!("Loaded config: {:#?}", config);
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidConfig(msg));
        if !(self.arena.width > 0.0 && self.arena.height > 0.0) {
            return invalid(format!(
                "arena must have a positive extent, got {}x{}",
                self.arena.width, self.arena.height
            ));
        }
        if self.target.min_speed < 0.0 || self.target.max_speed <= 0.0 {
            return invalid(format!(
                "target speeds must be non-negative with a positive maximum, got {}..{}",
                self.target.min_speed, self.target.max_speed
            ));
        }
        if self.target.min_speed > self.target.max_speed {
            return invalid(format!(
                "target min_speed {} exceeds max_speed {}",
                self.target.min_speed, self.target.max_speed
            ));
        }
        if self.pursuer.speed < 0.0 {
            return invalid(format!("pursuer speed {} is negative", self.pursuer.speed));
        }
        if self.capture_distance < 0.0 {
            return invalid(format!(
                "capture distance {} is negative",
                self.capture_distance
            ));
        }
        if self.target_fps == 0 {
            return invalid("target_fps must be positive".to_string());
        }
        Ok(())
    }

    pub fn center(&self) -> (f32, f32) {
        (self.arena.width / 2.0, self.arena.height / 2.0)
    }
}

/// Watches a config file and keeps the most recent successfully parsed version
/// until the driver picks it up.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    pending: Arc<Mutex<Option<Config>>>,
}

impl ConfigWatcher {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let pending = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&pending);
        let reload_path = path.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) if !is_rewrite(&event.kind) => {}
                Ok(_) => match Config::load(&reload_path) {
                    Ok(config) => {
                        log::info!("Loaded new config");
                        if let Ok(mut slot) = slot.lock() {
                            *slot = Some(config);
                        }
                    }
                    Err(e) => log::warn!("Ignoring config change: {}", e),
                },
                Err(e) => log::error!("Failed to watch config file: {:?}", e),
            }
        })?;
        watcher.watch(&path, NonRecursive)?;
        Ok(Self {
            _watcher: watcher,
            pending,
        })
    }

    /// Returns the newest config loaded since the last call, if any.
    pub fn take_update(&self) -> Option<Config> {
        self.pending.lock().ok().and_then(|mut pending| pending.take())
    }
}

/// Whether an event means the file holds new, complete contents. Reading the file
/// bumps its access time, so metadata changes and plain accesses must not count.
fn is_rewrite(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Access(AccessKind::Close(AccessMode::Write))
            | EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Name(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_shipped_file() {
        let shipped = std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml"))
            .expect("config.toml should ship with the crate");
        let config = Config::from_toml(&shipped).expect("shipped config should parse");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config = Config::from_toml(
            r#"
            capture_distance = 35.0
            strategy = "proportional"

            [pursuer]
            speed = 12.5
            "#,
        )
        .unwrap();
        assert_eq!(config.capture_distance, 35.0);
        assert_eq!(config.strategy, "proportional");
        assert_eq!(config.pursuer.speed, 12.5);
        assert_eq!(config.pursuer.reaction_time, 5);
        assert_eq!(config.arena, Arena::default());
        assert_eq!(config.seed, None);
    }

    #[test]
    fn rejects_inverted_speed_range() {
        let err = Config::from_toml(
            r#"
            [target]
            min_speed = 20.0
            max_speed = 10.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)), "got {:?}", err);
    }

    #[test]
    fn rejects_empty_arena() {
        let mut config = Config::default();
        config.arena.width = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = Config::from_toml("arena = 3").unwrap_err();
        assert!(matches!(err, Error::Parse(_)), "got {:?}", err);
    }

    #[test]
    fn watcher_starts_without_updates() {
        let path = std::env::temp_dir().join(format!("pursuit-config-{}.toml", std::process::id()));
        std::fs::write(&path, "capture_distance = 25.0\n").unwrap();
        let watcher = ConfigWatcher::new(&path).unwrap();
        assert_eq!(watcher.take_update(), None);
        drop(watcher);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn one_write_delivers_one_update() {
        use std::time::{Duration, Instant};

        let path = std::env::temp_dir().join(format!("pursuit-reload-{}.toml", std::process::id()));
        std::fs::write(&path, "capture_distance = 25.0\n").unwrap();
        let watcher = ConfigWatcher::new(&path).unwrap();
        std::fs::write(&path, "capture_distance = 30.0\n").unwrap();

        let mut updates = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if let Some(config) = watcher.take_update() {
                updates.push(config);
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        drop(watcher);
        std::fs::remove_file(&path).ok();

        assert_eq!(updates.len(), 1, "expected a single reload, got {:?}", updates);
        assert_eq!(updates[0].capture_distance, 30.0);
    }

    #[test]
    fn access_and_metadata_events_are_ignored() {
        use notify::event::{CreateKind, MetadataKind, RenameMode};

        assert!(is_rewrite(&EventKind::Access(AccessKind::Close(AccessMode::Write))));
        assert!(is_rewrite(&EventKind::Create(CreateKind::File)));
        assert!(is_rewrite(&EventKind::Modify(ModifyKind::Name(RenameMode::To))));
        assert!(!is_rewrite(&EventKind::Access(AccessKind::Open(AccessMode::Any))));
        assert!(!is_rewrite(&EventKind::Access(AccessKind::Close(AccessMode::Read))));
        assert!(!is_rewrite(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::AccessTime
        ))));
    }

    #[test]
    fn watching_a_missing_file_fails() {
        assert!(matches!(
            ConfigWatcher::new("does/not/exist.toml"),
            Err(Error::Watch(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Config::load("does/not/exist.toml").unwrap_err();
        match err {
            Error::Io { path, .. } => assert_eq!(path, PathBuf::from("does/not/exist.toml")),
            other => panic!("expected io error, got {:?}", other),
        }
    }
}
