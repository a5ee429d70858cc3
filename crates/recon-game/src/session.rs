//! Timed target-scan session: targets spawn at random inside a box, the player scans
//! (shoots) them before the clock runs out. Far targets only count when zoomed in.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use recon_core::GameConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid game config: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub position: Vec3,
    /// Seconds since the target spawned.
    pub active_time: f32,
    pub active: bool,
}

/// Result of one shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShotOutcome {
    /// The session is over; nothing was tested.
    Ignored,
    Miss,
    /// The ray crossed a far target but the FOV was too wide.
    NeedsZoom,
    /// A target was removed and scored.
    Hit { position: Vec3 },
}

/// What happened during one `update`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    Spawned(Vec3),
    GameOver { score: u32 },
}

#[derive(Debug)]
pub struct GameSession<R: Rng = StdRng> {
    cfg: GameConfig,
    rng: R,
    time_left: f32,
    score: u32,
    over: bool,
    spawn_timer: f32,
    targets: Vec<Target>,
}

impl GameSession<StdRng> {
    /// A started session seeded from OS entropy.
    pub fn new(cfg: GameConfig) -> Result<Self, GameError> {
        Self::with_rng(cfg, StdRng::from_entropy())
    }
}

impl<R: Rng> GameSession<R> {
    /// A started session drawing spawn positions from `rng`.
    pub fn with_rng(cfg: GameConfig, rng: R) -> Result<Self, GameError> {
        validate(&cfg)?;
        let mut session = Self {
            time_left: cfg.duration,
            cfg,
            rng,
            score: 0,
            over: false,
            spawn_timer: 0.0,
            targets: Vec::new(),
        };
        session.start();
        Ok(session)
    }

    pub fn config(&self) -> &GameConfig {
        &self.cfg
    }

    pub fn time_left(&self) -> f32 {
        self.time_left
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Full timer, zero score, no targets.
    pub fn start(&mut self) {
        self.time_left = self.cfg.duration;
        self.score = 0;
        self.over = false;
        self.spawn_timer = 0.0;
        self.targets.clear();
    }

    pub fn reset(&mut self) {
        self.start();
        tracing::info!("session restarted");
    }

    /// Advance the clock by `dt` seconds.
    pub fn update(&mut self, dt: f32) -> Option<SessionEvent> {
        if self.over {
            return None;
        }

        self.time_left -= dt;
        if self.time_left <= 0.0 {
            self.time_left = 0.0;
            self.over = true;
            tracing::info!(score = self.score, "session over");
            return Some(SessionEvent::GameOver { score: self.score });
        }

        for t in self.targets.iter_mut().filter(|t| t.active) {
            t.active_time += dt;
        }

        // The timer restarts even when the cap blocks the spawn.
        self.spawn_timer += dt;
        if self.spawn_timer >= self.cfg.spawn_interval {
            self.spawn_timer = 0.0;
            if self.targets.len() < self.cfg.max_targets {
                let position = self.spawn();
                return Some(SessionEvent::Spawned(position));
            }
        }
        None
    }

    fn spawn(&mut self) -> Vec3 {
        let b = &self.cfg.spawn_bounds;
        let position = Vec3::new(
            self.rng.gen_range(b.min[0]..b.max[0]),
            self.rng.gen_range(b.min[1]..b.max[1]),
            self.rng.gen_range(b.min[2]..b.max[2]),
        );
        self.targets.push(Target {
            position,
            active_time: 0.0,
            active: true,
        });
        tracing::debug!(?position, count = self.targets.len(), "target spawned");
        position
    }

    /// Cast a ray from `origin` along `dir` with the camera at `zoom` degrees FOV.
    ///
    /// Targets are tested in spawn order; the first valid hit is removed and scores one.
    pub fn check_shot(&mut self, origin: Vec3, dir: Vec3, zoom: f32) -> ShotOutcome {
        if self.over {
            return ShotOutcome::Ignored;
        }

        let mut needs_zoom = false;
        let hit = self.targets.iter().position(|t| {
            if !t.active || !ray_hits_sphere(origin, dir, t.position, self.cfg.hit_radius) {
                return false;
            }
            let far = origin.distance(t.position) > self.cfg.far_distance;
            if far && zoom > self.cfg.required_zoom {
                needs_zoom = true;
                return false;
            }
            true
        });

        match hit {
            Some(i) => {
                let target = self.targets.remove(i);
                self.score += 1;
                tracing::info!(score = self.score, position = ?target.position, "target scanned");
                ShotOutcome::Hit {
                    position: target.position,
                }
            }
            None if needs_zoom => ShotOutcome::NeedsZoom,
            None => ShotOutcome::Miss,
        }
    }
}

/// Line/sphere test on the ray's supporting line (discriminant strictly positive).
pub fn ray_hits_sphere(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> bool {
    let oc = origin - center;
    let a = dir.dot(dir);
    if a == 0.0 {
        return false;
    }
    let b = 2.0 * oc.dot(dir);
    let c = oc.dot(oc) - radius * radius;
    b * b - 4.0 * a * c > 0.0
}

fn validate(cfg: &GameConfig) -> Result<(), GameError> {
    if !(cfg.duration > 0.0 && cfg.spawn_interval > 0.0) {
        return Err(GameError::InvalidConfig(
            "duration and spawn_interval must be > 0".into(),
        ));
    }
    if !(cfg.hit_radius > 0.0) {
        return Err(GameError::InvalidConfig("hit_radius must be > 0".into()));
    }
    let b = &cfg.spawn_bounds;
    if let Some(axis) = (0..3).find(|&i| !(b.max[i] > b.min[i])) {
        return Err(GameError::InvalidConfig(format!(
            "spawn_bounds axis {axis} is empty ({}..{})",
            b.min[axis], b.max[axis]
        )));
    }
    Ok(())
}
