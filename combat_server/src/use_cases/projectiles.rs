// Live projectile table, per-kind collision dispatch, and the tick driver.

use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::combat::Combat;
use super::types::GameEvent;
use crate::domain::errors::CheckerError;
use crate::domain::kinematics;
use crate::domain::ports::Transport;
use crate::domain::state::{PlayerId, Projectile, ProjectileId, ProjectileKind, ProjectilePayload};
use crate::domain::{Roster, Vec3};

/// World state a collision checker may read and act on during one tick.
pub struct HitContext<'a> {
    pub roster: &'a mut Roster,
    pub combat: &'a mut Combat,
    pub transport: &'a dyn Transport,
    pub now: f64,
}

/// Decides whether a projectile hit something this tick and applies the effect if so.
///
/// Returning `Ok(true)` removes the projectile. Errors and panics count as "no hit".
pub trait CollisionChecker: Send {
    fn check(
        &self,
        projectile: &Projectile,
        ctx: &mut HitContext<'_>,
    ) -> Result<bool, CheckerError>;
}

#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub owner_id: PlayerId,
    pub kind: ProjectileKind,
    pub position: Vec3,
    /// Must already be a unit vector.
    pub direction: Vec3,
    pub speed: f64,
    pub lifetime: f64,
    pub gravity: f64,
    pub payload: ProjectilePayload,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub expired: Vec<ProjectileId>,
    pub collided: Vec<ProjectileId>,
    pub checker_failures: usize,
}

impl TickReport {
    pub fn removed(&self) -> usize {
        self.expired.len() + self.collided.len()
    }
}

#[derive(Default)]
pub struct ProjectileRegistry {
    projectiles: HashMap<ProjectileId, Projectile>,
    checkers: HashMap<ProjectileKind, Box<dyn CollisionChecker>>,
    // Kinds already reported as missing a checker; later misses log at debug only.
    warned_missing: HashSet<ProjectileKind>,
    next_seq: u64,
}

impl ProjectileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_checker(&mut self, kind: ProjectileKind, checker: Box<dyn CollisionChecker>) {
        if self.checkers.insert(kind, checker).is_some() {
            warn!(%kind, "replacing collision checker");
        }
        self.warned_missing.remove(&kind);
    }

    pub fn spawn(&mut self, request: SpawnRequest, now: f64) -> ProjectileId {
        self.next_seq += 1;
        let id = format!(
            "{}_{}_{:.4}_{}",
            request.kind, request.owner_id, now, self.next_seq
        );

        let projectile = Projectile {
            id: id.clone(),
            owner_id: request.owner_id,
            kind: request.kind,
            initial_position: request.position,
            direction: request.direction,
            speed: request.speed,
            gravity: request.gravity,
            created_at: now,
            expires_at: now + request.lifetime,
            position: request.position,
            payload: request.payload,
        };
        debug!(projectile_id = %id, kind = %projectile.kind, "projectile spawned");
        self.projectiles.insert(id.clone(), projectile);
        id
    }

    pub fn get(&self, id: &str) -> Option<&Projectile> {
        self.projectiles.get(id)
    }

    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }

    /// Advances every live projectile to `ctx.now` and runs its kind's checker.
    ///
    /// Projectiles at or past their expiry are removed without a check.
    pub fn tick(&mut self, ctx: &mut HitContext<'_>) -> TickReport {
        let now = ctx.now;
        let mut report = TickReport::default();
        let Self {
            projectiles,
            checkers,
            warned_missing,
            ..
        } = self;

        for (id, projectile) in projectiles.iter_mut() {
            if now >= projectile.expires_at {
                report.expired.push(id.clone());
                continue;
            }

            let elapsed = now - projectile.created_at;
            projectile.position = kinematics::advance(
                projectile.initial_position,
                projectile.direction,
                projectile.speed,
                projectile.gravity,
                elapsed,
            )
            .position;

            let Some(checker) = checkers.get(&projectile.kind) else {
                if warned_missing.insert(projectile.kind) {
                    warn!(kind = %projectile.kind, "no collision checker registered");
                } else {
                    debug!(kind = %projectile.kind, projectile_id = %id, "no collision checker");
                }
                continue;
            };

            let projectile = &*projectile;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| checker.check(projectile, ctx)))
                .unwrap_or_else(|payload| Err(CheckerError::Panicked(panic_message(payload))));

            match outcome {
                Ok(true) => report.collided.push(id.clone()),
                Ok(false) => {}
                Err(err) => {
                    report.checker_failures += 1;
                    warn!(projectile_id = %id, kind = %projectile.kind, error = %err, "collision check failed");
                }
            }
        }

        for id in report.expired.iter().chain(report.collided.iter()) {
            if projectiles.remove(id).is_some() {
                debug!(projectile_id = %id, "projectile removed");
            }
        }

        report
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Posts `GameEvent::Tick` into the world input at a fixed rate.
pub struct TickLoop {
    started: AtomicBool,
    input_tx: mpsc::Sender<GameEvent>,
    period: Duration,
}

impl TickLoop {
    pub fn new(input_tx: mpsc::Sender<GameEvent>, period: Duration) -> Self {
        Self {
            started: AtomicBool::new(false),
            input_tx,
            period,
        }
    }

    /// Starts the ticker. Returns false when it is already running.
    pub fn start(&self) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("tick loop already running");
            return false;
        }

        let input_tx = self.input_tx.clone();
        let period = self.period;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                match input_tx.try_send(GameEvent::Tick) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => debug!("world input full; dropping tick"),
                    Err(TrySendError::Closed(_)) => {
                        info!("world input closed; tick loop exiting");
                        break;
                    }
                }
            }
        });

        info!(period_ms = period.as_millis() as u64, "tick loop started");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tuning::player::PlayerTuning;
    use crate::use_cases::test_support::{test_player, RecordingScheduler, RecordingTransport};
    use std::sync::{Arc, Mutex};

    struct Fixture {
        roster: Roster,
        combat: Combat,
        transport: RecordingTransport,
    }

    impl Fixture {
        fn new() -> Self {
            let mut roster = Roster::new();
            roster.upsert(test_player("victim", Vec3::new(1000.0, 0.0, 0.0)));
            Self {
                roster,
                combat: Combat::new(PlayerTuning::default(), Arc::new(RecordingScheduler::default())),
                transport: RecordingTransport::default(),
            }
        }

        fn tick(&mut self, registry: &mut ProjectileRegistry, now: f64) -> TickReport {
            let mut ctx = HitContext {
                roster: &mut self.roster,
                combat: &mut self.combat,
                transport: &self.transport,
                now,
            };
            registry.tick(&mut ctx)
        }
    }

    struct CountingChecker {
        calls: Arc<Mutex<Vec<Vec3>>>,
        hit_after: usize,
    }

    impl CollisionChecker for CountingChecker {
        fn check(&self, projectile: &Projectile, _ctx: &mut HitContext<'_>) -> Result<bool, CheckerError> {
            let mut calls = self.calls.lock().expect("calls mutex poisoned");
            calls.push(projectile.position);
            Ok(calls.len() >= self.hit_after)
        }
    }

    struct PanickingChecker;

    impl CollisionChecker for PanickingChecker {
        fn check(&self, _projectile: &Projectile, _ctx: &mut HitContext<'_>) -> Result<bool, CheckerError> {
            panic!("checker blew up");
        }
    }

    struct FailingChecker;

    impl CollisionChecker for FailingChecker {
        fn check(&self, projectile: &Projectile, _ctx: &mut HitContext<'_>) -> Result<bool, CheckerError> {
            Err(CheckerError::PayloadMismatch {
                kind: projectile.kind,
            })
        }
    }

    fn cannonball(owner: &str) -> SpawnRequest {
        SpawnRequest {
            owner_id: owner.to_string(),
            kind: ProjectileKind::Cannon,
            position: Vec3::new(0.0, 1.0, 0.0),
            direction: Vec3::new(1.0, 0.0, 0.0),
            speed: 100.0,
            lifetime: 3.0,
            gravity: 0.0981,
            payload: ProjectilePayload::Cannon {
                blast_radius: 8.0,
                damage: 10,
            },
        }
    }

    #[test]
    fn when_spawning_twice_at_same_time_then_ids_differ() {
        let mut registry = ProjectileRegistry::new();

        let a = registry.spawn(cannonball("p1"), 1000.0);
        let b = registry.spawn(cannonball("p1"), 1000.0);

        assert_ne!(a, b);
        assert!(a.starts_with("cannon_p1_1000.0000_"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(&a).map(|p| p.expires_at), Some(1003.0));
    }

    #[test]
    fn when_ticking_then_position_follows_closed_form_motion() {
        let mut fixture = Fixture::new();
        let mut registry = ProjectileRegistry::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        registry.register_checker(
            ProjectileKind::Cannon,
            Box::new(CountingChecker {
                calls: calls.clone(),
                hit_after: usize::MAX,
            }),
        );
        let id = registry.spawn(cannonball("p1"), 1000.0);

        fixture.tick(&mut registry, 1000.5);

        let position = registry.get(&id).map(|p| p.position).expect("projectile alive");
        assert_approx_eq::assert_approx_eq!(position.x, 50.0, 1e-9);
        assert_approx_eq::assert_approx_eq!(position.y, 1.0 - 0.5 * 0.0981 * 0.25, 1e-9);
        assert_eq!(calls.lock().expect("calls mutex poisoned").len(), 1);
    }

    #[test]
    fn when_checker_reports_hit_then_projectile_is_removed() {
        let mut fixture = Fixture::new();
        let mut registry = ProjectileRegistry::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        registry.register_checker(
            ProjectileKind::Cannon,
            Box::new(CountingChecker {
                calls: calls.clone(),
                hit_after: 2,
            }),
        );
        let id = registry.spawn(cannonball("p1"), 1000.0);

        let first = fixture.tick(&mut registry, 1000.05);
        let second = fixture.tick(&mut registry, 1000.10);
        let third = fixture.tick(&mut registry, 1000.15);

        assert!(first.collided.is_empty());
        assert_eq!(second.collided, vec![id]);
        assert_eq!(third, TickReport::default());
        assert!(registry.is_empty());
        assert_eq!(calls.lock().expect("calls mutex poisoned").len(), 2);
    }

    #[test]
    fn when_lifetime_elapses_then_projectile_expires_without_check() {
        let mut fixture = Fixture::new();
        let mut registry = ProjectileRegistry::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        registry.register_checker(
            ProjectileKind::Cannon,
            Box::new(CountingChecker {
                calls: calls.clone(),
                hit_after: usize::MAX,
            }),
        );
        let id = registry.spawn(cannonball("p1"), 1000.0);

        let report = fixture.tick(&mut registry, 1003.0);

        assert_eq!(report.expired, vec![id]);
        assert!(registry.is_empty());
        assert!(calls.lock().expect("calls mutex poisoned").is_empty());
    }

    #[test]
    fn when_no_checker_is_registered_then_projectile_flies_until_expiry() {
        let mut fixture = Fixture::new();
        let mut registry = ProjectileRegistry::new();
        registry.spawn(cannonball("p1"), 1000.0);

        for step in 1..60 {
            let report = fixture.tick(&mut registry, 1000.0 + step as f64 * 0.05);
            assert_eq!(report.removed(), 0);
        }
        let report = fixture.tick(&mut registry, 1003.0);

        assert_eq!(report.expired.len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn when_checker_panics_then_tick_completes_and_projectile_stays() {
        let mut fixture = Fixture::new();
        let mut registry = ProjectileRegistry::new();
        registry.register_checker(ProjectileKind::Cannon, Box::new(PanickingChecker));
        registry.register_checker(ProjectileKind::Harpoon, Box::new(FailingChecker));
        registry.spawn(cannonball("p1"), 1000.0);
        let mut harpoon = cannonball("p2");
        harpoon.kind = ProjectileKind::Harpoon;
        registry.spawn(harpoon, 1000.0);

        let first = fixture.tick(&mut registry, 1000.05);
        let second = fixture.tick(&mut registry, 1000.10);

        assert_eq!(first.checker_failures, 2);
        assert_eq!(second.checker_failures, 2);
        assert_eq!(registry.len(), 2);
        assert!(fixture.transport.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn when_tick_loop_started_twice_then_only_one_ticker_runs() {
        let (tx, mut rx) = mpsc::channel(64);
        let ticker = TickLoop::new(tx, Duration::from_millis(50));

        assert!(ticker.start());
        assert!(!ticker.start());

        tokio::time::sleep(Duration::from_millis(120)).await;

        let mut ticks = 0;
        while let Ok(event) = rx.try_recv() {
            assert!(matches!(event, GameEvent::Tick));
            ticks += 1;
        }
        assert!((2..=3).contains(&ticks), "got {ticks} ticks");
    }

    #[tokio::test(start_paused = true)]
    async fn when_world_input_is_full_then_ticks_are_dropped() {
        let (tx, mut rx) = mpsc::channel(1);
        let ticker = TickLoop::new(tx, Duration::from_millis(50));
        ticker.start();

        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(matches!(rx.try_recv(), Ok(GameEvent::Tick)));
        assert!(rx.try_recv().is_err());
    }
}
