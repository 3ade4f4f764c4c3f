// The world task: single owner of roster, projectiles, cooldowns and sync records.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::combat::{ChannelRespawnScheduler, Combat};
use super::outbox::{DurableWriter, RelayDispatch};
use super::presence::{sanitize_name, validate_color, validate_message, PositionSync};
use super::projectiles::{HitContext, ProjectileRegistry, TickLoop};
use super::types::{GameEvent, PlayerAction};
use super::weapons::{CannonChecker, HarpoonChecker, Weapon};
use crate::domain::errors::{FireError, ValidationError};
use crate::domain::events::{RelayEvent, ServerEvent, Target};
use crate::domain::ports::{Clock, PlayerStore, RelayNotifier, RespawnScheduler, Transport};
use crate::domain::state::{
    Color, Player, PlayerPatch, PlayerRecord, PlayerSnapshot, ProjectileKind,
};
use crate::domain::tuning::GameTuning;
use crate::domain::{Roster, Vec3};

pub struct WorldPorts {
    pub transport: Arc<dyn Transport>,
    pub store: Arc<dyn PlayerStore>,
    pub relay: Arc<dyn RelayNotifier>,
    pub clock: Arc<dyn Clock>,
}

pub struct World {
    roster: Roster,
    registry: ProjectileRegistry,
    cannon: Weapon,
    harpoon: Weapon,
    combat: Combat,
    sync: PositionSync,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    writer: DurableWriter,
    relay: RelayDispatch,
}

fn active_player<'a>(roster: &'a mut Roster, player_id: &str) -> Result<&'a mut Player, ValidationError> {
    let player = roster
        .get_mut(player_id)
        .ok_or(ValidationError::UnknownPlayer)?;
    if !player.active {
        return Err(ValidationError::InactivePlayer);
    }
    Ok(player)
}

impl World {
    pub fn new(
        tuning: GameTuning,
        ports: WorldPorts,
        scheduler: Arc<dyn RespawnScheduler>,
        feedback_tx: mpsc::Sender<GameEvent>,
        initial_players: Vec<PlayerRecord>,
    ) -> Self {
        let mut roster = Roster::new();
        for record in initial_players {
            roster.upsert(Player::from(record));
        }

        let mut registry = ProjectileRegistry::new();
        registry.register_checker(ProjectileKind::Cannon, Box::new(CannonChecker));
        registry.register_checker(ProjectileKind::Harpoon, Box::new(HarpoonChecker));

        Self {
            roster,
            registry,
            cannon: Weapon::cannon(tuning.cannon),
            harpoon: Weapon::harpoon(tuning.harpoon),
            combat: Combat::new(tuning.player, scheduler),
            sync: PositionSync::new(tuning.sync),
            transport: ports.transport,
            clock: ports.clock,
            writer: DurableWriter::new(ports.store, feedback_tx),
            relay: RelayDispatch::new(ports.relay),
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn projectiles(&self) -> &ProjectileRegistry {
        &self.registry
    }

    pub fn handle(&mut self, event: GameEvent) {
        let result = match event {
            GameEvent::Join { record } => {
                self.join(record);
                Ok(())
            }
            GameEvent::Leave { player_id } => {
                self.leave(&player_id);
                Ok(())
            }
            GameEvent::Fire {
                kind,
                player_id,
                position,
                direction,
            } => {
                self.fire(kind, &player_id, position, direction);
                Ok(())
            }
            GameEvent::UpdatePosition {
                player_id,
                position,
                rotation,
                mode,
            } => self.update_position(&player_id, position, rotation, mode),
            GameEvent::UpdateColor { player_id, color } => self.update_color(&player_id, color),
            GameEvent::UpdateName { player_id, name } => self.update_name(&player_id, &name),
            GameEvent::Action { player_id, action } => self.record_action(&player_id, action),
            GameEvent::SendMessage { player_id, content } => {
                self.send_message(&player_id, &content)
            }
            GameEvent::Tick => {
                self.tick();
                Ok(())
            }
            GameEvent::Respawn { player_id, death } => {
                self.combat
                    .respawn(&mut self.roster, self.transport.as_ref(), &player_id, death);
                Ok(())
            }
            GameEvent::PositionWriteFailed {
                player_id,
                written_at,
            } => {
                if self.sync.forget_if_written_at(&player_id, written_at) {
                    debug!(%player_id, "position sync record dropped after failed write");
                }
                Ok(())
            }
        };

        if let Err(err) = result {
            warn!(error = %err, "event rejected");
        }
    }

    fn join(&mut self, record: PlayerRecord) {
        let mut player = Player::from(record);
        player.active = true;
        if self.combat.hold_until_respawn(&mut player) {
            debug!(player_id = %player.id, "rejoined while defeated; waiting for respawn");
        }
        let player_id = player.id.clone();
        let snapshot = PlayerSnapshot::from(&player);
        let name = player.name.clone();
        self.roster.upsert(player);

        info!(%player_id, %name, "player joined");
        self.transport
            .emit(Target::All, ServerEvent::PlayerJoined { player: snapshot });
        self.transport.emit(
            Target::Only(player_id),
            ServerEvent::AllPlayers {
                players: self.roster.active_snapshots(),
            },
        );
        self.relay.send(RelayEvent::PlayerJoined { name });
    }

    fn leave(&mut self, player_id: &str) {
        let now = self.clock.now_secs();
        let Some(player) = self.roster.get_mut(player_id) else {
            warn!(%player_id, "leave for unknown player");
            return;
        };
        if !player.active {
            debug!(%player_id, "leave for inactive player");
            return;
        }

        player.active = false;
        player.status = None;
        player.last_update = now;
        let name = player.name.clone();

        info!(%player_id, "player left");
        self.transport.emit(
            Target::All,
            ServerEvent::PlayerDisconnected {
                player_id: player_id.to_string(),
            },
        );
        let mut patch = PlayerPatch::at(now);
        patch.active = Some(false);
        self.writer.write(player_id.to_string(), patch);
        self.relay.send(RelayEvent::PlayerLeft { name });
    }

    fn fire(&mut self, kind: ProjectileKind, player_id: &str, position: Vec3, direction: Vec3) {
        let now = self.clock.now_secs();
        let weapon = match kind {
            ProjectileKind::Cannon => &mut self.cannon,
            ProjectileKind::Harpoon => &mut self.harpoon,
        };

        match weapon.fire(
            &self.roster,
            &mut self.registry,
            self.transport.as_ref(),
            player_id,
            position,
            direction,
            now,
        ) {
            Ok(_) => {}
            Err(FireError::RateLimited { remaining }) => {
                debug!(%player_id, weapon = %kind, remaining, "fire rate limited");
                self.transport.emit(
                    Target::Only(player_id.to_string()),
                    ServerEvent::CooldownActive { kind, remaining },
                );
            }
            Err(FireError::Invalid(err)) => {
                warn!(%player_id, weapon = %kind, error = %err, "fire rejected");
            }
        }
    }

    fn update_position(
        &mut self,
        player_id: &str,
        position: Vec3,
        rotation: Option<f64>,
        mode: Option<String>,
    ) -> Result<(), ValidationError> {
        if !position.is_finite() || rotation.is_some_and(|r| !r.is_finite()) {
            return Err(ValidationError::NonFiniteVector);
        }
        let now = self.clock.now_secs();
        let player = active_player(&mut self.roster, player_id)?;

        player.position = Some(position);
        if let Some(rotation) = rotation {
            player.rotation = rotation;
        }
        if let Some(mode) = &mode {
            player.mode = mode.clone();
        }
        player.last_update = now;
        let (rotation_now, mode_now) = (player.rotation, player.mode.clone());

        // Live path: always.
        self.transport.emit(
            Target::AllExcept(player_id.to_string()),
            ServerEvent::PlayerMoved {
                player_id: player_id.to_string(),
                position,
                rotation,
                mode,
            },
        );

        // Durable path: throttled.
        if self.sync.should_persist(player_id, position, now) {
            let mut patch = PlayerPatch::at(now);
            patch.position = Some(position);
            patch.rotation = Some(rotation_now);
            patch.mode = Some(mode_now);
            self.writer.write_position(player_id.to_string(), patch);
        }
        Ok(())
    }

    fn update_color(&mut self, player_id: &str, color: Color) -> Result<(), ValidationError> {
        let color = validate_color(color)?;
        let now = self.clock.now_secs();
        let player = active_player(&mut self.roster, player_id)?;
        player.color = color;
        player.last_update = now;

        let mut patch = PlayerPatch::at(now);
        patch.color = Some(color);
        self.writer.write(player_id.to_string(), patch);
        self.transport.emit(
            Target::All,
            ServerEvent::PlayerUpdated {
                player_id: player_id.to_string(),
                name: None,
                color: Some(color),
            },
        );
        Ok(())
    }

    fn update_name(&mut self, player_id: &str, raw: &str) -> Result<(), ValidationError> {
        let name = sanitize_name(raw)?;
        let now = self.clock.now_secs();
        let player = active_player(&mut self.roster, player_id)?;
        player.name = name.clone();
        player.last_update = now;

        info!(%player_id, %name, "player renamed");
        let mut patch = PlayerPatch::at(now);
        patch.name = Some(name.clone());
        self.writer.write(player_id.to_string(), patch);
        self.transport.emit(
            Target::All,
            ServerEvent::PlayerUpdated {
                player_id: player_id.to_string(),
                name: Some(name),
                color: None,
            },
        );
        Ok(())
    }

    fn record_action(&mut self, player_id: &str, action: PlayerAction) -> Result<(), ValidationError> {
        let now = self.clock.now_secs();
        let player = active_player(&mut self.roster, player_id)?;
        match &action {
            PlayerAction::FishCaught => player.stats.catches += 1,
            PlayerAction::MonsterKilled => player.stats.kills += 1,
            PlayerAction::MoneyEarned { amount } => {
                let amount = u64::try_from(*amount).map_err(|_| ValidationError::InvalidAmount)?;
                player.stats.currency = player.stats.currency.saturating_add(amount);
            }
        }
        player.last_update = now;
        let (name, stats) = (player.name.clone(), player.stats);
        let achievement = action.achievement().to_string();

        let mut patch = PlayerPatch::at(now);
        patch.stats = Some(stats);
        self.writer.write(player_id.to_string(), patch);
        self.transport.emit(
            Target::All,
            ServerEvent::PlayerAchievement {
                player_id: player_id.to_string(),
                name: name.clone(),
                achievement: achievement.clone(),
                stats,
            },
        );
        self.relay.send(RelayEvent::Achievement {
            player_id: player_id.to_string(),
            name,
            achievement,
        });
        Ok(())
    }

    fn send_message(&mut self, player_id: &str, raw: &str) -> Result<(), ValidationError> {
        let content = validate_message(raw)?;
        let now = self.clock.now_secs();
        let sender_name = active_player(&mut self.roster, player_id)?.name.clone();

        self.transport.emit(
            Target::All,
            ServerEvent::NewMessage {
                player_id: player_id.to_string(),
                sender_name: sender_name.clone(),
                content: content.clone(),
                timestamp: now,
            },
        );
        self.relay.send(RelayEvent::Chat {
            player_id: player_id.to_string(),
            sender_name,
            content,
            timestamp: now,
        });
        Ok(())
    }

    fn tick(&mut self) {
        let now = self.clock.now_secs();
        let mut ctx = HitContext {
            roster: &mut self.roster,
            combat: &mut self.combat,
            transport: self.transport.as_ref(),
            now,
        };
        let report = self.registry.tick(&mut ctx);
        let cleared = self.combat.expire_statuses(&mut self.roster, now);

        if report.removed() > 0 || report.checker_failures > 0 || cleared > 0 {
            debug!(
                expired = report.expired.len(),
                collided = report.collided.len(),
                failures = report.checker_failures,
                statuses_cleared = cleared,
                "tick"
            );
        }
    }
}

pub async fn world_task(mut input_rx: mpsc::Receiver<GameEvent>, mut world: World) {
    while let Some(event) = input_rx.recv().await {
        world.handle(event);
    }
    info!("world input closed; world task exiting");
}

pub struct WorldSettings {
    pub tuning: GameTuning,
    pub input_capacity: usize,
    pub tick_interval: Duration,
}

/// Cloneable entry point into the running world.
#[derive(Clone)]
pub struct WorldHandle {
    input_tx: mpsc::Sender<GameEvent>,
    ticker: Arc<TickLoop>,
}

impl WorldHandle {
    pub fn input(&self) -> mpsc::Sender<GameEvent> {
        self.input_tx.clone()
    }

    /// Queues an event for the world task. Returns false once the world is gone.
    pub async fn send(&self, event: GameEvent) -> bool {
        self.input_tx.send(event).await.is_ok()
    }

    pub fn start_ticking(&self) -> bool {
        self.ticker.start()
    }
}

pub fn spawn_world(
    settings: WorldSettings,
    ports: WorldPorts,
    initial_players: Vec<PlayerRecord>,
) -> WorldHandle {
    let (input_tx, input_rx) = mpsc::channel(settings.input_capacity);
    let scheduler = Arc::new(ChannelRespawnScheduler::new(input_tx.clone()));
    let world = World::new(
        settings.tuning,
        ports,
        scheduler,
        input_tx.clone(),
        initial_players,
    );
    tokio::spawn(world_task(input_rx, world));

    WorldHandle {
        ticker: Arc::new(TickLoop::new(input_tx.clone(), settings.tick_interval)),
        input_tx,
    }
}
