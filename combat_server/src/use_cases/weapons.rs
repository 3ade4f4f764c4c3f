// Cannon and harpoon firing, cooldowns, and their collision checkers.

use std::collections::HashMap;

use tracing::{debug, info};

use super::projectiles::{CollisionChecker, HitContext, ProjectileRegistry, SpawnRequest};
use crate::domain::errors::{CheckerError, FireError, ValidationError};
use crate::domain::events::{ServerEvent, Target};
use crate::domain::kinematics;
use crate::domain::ports::Transport;
use crate::domain::state::{
    HitEffect, PlayerId, Projectile, ProjectileId, ProjectileKind, ProjectilePayload, StatusKind,
};
use crate::domain::tuning::weapon::{CannonTuning, HarpoonTuning};
use crate::domain::{Roster, Vec3};

/// Flight and cooldown parameters shared by every weapon kind.
#[derive(Debug, Clone, Copy)]
pub struct WeaponSpec {
    pub kind: ProjectileKind,
    pub speed: f64,
    pub lifetime: f64,
    pub gravity: f64,
    pub cooldown: f64,
    pub payload: ProjectilePayload,
}

impl From<CannonTuning> for WeaponSpec {
    fn from(t: CannonTuning) -> Self {
        Self {
            kind: ProjectileKind::Cannon,
            speed: t.speed,
            lifetime: t.lifetime,
            gravity: t.gravity,
            cooldown: t.cooldown,
            payload: ProjectilePayload::Cannon {
                blast_radius: t.blast_radius,
                damage: t.damage,
            },
        }
    }
}

impl From<HarpoonTuning> for WeaponSpec {
    fn from(t: HarpoonTuning) -> Self {
        Self {
            kind: ProjectileKind::Harpoon,
            speed: t.speed,
            lifetime: t.lifetime,
            gravity: 0.0,
            cooldown: t.cooldown,
            payload: ProjectilePayload::Harpoon {
                hit_radius: t.hit_radius,
                status_duration: t.status_duration,
            },
        }
    }
}

pub struct Weapon {
    spec: WeaponSpec,
    // Only accepted shots are recorded here.
    last_fire: HashMap<PlayerId, f64>,
}

impl Weapon {
    pub fn new(spec: WeaponSpec) -> Self {
        Self {
            spec,
            last_fire: HashMap::new(),
        }
    }

    pub fn cannon(tuning: CannonTuning) -> Self {
        Self::new(tuning.into())
    }

    pub fn harpoon(tuning: HarpoonTuning) -> Self {
        Self::new(tuning.into())
    }

    pub fn kind(&self) -> ProjectileKind {
        self.spec.kind
    }

    pub fn last_fire(&self, player_id: &str) -> Option<f64> {
        self.last_fire.get(player_id).copied()
    }

    /// Validates and rate-limits a shot, then spawns the projectile and tells everyone
    /// but the shooter.
    pub fn fire(
        &mut self,
        roster: &Roster,
        registry: &mut ProjectileRegistry,
        transport: &dyn Transport,
        player_id: &str,
        position: Vec3,
        direction: Vec3,
        now: f64,
    ) -> Result<ProjectileId, FireError> {
        let player = roster.get(player_id).ok_or(ValidationError::UnknownPlayer)?;
        if !player.active {
            return Err(ValidationError::InactivePlayer.into());
        }
        if !position.is_finite() || !direction.is_finite() {
            return Err(ValidationError::NonFiniteVector.into());
        }
        let direction = direction.normalized().ok_or(ValidationError::ZeroDirection)?;

        if let Some(last) = self.last_fire.get(player_id) {
            let since = now - last;
            if since < self.spec.cooldown {
                return Err(FireError::RateLimited {
                    remaining: self.spec.cooldown - since,
                });
            }
        }
        self.last_fire.insert(player_id.to_string(), now);

        let projectile_id = registry.spawn(
            SpawnRequest {
                owner_id: player_id.to_string(),
                kind: self.spec.kind,
                position,
                direction,
                speed: self.spec.speed,
                lifetime: self.spec.lifetime,
                gravity: self.spec.gravity,
                payload: self.spec.payload,
            },
            now,
        );

        info!(%player_id, weapon = %self.spec.kind, %projectile_id, "weapon fired");
        transport.emit(
            Target::AllExcept(player_id.to_string()),
            ServerEvent::WeaponFired {
                kind: self.spec.kind,
                projectile_id: projectile_id.clone(),
                owner_id: player_id.to_string(),
                position,
                direction,
                speed: self.spec.speed,
            },
        );
        Ok(projectile_id)
    }
}

// First live, positioned, active non-owner within `radius`, in roster order.
fn first_target(roster: &Roster, projectile: &Projectile, radius: f64) -> Option<(PlayerId, Vec3)> {
    roster
        .iter()
        .filter(|p| p.id != projectile.owner_id && p.active && p.is_alive())
        .find_map(|p| {
            let at = p.position?;
            kinematics::within_radius(projectile.position, at, radius).then(|| (p.id.clone(), at))
        })
}

pub struct CannonChecker;

impl CollisionChecker for CannonChecker {
    fn check(&self, projectile: &Projectile, ctx: &mut HitContext<'_>) -> Result<bool, CheckerError> {
        let ProjectilePayload::Cannon {
            blast_radius,
            damage,
        } = projectile.payload
        else {
            return Err(CheckerError::PayloadMismatch {
                kind: ProjectileKind::Cannon,
            });
        };

        let Some((victim_id, _)) = first_target(ctx.roster, projectile, blast_radius) else {
            return Ok(false);
        };

        debug!(projectile_id = %projectile.id, %victim_id, damage, "cannonball hit");
        ctx.transport.emit(
            Target::All,
            ServerEvent::ProjectileHit {
                kind: ProjectileKind::Cannon,
                projectile_id: projectile.id.clone(),
                owner_id: projectile.owner_id.clone(),
                victim_id: victim_id.clone(),
                effect: HitEffect::Damage { amount: damage },
                hit_position: projectile.position,
            },
        );
        ctx.combat.damage(
            ctx.roster,
            ctx.transport,
            &victim_id,
            damage,
            Some(&projectile.owner_id),
        );
        Ok(true)
    }
}

pub struct HarpoonChecker;

impl CollisionChecker for HarpoonChecker {
    fn check(&self, projectile: &Projectile, ctx: &mut HitContext<'_>) -> Result<bool, CheckerError> {
        let ProjectilePayload::Harpoon {
            hit_radius,
            status_duration,
        } = projectile.payload
        else {
            return Err(CheckerError::PayloadMismatch {
                kind: ProjectileKind::Harpoon,
            });
        };

        let Some((victim_id, _)) = first_target(ctx.roster, projectile, hit_radius) else {
            return Ok(false);
        };

        debug!(projectile_id = %projectile.id, %victim_id, "harpoon hit");
        ctx.combat.apply_status(
            ctx.roster,
            &victim_id,
            StatusKind::Harpooned,
            &projectile.owner_id,
            status_duration,
            ctx.now,
        );
        ctx.transport.emit(
            Target::All,
            ServerEvent::ProjectileHit {
                kind: ProjectileKind::Harpoon,
                projectile_id: projectile.id.clone(),
                owner_id: projectile.owner_id.clone(),
                victim_id,
                effect: HitEffect::Status {
                    kind: StatusKind::Harpooned,
                    duration: status_duration,
                },
                hit_position: projectile.position,
            },
        );
        Ok(true)
    }
}
