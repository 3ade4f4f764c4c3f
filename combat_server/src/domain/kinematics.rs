// Projectile kinematics: closed-form trajectories and distance tests.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// A point or vector in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Unit vector in the same direction; `None` for zero-length or non-finite input.
    pub fn normalized(self) -> Option<Vec3> {
        if !self.is_finite() {
            return None;
        }
        let len = self.length();
        if len == 0.0 || !len.is_finite() {
            return None;
        }
        Some(self * (1.0 / len))
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Position and instantaneous velocity of a ballistic body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Evaluates the trajectory at `elapsed` seconds after launch.
///
/// Always computed from the launch state rather than integrated, so the result does not
/// depend on how often it is sampled. Gravity pulls along -y.
pub fn advance(initial: Vec3, direction: Vec3, speed: f64, gravity: f64, elapsed: f64) -> Motion {
    let launch_velocity = direction * speed;
    let mut position = initial + launch_velocity * elapsed;
    position.y -= 0.5 * gravity * elapsed * elapsed;

    let mut velocity = launch_velocity;
    velocity.y -= gravity * elapsed;

    Motion { position, velocity }
}

pub fn distance(a: Vec3, b: Vec3) -> f64 {
    (a - b).length()
}

/// Inclusive radius test: a point exactly on the boundary is inside.
pub fn within_radius(a: Vec3, b: Vec3, radius: f64) -> bool {
    distance(a, b) <= radius
}
