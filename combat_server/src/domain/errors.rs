// Domain-level errors for combat, presence, and collaborator calls.

use crate::domain::state::ProjectileKind;
use std::fmt;

/// Malformed or unauthorized input. Logged and dropped; never changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    UnknownPlayer,
    InactivePlayer,
    ZeroDirection,
    NonFiniteVector,
    PlayerMismatch,
    InvalidName,
    InvalidColor,
    InvalidMessage,
    InvalidAmount,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ValidationError::UnknownPlayer => "unknown player",
            ValidationError::InactivePlayer => "inactive player",
            ValidationError::ZeroDirection => "zero-length direction",
            ValidationError::NonFiniteVector => "non-finite vector",
            ValidationError::PlayerMismatch => "payload player does not match session",
            ValidationError::InvalidName => "invalid name",
            ValidationError::InvalidColor => "invalid color",
            ValidationError::InvalidMessage => "invalid chat message",
            ValidationError::InvalidAmount => "invalid amount",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FireError {
    Invalid(ValidationError),
    /// Cooldown still running; `remaining` is in seconds.
    RateLimited { remaining: f64 },
}

impl From<ValidationError> for FireError {
    fn from(e: ValidationError) -> Self {
        FireError::Invalid(e)
    }
}

/// Raised by a collision checker. The registry treats it as "no hit" for that tick.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckerError {
    PayloadMismatch { kind: ProjectileKind },
    Panicked(String),
}

impl fmt::Display for CheckerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckerError::PayloadMismatch { kind } => {
                write!(f, "payload does not belong to a {kind} projectile")
            }
            CheckerError::Panicked(msg) => write!(f, "collision checker panicked: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    NotFound,
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound => f.write_str("player record not found"),
            StoreError::Unavailable(msg) => write!(f, "player store unavailable: {msg}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyTokenError {
    InvalidToken,
    SessionExpired,
    UpstreamUnavailable,
}

impl fmt::Display for VerifyTokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            VerifyTokenError::InvalidToken => "invalid token",
            VerifyTokenError::SessionExpired => "session expired",
            VerifyTokenError::UpstreamUnavailable => "identity service unavailable",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinError {
    InvalidCredential,
    IdentityMismatch,
    Verify(VerifyTokenError),
    Storage(StoreError),
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinError::InvalidCredential => f.write_str("malformed credential"),
            JoinError::IdentityMismatch => f.write_str("claimed id does not match credential"),
            JoinError::Verify(e) => write!(f, "credential rejected: {e}"),
            JoinError::Storage(e) => write!(f, "player lookup failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelayError {
    Transport(String),
    Upstream { status: u16 },
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Transport(msg) => write!(f, "relay transport error: {msg}"),
            RelayError::Upstream { status } => write!(f, "relay upstream error {status}"),
        }
    }
}
