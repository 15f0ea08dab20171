//! Actuator command tagged union.
//!
//! A `Command` is produced once at the decode boundary and consumed once by
//! the control loop; it is an immutable value in between. Consumers should
//! destructure with an exhaustive `match` so an unhandled variant is a
//! compile error, never a runtime surprise.

use serde::{Deserialize, Serialize};

use crate::sensor::Finger;

// ─── Variant Payloads ───────────────────────────────────────────────

/// Move one servo directly to a target angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoToAngle {
    /// Servo instance index.
    pub servo: u8,
    /// Target angle [deg].
    pub angle_deg: u16,
}

/// Lock a servo in place. Motion commands for it are ignored until unlock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lock {
    /// Servo instance index.
    pub servo: u8,
}

/// Release a previously locked servo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Unlock {
    /// Servo instance index.
    pub servo: u8,
}

/// Ramp one servo to a target angle over a duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothMove {
    /// Servo instance index.
    pub servo: u8,
    /// Target angle [deg].
    pub angle_deg: u16,
    /// Ramp duration [ms].
    pub duration_ms: u32,
}

/// Close a finger until the fingertip strain gauge reports a pressure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveToPressure {
    /// Which finger to close.
    pub finger: Finger,
    /// Target contact pressure [kPa].
    pub pressure_kpa: f32,
}

/// Assume and hold a pre-defined gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoldGesture {
    /// Gesture table index.
    pub gesture: u8,
    /// Hold duration [ms]; 0 means hold until the next command.
    pub hold_ms: u32,
}

// ─── The Union ──────────────────────────────────────────────────────

/// One remotely issued actuator instruction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Command {
    GoToAngle(GoToAngle),
    Lock(Lock),
    Unlock(Unlock),
    SmoothMove(SmoothMove),
    MoveToPressure(MoveToPressure),
    HoldGesture(HoldGesture),
}

/// Discriminant-only view of [`Command`], for logging and routing tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CommandKind {
    GoToAngle = 0,
    Lock = 1,
    Unlock = 2,
    SmoothMove = 3,
    MoveToPressure = 4,
    HoldGesture = 5,
}

impl CommandKind {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::GoToAngle),
            1 => Some(Self::Lock),
            2 => Some(Self::Unlock),
            3 => Some(Self::SmoothMove),
            4 => Some(Self::MoveToPressure),
            5 => Some(Self::HoldGesture),
            _ => None,
        }
    }

    /// Stable lowercase name, used in log fields.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GoToAngle => "go_to_angle",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::SmoothMove => "smooth_move",
            Self::MoveToPressure => "move_to_pressure",
            Self::HoldGesture => "hold_gesture",
        }
    }
}

impl Command {
    /// Discriminant of this command.
    #[inline]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::GoToAngle(_) => CommandKind::GoToAngle,
            Self::Lock(_) => CommandKind::Lock,
            Self::Unlock(_) => CommandKind::Unlock,
            Self::SmoothMove(_) => CommandKind::SmoothMove,
            Self::MoveToPressure(_) => CommandKind::MoveToPressure,
            Self::HoldGesture(_) => CommandKind::HoldGesture,
        }
    }

    /// Payload accessor; `None` when the command holds another variant.
    #[inline]
    pub const fn as_go_to_angle(&self) -> Option<&GoToAngle> {
        match self {
            Self::GoToAngle(p) => Some(p),
            _ => None,
        }
    }

    /// Payload accessor; `None` when the command holds another variant.
    #[inline]
    pub const fn as_lock(&self) -> Option<&Lock> {
        match self {
            Self::Lock(p) => Some(p),
            _ => None,
        }
    }

    /// Payload accessor; `None` when the command holds another variant.
    #[inline]
    pub const fn as_unlock(&self) -> Option<&Unlock> {
        match self {
            Self::Unlock(p) => Some(p),
            _ => None,
        }
    }

    /// Payload accessor; `None` when the command holds another variant.
    #[inline]
    pub const fn as_smooth_move(&self) -> Option<&SmoothMove> {
        match self {
            Self::SmoothMove(p) => Some(p),
            _ => None,
        }
    }

    /// Payload accessor; `None` when the command holds another variant.
    #[inline]
    pub const fn as_move_to_pressure(&self) -> Option<&MoveToPressure> {
        match self {
            Self::MoveToPressure(p) => Some(p),
            _ => None,
        }
    }

    /// Payload accessor; `None` when the command holds another variant.
    #[inline]
    pub const fn as_hold_gesture(&self) -> Option<&HoldGesture> {
        match self {
            Self::HoldGesture(p) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let cmd = Command::GoToAngle(GoToAngle {
            servo: 3,
            angle_deg: 90,
        });
        assert_eq!(cmd.kind(), CommandKind::GoToAngle);
        assert_eq!(cmd.kind().as_str(), "go_to_angle");

        let cmd = Command::HoldGesture(HoldGesture {
            gesture: 1,
            hold_ms: 500,
        });
        assert_eq!(cmd.kind(), CommandKind::HoldGesture);
    }

    #[test]
    fn command_kind_u8_roundtrip() {
        for v in 0..=5u8 {
            let k = CommandKind::from_u8(v).unwrap();
            assert_eq!(k as u8, v);
        }
        assert_eq!(CommandKind::from_u8(6), None);
    }

    #[test]
    fn accessor_rejects_other_variant() {
        let cmd = Command::Lock(Lock { servo: 0 });
        assert!(cmd.as_go_to_angle().is_none());
        assert!(cmd.as_smooth_move().is_none());
        assert!(cmd.as_unlock().is_none());

        let cmd = Command::SmoothMove(SmoothMove {
            servo: 2,
            angle_deg: 45,
            duration_ms: 1200,
        });
        let payload = cmd.as_smooth_move().unwrap();
        assert_eq!(payload.servo, 2);
        assert_eq!(payload.duration_ms, 1200);
    }

    #[test]
    fn every_variant_has_a_matching_accessor() {
        assert_eq!(
            Command::Lock(Lock { servo: 5 }).as_lock().unwrap().servo,
            5
        );
        assert_eq!(
            Command::Unlock(Unlock { servo: 6 })
                .as_unlock()
                .unwrap()
                .servo,
            6
        );
        assert_eq!(
            Command::MoveToPressure(MoveToPressure {
                finger: Finger::Ring,
                pressure_kpa: 4.0,
            })
            .as_move_to_pressure()
            .unwrap()
            .finger,
            Finger::Ring
        );
        assert_eq!(
            Command::HoldGesture(HoldGesture {
                gesture: 2,
                hold_ms: 250,
            })
            .as_hold_gesture()
            .unwrap()
            .hold_ms,
            250
        );
        assert!(
            Command::GoToAngle(GoToAngle {
                servo: 0,
                angle_deg: 0,
            })
            .as_hold_gesture()
            .is_none()
        );
    }

    #[test]
    fn command_json_roundtrip() {
        let cmd = Command::MoveToPressure(MoveToPressure {
            finger: Finger::Index,
            pressure_kpa: 12.5,
        });
        let json = serde_json::to_string(&cmd).unwrap();
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }
}
