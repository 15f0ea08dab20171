//! Sensor kinds and per-kind sample types.
//!
//! Every kind owns a fixed-length sequence of instances in the state store,
//! one slot per physical sensor/actuator unit. All sample types are `Copy`
//! so the telemetry sweep can copy an instance out under the store guard and
//! serialize it after release (the copy-out pattern — guard hold time stays
//! O(one instance)).

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

// ─── Sensor Kinds ───────────────────────────────────────────────────

/// The closed set of sensor/result categories held by the state store.
///
/// Counts per kind are fixed at `StateStore::init` and never change until
/// the next (destructive) re-init.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SensorKind {
    /// Raw inertial samples straight from the IMU.
    ImuRaw = 0,
    /// Fused orientation estimates derived from raw IMU data.
    ImuFused = 1,
    /// Joint potentiometer readings.
    Potentiometer = 2,
    /// Fingertip strain-gauge readings.
    StrainGauge = 3,
    /// Servo actuator status (written back by the control loop).
    Servo = 4,
}

impl SensorKind {
    /// All kinds, in telemetry sweep order.
    pub const ALL: [SensorKind; 5] = [
        Self::ImuRaw,
        Self::ImuFused,
        Self::Potentiometer,
        Self::StrainGauge,
        Self::Servo,
    ];

    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::ImuRaw),
            1 => Some(Self::ImuFused),
            2 => Some(Self::Potentiometer),
            3 => Some(Self::StrainGauge),
            4 => Some(Self::Servo),
            _ => None,
        }
    }

    /// Stable lowercase name, used in log fields and config keys.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ImuRaw => "imu_raw",
            Self::ImuFused => "imu_fused",
            Self::Potentiometer => "potentiometer",
            Self::StrainGauge => "strain_gauge",
            Self::Servo => "servo",
        }
    }
}

// ─── Hand Geometry ──────────────────────────────────────────────────

/// Finger identifier, thumb first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Finger {
    Thumb = 0,
    Index = 1,
    Middle = 2,
    Ring = 3,
    Little = 4,
}

impl Finger {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Thumb),
            1 => Some(Self::Index),
            2 => Some(Self::Middle),
            3 => Some(Self::Ring),
            4 => Some(Self::Little),
            _ => None,
        }
    }
}

impl Default for Finger {
    fn default() -> Self {
        Self::Thumb
    }
}

/// Joint position along a finger.
///
/// `P0` is the knuckle joint (for the thumb: adduction), `P1` the middle
/// joint, `P2` the joint before the fingertip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum JointPos {
    P0 = 0,
    P1 = 1,
    P2 = 2,
}

impl JointPos {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::P0),
            1 => Some(Self::P1),
            2 => Some(Self::P2),
            _ => None,
        }
    }
}

impl Default for JointPos {
    fn default() -> Self {
        Self::P0
    }
}

// ─── Sample Types ───────────────────────────────────────────────────

/// Raw inertial sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImuSample {
    /// Accelerometer reading [g], x/y/z.
    pub accel: [f32; 3],
    /// Gyroscope reading [deg/s], x/y/z.
    pub gyro: [f32; 3],
    /// Die temperature [°C].
    pub temp_c: f32,
    /// Capture sequence number, incremented by the sampling task per write.
    pub seq: u32,
}

/// Fused orientation estimate derived from raw IMU samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImuEstimate {
    /// Roll [deg].
    pub roll: f32,
    /// Pitch [deg].
    pub pitch: f32,
    /// Yaw [deg].
    pub yaw: f32,
    /// Sequence number of the raw sample this estimate was derived from.
    pub seq: u32,
}

/// Joint potentiometer reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PotentiometerSample {
    /// Which finger the joint belongs to.
    pub finger: Finger,
    /// Joint position along the finger.
    pub joint: JointPos,
    /// Measured joint angle [deg].
    pub angle_deg: u16,
    /// Analog multiplexer channel the pot is wired to.
    pub mux_channel: u8,
    /// Capture sequence number.
    pub seq: u32,
}

/// Fingertip strain-gauge reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StrainGaugeSample {
    /// Which fingertip.
    pub finger: Finger,
    /// Raw ADC value.
    pub raw: u32,
    /// Calibrated contact pressure [kPa].
    pub pressure_kpa: f32,
    /// Capture sequence number.
    pub seq: u32,
}

bitflags! {
    /// Servo condition flags, written by the control loop.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ServoFlags: u8 {
        /// Servo is locked in place, motion commands are ignored.
        const LOCKED        = 0x01;
        /// A motion toward `target_angle_deg` is in progress.
        const MOVING        = 0x02;
        /// Servo is holding a pressure target instead of an angle target.
        const PRESSURE_HOLD = 0x04;
        /// Drive reported a stall.
        const STALLED       = 0x08;
    }
}

impl Default for ServoFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Servo actuator status.
///
/// The control loop updates this after dispatching each command, so remote
/// monitors can observe post-command actuator state via telemetry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ServoStatus {
    /// Commanded target angle [deg].
    pub target_angle_deg: u16,
    /// Last measured angle [deg].
    pub current_angle_deg: u16,
    /// Condition flags.
    pub flags: ServoFlags,
    /// Count of commands dispatched to this servo since boot.
    pub commands_seen: u32,
}

// Copy-out pattern budget: every sample must stay within a cache line so
// a guarded copy is a handful of moves, never a memcpy loop worth noticing.
const_assert!(core::mem::size_of::<ImuSample>() <= 64);
const_assert!(core::mem::size_of::<ImuEstimate>() <= 64);
const_assert!(core::mem::size_of::<PotentiometerSample>() <= 64);
const_assert!(core::mem::size_of::<StrainGaugeSample>() <= 64);
const_assert!(core::mem::size_of::<ServoStatus>() <= 64);
