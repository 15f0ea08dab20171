//! Typed shared-state store.
//!
//! One fixed-length slot vector per [`SensorKind`], all behind a single
//! coarse [`SpinGuard`]. Coarse on purpose: one acquire/release pair per
//! access keeps the interrupt-sensitive paths cheap, and the telemetry
//! sweep never observes a half-written instance. The trade-off is that any
//! writer blocks every other kind's readers for the duration of its write,
//! so critical sections must stay O(one instance).
//!
//! Kind dispatch is compile-time: each sample type implements the sealed
//! [`StateRecord`] trait, and `handle.get_mut::<PotentiometerSample>(idx)`
//! resolves to the right vector with no runtime tag.

use core::cell::UnsafeCell;
use serde::Serialize;
use thiserror::Error;

use hand::config::StoreLayout;
use hand::sensor::{
    ImuEstimate, ImuSample, PotentiometerSample, SensorKind, ServoStatus, StrainGaugeSample,
};

use crate::guard::{SpinGuard, YieldPolicy};

/// Store access errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Index outside `0..count(kind)`. A correct caller iterating by
    /// `count()` never sees this; treat it as a programming error.
    #[error("invalid index {index} for kind '{}' (len {len})", kind.as_str())]
    InvalidIndex {
        kind: SensorKind,
        index: usize,
        len: usize,
    },
}

/// Slot vectors, one per kind. Only reachable through a held guard.
#[derive(Debug, Default)]
pub struct StoreInner {
    imu_raw: Vec<ImuSample>,
    imu_fused: Vec<ImuEstimate>,
    potentiometer: Vec<PotentiometerSample>,
    strain_gauge: Vec<StrainGaugeSample>,
    servo: Vec<ServoStatus>,
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for hand::sensor::ImuSample {}
    impl Sealed for hand::sensor::ImuEstimate {}
    impl Sealed for hand::sensor::PotentiometerSample {}
    impl Sealed for hand::sensor::StrainGaugeSample {}
    impl Sealed for hand::sensor::ServoStatus {}
}

/// A sample type stored by the state store. Sealed: the kind set is closed.
pub trait StateRecord:
    sealed::Sealed + Default + Copy + Serialize + Send + Sync + 'static
{
    /// The kind whose slot vector holds this type.
    const KIND: SensorKind;

    #[doc(hidden)]
    fn slots(inner: &StoreInner) -> &Vec<Self>;
    #[doc(hidden)]
    fn slots_mut(inner: &mut StoreInner) -> &mut Vec<Self>;
}

macro_rules! impl_state_record {
    ($ty:ty, $kind:expr, $field:ident) => {
        impl StateRecord for $ty {
            const KIND: SensorKind = $kind;

            fn slots(inner: &StoreInner) -> &Vec<Self> {
                &inner.$field
            }

            fn slots_mut(inner: &mut StoreInner) -> &mut Vec<Self> {
                &mut inner.$field
            }
        }
    };
}

impl_state_record!(ImuSample, SensorKind::ImuRaw, imu_raw);
impl_state_record!(ImuEstimate, SensorKind::ImuFused, imu_fused);
impl_state_record!(PotentiometerSample, SensorKind::Potentiometer, potentiometer);
impl_state_record!(StrainGaugeSample, SensorKind::StrainGauge, strain_gauge);
impl_state_record!(ServoStatus, SensorKind::Servo, servo);

/// Process-wide typed state container.
///
/// Construct once at boot, share via `Arc`, call [`init`](Self::init)
/// before anything else. There is deliberately no global instance; every
/// task receives the same `Arc` at spawn time.
#[derive(Debug)]
pub struct StateStore {
    guard: SpinGuard,
    inner: UnsafeCell<StoreInner>,
}

// SAFETY: `inner` is only dereferenced while `guard` is held, enforced by
// the `StoreHandle` borrow discipline below (and by the documented contract
// of the raw lock API). The guard's acquire/release orderings publish all
// writes to the next acquirer.
unsafe impl Sync for StateStore {}

impl StateStore {
    /// Create an empty store. Every kind has count 0 until [`init`](Self::init).
    pub const fn new() -> Self {
        Self {
            guard: SpinGuard::new(),
            inner: UnsafeCell::new(StoreInner {
                imu_raw: Vec::new(),
                imu_fused: Vec::new(),
                potentiometer: Vec::new(),
                strain_gauge: Vec::new(),
                servo: Vec::new(),
            }),
        }
    }

    /// Allocate fresh default-valued slots for every kind.
    ///
    /// Destructive: existing instance data is discarded and any index
    /// assumptions held by other tasks are invalidated. Call once at boot;
    /// calling again is a full reset.
    pub fn init(&self, layout: &StoreLayout) {
        self.guard.acquire(YieldPolicy::Task);
        // SAFETY: guard held for the whole block, released below.
        let inner = unsafe { &mut *self.inner.get() };
        reset_slots(&mut inner.imu_raw, layout.imu_raw);
        reset_slots(&mut inner.imu_fused, layout.imu_fused);
        reset_slots(&mut inner.potentiometer, layout.potentiometer);
        reset_slots(&mut inner.strain_gauge, layout.strain_gauge);
        reset_slots(&mut inner.servo, layout.servo);
        self.guard.release();
    }

    /// Acquire the guard and return a scoped access handle.
    ///
    /// The guard is released when the handle drops, on every exit path.
    pub fn lock(&self) -> StoreHandle<'_> {
        self.guard.acquire(YieldPolicy::Task);
        StoreHandle { store: self }
    }

    /// Like [`lock`](Self::lock), but relaxes with spin hints only.
    ///
    /// For interrupt-style callers that must never yield to the scheduler.
    pub fn lock_from_isr(&self) -> StoreHandle<'_> {
        self.guard.acquire(YieldPolicy::Interrupt);
        StoreHandle { store: self }
    }

    /// Run `f` with the guard held.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut StoreHandle<'_>) -> R) -> R {
        let mut handle = self.lock();
        f(&mut handle)
    }

    /// Advisory lock-state probe.
    pub fn is_locked(&self) -> bool {
        self.guard.is_locked()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

fn reset_slots<T: Default>(slots: &mut Vec<T>, count: usize) {
    slots.clear();
    slots.resize_with(count, T::default);
}

/// Scoped store access. Holds the guard until dropped.
///
/// References obtained from the handle are tied to its borrow, so they
/// cannot outlive the guarded section.
pub struct StoreHandle<'a> {
    store: &'a StateStore,
}

impl StoreHandle<'_> {
    /// Configured slot count for a kind; 0 before `init`.
    pub fn count<T: StateRecord>(&self) -> usize {
        // SAFETY: guard held while `self` exists.
        let inner = unsafe { &*self.store.inner.get() };
        T::slots(inner).len()
    }

    /// Shared reference to one instance.
    pub fn get<T: StateRecord>(&self, index: usize) -> Result<&T, StoreError> {
        // SAFETY: guard held while `self` exists.
        let inner = unsafe { &*self.store.inner.get() };
        let slots = T::slots(inner);
        slots.get(index).ok_or_else(|| {
            debug_assert!(false, "index {index} out of range for {}", T::KIND.as_str());
            StoreError::InvalidIndex {
                kind: T::KIND,
                index,
                len: slots.len(),
            }
        })
    }

    /// Mutable reference to one instance.
    pub fn get_mut<T: StateRecord>(&mut self, index: usize) -> Result<&mut T, StoreError> {
        // SAFETY: guard held while `self` exists; `&mut self` prevents a
        // second live reference from the same handle.
        let inner = unsafe { &mut *self.store.inner.get() };
        let slots = T::slots_mut(inner);
        let len = slots.len();
        slots.get_mut(index).ok_or_else(|| {
            debug_assert!(false, "index {index} out of range for {}", T::KIND.as_str());
            StoreError::InvalidIndex {
                kind: T::KIND,
                index,
                len,
            }
        })
    }

    /// Copy one instance out, for the serialize-after-release pattern.
    pub fn copy_out<T: StateRecord>(&self, index: usize) -> Result<T, StoreError> {
        self.get::<T>(index).copied()
    }

    /// Slot count for a kind known only at runtime.
    pub fn count_of(&self, kind: SensorKind) -> usize {
        match kind {
            SensorKind::ImuRaw => self.count::<ImuSample>(),
            SensorKind::ImuFused => self.count::<ImuEstimate>(),
            SensorKind::Potentiometer => self.count::<PotentiometerSample>(),
            SensorKind::StrainGauge => self.count::<StrainGaugeSample>(),
            SensorKind::Servo => self.count::<ServoStatus>(),
        }
    }
}

impl Drop for StoreHandle<'_> {
    fn drop(&mut self) {
        self.store.guard.release();
    }
}
