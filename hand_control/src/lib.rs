//! # Hand Control
//!
//! Consumer side of the command queue. Every tick the loop drains up to a
//! budget of commands, dispatches each to the actuator driver with an
//! exhaustive match over the variant set, and writes the resulting servo
//! status back into the state store so the next telemetry sweep reports
//! post-command actuator state.
//!
//! The loop never panics on bad remote input: a command naming a servo the
//! store doesn't have is logged and dropped, the same as a malformed
//! payload at the decode boundary.

pub mod driver;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, trace, warn};

use hand::command::Command;
use hand::config::ControlConfig;
use hand::sensor::{ServoFlags, ServoStatus};
use hand_core::{CommandQueue, StateStore};

pub use driver::{ActuatorDriver, DriverError, LoggingDriver};

/// Fixed-cadence command consumer.
pub struct ControlLoop {
    queue: Arc<CommandQueue>,
    store: Arc<StateStore>,
    driver: Box<dyn ActuatorDriver>,
    config: ControlConfig,
}

impl ControlLoop {
    pub fn new(
        queue: Arc<CommandQueue>,
        store: Arc<StateStore>,
        driver: Box<dyn ActuatorDriver>,
        config: ControlConfig,
    ) -> Self {
        Self {
            queue,
            store,
            driver,
            config,
        }
    }

    /// Tick at the configured cadence while `running` stays set.
    pub fn run(&mut self, running: &AtomicBool) {
        let period = Duration::from_millis(self.config.period_ms);
        while running.load(Ordering::Relaxed) {
            let executed = self.tick();
            if executed > 0 {
                trace!(executed, "control tick");
            }
            std::thread::sleep(period);
        }
        debug!("control loop stopped");
    }

    /// Drain up to `commands_per_tick` commands. Returns how many were
    /// dispatched.
    pub fn tick(&mut self) -> usize {
        let mut executed = 0;
        for _ in 0..self.config.commands_per_tick {
            let Ok(command) = self.queue.pop() else {
                break;
            };
            self.dispatch(command);
            executed += 1;
        }
        executed
    }

    fn dispatch(&mut self, command: Command) {
        let result = match command {
            Command::GoToAngle(p) => {
                if self.servo_locked_or_missing(p.servo) {
                    return;
                }
                self.driver.go_to_angle(p.servo, p.angle_deg).map(|()| {
                    self.update_servo(p.servo, |s| {
                        s.target_angle_deg = p.angle_deg;
                        s.flags.insert(ServoFlags::MOVING);
                        s.flags.remove(ServoFlags::PRESSURE_HOLD);
                    });
                })
            }
            Command::Lock(p) => {
                if self.servo_missing(p.servo) {
                    return;
                }
                self.driver.set_lock(p.servo, true).map(|()| {
                    self.update_servo(p.servo, |s| {
                        s.flags.insert(ServoFlags::LOCKED);
                        s.flags.remove(ServoFlags::MOVING);
                    });
                })
            }
            Command::Unlock(p) => {
                if self.servo_missing(p.servo) {
                    return;
                }
                self.driver.set_lock(p.servo, false).map(|()| {
                    self.update_servo(p.servo, |s| {
                        s.flags.remove(ServoFlags::LOCKED);
                    });
                })
            }
            Command::SmoothMove(p) => {
                if self.servo_locked_or_missing(p.servo) {
                    return;
                }
                self.driver
                    .smooth_move(p.servo, p.angle_deg, p.duration_ms)
                    .map(|()| {
                        self.update_servo(p.servo, |s| {
                            s.target_angle_deg = p.angle_deg;
                            s.flags.insert(ServoFlags::MOVING);
                            s.flags.remove(ServoFlags::PRESSURE_HOLD);
                        });
                    })
            }
            Command::MoveToPressure(p) => self
                .driver
                .seek_pressure(p.finger, p.pressure_kpa)
                .map(|()| {
                    self.mark_all_unlocked_servos(|s| {
                        s.flags.insert(ServoFlags::PRESSURE_HOLD);
                    });
                }),
            Command::HoldGesture(p) => self.driver.hold_gesture(p.gesture, p.hold_ms).map(|()| {
                self.mark_all_unlocked_servos(|s| {
                    s.flags.insert(ServoFlags::MOVING);
                    s.flags.remove(ServoFlags::PRESSURE_HOLD);
                });
            }),
        };

        if let Err(e) = result {
            warn!(kind = command.kind().as_str(), error = %e, "command failed");
        }
    }

    /// True (and logged) when the servo index is not in the store.
    fn servo_missing(&self, servo: u8) -> bool {
        let count = self.store.with_lock(|h| h.count::<ServoStatus>());
        if usize::from(servo) >= count {
            warn!(servo, count, "command for unknown servo dropped");
            return true;
        }
        false
    }

    /// True when the servo is missing or currently locked.
    fn servo_locked_or_missing(&self, servo: u8) -> bool {
        if self.servo_missing(servo) {
            return true;
        }
        let locked = self.store.with_lock(|h| {
            h.get::<ServoStatus>(usize::from(servo))
                .map(|s| s.flags.contains(ServoFlags::LOCKED))
                .unwrap_or(false)
        });
        if locked {
            debug!(servo, "motion command ignored, servo locked");
        }
        locked
    }

    fn update_servo(&self, servo: u8, f: impl FnOnce(&mut ServoStatus)) {
        self.store.with_lock(|h| {
            if let Ok(status) = h.get_mut::<ServoStatus>(usize::from(servo)) {
                f(status);
                status.commands_seen += 1;
            }
        });
    }

    fn mark_all_unlocked_servos(&self, f: impl Fn(&mut ServoStatus)) {
        // One guarded pass; servo status updates are a few flag writes.
        self.store.with_lock(|h| {
            for idx in 0..h.count::<ServoStatus>() {
                if let Ok(status) = h.get_mut::<ServoStatus>(idx) {
                    if !status.flags.contains(ServoFlags::LOCKED) {
                        f(status);
                        status.commands_seen += 1;
                    }
                }
            }
        });
    }
}
