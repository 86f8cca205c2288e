//! Virtual motor
//!
//! An actuator without hardware. Every commanded move is planned on a
//! [`SharedProfile`] and the motor's position and speed are whatever that
//! profile says at the time asked. Useful for trying patterns and safety
//! behaviour without putting a machine at risk, and for streaming the
//! simulated motion from another context.
//!
//! The motor's profile is its rail. An engine driving the motor needs a
//! second profile for its plan.
//!
//! # Usage
//!
//! ```ignore
//! static PLAN: SharedProfile<CriticalSectionRawMutex> = SharedProfile::new();
//! static RAIL: SharedProfile<CriticalSectionRawMutex> = SharedProfile::new();
//!
//! let mut motor = VirtualMotor::new(VirtualMotorConfig::default(), &RAIL);
//! motor.enable();
//! motor.home(now_ms);
//! let mut engine = StrokeEngine::new(motor, &PLAN, PatternRegistry::standard(), now_ms)?;
//!
//! // Elsewhere, at any time:
//! let sample = RAIL.sample(now_ms);
//! ```

use cadence_core::config::{
    FACTORY_KEEPOUT_MM, FACTORY_MAX_ACCELERATION, FACTORY_MAX_VELOCITY, FACTORY_TRAVEL_MM,
};
use cadence_core::motion::SharedProfile;
use cadence_core::traits::{Actuator, ActuatorError, ActuatorLimits};
use embassy_sync::blocking_mutex::raw::RawMutex;

/// Virtual motor configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VirtualMotorConfig {
    /// Rail length from endstop to endstop in mm
    pub travel_mm: f32,
    /// Distance kept clear of each endstop in mm
    pub keepout_mm: f32,
    /// Maximum speed in mm/s
    pub max_speed: f32,
    /// Maximum acceleration in mm/s²
    pub max_acceleration: f32,
}

impl Default for VirtualMotorConfig {
    fn default() -> Self {
        Self {
            travel_mm: FACTORY_TRAVEL_MM,
            keepout_mm: FACTORY_KEEPOUT_MM,
            max_speed: FACTORY_MAX_VELOCITY,
            max_acceleration: FACTORY_MAX_ACCELERATION,
        }
    }
}

impl VirtualMotorConfig {
    /// Usable travel between both keepouts
    ///
    /// Position 0 is the outer keepout, this is the inner one.
    pub fn max_position(&self) -> f32 {
        (self.travel_mm - 2.0 * self.keepout_mm).max(0.0)
    }
}

/// Virtual motor
pub struct VirtualMotor<'p, M: RawMutex> {
    config: VirtualMotorConfig,
    profile: &'p SharedProfile<M>,
    enabled: bool,
    homed: bool,
    /// Injected driver fault
    fault: bool,
}

impl<'p, M: RawMutex> VirtualMotor<'p, M> {
    /// Create a disabled, unhomed motor
    pub fn new(config: VirtualMotorConfig, profile: &'p SharedProfile<M>) -> Self {
        let mut motor = Self {
            config: VirtualMotorConfig::default(),
            profile,
            enabled: false,
            homed: false,
            fault: false,
        };
        motor.config.max_speed = config.max_speed.max(0.0);
        motor.config.max_acceleration = config.max_acceleration.max(0.0);
        motor.set_machine_geometry(config.travel_mm, config.keepout_mm);
        motor
    }

    /// Get the configuration
    pub fn config(&self) -> &VirtualMotorConfig {
        &self.config
    }

    /// Change the rail geometry
    ///
    /// The keepout never exceeds half the travel. Non-finite values keep the
    /// previous geometry.
    pub fn set_machine_geometry(&mut self, travel_mm: f32, keepout_mm: f32) {
        if !travel_mm.is_finite() || !keepout_mm.is_finite() {
            return;
        }
        let travel = travel_mm.max(0.0);
        self.config.travel_mm = travel;
        self.config.keepout_mm = keepout_mm.max(0.0).min(0.5 * travel);
    }

    /// Position measured from the outer endstop in mm
    pub fn get_rail_position(&self, now_ms: u64) -> f32 {
        self.profile.sample(now_ms).position + self.config.keepout_mm
    }

    /// Simulate a driver fault
    pub fn inject_fault(&mut self) {
        self.fault = true;
    }

    pub fn clear_fault(&mut self) {
        self.fault = false;
    }

    fn clamp_position(&self, position: f32) -> f32 {
        position.max(0.0).min(self.config.max_position())
    }
}

impl<M: RawMutex> Actuator for VirtualMotor<'_, M> {
    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// A virtual axis always knows where it is; homing resets it to 0
    fn home(&mut self, now_ms: u64) {
        self.profile.reset_to(0.0, now_ms);
        self.homed = true;
    }

    fn is_homed(&self) -> bool {
        self.homed
    }

    fn is_active(&self) -> bool {
        self.enabled && self.homed && !self.fault
    }

    fn limits(&self) -> ActuatorLimits {
        ActuatorLimits {
            max_position: self.config.max_position(),
            max_speed: self.config.max_speed,
            max_acceleration: self.config.max_acceleration,
        }
    }

    fn go_to_position(
        &mut self,
        position: f32,
        speed: f32,
        acceleration: f32,
        now_ms: u64,
    ) -> Result<(), ActuatorError> {
        if !self.enabled {
            return Err(ActuatorError::Disabled);
        }
        if !self.homed {
            return Err(ActuatorError::NotHomed);
        }
        if self.fault {
            return Err(ActuatorError::Fault);
        }
        if !position.is_finite() || !speed.is_finite() || !acceleration.is_finite() {
            return Err(ActuatorError::InvalidMotion);
        }

        let position = self.clamp_position(position);
        let speed = speed.max(0.0).min(self.config.max_speed);
        let acceleration = acceleration.min(self.config.max_acceleration);

        self.profile
            .generate(position, speed, acceleration, now_ms)
            .map_err(|_| ActuatorError::InvalidMotion)
    }

    /// Brake at full acceleration without losing position
    fn stop_motion(&mut self, now_ms: u64) {
        let target = self.profile.snapshot().target();
        if self
            .profile
            .generate(target, 0.0, self.config.max_acceleration, now_ms)
            .is_err()
        {
            let position = self.profile.sample(now_ms).position;
            self.profile.reset_to(position, now_ms);
        }
    }

    fn motion_completed(&self, now_ms: u64) -> bool {
        self.profile.is_complete(now_ms)
    }

    fn get_position(&self, now_ms: u64) -> f32 {
        self.profile.sample(now_ms).position
    }

    fn get_speed(&self, now_ms: u64) -> f32 {
        self.profile.sample(now_ms).speed
    }

    fn get_acceleration(&self) -> f32 {
        self.profile.snapshot().acceleration()
    }

    fn has_error(&self) -> bool {
        self.fault
    }

    fn drives_profile<P: RawMutex>(&self, profile: &SharedProfile<P>) -> bool {
        core::ptr::eq(
            self.profile as *const SharedProfile<M> as *const (),
            profile as *const SharedProfile<P> as *const (),
        )
    }
}
