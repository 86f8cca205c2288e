//! Vibration modifier
//!
//! Superimposes a sinusoidal oscillation on the main motion. While the
//! oscillation is active the main motion only exists as the shared profile:
//! each [`poll`](VibrationModifier::poll) samples it, adds the oscillation
//! and pushes the result straight to the actuator. Once the main motion has
//! finished the oscillation keeps running around its final position.

use core::f32::consts::PI;

use embassy_sync::blocking_mutex::raw::RawMutex;
use libm::{fabsf, sinf};

use super::profile::SharedProfile;
use crate::safety::guard::{constrain, SafeStrokeParameters, MAX_VIBRATION_FREQUENCY_HZ};
use crate::state::StrokeCommand;
use crate::traits::Actuator;

/// Vibration modifier
#[derive(Debug, Clone)]
pub struct VibrationModifier {
    /// Manually set frequency in Hz
    manual_frequency: f32,
    /// Manually set amplitude in mm
    manual_amplitude: f32,
    manual_override: bool,
    /// Latched for the current main motion
    frequency: f32,
    amplitude: f32,
    /// Phase origin, the start of the main motion
    phase_origin_ms: u64,
}

impl Default for VibrationModifier {
    fn default() -> Self {
        Self::new()
    }
}

impl VibrationModifier {
    pub const fn new() -> Self {
        Self {
            manual_frequency: 0.0,
            manual_amplitude: 0.0,
            manual_override: false,
            frequency: 0.0,
            amplitude: 0.0,
            phase_origin_ms: 0,
        }
    }

    /// Returns the stored manual frequency
    pub fn set_vibration_frequency(&mut self, frequency: f32) -> f32 {
        if frequency.is_finite() {
            self.manual_frequency = constrain(frequency, 0.0, MAX_VIBRATION_FREQUENCY_HZ);
        }
        self.manual_frequency
    }

    /// Returns the stored manual amplitude
    pub fn set_vibration_amplitude(&mut self, amplitude: f32) -> f32 {
        if amplitude.is_finite() {
            self.manual_amplitude = amplitude.max(0.0);
        }
        self.manual_amplitude
    }

    /// Use the manual values instead of the ones carried by the parameters
    pub fn manual_override(&mut self, enabled: bool) {
        self.manual_override = enabled;
    }

    pub fn is_manual_override(&self) -> bool {
        self.manual_override
    }

    /// Latch the vibration for a main motion starting at `now_ms`
    ///
    /// The parameters keep their target, speed and acceleration; only the
    /// vibration fields are rewritten to the values that will be used.
    pub fn apply_vibration_modification(
        &mut self,
        parameters: &mut SafeStrokeParameters,
        command: StrokeCommand,
        now_ms: u64,
    ) {
        let (amplitude, frequency) = if command == StrokeCommand::PositionStream {
            (0.0, 0.0)
        } else if self.manual_override {
            (self.manual_amplitude, self.manual_frequency)
        } else {
            (
                parameters.vibration_amplitude.max(0.0),
                parameters.vibration_frequency.max(0.0),
            )
        };

        self.amplitude = amplitude;
        self.frequency = frequency;
        self.phase_origin_ms = now_ms;

        parameters.vibration_amplitude = amplitude;
        parameters.vibration_frequency = frequency;
    }

    /// Check if an oscillation is latched
    pub fn is_active(&self) -> bool {
        self.amplitude > 0.0 && self.frequency > 0.0
    }

    pub fn get_amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn get_frequency(&self) -> f32 {
        self.frequency
    }

    /// Oscillation offset at `now_ms`
    pub fn offset(&self, now_ms: u64) -> f32 {
        if !self.is_active() {
            return 0.0;
        }
        let t = now_ms.saturating_sub(self.phase_origin_ms) as f32 * 1.0e-3;
        self.amplitude * sinf(2.0 * PI * self.frequency * t)
    }

    /// Check if the main motion is complete, ignoring the oscillation
    pub fn motion_completed<M: RawMutex>(&self, profile: &SharedProfile<M>, now_ms: u64) -> bool {
        profile.is_complete(now_ms)
    }

    /// Push the main motion plus the oscillation to the actuator
    ///
    /// Does nothing while no oscillation is latched; the actuator then runs
    /// the main motion on its own.
    ///
    /// # Returns
    /// Whether the main motion is complete
    pub fn poll<M: RawMutex, A: Actuator>(
        &mut self,
        profile: &SharedProfile<M>,
        actuator: &mut A,
        now_ms: u64,
    ) -> bool {
        let completed = self.motion_completed(profile, now_ms);
        if !self.is_active() {
            return completed;
        }

        let main = profile.sample(now_ms);
        let omega = 2.0 * PI * self.frequency;
        let max_position = actuator.limits().max_position;
        let position = constrain(main.position + self.offset(now_ms), 0.0, max_position);
        let speed = fabsf(main.speed) + omega * self.amplitude;
        let acceleration = fabsf(main.acceleration) + omega * omega * self.amplitude;

        if let Err(e) = actuator.go_to_position(position, speed, acceleration, now_ms) {
            warn!("vibration: actuator rejected move: {}", e);
        }
        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ActuatorError, ActuatorLimits};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use proptest::prelude::*;

    /// Records the last commanded move
    struct Recorder {
        last: Option<(f32, f32, f32)>,
        moves: usize,
    }

    impl Actuator for Recorder {
        fn enable(&mut self) {}
        fn disable(&mut self) {}
        fn is_enabled(&self) -> bool {
            true
        }
        fn home(&mut self, _now_ms: u64) {}
        fn is_homed(&self) -> bool {
            true
        }
        fn limits(&self) -> ActuatorLimits {
            ActuatorLimits {
                max_position: 100.0,
                max_speed: 1000.0,
                max_acceleration: 100_000.0,
            }
        }
        fn go_to_position(
            &mut self,
            position: f32,
            speed: f32,
            acceleration: f32,
            _now_ms: u64,
        ) -> Result<(), ActuatorError> {
            self.last = Some((position, speed, acceleration));
            self.moves += 1;
            Ok(())
        }
        fn stop_motion(&mut self, _now_ms: u64) {}
        fn motion_completed(&self, _now_ms: u64) -> bool {
            true
        }
        fn get_position(&self, _now_ms: u64) -> f32 {
            0.0
        }
        fn get_speed(&self, _now_ms: u64) -> f32 {
            0.0
        }
        fn get_acceleration(&self) -> f32 {
            0.0
        }
        fn has_error(&self) -> bool {
            false
        }
    }

    fn params(target: f32, amplitude: f32, frequency: f32) -> SafeStrokeParameters {
        SafeStrokeParameters {
            absolute_target_position: target,
            stroke_length: 50.0,
            speed: 100.0,
            acceleration: 1000.0,
            vibration_frequency: frequency,
            vibration_amplitude: amplitude,
        }
    }

    #[test]
    fn test_parameters_latch_vibration() {
        let mut vibration = VibrationModifier::new();
        let mut p = params(40.0, 2.0, 20.0);
        let before = p;
        vibration.apply_vibration_modification(&mut p, StrokeCommand::Pattern, 0);
        assert_eq!(p, before);
        assert!(vibration.is_active());
        assert_eq!(vibration.get_amplitude(), 2.0);
    }

    #[test]
    fn test_manual_override_wins() {
        let mut vibration = VibrationModifier::new();
        assert_eq!(vibration.set_vibration_amplitude(1.0), 1.0);
        assert_eq!(vibration.set_vibration_frequency(80.0), MAX_VIBRATION_FREQUENCY_HZ);
        assert_eq!(vibration.set_vibration_amplitude(f32::NAN), 1.0);
        assert!(!vibration.is_manual_override());
        vibration.manual_override(true);
        assert!(vibration.is_manual_override());

        let mut p = params(40.0, 2.0, 20.0);
        vibration.apply_vibration_modification(&mut p, StrokeCommand::Pattern, 0);
        assert_eq!(p.vibration_amplitude, 1.0);
        assert_eq!(p.vibration_frequency, MAX_VIBRATION_FREQUENCY_HZ);
    }

    #[test]
    fn test_position_stream_disables_vibration() {
        let mut vibration = VibrationModifier::new();
        let mut p = params(40.0, 2.0, 20.0);
        vibration.apply_vibration_modification(&mut p, StrokeCommand::PositionStream, 0);
        assert!(!vibration.is_active());
        assert_eq!(p.vibration_amplitude, 0.0);
    }

    #[test]
    fn test_poll_follows_main_motion() {
        let profile: SharedProfile<NoopRawMutex> = SharedProfile::new();
        profile.reset_to(0.0, 0);
        profile.generate(40.0, 100.0, 1000.0, 0).unwrap();

        let mut vibration = VibrationModifier::new();
        let mut p = params(40.0, 2.0, 25.0);
        vibration.apply_vibration_modification(&mut p, StrokeCommand::Pattern, 0);

        let mut actuator = Recorder { last: None, moves: 0 };
        assert!(!vibration.poll(&profile, &mut actuator, 0));
        let (position, speed, acceleration) = actuator.last.unwrap();
        assert!(position.abs() < 1.0e-4);
        assert!((speed - 2.0 * PI * 25.0 * 2.0).abs() < 1.0e-2);
        assert!(acceleration > 1000.0);

        // A quarter period in, the offset peaks on top of the main motion
        assert!(!vibration.poll(&profile, &mut actuator, 10));
        let main = profile.sample(10).position;
        let (position, _, _) = actuator.last.unwrap();
        assert!((position - (main + 2.0)).abs() < 1.0e-3);

        let eta = profile.absolute_eta_ms();
        assert!(vibration.poll(&profile, &mut actuator, eta));
        assert_eq!(actuator.moves, 3);
    }

    #[test]
    fn test_inactive_poll_does_not_move() {
        let profile: SharedProfile<NoopRawMutex> = SharedProfile::new();
        profile.reset_to(10.0, 0);
        let mut vibration = VibrationModifier::new();
        let mut actuator = Recorder { last: None, moves: 0 };
        assert!(vibration.poll(&profile, &mut actuator, 5));
        assert_eq!(actuator.moves, 0);
        assert_eq!(vibration.offset(5), 0.0);
    }

    #[test]
    fn test_poll_clamps_to_travel() {
        let profile: SharedProfile<NoopRawMutex> = SharedProfile::new();
        profile.reset_to(99.0, 0);
        let mut vibration = VibrationModifier::new();
        let mut p = params(99.0, 5.0, 25.0);
        vibration.apply_vibration_modification(&mut p, StrokeCommand::Pattern, 0);

        let mut actuator = Recorder { last: None, moves: 0 };
        assert!(vibration.poll(&profile, &mut actuator, 10));
        assert_eq!(actuator.last.unwrap().0, 100.0);
    }

    proptest! {
        #[test]
        fn prop_offset_bounded_by_amplitude(
            amplitude in 0.0f32..20.0,
            frequency in 0.0f32..50.0,
            t in 0u64..100_000,
        ) {
            let mut vibration = VibrationModifier::new();
            let mut p = params(50.0, amplitude, frequency);
            vibration.apply_vibration_modification(&mut p, StrokeCommand::Pattern, 0);
            prop_assert!(vibration.offset(t).abs() <= amplitude + 1.0e-4);
        }
    }
}
