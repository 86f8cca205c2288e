//! Trapezoidal motion profile
//!
//! A profile is a closed-form motion law made of five ramp points:
//!
//! ```text
//! now --[0]--> decelerate --[1]--> accelerate --[2]--> coast --[3]--> decelerate to zero --[4]--> hold
//! ```
//!
//! Phases with zero duration are skipped, so a move that is too short to reach
//! the requested speed degenerates into a triangle. A new profile is always
//! generated from the position and speed sampled out of the previous one, which
//! keeps position and speed continuous when a move is re-targeted mid-flight.
//!
//! [`TrapezoidalProfile`] is a plain `Copy` value. [`SharedProfile`] wraps one
//! in a blocking mutex so the control loop can regenerate it while a faster
//! sampling context reads it, swapping the whole value at once.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use libm::{ceilf, fabsf, sqrtf};

/// Number of ramp points in a profile
pub const PROFILE_POINTS: usize = 5;

/// Errors rejected by [`TrapezoidalProfile::generate`]
///
/// The previous profile is kept whenever one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProfileError {
    /// Target position is NaN or infinite
    NonFiniteTarget,
    /// Speed is NaN, infinite or negative
    InvalidSpeed,
    /// Acceleration is NaN, infinite, zero or negative
    InvalidAcceleration,
}

/// One phase boundary of a profile
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProfilePoint {
    /// Time since profile start in seconds
    pub time: f32,
    /// Position in mm
    pub position: f32,
    /// Signed speed in mm/s
    pub speed: f32,
}

impl ProfilePoint {
    const fn at_rest(position: f32) -> Self {
        Self {
            time: 0.0,
            position,
            speed: 0.0,
        }
    }
}

/// Kinematic state of a profile at one instant
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionSample {
    /// Position in mm
    pub position: f32,
    /// Signed speed in mm/s
    pub speed: f32,
    /// Signed acceleration of the active phase in mm/s²
    pub acceleration: f32,
}

/// Five-point trapezoidal motion profile
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrapezoidalProfile {
    points: [ProfilePoint; PROFILE_POINTS],
    /// Magnitude of acceleration used by every ramp phase
    acceleration: f32,
    /// Absolute start time in ms
    start_ms: u64,
}

impl Default for TrapezoidalProfile {
    fn default() -> Self {
        Self::new()
    }
}

/// Sign of `x` as -1.0, 0.0 or 1.0
fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

impl TrapezoidalProfile {
    /// Create a profile at rest at position 0
    pub const fn new() -> Self {
        Self::at_rest(0.0, 0)
    }

    /// Create a profile at rest at `position`, starting at `now_ms`
    pub const fn at_rest(position: f32, now_ms: u64) -> Self {
        Self {
            points: [ProfilePoint::at_rest(position); PROFILE_POINTS],
            acceleration: 0.0,
            start_ms: now_ms,
        }
    }

    /// Discard any motion and hold still at `position`
    pub fn reset_to(&mut self, position: f32, now_ms: u64) {
        *self = Self::at_rest(position, now_ms);
        debug!("profile reset to {=f32} mm", position);
    }

    /// Generate a new profile towards `target`
    ///
    /// Starts from the position and speed this profile has at `now_ms`.
    /// A `max_speed` of zero brings the axis to a controlled stop instead.
    ///
    /// # Errors
    /// Rejects non-finite targets, invalid speeds and non-positive
    /// accelerations, leaving the current profile untouched.
    pub fn generate(
        &mut self,
        target: f32,
        max_speed: f32,
        acceleration: f32,
        now_ms: u64,
    ) -> Result<(), ProfileError> {
        if !target.is_finite() {
            return Err(ProfileError::NonFiniteTarget);
        }
        if !max_speed.is_finite() || max_speed < 0.0 {
            return Err(ProfileError::InvalidSpeed);
        }
        if !acceleration.is_finite() || acceleration <= 0.0 {
            return Err(ProfileError::InvalidAcceleration);
        }

        let current = self.sample(now_ms);
        let a = acceleration;
        let p0 = ProfilePoint {
            time: 0.0,
            position: current.position,
            speed: current.speed,
        };

        // Point 1: decelerate. Default is a full stop.
        let stop_time = fabsf(p0.speed) / a;
        let mut p1 = ProfilePoint {
            time: stop_time,
            position: p0.position + sign(p0.speed) * 0.5 * a * stop_time * stop_time,
            speed: 0.0,
        };

        if max_speed == 0.0 {
            *self = Self {
                points: [p0, p1, p1, p1, p1],
                acceleration: a,
                start_ms: now_ms,
            };
            trace!("profile: full stop at {=f32} mm", p1.position);
            return Ok(());
        }

        let travel = target - p0.position;
        let same_direction = p0.speed != 0.0 && sign(travel) == sign(p0.speed);
        if same_direction {
            let overshoots = fabsf(target - p1.position) > fabsf(travel)
                || sign(target - p1.position) != sign(p0.speed);
            if overshoots {
                // Stop past the target and come back
            } else if fabsf(p0.speed) > max_speed {
                let t = (fabsf(p0.speed) - max_speed) / a;
                p1 = ProfilePoint {
                    time: t,
                    position: p0.position + p0.speed * t - sign(p0.speed) * 0.5 * a * t * t,
                    speed: sign(p0.speed) * max_speed,
                };
            } else {
                p1 = p0;
            }
        }

        // Point 2: accelerate towards coasting speed
        let direction = if target - p1.position < 0.0 { -1.0 } else { 1.0 };
        let p2 = if fabsf(p1.speed) >= max_speed {
            p1
        } else {
            let v1 = fabsf(p1.speed);
            let distance = fabsf(target - p1.position);
            let mut top_speed = sqrtf((v1 * v1 + 2.0 * a * distance) * 0.5);
            if top_speed > max_speed {
                top_speed = max_speed;
            }
            let dt = ((top_speed - v1) / a).max(0.0);
            ProfilePoint {
                time: p1.time + dt,
                position: p1.position + p1.speed * dt + direction * 0.5 * a * dt * dt,
                speed: direction * top_speed,
            }
        };

        // Point 3: coast until the final deceleration has to begin
        let p3 = if fabsf(p2.speed) < max_speed {
            p2
        } else {
            let braking = 0.5 * p2.speed * p2.speed / a;
            let position = target - sign(p2.speed) * braking;
            ProfilePoint {
                time: p2.time + fabsf(position - p2.position) / fabsf(p2.speed),
                position,
                speed: p2.speed,
            }
        };

        // Point 4: decelerate to standstill on target
        let p4 = ProfilePoint {
            time: p3.time + fabsf(p3.speed) / a,
            position: target,
            speed: 0.0,
        };

        *self = Self {
            points: [p0, p1, p2, p3, p4],
            acceleration: a,
            start_ms: now_ms,
        };
        trace!(
            "profile to {=f32} mm @ {=f32} mm/s, {=f32} mm/s², eta {=f32} s",
            target,
            max_speed,
            a,
            p4.time
        );
        Ok(())
    }

    /// Sample the profile at an absolute time
    ///
    /// From the absolute ETA on, this always returns the held target.
    pub fn sample(&self, now_ms: u64) -> MotionSample {
        if self.is_complete(now_ms) {
            return self.hold();
        }
        let elapsed_ms = now_ms.saturating_sub(self.start_ms);
        self.sample_at(elapsed_ms as f32 * 1.0e-3)
    }

    fn hold(&self) -> MotionSample {
        MotionSample {
            position: self.target(),
            speed: 0.0,
            acceleration: 0.0,
        }
    }

    /// Sample the profile at `t` seconds after its start
    pub fn sample_at(&self, t: f32) -> MotionSample {
        let t = t.max(0.0);
        let a = self.acceleration;
        let [p0, p1, p2, p3, p4] = self.points;

        if t < p1.time {
            let s = -sign(p0.speed) * a;
            MotionSample {
                position: p0.position + p0.speed * t + 0.5 * s * t * t,
                speed: p0.speed + s * t,
                acceleration: s,
            }
        } else if t < p2.time {
            let tau = t - p1.time;
            let s = sign(p2.speed) * a;
            MotionSample {
                position: p1.position + p1.speed * tau + 0.5 * s * tau * tau,
                speed: p1.speed + s * tau,
                acceleration: s,
            }
        } else if t < p3.time {
            let tau = t - p2.time;
            MotionSample {
                position: p2.position + p2.speed * tau,
                speed: p2.speed,
                acceleration: 0.0,
            }
        } else if t < p4.time {
            let tau = t - p3.time;
            let s = -sign(p3.speed) * a;
            MotionSample {
                position: p3.position + p3.speed * tau + 0.5 * s * tau * tau,
                speed: p3.speed + s * tau,
                acceleration: s,
            }
        } else {
            self.hold()
        }
    }

    /// Duration of the profile in seconds
    pub fn eta(&self) -> f32 {
        self.points[PROFILE_POINTS - 1].time
    }

    /// Absolute completion time in ms
    pub fn absolute_eta_ms(&self) -> u64 {
        self.start_ms + ceilf(self.eta() * 1000.0) as u64
    }

    /// Check whether the motion has come to rest on target
    pub fn is_complete(&self, now_ms: u64) -> bool {
        now_ms >= self.absolute_eta_ms()
    }

    /// Get a ramp point, clamping the index to the last point
    pub fn point(&self, index: usize) -> ProfilePoint {
        self.points[index.min(PROFILE_POINTS - 1)]
    }

    /// Final target position
    pub fn target(&self) -> f32 {
        self.points[PROFILE_POINTS - 1].position
    }

    /// Acceleration magnitude used by the ramps
    pub fn acceleration(&self) -> f32 {
        self.acceleration
    }

    /// Absolute start time in ms
    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }
}

/// A profile shared between the control loop and a sampling context
///
/// Every access runs inside the mutex and only performs closed-form math,
/// so the critical section stays short. Writers compute the replacement
/// value and swap it in as a whole.
pub struct SharedProfile<M: RawMutex> {
    inner: Mutex<M, Cell<TrapezoidalProfile>>,
}

impl<M: RawMutex> Default for SharedProfile<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> SharedProfile<M> {
    /// Create a shared profile at rest at position 0
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(TrapezoidalProfile::new())),
        }
    }

    /// See [`TrapezoidalProfile::reset_to`]
    pub fn reset_to(&self, position: f32, now_ms: u64) {
        self.inner.lock(|cell| {
            let mut profile = cell.get();
            profile.reset_to(position, now_ms);
            cell.set(profile);
        });
    }

    /// See [`TrapezoidalProfile::generate`]
    pub fn generate(
        &self,
        target: f32,
        max_speed: f32,
        acceleration: f32,
        now_ms: u64,
    ) -> Result<(), ProfileError> {
        self.inner.lock(|cell| {
            let mut profile = cell.get();
            profile.generate(target, max_speed, acceleration, now_ms)?;
            cell.set(profile);
            Ok(())
        })
    }

    /// See [`TrapezoidalProfile::sample`]
    pub fn sample(&self, now_ms: u64) -> MotionSample {
        self.inner.lock(|cell| cell.get().sample(now_ms))
    }

    /// See [`TrapezoidalProfile::eta`]
    pub fn eta(&self) -> f32 {
        self.inner.lock(|cell| cell.get().eta())
    }

    /// See [`TrapezoidalProfile::absolute_eta_ms`]
    pub fn absolute_eta_ms(&self) -> u64 {
        self.inner.lock(|cell| cell.get().absolute_eta_ms())
    }

    /// See [`TrapezoidalProfile::is_complete`]
    pub fn is_complete(&self, now_ms: u64) -> bool {
        self.inner.lock(|cell| cell.get().is_complete(now_ms))
    }

    /// Copy out the current profile
    pub fn snapshot(&self) -> TrapezoidalProfile {
        self.inner.lock(|cell| cell.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use proptest::prelude::*;

    const EPS: f32 = 1.0e-3;

    fn assert_close(actual: f32, expected: f32, tolerance: f32) {
        assert!(
            fabsf(actual - expected) <= tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_initial_profile_is_complete() {
        let profile = TrapezoidalProfile::new();
        assert!(profile.is_complete(0));
        assert_eq!(profile.sample(1234).position, 0.0);
        assert_eq!(profile.eta(), 0.0);
    }

    #[test]
    fn test_trapezoid_completeness() {
        let mut profile = TrapezoidalProfile::new();
        profile.generate(100.0, 15.0, 45.0, 0).unwrap();

        let eta = profile.absolute_eta_ms();
        let at_eta = profile.sample(eta);
        assert_eq!(at_eta.position, 100.0);
        assert_eq!(at_eta.speed, 0.0);

        assert!(!profile.is_complete(eta - 1));
        assert!(profile.is_complete(eta));
        assert!(profile.is_complete(eta + 10_000));

        // 1/3 s ramps and 95 mm of coasting at 15 mm/s
        assert_close(profile.eta(), 7.0, EPS);
        assert_close(profile.point(2).position, 2.5, EPS);
        assert_close(profile.point(3).position, 97.5, EPS);
    }

    #[test]
    fn test_triangular_profile_has_no_coast() {
        let mut profile = TrapezoidalProfile::new();
        // Top speed of the triangle is sqrt(10 * 100) ≈ 31.6 mm/s
        profile.generate(10.0, 1000.0, 100.0, 0).unwrap();

        let p2 = profile.point(2);
        let p3 = profile.point(3);
        assert_eq!(p2.time, p3.time);
        assert_close(p2.position, 5.0, EPS);
        assert_close(p2.speed, sqrtf(1000.0), EPS);

        let end = profile.sample(profile.absolute_eta_ms());
        assert_eq!(end.position, 10.0);
    }

    #[test]
    fn test_reverse_move() {
        let mut profile = TrapezoidalProfile::at_rest(80.0, 0);
        profile.generate(20.0, 30.0, 60.0, 0).unwrap();

        let mid = profile.sample(1000);
        assert!(mid.speed < 0.0);
        assert!(mid.position < 80.0 && mid.position > 20.0);

        let end = profile.sample(profile.absolute_eta_ms());
        assert_eq!(end.position, 20.0);
    }

    #[test]
    fn test_zero_speed_is_controlled_stop() {
        let mut profile = TrapezoidalProfile::new();
        profile.generate(100.0, 20.0, 40.0, 0).unwrap();
        let before = profile.sample(1000);
        assert_close(before.speed, 20.0, EPS);

        profile.generate(100.0, 0.0, 40.0, 1000).unwrap();
        // Stopping from 20 mm/s at 40 mm/s² takes 0.5 s and 5 mm
        assert_close(profile.eta(), 0.5, EPS);
        assert_close(profile.target(), before.position + 5.0, EPS);
        let after = profile.sample(2000);
        assert_eq!(after.speed, 0.0);
    }

    #[test]
    fn test_slow_down_while_moving_towards_target() {
        let mut profile = TrapezoidalProfile::new();
        profile.generate(200.0, 40.0, 40.0, 0).unwrap();
        // Coasting at 40 mm/s after one second
        profile.generate(200.0, 10.0, 40.0, 2000).unwrap();

        let p1 = profile.point(1);
        assert_close(p1.speed, 10.0, EPS);
        assert_close(p1.time, 0.75, EPS);
        // Already at coasting speed, so no acceleration phase
        assert_eq!(profile.point(2), p1);
    }

    #[test]
    fn test_overshoot_reverses() {
        let mut profile = TrapezoidalProfile::new();
        profile.generate(100.0, 50.0, 50.0, 0).unwrap();
        let now = 2000;
        let state = profile.sample(now);
        // Target just ahead but closer than the braking distance
        let target = state.position + 1.0;
        profile.generate(target, 50.0, 50.0, now).unwrap();

        let stop = profile.point(1);
        assert_eq!(stop.speed, 0.0);
        assert!(stop.position > target);
        assert!(profile.point(2).speed < 0.0);
        assert_eq!(profile.sample(profile.absolute_eta_ms()).position, target);
    }

    #[test]
    fn test_invalid_requests_keep_profile() {
        let mut profile = TrapezoidalProfile::new();
        profile.generate(50.0, 10.0, 10.0, 0).unwrap();
        let before = profile;

        assert_eq!(
            profile.generate(f32::NAN, 10.0, 10.0, 100),
            Err(ProfileError::NonFiniteTarget)
        );
        assert_eq!(
            profile.generate(10.0, -1.0, 10.0, 100),
            Err(ProfileError::InvalidSpeed)
        );
        assert_eq!(
            profile.generate(10.0, 10.0, 0.0, 100),
            Err(ProfileError::InvalidAcceleration)
        );
        assert_eq!(
            profile.generate(10.0, 10.0, f32::INFINITY, 100),
            Err(ProfileError::InvalidAcceleration)
        );
        assert_eq!(profile, before);
    }

    #[test]
    fn test_point_index_clamped() {
        let mut profile = TrapezoidalProfile::new();
        profile.generate(30.0, 10.0, 10.0, 0).unwrap();
        assert_eq!(profile.point(4), profile.point(99));
    }

    #[test]
    fn test_reset_discards_motion() {
        let mut profile = TrapezoidalProfile::new();
        profile.generate(100.0, 10.0, 10.0, 0).unwrap();
        profile.reset_to(42.0, 500);
        assert!(profile.is_complete(500));
        assert_eq!(profile.sample(600).position, 42.0);
        assert_eq!(profile.sample(600).speed, 0.0);
    }

    #[test]
    fn test_shared_profile_swaps_whole_value() {
        let shared: SharedProfile<NoopRawMutex> = SharedProfile::new();
        shared.generate(60.0, 20.0, 40.0, 0).unwrap();
        let snapshot = shared.snapshot();
        assert_eq!(snapshot.target(), 60.0);
        assert_eq!(shared.absolute_eta_ms(), snapshot.absolute_eta_ms());

        assert!(shared.generate(f32::NAN, 20.0, 40.0, 10).is_err());
        assert_eq!(shared.snapshot(), snapshot);
    }

    proptest! {
        #[test]
        fn prop_reissue_is_continuous(
            first in -150.0f32..150.0,
            second in -150.0f32..150.0,
            speed_a in 1.0f32..200.0,
            speed_b in 0.0f32..200.0,
            accel_a in 5.0f32..2000.0,
            accel_b in 5.0f32..2000.0,
            reissue_ms in 0u64..5000,
        ) {
            let mut profile = TrapezoidalProfile::new();
            profile.generate(first, speed_a, accel_a, 0).unwrap();
            let before = profile.sample(reissue_ms);

            profile.generate(second, speed_b, accel_b, reissue_ms).unwrap();
            let after = profile.sample(reissue_ms);

            prop_assert!(fabsf(before.position - after.position) <= 1.0e-3);
            prop_assert!(fabsf(before.speed - after.speed) <= 1.0e-3);

            // One millisecond later the path is still close to where it was
            let next = profile.sample(reissue_ms + 1);
            let bound = fabsf(after.speed) * 1.0e-3 + accel_b * 1.0e-6 + 1.0e-3;
            prop_assert!(fabsf(next.position - after.position) <= bound);
        }

        #[test]
        fn prop_profile_ends_on_target(
            start in -100.0f32..100.0,
            target in -100.0f32..100.0,
            speed in 0.5f32..300.0,
            accel in 1.0f32..3000.0,
        ) {
            let mut profile = TrapezoidalProfile::at_rest(start, 0);
            profile.generate(target, speed, accel, 0).unwrap();
            let end = profile.sample(profile.absolute_eta_ms());
            prop_assert_eq!(end.position, target);
            prop_assert_eq!(end.speed, 0.0);

            // Speed never exceeds the request on a move from rest
            for step in 0..50u64 {
                let t = profile.absolute_eta_ms() * step / 50;
                prop_assert!(fabsf(profile.sample(t).speed) <= speed + 1.0e-3);
            }
        }
    }
}
