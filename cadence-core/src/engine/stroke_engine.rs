//! Stroke engine
//!
//! Ties the pipeline together: the selected pattern produces raw moves, the
//! safety guard clamps them, ease-in and vibration modify them and the
//! actuator executes them. [`StrokeEngine::tick`] is one iteration of the
//! control loop and is expected every [`LOOP_PERIOD_MS`].
//!
//! The engine plans every move on a [`SharedProfile`] so the main motion can
//! be sampled independently of what the actuator is doing.
//!
//! [`LOOP_PERIOD_MS`]: crate::config::LOOP_PERIOD_MS

use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::Deque;

use super::types::{
    EngineError, Notification, StrokeLimit, StrokeParameter, Telemetry, NOTIFICATION_CAPACITY,
};
use crate::config::{
    FACTORY_EASE_IN_VELOCITY, FACTORY_MAX_RATE, FACTORY_PATTERN, FACTORY_RATE,
    FACTORY_SENSATION, FACTORY_STROKE_MM, FACTORY_VIBRATION_AMPLITUDE_MM,
    FACTORY_VIBRATION_FREQUENCY_HZ,
};
use crate::motion::{EaseInModifier, SharedProfile, VibrationModifier};
use crate::pattern::{
    AnyPattern, MotionRequest, Pattern, PatternRegistry, TeasingPounding, SENSATION_MAX,
    SENSATION_MIN,
};
use crate::safety::guard::{constrain, GuardSetup, SafeStrokeParameters, SafetyGuard};
use crate::safety::{HeartbeatWatchdog, WatchdogError, WatchdogMode, WatchdogStatus};
use crate::state::{CommandEvent, StopReason, StrokeCommand};
use crate::traits::Actuator;

/// Name reported for pattern indices outside the registry
pub const INVALID_PATTERN_NAME: &str = "Invalid";

/// Stroke engine
pub struct StrokeEngine<'p, M: RawMutex, A: Actuator> {
    actuator: A,
    /// Planned main motion
    profile: &'p SharedProfile<M>,
    guard: SafetyGuard,
    ease_in: EaseInModifier,
    vibration: VibrationModifier,
    registry: PatternRegistry,
    pattern: AnyPattern,
    pattern_index: usize,
    /// Index handed to the pattern for the last issued move, `None` before
    /// the first one
    stroke_index: Option<u32>,
    command: StrokeCommand,
    /// A pattern is running
    active: bool,
    /// Recompute the move in flight on the next tick
    apply_update: bool,
    sensation: f32,
    watchdog: HeartbeatWatchdog,
    notifications: Deque<Notification, NOTIFICATION_CAPACITY>,
}

impl<'p, M: RawMutex, A: Actuator> StrokeEngine<'p, M, A> {
    /// Attach an actuator and set up factory defaults
    ///
    /// Depth and both travel limits start at the actuator's full travel and
    /// the velocity limit at its maximum speed. `profile` holds the main
    /// motion and must not be the one the actuator moves on.
    pub fn new(
        actuator: A,
        profile: &'p SharedProfile<M>,
        registry: PatternRegistry,
        now_ms: u64,
    ) -> Result<Self, EngineError> {
        if actuator.drives_profile(profile) {
            warn!("engine: actuator moves on the plan profile");
            return Err(EngineError::PlanProfileShared);
        }
        profile.reset_to(actuator.get_position(now_ms), now_ms);

        let limits = actuator.limits();
        let mut guard = SafetyGuard::new();
        guard.begin(
            limits,
            GuardSetup {
                depth: limits.max_position,
                stroke: FACTORY_STROKE_MM,
                rate: FACTORY_RATE,
                depth_limit: limits.max_position,
                stroke_limit: limits.max_position,
                rate_limit: FACTORY_MAX_RATE,
                velocity_limit: limits.max_speed,
                ease_in_speed: FACTORY_EASE_IN_VELOCITY,
            },
        );
        guard.set_vibration_amplitude(FACTORY_VIBRATION_AMPLITUDE_MM);
        guard.set_vibration_frequency(FACTORY_VIBRATION_FREQUENCY_HZ);

        let mut ease_in = EaseInModifier::new();
        ease_in.begin(&guard);

        let (pattern_index, pattern) = match registry
            .index_of(FACTORY_PATTERN)
            .and_then(|index| registry.create(index).map(|p| (index, p)))
        {
            Some(selected) => selected,
            None => (0, AnyPattern::TeasingPounding(TeasingPounding::new())),
        };

        let mut engine = Self {
            actuator,
            profile,
            guard,
            ease_in,
            vibration: VibrationModifier::new(),
            registry,
            pattern,
            pattern_index,
            stroke_index: None,
            command: StrokeCommand::Stop,
            active: false,
            apply_update: false,
            sensation: FACTORY_SENSATION,
            watchdog: HeartbeatWatchdog::default(),
            notifications: Deque::new(),
        };
        engine.send_parameters_to_pattern();

        info!(
            "engine: attached, travel {=f32} mm, pattern {=str}",
            limits.max_position,
            engine.pattern.name()
        );
        Ok(engine)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Execute a stroke command
    ///
    /// Only `Stop` is accepted while the actuator is not active.
    ///
    /// # Returns
    /// `true` if the command was accepted
    pub fn run_command(&mut self, command: StrokeCommand, now_ms: u64) -> bool {
        if !self.actuator.is_active() && command != StrokeCommand::Stop {
            warn!("engine: {=str} refused, actuator not active", command.name());
            return false;
        }

        if !command.is_supported() {
            warn!("engine: no motion source for {=str}", command.name());
        }

        self.apply_event(CommandEvent::Requested(command));
        match self.command {
            StrokeCommand::Retract | StrokeCommand::Depth | StrokeCommand::Stroke => {
                if self.active {
                    self.stop_motion(now_ms);
                }
                self.update_fixed_position(now_ms);
            }
            StrokeCommand::Pattern => self.start_pattern(now_ms),
            StrokeCommand::Stop => self.stop_motion(now_ms),
            StrokeCommand::StrokeStream | StrokeCommand::PositionStream => {
                if self.active {
                    self.stop_motion(now_ms);
                }
            }
        }
        true
    }

    pub fn get_command(&self) -> StrokeCommand {
        self.command
    }

    /// Check if a pattern is running
    pub fn is_active(&self) -> bool {
        self.active
    }

    // ========================================================================
    // Parameters and limits
    // ========================================================================

    /// Change a setpoint
    ///
    /// # Returns
    /// The value that took effect after clamping
    pub fn set_parameter(&mut self, parameter: StrokeParameter, value: f32, now_ms: u64) -> f32 {
        let sanitized = match parameter {
            StrokeParameter::Rate => self.guard.set_rate(value),
            StrokeParameter::Depth => {
                let depth = self.guard.set_depth(value);
                self.ease_in.set_depth(depth, now_ms);
                self.sync_ease_in_stroke(now_ms);
                depth
            }
            StrokeParameter::Stroke => {
                let stroke = self.guard.set_stroke(value);
                self.ease_in.set_stroke(stroke, now_ms);
                stroke
            }
            StrokeParameter::Sensation => {
                if value.is_finite() {
                    self.sensation = constrain(value, SENSATION_MIN, SENSATION_MAX);
                }
                debug!("engine: sensation {=f32}", self.sensation);
                self.sensation
            }
        };

        self.send_parameters_to_pattern();
        if matches!(parameter, StrokeParameter::Depth | StrokeParameter::Stroke)
            && self.command.is_fixed_move()
        {
            self.update_fixed_position(now_ms);
        }
        self.note_restriction(value, sanitized);
        sanitized
    }

    pub fn get_parameter(&self, parameter: StrokeParameter) -> f32 {
        match parameter {
            StrokeParameter::Rate => self.guard.get_rate(),
            StrokeParameter::Depth => self.guard.get_depth(),
            StrokeParameter::Stroke => self.guard.get_stroke(),
            StrokeParameter::Sensation => self.sensation,
        }
    }

    /// Change a machine limit
    ///
    /// Setpoints above the new limit are pulled down with it.
    ///
    /// # Returns
    /// The limit that took effect after clamping
    pub fn set_limit(&mut self, limit: StrokeLimit, value: f32, now_ms: u64) -> f32 {
        let sanitized = match limit {
            StrokeLimit::Rate => self.guard.set_rate_limit(value),
            StrokeLimit::Velocity => {
                let velocity = self.guard.set_velocity_limit(value);
                self.ease_in.set_velocity_limit(velocity);
                if self.ease_in.get_ease_in_speed() != self.guard.get_ease_in_speed() {
                    self.ease_in
                        .set_ease_in_speed(self.guard.get_ease_in_speed(), now_ms);
                }
                velocity
            }
            StrokeLimit::Depth => {
                let depth_limit = self.guard.set_depth_limit(value);
                self.sync_ease_in_depth(now_ms);
                self.sync_ease_in_stroke(now_ms);
                depth_limit
            }
            StrokeLimit::Stroke => {
                let stroke_limit = self.guard.set_stroke_limit(value);
                self.sync_ease_in_stroke(now_ms);
                stroke_limit
            }
        };

        self.send_parameters_to_pattern();
        self.note_restriction(value, sanitized);
        sanitized
    }

    pub fn get_limit(&self, limit: StrokeLimit) -> f32 {
        match limit {
            StrokeLimit::Rate => self.guard.get_rate_limit(),
            StrokeLimit::Velocity => self.guard.get_velocity_limit(),
            StrokeLimit::Depth => self.guard.get_depth_limit(),
            StrokeLimit::Stroke => self.guard.get_stroke_limit(),
        }
    }

    /// Change the speed of fixed moves and setpoint easing
    pub fn set_ease_in_velocity(&mut self, velocity: f32, now_ms: u64) -> f32 {
        let sanitized = self.guard.set_ease_in_speed(velocity);
        self.ease_in.set_ease_in_speed(sanitized, now_ms);
        self.note_restriction(velocity, sanitized);
        sanitized
    }

    pub fn get_ease_in_velocity(&self) -> f32 {
        self.guard.get_ease_in_speed()
    }

    /// Change the vibration superimposed on pattern moves
    ///
    /// Takes effect with the next move. With the manual override on, the
    /// amplitude is not limited by the stroke.
    ///
    /// # Returns
    /// The amplitude and frequency that took effect
    pub fn set_vibration(&mut self, amplitude: f32, frequency: f32) -> (f32, f32) {
        let guarded = (
            self.guard.set_vibration_amplitude(amplitude),
            self.guard.set_vibration_frequency(frequency),
        );
        let manual = (
            self.vibration.set_vibration_amplitude(amplitude),
            self.vibration.set_vibration_frequency(frequency),
        );
        let (amplitude_used, frequency_used) = if self.vibration.is_manual_override() {
            manual
        } else {
            guarded
        };
        self.note_restriction(amplitude, amplitude_used);
        self.note_restriction(frequency, frequency_used);
        (amplitude_used, frequency_used)
    }

    /// Vibrate with the last requested values even where the stroke would
    /// limit the amplitude
    pub fn set_vibration_override(&mut self, enabled: bool) {
        self.vibration.manual_override(enabled);
    }

    /// Recompute the move in flight on the next tick instead of waiting for
    /// it to finish
    pub fn apply_changes_now(&mut self) {
        self.apply_update = true;
    }

    // ========================================================================
    // Patterns
    // ========================================================================

    /// Select a pattern by registry index
    ///
    /// The pattern starts from a fresh instance. Unknown indices keep the
    /// current pattern.
    pub fn set_pattern(&mut self, index: usize, apply_now: bool) -> bool {
        let Some(pattern) = self.registry.create(index) else {
            warn!("engine: no pattern at index {=usize}", index);
            return false;
        };

        self.pattern = pattern;
        self.pattern_index = index;
        self.send_parameters_to_pattern();
        self.stroke_index = Some(0);
        // Only a running pattern has a move in flight to recompute
        self.apply_update = apply_now && self.command.is_stroking();
        info!("engine: pattern {=str}", self.pattern.name());
        true
    }

    pub fn set_pattern_by_name(&mut self, name: &str, apply_now: bool) -> bool {
        match self.registry.index_of(name) {
            Some(index) => self.set_pattern(index, apply_now),
            None => false,
        }
    }

    pub fn get_current_pattern(&self) -> usize {
        self.pattern_index
    }

    pub fn get_current_pattern_name(&self) -> &'static str {
        self.pattern.name()
    }

    pub fn get_pattern_name(&self, index: usize) -> &'static str {
        self.registry.name(index).unwrap_or(INVALID_PATTERN_NAME)
    }

    pub fn get_number_of_patterns(&self) -> usize {
        self.registry.len()
    }

    // ========================================================================
    // Watchdog
    // ========================================================================

    pub fn set_watchdog_mode(&mut self, mode: WatchdogMode) {
        self.watchdog.set_mode(mode);
    }

    pub fn heartbeat(&mut self, client_id: &str, now_ms: u64) -> Result<(), WatchdogError> {
        self.watchdog.heartbeat(client_id, now_ms)
    }

    pub fn remove_client(&mut self, client_id: &str) {
        self.watchdog.remove_client(client_id);
    }

    pub fn watchdog(&self) -> &HeartbeatWatchdog {
        &self.watchdog
    }

    // ========================================================================
    // Control loop
    // ========================================================================

    /// Run one control loop iteration
    pub fn tick(&mut self, now_ms: u64) {
        if self.watchdog.check(now_ms) == WatchdogStatus::Tripped {
            warn!("engine: heartbeat lost, stopping");
            self.fault(StopReason::HeartbeatLost, now_ms);
            self.notify(Notification::HeartbeatLost);
            return;
        }

        if !self.active {
            return;
        }

        if !self.actuator.is_active() {
            warn!("engine: actuator no longer active, stopping");
            self.fault(StopReason::MotorError, now_ms);
            self.notify(Notification::MotorError);
            return;
        }

        let completed = self.main_motion_completed(now_ms);
        if self.apply_update && !completed {
            let index = self.stroke_index.unwrap_or(0);
            let request = self.pattern.next_target(index, now_ms);
            if !request.skip {
                self.replan(&request, now_ms);
            }
        } else if completed {
            let index = self.stroke_index.map_or(0, |i| i.wrapping_add(1));
            let request = self.pattern.next_target(index, now_ms);
            if request.skip {
                trace!("engine: stroke {=u32} skipped", index);
            } else {
                self.stroke_index = Some(index);
                self.issue_stroke(&request, now_ms);
            }
        }
        self.apply_update = false;

        if self.vibration.is_active() {
            self.vibration
                .poll(self.profile, &mut self.actuator, now_ms);
        }
    }

    /// Oldest pending notification
    pub fn take_notification(&mut self) -> Option<Notification> {
        self.notifications.pop_front()
    }

    pub fn telemetry(&self, now_ms: u64) -> Telemetry {
        Telemetry {
            position: self.actuator.get_position(now_ms),
            speed: self.actuator.get_speed(now_ms),
            homed: self.actuator.is_homed(),
            error: self.actuator.has_error(),
            active: self.active,
            command: self.command,
            pattern_index: self.pattern_index,
        }
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    pub fn guard(&self) -> &SafetyGuard {
        &self.guard
    }

    pub fn ease_in(&self) -> &EaseInModifier {
        &self.ease_in
    }

    pub fn vibration(&self) -> &VibrationModifier {
        &self.vibration
    }

    pub fn profile(&self) -> &'p SharedProfile<M> {
        self.profile
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn send_parameters_to_pattern(&mut self) {
        self.pattern.set_time_of_stroke(self.guard.get_time_of_stroke());
        self.pattern.set_stroke(self.guard.get_stroke());
        self.pattern.set_sensation(self.sensation);
    }

    /// Follow a stroke the guard pulled down
    fn sync_ease_in_stroke(&mut self, now_ms: u64) {
        let stroke = self.guard.get_stroke();
        if self.ease_in.stroke_ramp().target != stroke {
            self.ease_in.set_stroke(stroke, now_ms);
        }
    }

    /// Follow a depth the guard pulled down
    fn sync_ease_in_depth(&mut self, now_ms: u64) {
        let depth = self.guard.get_depth();
        if self.ease_in.depth_ramp().target != depth {
            self.ease_in.set_depth(depth, now_ms);
        }
    }

    fn note_restriction(&mut self, requested: f32, used: f32) {
        if requested != used {
            debug!("engine: {=f32} restricted to {=f32}", requested, used);
            self.notify(Notification::ParameterRestricted);
        }
    }

    fn notify(&mut self, notification: Notification) {
        if self.notifications.is_full() {
            self.notifications.pop_front();
        }
        let _ = self.notifications.push_back(notification);
    }

    fn main_motion_completed(&self, now_ms: u64) -> bool {
        if self.vibration.is_active() {
            self.vibration.motion_completed(self.profile, now_ms)
        } else {
            self.actuator.motion_completed(now_ms)
        }
    }

    fn fault(&mut self, reason: StopReason, now_ms: u64) {
        self.stop_motion(now_ms);
        self.apply_event(CommandEvent::Fault(reason));
    }

    fn apply_event(&mut self, event: CommandEvent) {
        let next = self.command.transition(event);
        if next != self.command {
            if event.is_client_event() {
                info!("engine: {=str} -> {=str}", self.command.name(), next.name());
            } else {
                warn!("engine: {=str} -> {=str} on fault", self.command.name(), next.name());
            }
        }
        self.command = next;
    }

    /// Stop the pattern and bring the actuator and the plan to rest
    fn stop_motion(&mut self, now_ms: u64) {
        info!("engine: stopping motion");
        self.active = false;
        self.actuator.stop_motion(now_ms);

        let plan = self.profile.snapshot();
        let acceleration = plan.acceleration();
        let stopped = acceleration > 0.0
            && self
                .profile
                .generate(plan.target(), 0.0, acceleration, now_ms)
                .is_ok();
        if !stopped {
            self.profile
                .reset_to(self.profile.sample(now_ms).position, now_ms);
        }
    }

    fn start_pattern(&mut self, now_ms: u64) {
        if !self.actuator.motion_completed(now_ms) {
            self.stop_motion(now_ms);
        }
        self.stroke_index = None;
        self.send_parameters_to_pattern();
        self.active = true;
        info!("engine: starting {=str}", self.pattern.name());
    }

    fn update_fixed_position(&mut self, now_ms: u64) {
        let target = match self.command {
            StrokeCommand::Retract => 0.0,
            StrokeCommand::Depth => self.guard.get_depth(),
            StrokeCommand::Stroke => self.guard.get_depth() - self.guard.get_stroke(),
            _ => return,
        };
        let speed = self.guard.get_ease_in_speed();
        let acceleration = 2.0 * speed;

        info!(
            "engine: fixed move to {=f32} mm @ {=f32} mm/s",
            target,
            speed
        );
        let parameters = SafeStrokeParameters {
            absolute_target_position: target,
            stroke_length: self.guard.get_stroke(),
            speed,
            acceleration,
            vibration_frequency: 0.0,
            vibration_amplitude: 0.0,
        };
        if self.plan(&parameters, now_ms) {
            self.dispatch(&parameters, now_ms);
        }
    }

    /// Recompute the move in flight without easing
    fn replan(&mut self, request: &MotionRequest, now_ms: u64) {
        let mut parameters = self
            .guard
            .make_safe_request(request, self.actuator.motion(now_ms));
        self.vibration
            .apply_vibration_modification(&mut parameters, self.command, now_ms);
        if self.plan(&parameters, now_ms) && !self.vibration.is_active() {
            self.dispatch(&parameters, now_ms);
        }
    }

    fn issue_stroke(&mut self, request: &MotionRequest, now_ms: u64) {
        let mut parameters = self
            .guard
            .make_safe_request(request, self.actuator.motion(now_ms));

        if let Err(e) = self
            .ease_in
            .apply_modification(&mut parameters, self.profile, now_ms)
        {
            warn!("engine: move not planned: {}", e);
            return;
        }

        self.vibration
            .apply_vibration_modification(&mut parameters, self.command, now_ms);
        if !self.vibration.is_active() {
            self.dispatch(&parameters, now_ms);
        }
    }

    fn plan(&self, parameters: &SafeStrokeParameters, now_ms: u64) -> bool {
        match self.profile.generate(
            parameters.absolute_target_position,
            parameters.speed,
            parameters.acceleration,
            now_ms,
        ) {
            Ok(()) => true,
            Err(e) => {
                warn!("engine: move not planned: {}", e);
                false
            }
        }
    }

    fn dispatch(&mut self, parameters: &SafeStrokeParameters, now_ms: u64) {
        trace!(
            "engine: move to {=f32} mm @ {=f32} mm/s, {=f32} mm/s²",
            parameters.absolute_target_position,
            parameters.speed,
            parameters.acceleration
        );
        if let Err(e) = self.actuator.go_to_position(
            parameters.absolute_target_position,
            parameters.speed,
            parameters.acceleration,
            now_ms,
        ) {
            warn!("engine: actuator rejected move: {}", e);
            self.notify(Notification::MoveRejected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::TrapezoidalProfile;
    use crate::traits::{ActuatorError, ActuatorLimits};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    /// Actuator following its own profile
    struct SimActuator {
        enabled: bool,
        homed: bool,
        profile: TrapezoidalProfile,
        moves: usize,
        stops: usize,
        reject: bool,
    }

    impl SimActuator {
        fn ready() -> Self {
            Self {
                enabled: true,
                homed: true,
                profile: TrapezoidalProfile::at_rest(0.0, 0),
                moves: 0,
                stops: 0,
                reject: false,
            }
        }
    }

    impl Actuator for SimActuator {
        fn enable(&mut self) {
            self.enabled = true;
        }
        fn disable(&mut self) {
            self.enabled = false;
        }
        fn is_enabled(&self) -> bool {
            self.enabled
        }
        fn home(&mut self, now_ms: u64) {
            self.homed = true;
            self.profile.reset_to(0.0, now_ms);
        }
        fn is_homed(&self) -> bool {
            self.homed
        }
        fn limits(&self) -> ActuatorLimits {
            ActuatorLimits {
                max_position: 150.0,
                max_speed: 1000.0,
                max_acceleration: 10_000.0,
            }
        }
        fn go_to_position(
            &mut self,
            position: f32,
            speed: f32,
            acceleration: f32,
            now_ms: u64,
        ) -> Result<(), ActuatorError> {
            if self.reject {
                return Err(ActuatorError::Fault);
            }
            self.profile
                .generate(position, speed, acceleration, now_ms)
                .map_err(|_| ActuatorError::InvalidMotion)?;
            self.moves += 1;
            Ok(())
        }
        fn stop_motion(&mut self, now_ms: u64) {
            self.stops += 1;
            let position = self.profile.sample(now_ms).position;
            self.profile.reset_to(position, now_ms);
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
            self.profile.acceleration()
        }
        fn has_error(&self) -> bool {
            false
        }
    }

    fn engine(profile: &SharedProfile<NoopRawMutex>) -> StrokeEngine<'_, NoopRawMutex, SimActuator> {
        StrokeEngine::new(SimActuator::ready(), profile, PatternRegistry::standard(), 0).unwrap()
    }

    /// Tick every loop period until `until_ms`
    fn run(engine: &mut StrokeEngine<'_, NoopRawMutex, SimActuator>, from_ms: u64, until_ms: u64) {
        let mut now = from_ms;
        while now <= until_ms {
            engine.tick(now);
            now += crate::config::LOOP_PERIOD_MS as u64;
        }
    }

    #[test]
    fn test_factory_state() {
        let profile = SharedProfile::new();
        let engine = engine(&profile);
        assert_eq!(engine.get_command(), StrokeCommand::Stop);
        assert!(!engine.is_active());
        assert_eq!(engine.get_parameter(StrokeParameter::Depth), 150.0);
        assert_eq!(engine.get_parameter(StrokeParameter::Stroke), 80.0);
        assert_eq!(engine.get_parameter(StrokeParameter::Rate), 30.0);
        assert_eq!(engine.get_limit(StrokeLimit::Velocity), 1000.0);
        assert_eq!(engine.get_limit(StrokeLimit::Rate), 240.0);
        assert_eq!(engine.get_ease_in_velocity(), 20.0);
        assert_eq!(engine.get_current_pattern_name(), "PoundingTeasing");
        assert_eq!(engine.get_number_of_patterns(), 7);
    }

    #[test]
    fn test_commands_need_active_actuator() {
        let profile: SharedProfile<NoopRawMutex> = SharedProfile::new();
        let mut actuator = SimActuator::ready();
        actuator.homed = false;
        let mut engine =
            StrokeEngine::new(actuator, &profile, PatternRegistry::standard(), 0).unwrap();

        assert!(!engine.run_command(StrokeCommand::Pattern, 0));
        assert!(!engine.run_command(StrokeCommand::Retract, 0));
        assert!(!engine.is_active());
        assert!(engine.run_command(StrokeCommand::Stop, 0));
        assert_eq!(engine.get_command(), StrokeCommand::Stop);
    }

    #[test]
    fn test_fixed_moves() {
        let profile = SharedProfile::new();
        let mut engine = engine(&profile);
        engine.set_parameter(StrokeParameter::Depth, 100.0, 0);
        engine.set_parameter(StrokeParameter::Stroke, 60.0, 0);

        assert!(engine.run_command(StrokeCommand::Depth, 0));
        assert_eq!(engine.get_command(), StrokeCommand::Depth);
        assert_eq!(engine.actuator().profile.target(), 100.0);
        // Ease-in speed with twice its value as acceleration
        assert_eq!(engine.actuator().profile.acceleration(), 40.0);

        assert!(engine.run_command(StrokeCommand::Stroke, 100));
        assert_eq!(engine.actuator().profile.target(), 40.0);

        assert!(engine.run_command(StrokeCommand::Retract, 200));
        assert_eq!(engine.actuator().profile.target(), 0.0);
        assert!(!engine.is_active());
    }

    #[test]
    fn test_depth_change_follows_fixed_move() {
        let profile = SharedProfile::new();
        let mut engine = engine(&profile);
        engine.run_command(StrokeCommand::Depth, 0);
        engine.set_parameter(StrokeParameter::Depth, 90.0, 50);
        assert_eq!(engine.actuator().profile.target(), 90.0);
    }

    #[test]
    fn test_streaming_commands_fall_back_to_stop() {
        let profile = SharedProfile::new();
        let mut engine = engine(&profile);
        engine.run_command(StrokeCommand::Pattern, 0);
        assert!(engine.run_command(StrokeCommand::StrokeStream, 10));
        assert_eq!(engine.get_command(), StrokeCommand::Stop);
        assert!(!engine.is_active());

        assert!(engine.run_command(StrokeCommand::PositionStream, 20));
        assert_eq!(engine.get_command(), StrokeCommand::Stop);
    }

    #[test]
    fn test_pattern_strokes_between_depth_and_outer_end() {
        let profile = SharedProfile::new();
        let mut engine = engine(&profile);
        engine.set_parameter(StrokeParameter::Rate, 120.0, 0);
        assert!(engine.run_command(StrokeCommand::Pattern, 0));
        assert!(engine.is_active());

        // First move goes in to the depth
        engine.tick(0);
        assert_eq!(engine.stroke_index, Some(0));
        assert_eq!(profile.snapshot().target(), 150.0);

        let mut now = 0;
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        while now < 5_000 {
            now += 10;
            engine.tick(now);
            // Skip the approach from the rest position
            if now >= 1_000 {
                let position = engine.actuator().get_position(now);
                min = min.min(position);
                max = max.max(position);
            }
        }
        assert!(engine.actuator().moves >= 8);
        assert!(min >= 70.0 - 1.0e-2);
        assert!(max <= 150.0 + 1.0e-2);
    }

    #[test]
    fn test_stop_brings_plan_to_rest() {
        let profile = SharedProfile::new();
        let mut engine = engine(&profile);
        engine.run_command(StrokeCommand::Pattern, 0);
        run(&mut engine, 0, 200);

        assert!(engine.run_command(StrokeCommand::Stop, 200));
        assert!(!engine.is_active());
        assert_eq!(engine.actuator().stops, 1);

        let moves = engine.actuator().moves;
        run(&mut engine, 210, 5_000);
        assert_eq!(engine.actuator().moves, moves);
        assert_eq!(profile.sample(5_000).speed, 0.0);
    }

    #[test]
    fn test_stop_n_go_pause_rolls_back_index() {
        let profile = SharedProfile::new();
        let mut engine = engine(&profile);
        assert!(engine.set_pattern_by_name("Stop'n'Go", false));
        engine.set_parameter(StrokeParameter::Rate, 240.0, 0);
        engine.run_command(StrokeCommand::Pattern, 0);

        // One in/out pair, then the pattern pauses
        run(&mut engine, 0, 600);
        let index = engine.stroke_index;
        let moves = engine.actuator().moves;
        assert_eq!(moves, 2);
        run(&mut engine, 610, 650);
        assert_eq!(engine.stroke_index, index);
        assert_eq!(engine.actuator().moves, moves);
    }

    #[test]
    fn test_set_pattern() {
        let profile = SharedProfile::new();
        let mut engine = engine(&profile);
        assert!(engine.set_pattern(3, true));
        assert_eq!(engine.get_current_pattern(), 3);
        assert_eq!(engine.get_current_pattern_name(), "Deeper");
        assert_eq!(engine.stroke_index, Some(0));
        // Stopped: no move in flight to recompute
        assert!(!engine.apply_update);

        engine.run_command(StrokeCommand::Pattern, 0);
        assert!(engine.set_pattern(4, true));
        assert_eq!(engine.get_current_pattern_name(), "Stop'n'Go");
        assert!(engine.apply_update);

        assert!(!engine.set_pattern(7, false));
        assert_eq!(engine.get_current_pattern(), 4);
        assert!(!engine.set_pattern_by_name("Unknown", false));
        assert_eq!(engine.get_pattern_name(7), "Invalid");
        assert_eq!(engine.get_pattern_name(1), "RoboStroke");
    }

    #[test]
    fn test_parameter_restriction_is_notified() {
        let profile = SharedProfile::new();
        let mut engine = engine(&profile);

        assert_eq!(engine.set_parameter(StrokeParameter::Depth, 120.0, 0), 120.0);
        assert_eq!(engine.take_notification(), None);

        assert_eq!(engine.set_parameter(StrokeParameter::Depth, 500.0, 0), 150.0);
        assert_eq!(
            engine.take_notification(),
            Some(Notification::ParameterRestricted)
        );

        assert_eq!(engine.set_parameter(StrokeParameter::Sensation, -300.0, 0), -100.0);
        assert_eq!(engine.get_parameter(StrokeParameter::Sensation), -100.0);
        assert_eq!(
            engine.take_notification(),
            Some(Notification::ParameterRestricted)
        );
    }

    #[test]
    fn test_parameters_reach_pattern() {
        let profile = SharedProfile::new();
        let mut engine = engine(&profile);
        engine.set_parameter(StrokeParameter::Rate, 60.0, 0);
        engine.set_parameter(StrokeParameter::Stroke, 50.0, 0);
        engine.set_parameter(StrokeParameter::Sensation, 40.0, 0);

        let params = engine.pattern.params();
        assert_eq!(params.time_of_stroke, 1.0);
        assert_eq!(params.stroke, 50.0);
        assert_eq!(params.sensation, 40.0);
    }

    #[test]
    fn test_depth_below_stroke_pulls_stroke_ramp() {
        let profile = SharedProfile::new();
        let mut engine = engine(&profile);
        engine.set_parameter(StrokeParameter::Depth, 40.0, 0);
        assert_eq!(engine.get_parameter(StrokeParameter::Stroke), 40.0);
        assert_eq!(engine.ease_in().stroke_ramp().target, 40.0);
    }

    #[test]
    fn test_velocity_limit_pulls_ease_in_speed() {
        let profile = SharedProfile::new();
        let mut engine = engine(&profile);
        assert_eq!(engine.set_limit(StrokeLimit::Velocity, 10.0, 0), 10.0);
        assert_eq!(engine.get_ease_in_velocity(), 10.0);
        assert_eq!(engine.ease_in().get_ease_in_speed(), 10.0);
        assert_eq!(engine.set_ease_in_velocity(50.0, 0), 10.0);
    }

    #[test]
    fn test_notification_queue_drops_oldest() {
        let profile = SharedProfile::new();
        let mut engine = engine(&profile);
        engine.notify(Notification::MotorError);
        for _ in 0..NOTIFICATION_CAPACITY {
            engine.notify(Notification::ParameterRestricted);
        }
        let mut drained = 0;
        while let Some(n) = engine.take_notification() {
            assert_eq!(n, Notification::ParameterRestricted);
            drained += 1;
        }
        assert_eq!(drained, NOTIFICATION_CAPACITY);
    }

    #[test]
    fn test_motor_error_stops_pattern() {
        let profile = SharedProfile::new();
        let mut engine = engine(&profile);
        engine.run_command(StrokeCommand::Pattern, 0);
        run(&mut engine, 0, 100);

        engine.actuator_mut().disable();
        engine.tick(110);
        assert!(!engine.is_active());
        assert_eq!(engine.get_command(), StrokeCommand::Stop);
        assert_eq!(engine.take_notification(), Some(Notification::MotorError));
    }

    #[test]
    fn test_rejected_move_is_notified() {
        let profile = SharedProfile::new();
        let mut engine = engine(&profile);
        engine.actuator_mut().reject = true;
        engine.run_command(StrokeCommand::Pattern, 0);
        engine.tick(0);
        assert_eq!(engine.take_notification(), Some(Notification::MoveRejected));
        assert!(engine.is_active());
    }

    #[test]
    fn test_heartbeat_loss_stops_pattern() {
        let profile = SharedProfile::new();
        let mut engine = engine(&profile);
        engine.set_watchdog_mode(WatchdogMode::Any);
        engine.heartbeat("remote", 0).unwrap();
        engine.run_command(StrokeCommand::Pattern, 0);

        run(&mut engine, 0, 2_000);
        engine.heartbeat("remote", 2_000).unwrap();
        run(&mut engine, 2_010, 5_000);
        assert!(engine.is_active());

        run(&mut engine, 5_010, 5_020);
        assert!(!engine.is_active());
        assert_eq!(engine.get_command(), StrokeCommand::Stop);
        assert_eq!(engine.take_notification(), Some(Notification::HeartbeatLost));
        assert_eq!(engine.watchdog().number_of_clients(), 0);
    }

    #[test]
    fn test_vibration_drives_actuator_every_tick() {
        let profile = SharedProfile::new();
        let mut engine = engine(&profile);
        assert_eq!(engine.set_vibration(2.0, 20.0), (2.0, 20.0));
        engine.run_command(StrokeCommand::Pattern, 0);

        run(&mut engine, 0, 90);
        assert!(engine.vibration().is_active());
        assert_eq!(engine.actuator().moves, 10);
        // Main motion is still the planned stroke
        assert_eq!(profile.snapshot().target(), 150.0);
    }

    #[test]
    fn test_manual_vibration_is_not_limited_by_stroke() {
        let profile = SharedProfile::new();
        let mut engine = engine(&profile);
        engine.set_parameter(StrokeParameter::Stroke, 10.0, 0);

        assert_eq!(engine.set_vibration(25.0, 30.0), (10.0, 30.0));
        assert_eq!(
            engine.take_notification(),
            Some(Notification::ParameterRestricted)
        );

        engine.set_vibration_override(true);
        assert_eq!(engine.set_vibration(25.0, 30.0), (25.0, 30.0));
        assert_eq!(engine.take_notification(), None);
        assert_eq!(engine.guard().get_vibration_amplitude(), 10.0);
    }

    #[test]
    fn test_telemetry() {
        let profile = SharedProfile::new();
        let mut engine = engine(&profile);
        engine.set_pattern(2, false);
        engine.run_command(StrokeCommand::Pattern, 0);
        let telemetry = engine.telemetry(0);
        assert!(telemetry.homed);
        assert!(!telemetry.error);
        assert!(telemetry.active);
        assert_eq!(telemetry.command, StrokeCommand::Pattern);
        assert_eq!(telemetry.pattern_index, 2);
        assert_eq!(telemetry.position, 0.0);
    }
}
