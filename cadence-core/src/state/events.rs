//! Events that change the stroke command

use super::machine::StrokeCommand;

/// Reasons the engine stops on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopReason {
    /// Actuator disabled, unhomed or faulted
    MotorError,
    /// Heartbeat watchdog tripped
    HeartbeatLost,
}

/// Events that can change the stroke command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandEvent {
    /// A client asked for a command
    Requested(StrokeCommand),
    /// The engine had to stop
    Fault(StopReason),
}

impl CommandEvent {
    /// Check if this event came from a client
    pub fn is_client_event(&self) -> bool {
        matches!(self, CommandEvent::Requested(_))
    }

    /// Check if this event forces a stop regardless of the current command
    pub fn is_fault(&self) -> bool {
        matches!(self, CommandEvent::Fault(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kinds() {
        let request = CommandEvent::Requested(StrokeCommand::Pattern);
        assert!(request.is_client_event());
        assert!(!request.is_fault());

        let fault = CommandEvent::Fault(StopReason::HeartbeatLost);
        assert!(fault.is_fault());
        assert!(!fault.is_client_event());
    }
}
