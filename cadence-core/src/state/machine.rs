//! Stroke command state
//!
//! What the engine is currently doing with the actuator. The command only
//! ever changes through [`StrokeCommand::transition`].

use super::events::CommandEvent;

/// Stroke commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StrokeCommand {
    /// No motion
    #[default]
    Stop,
    /// Fixed move to the outermost position
    Retract,
    /// Fixed move to the depth
    Depth,
    /// Fixed move to the outer end of the stroke
    Stroke,
    /// Running the selected pattern
    Pattern,
    /// Externally streamed strokes
    StrokeStream,
    /// Externally streamed positions
    PositionStream,
}

impl StrokeCommand {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            StrokeCommand::Stop => "stop",
            StrokeCommand::Retract => "retract",
            StrokeCommand::Depth => "depth",
            StrokeCommand::Stroke => "stroke",
            StrokeCommand::Pattern => "pattern",
            StrokeCommand::StrokeStream => "strokestream",
            StrokeCommand::PositionStream => "positionstream",
        }
    }

    /// Check if the pattern generates moves in this state
    pub fn is_stroking(&self) -> bool {
        matches!(self, StrokeCommand::Pattern)
    }

    /// Check if this is a single move to a fixed position
    pub fn is_fixed_move(&self) -> bool {
        matches!(
            self,
            StrokeCommand::Retract | StrokeCommand::Depth | StrokeCommand::Stroke
        )
    }

    /// Check if the engine can act on this command
    ///
    /// Streaming commands have no motion source in the core.
    pub fn is_supported(&self) -> bool {
        !matches!(
            self,
            StrokeCommand::StrokeStream | StrokeCommand::PositionStream
        )
    }

    /// Process an event and return the next command
    pub fn transition(self, event: CommandEvent) -> Self {
        use CommandEvent::Requested;
        use StrokeCommand::Stop;

        match (self, event) {
            // Faults always stop
            (_, event) if event.is_fault() => Stop,

            (_, Requested(next)) if next.is_supported() => next,

            // Unsupported sources fall back to stop
            _ => Stop,
        }
    }
}
