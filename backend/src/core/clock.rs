//! Simulation clock
//!
//! The simulation operates in whole days, numbered from 1 to `max_day`.
//! The clock only decides which day is "current" and in which direction the
//! last change went; it never runs day transitions itself. Catching up to
//! the current day is the engine's job, done lazily on the next query.

use serde::{Deserialize, Serialize};

use crate::orchestrator::SimulationError;

/// First simulated day
pub const FIRST_DAY: u32 = 1;

/// Direction of the last successful day change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
}

/// Outcome of [`SimulationClock::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockMove {
    /// Day changed in the given direction
    Moved(Direction),
    /// Already at a boundary, nothing changed
    Unchanged,
}

/// Tracks the current simulated day
///
/// # Example
/// ```
/// use bed_occupancy_core::core::{ClockMove, Direction, SimulationClock};
///
/// let mut clock = SimulationClock::new(20);
/// assert_eq!(clock.current_day(), 1);
///
/// assert_eq!(clock.advance(1).unwrap(), ClockMove::Moved(Direction::Forward));
/// assert_eq!(clock.current_day(), 2);
///
/// // Bad deltas are rejected without touching state
/// assert!(clock.advance(3).is_err());
/// assert_eq!(clock.current_day(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationClock {
    current_day: u32,
    last_direction: Direction,
    max_day: u32,
}

impl SimulationClock {
    /// Create a clock positioned on day 1
    pub fn new(max_day: u32) -> Self {
        Self {
            current_day: FIRST_DAY,
            last_direction: Direction::Forward,
            max_day: max_day.max(FIRST_DAY),
        }
    }

    /// Move one day forward (`+1`) or backward (`-1`)
    ///
    /// Moving past `max_day` or before day 1 is a silent no-op.
    pub fn advance(&mut self, delta: i32) -> Result<ClockMove, SimulationError> {
        let direction = match delta {
            1 => Direction::Forward,
            -1 => Direction::Backward,
            _ => {
                return Err(SimulationError::InvalidInput(
                    "Invalid delta value. Use -1 or 1.".to_string(),
                ))
            }
        };

        let movable = match direction {
            Direction::Forward => self.current_day < self.max_day,
            Direction::Backward => self.current_day > FIRST_DAY,
        };
        if !movable {
            return Ok(ClockMove::Unchanged);
        }

        self.current_day = match direction {
            Direction::Forward => self.current_day + 1,
            Direction::Backward => self.current_day - 1,
        };
        self.last_direction = direction;
        Ok(ClockMove::Moved(direction))
    }

    /// Return to day 1
    pub fn reset(&mut self) -> u32 {
        self.current_day = FIRST_DAY;
        self.last_direction = Direction::Forward;
        self.current_day
    }

    pub fn current_day(&self) -> u32 {
        self.current_day
    }

    pub fn last_direction(&self) -> Direction {
        self.last_direction
    }

    pub fn max_day(&self) -> u32 {
        self.max_day
    }

    /// Restore a clock position (snapshot import)
    pub(crate) fn set_position(&mut self, day: u32, direction: Direction) {
        self.current_day = day.clamp(FIRST_DAY, self.max_day);
        self.last_direction = direction;
    }
}
