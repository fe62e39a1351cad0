use thiserror::Error;

/// Phases shared by every play session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the player to pick the next clue or make the next guess.
    Board,
    /// A daily double was picked; the stake must be chosen first.
    Wagering,
    /// A clue is open and waiting for its answer.
    Answering,
    /// No further plays are accepted.
    GameOver,
}

/// Events that can be applied to the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// A clue was opened from the board.
    Select {
        /// Whether the clue requires a wager first.
        daily_double: bool,
    },
    /// The wager for an open daily double was placed.
    Wager,
    /// A play was settled. Games without clue selection resolve straight from the board.
    Resolve {
        /// Whether that play exhausted the game.
        finished: bool,
    },
    /// End the game early.
    Finish,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: PhaseEvent,
}

/// Phase tracker that only moves along valid transitions.
#[derive(Debug, Clone)]
pub struct PhaseMachine {
    phase: SessionPhase,
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseMachine {
    /// Create a machine waiting on the board.
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Board,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Whether the session has ended.
    pub fn is_over(&self) -> bool {
        self.phase == SessionPhase::GameOver
    }

    /// Check that `event` is accepted without applying it.
    pub fn ensure(&self, event: PhaseEvent) -> Result<SessionPhase, InvalidTransition> {
        self.compute_transition(event)
    }

    /// Apply `event`, returning the new phase.
    pub fn apply(&mut self, event: PhaseEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        Ok(next)
    }

    fn compute_transition(&self, event: PhaseEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::Board, PhaseEvent::Select { daily_double: true }) => {
                SessionPhase::Wagering
            }
            (SessionPhase::Board, PhaseEvent::Select { daily_double: false }) => {
                SessionPhase::Answering
            }
            (SessionPhase::Wagering, PhaseEvent::Wager) => SessionPhase::Answering,
            (
                SessionPhase::Board | SessionPhase::Answering,
                PhaseEvent::Resolve { finished: false },
            ) => SessionPhase::Board,
            (
                SessionPhase::Board | SessionPhase::Answering,
                PhaseEvent::Resolve { finished: true },
            ) => SessionPhase::GameOver,
            (from, PhaseEvent::Finish) if from != SessionPhase::GameOver => {
                SessionPhase::GameOver
            }
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_board() {
        let machine = PhaseMachine::new();
        assert_eq!(machine.phase(), SessionPhase::Board);
        assert!(!machine.is_over());
    }

    #[test]
    fn daily_double_goes_through_wagering() {
        let mut machine = PhaseMachine::new();

        assert_eq!(
            machine.apply(PhaseEvent::Select { daily_double: true }),
            Ok(SessionPhase::Wagering)
        );
        assert_eq!(machine.apply(PhaseEvent::Wager), Ok(SessionPhase::Answering));
        assert_eq!(
            machine.apply(PhaseEvent::Resolve { finished: false }),
            Ok(SessionPhase::Board)
        );
    }

    #[test]
    fn cannot_answer_while_wagering() {
        let mut machine = PhaseMachine::new();
        machine
            .apply(PhaseEvent::Select { daily_double: true })
            .unwrap();

        let err = machine
            .apply(PhaseEvent::Resolve { finished: false })
            .unwrap_err();
        assert_eq!(err.from, SessionPhase::Wagering);
        assert_eq!(machine.phase(), SessionPhase::Wagering);
    }

    #[test]
    fn game_over_rejects_everything() {
        let mut machine = PhaseMachine::new();
        machine.apply(PhaseEvent::Finish).unwrap();

        for event in [
            PhaseEvent::Select {
                daily_double: false,
            },
            PhaseEvent::Wager,
            PhaseEvent::Resolve { finished: true },
            PhaseEvent::Finish,
        ] {
            assert!(machine.ensure(event).is_err(), "{event:?} accepted");
        }
    }

    #[test]
    fn select_is_rejected_while_a_clue_is_open() {
        let mut machine = PhaseMachine::new();
        machine
            .apply(PhaseEvent::Select {
                daily_double: false,
            })
            .unwrap();

        assert!(
            machine
                .apply(PhaseEvent::Select {
                    daily_double: false
                })
                .is_err()
        );
    }
}
