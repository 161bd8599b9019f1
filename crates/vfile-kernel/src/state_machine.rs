use crate::error::StateMachineError;
use crate::types::CellState;

/// Validates a cell lifecycle transition.
///
/// Illegal transitions panic with the `strict-debug` feature; otherwise
/// they are reported as an error.
pub fn validate_transition(from: CellState, to: CellState) -> Result<(), StateMachineError> {
    if allowed(from, to) {
        Ok(())
    } else {
        #[cfg(feature = "strict-debug")]
        panic!("Illegal cell transition attempted: {from:?} -> {to:?}");

        #[cfg(not(feature = "strict-debug"))]
        Err(StateMachineError::IllegalTransition { from, to })
    }
}

pub fn allowed_transitions(from: CellState) -> Vec<CellState> {
    use CellState::*;
    match from {
        Unregistered => vec![Live, Deleted],
        Live => vec![Live, Deleted],
        Deleted => vec![],
    }
}

fn allowed(from: CellState, to: CellState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}

#[cfg(all(test, not(feature = "strict-debug")))]
mod tests {
    use super::*;

    #[test]
    fn rerun_stays_live() {
        assert!(validate_transition(CellState::Live, CellState::Live).is_ok());
    }

    #[test]
    fn deleted_is_terminal() {
        for to in CellState::ALL {
            assert!(validate_transition(CellState::Deleted, to).is_err());
        }
    }

    #[test]
    fn cannot_unregister() {
        assert!(validate_transition(CellState::Live, CellState::Unregistered).is_err());
    }
}
