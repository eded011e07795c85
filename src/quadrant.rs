//! Eisenhower quadrants.
//!
//! A quadrant is derivable from the (urgent, important) flags but is also
//! stored and settable on its own. The two representations are kept in step
//! by the board: flag writes recompute the quadrant, quadrant writes
//! overwrite the flags.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Quadrant {
    /// Urgent and important: do it now.
    DoFirst = 1,
    /// Important, not urgent: schedule it.
    Schedule = 2,
    /// Urgent, not important: delegate it.
    Delegate = 3,
    /// Neither: drop it.
    Eliminate = 4,
}

impl Quadrant {
    pub fn resolve(urgent: bool, important: bool) -> Self {
        match (important, urgent) {
            (true, true) => Quadrant::DoFirst,
            (true, false) => Quadrant::Schedule,
            (false, true) => Quadrant::Delegate,
            (false, false) => Quadrant::Eliminate,
        }
    }

    /// The (urgent, important) flags this quadrant stands for.
    pub fn flags(self) -> (bool, bool) {
        match self {
            Quadrant::DoFirst => (true, true),
            Quadrant::Schedule => (false, true),
            Quadrant::Delegate => (true, false),
            Quadrant::Eliminate => (false, false),
        }
    }

    pub fn number(self) -> u8 {
        self as u8
    }

    /// Zero-based slot, handy for indexing per-quadrant arrays.
    pub fn index(self) -> usize {
        self as usize - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidQuadrant(pub i64);

impl fmt::Display for InvalidQuadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quadrant must be between 1 and 4, got {}", self.0)
    }
}

impl std::error::Error for InvalidQuadrant {}

impl TryFrom<i64> for Quadrant {
    type Error = InvalidQuadrant;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Quadrant::DoFirst),
            2 => Ok(Quadrant::Schedule),
            3 => Ok(Quadrant::Delegate),
            4 => Ok(Quadrant::Eliminate),
            other => Err(InvalidQuadrant(other)),
        }
    }
}

impl TryFrom<u8> for Quadrant {
    type Error = InvalidQuadrant;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Quadrant::try_from(i64::from(n))
    }
}

impl From<Quadrant> for u8 {
    fn from(q: Quadrant) -> u8 {
        q.number()
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_follows_eisenhower_table() {
        assert_eq!(Quadrant::resolve(true, true).number(), 1);
        assert_eq!(Quadrant::resolve(false, true).number(), 2);
        assert_eq!(Quadrant::resolve(true, false).number(), 3);
        assert_eq!(Quadrant::resolve(false, false).number(), 4);
    }

    #[test]
    fn flags_round_trip_for_every_pair() {
        for urgent in [false, true] {
            for important in [false, true] {
                let q = Quadrant::resolve(urgent, important);
                assert_eq!(q.flags(), (urgent, important));
            }
        }
    }

    #[test]
    fn out_of_range_numbers_rejected() {
        assert_eq!(Quadrant::try_from(0i64), Err(InvalidQuadrant(0)));
        assert_eq!(Quadrant::try_from(5i64), Err(InvalidQuadrant(5)));
        assert_eq!(Quadrant::try_from(-1i64), Err(InvalidQuadrant(-1)));
        assert_eq!(Quadrant::try_from(3i64), Ok(Quadrant::Delegate));
    }

    #[test]
    fn serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&Quadrant::Schedule).unwrap(), "2");
        let q: Quadrant = serde_json::from_str("4").unwrap();
        assert_eq!(q, Quadrant::Eliminate);
        assert!(serde_json::from_str::<Quadrant>("7").is_err());
    }
}
