//! Human-readable ticket numbers.
//!
//! A number is `#<year>-<seq>` where `seq` is the count of tickets created in
//! that calendar year plus one, zero-padded to three digits. Sequences past
//! 999 simply grow wider.
//!
//! The count-then-write scheme is not serialized against concurrent
//! creations: two tickets created at the same moment can be handed the same
//! number. Stores that enforce uniqueness surface that as a conflict.

use chrono::{DateTime, Datelike, Utc};
use std::fmt;

/// A formatted ticket number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TicketNumber {
    year: i32,
    sequence: u64,
}

impl TicketNumber {
    /// Allocate the number following `created_this_year` existing tickets.
    #[must_use]
    pub const fn allocate(year: i32, created_this_year: u64) -> Self {
        Self {
            year,
            sequence: created_this_year + 1,
        }
    }

    /// Allocate for a ticket created at `at`.
    #[must_use]
    pub fn for_instant(at: DateTime<Utc>, created_this_year: u64) -> Self {
        Self::allocate(at.year(), created_this_year)
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}-{:03}", self.year, self.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_ticket_of_the_year() {
        assert_eq!(TicketNumber::allocate(2025, 0).to_string(), "#2025-001");
    }

    #[test]
    fn pads_to_three_digits_then_grows() {
        assert_eq!(TicketNumber::allocate(2025, 41).to_string(), "#2025-042");
        assert_eq!(TicketNumber::allocate(2025, 999).to_string(), "#2025-1000");
    }
}
