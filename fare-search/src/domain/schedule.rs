//! Candidate flight schedules and travel date pairs.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::CarrierCode;

/// Identifier of one candidate schedule (an itinerary option) within a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleId(pub u32);

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// One candidate flight schedule covering a single leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    /// Governing carrier of the schedule.
    pub carrier: CarrierCode,
    pub departure: NaiveDate,
    /// Number of flight segments; 1 is a nonstop.
    pub segments: u8,
    pub duration_mins: u32,
}

impl Schedule {
    pub fn is_nonstop(&self) -> bool {
        self.segments <= 1
    }
}

/// Outbound and (optional) inbound departure dates of a solution.
///
/// Alternate-dates shopping partitions its quotas by this pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatePair {
    pub outbound: NaiveDate,
    pub inbound: Option<NaiveDate>,
}

impl DatePair {
    pub fn new(outbound: NaiveDate, inbound: Option<NaiveDate>) -> Self {
        Self { outbound, inbound }
    }
}

impl fmt::Display for DatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inbound {
            Some(inbound) => write!(f, "{}/{}", self.outbound, inbound),
            None => write!(f, "{}", self.outbound),
        }
    }
}
