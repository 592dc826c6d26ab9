//! Fare markets as seen by the search: lower bounds and combinability summaries.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{CarrierCode, Money, ScheduleId};

/// External identifier of a fare market, as supplied by the routing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FareMarketId(pub u32);

impl fmt::Display for FareMarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FM{}", self.0)
    }
}

/// Which kinds of fares a market offers.
///
/// The tag flags follow the usual ATPCO owrt indicator: tag 1 fares may be
/// sold one-way or doubled for round trips, tag 2 are round-trip only, tag 3
/// are one-way only. `normal` and `special` record whether the market holds
/// any normal (unrestricted) or special (restricted) fares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FareTags {
    pub tag1: bool,
    pub tag2: bool,
    pub tag3: bool,
    pub normal: bool,
    pub special: bool,
}

impl FareTags {
    /// Tags of a market that only sells normal tag-1 fares.
    pub fn normal_tag1() -> Self {
        Self {
            tag1: true,
            normal: true,
            ..Self::default()
        }
    }

    pub fn has_one_way_fares(&self) -> bool {
        self.tag1 || self.tag3
    }
}

/// Cheapest fare per end-on-end category, precomputed from category 10 rules.
///
/// `None` in either field means the market has no fare of that category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EoeSummary {
    /// Cheapest fare that permits end-on-end combination.
    pub eoe: Option<Money>,
    /// Cheapest fare that may only be combined other than end-on-end.
    pub not_eoe: Option<Money>,
}

/// One fare market available to a leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareMarket {
    pub id: FareMarketId,
    pub governing_carrier: CarrierCode,
    /// Carriers marketing the flights covered by this market. The governing
    /// carrier is implied and need not be repeated.
    #[serde(default)]
    pub marketing_carriers: Vec<CarrierCode>,
    /// Cheapest fare amount in the market.
    pub lower_bound: Money,
    #[serde(default = "FareTags::normal_tag1")]
    pub tags: FareTags,
    /// End-on-end summary, when the provider computed one.
    #[serde(default)]
    pub eoe: Option<EoeSummary>,
    /// Schedules this market applies to; empty means every schedule of the leg.
    #[serde(default)]
    pub schedules: Vec<ScheduleId>,
}

impl FareMarket {
    /// All carriers involved: governing first, then distinct marketing ones.
    pub fn carriers(&self) -> Vec<CarrierCode> {
        let mut carriers = vec![self.governing_carrier];
        for c in &self.marketing_carriers {
            if !carriers.contains(c) {
                carriers.push(*c);
            }
        }
        carriers
    }

    pub fn applies_to(&self, schedule: ScheduleId) -> bool {
        self.schedules.is_empty() || self.schedules.contains(&schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(json: &str) -> FareMarket {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let fm = market(r#"{"id":1,"governing_carrier":"BA","lower_bound":10000}"#);
        assert_eq!(fm.id, FareMarketId(1));
        assert_eq!(fm.tags, FareTags::normal_tag1());
        assert!(fm.eoe.is_none());
        assert!(fm.applies_to(ScheduleId(42)));
    }

    #[test]
    fn carriers_are_distinct_and_governing_first() {
        let fm = market(
            r#"{"id":1,"governing_carrier":"BA","marketing_carriers":["AA","BA","IB"],"lower_bound":1}"#,
        );
        let codes: Vec<_> = fm.carriers().iter().map(|c| c.to_string()).collect();
        assert_eq!(codes, vec!["BA", "AA", "IB"]);
    }

    #[test]
    fn schedule_applicability() {
        let fm = market(r#"{"id":1,"governing_carrier":"BA","lower_bound":1,"schedules":[2,3]}"#);
        assert!(fm.applies_to(ScheduleId(2)));
        assert!(!fm.applies_to(ScheduleId(4)));
    }

    #[test]
    fn display_id() {
        assert_eq!(FareMarketId(12).to_string(), "FM12");
    }
}
