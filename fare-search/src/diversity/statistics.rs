//! Running statistics over the admitted solution set.

use std::collections::BTreeMap;

use crate::domain::{CarrierCode, DatePair, Money};
use crate::search::{Applicability, Solution};

/// Count and price range of a group of solutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupStats {
    pub count: usize,
    pub min_price: Money,
    pub max_price: Money,
}

impl GroupStats {
    fn new(price: Money) -> Self {
        Self {
            count: 1,
            min_price: price,
            max_price: price,
        }
    }

    fn add(&mut self, price: Money) {
        self.count += 1;
        self.min_price = self.min_price.min(price);
        self.max_price = self.max_price.max(price);
    }
}

/// Aggregates of the admitted solutions, read by the policies and the
/// frontier.
#[derive(Debug, Clone, Default)]
pub struct SearchStatistics {
    total: usize,
    price_sum: i128,
    duration_sum: u64,
    prices: Option<(Money, Money)>,
    min_duration: Option<u32>,
    by_applicability: BTreeMap<Applicability, GroupStats>,
    by_date_pair: BTreeMap<DatePair, GroupStats>,
}

impl SearchStatistics {
    pub fn from_solutions<'s>(solutions: impl IntoIterator<Item = &'s Solution>) -> Self {
        let mut stats = Self::default();
        for s in solutions {
            stats.add(s);
        }
        stats
    }

    pub fn add(&mut self, solution: &Solution) {
        let price = solution.price;
        self.total += 1;
        self.price_sum += price.minor() as i128;
        self.duration_sum += solution.duration_mins as u64;
        self.prices = Some(match self.prices {
            Some((lo, hi)) => (lo.min(price), hi.max(price)),
            None => (price, price),
        });
        self.min_duration = Some(
            self.min_duration
                .map_or(solution.duration_mins, |d| d.min(solution.duration_mins)),
        );
        self.by_applicability
            .entry(solution.applicability)
            .and_modify(|g| g.add(price))
            .or_insert_with(|| GroupStats::new(price));
        self.by_date_pair
            .entry(solution.date_pair)
            .and_modify(|g| g.add(price))
            .or_insert_with(|| GroupStats::new(price));
    }

    /// Number of admitted solutions.
    pub fn total_options(&self) -> usize {
        self.total
    }

    pub fn min_price(&self) -> Option<Money> {
        self.prices.map(|(lo, _)| lo)
    }

    pub fn max_price(&self) -> Option<Money> {
        self.prices.map(|(_, hi)| hi)
    }

    /// Mean price in major units.
    pub fn avg_price(&self) -> Option<f64> {
        (self.total > 0).then(|| self.price_sum as f64 / self.total as f64 / 100.0)
    }

    pub fn min_duration(&self) -> Option<u32> {
        self.min_duration
    }

    /// Mean travel time in minutes.
    pub fn avg_duration(&self) -> Option<f64> {
        (self.total > 0).then(|| self.duration_sum as f64 / self.total as f64)
    }

    pub fn applicability(&self, applicability: &Applicability) -> Option<&GroupStats> {
        self.by_applicability.get(applicability)
    }

    pub fn count_for(&self, applicability: &Applicability) -> usize {
        self.applicability(applicability).map_or(0, |g| g.count)
    }

    pub fn carrier_count(&self, carrier: CarrierCode) -> usize {
        self.count_for(&Applicability::Online(carrier))
    }

    pub fn date_pair(&self, date_pair: &DatePair) -> Option<&GroupStats> {
        self.by_date_pair.get(date_pair)
    }

    pub fn date_pairs(&self) -> impl Iterator<Item = (&DatePair, &GroupStats)> {
        self.by_date_pair.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PatternId;
    use crate::domain::ScheduleId;
    use crate::pricing::PricedFarePath;
    use crate::search::ScheduleCombination;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn solution(id: u32, carrier: &str, price: i64, duration: u32, segments: Vec<u8>) -> Solution {
        let day = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        Solution {
            key: ScheduleCombination(vec![ScheduleId(id)]),
            price: Money::from_major(price),
            applicability: Applicability::Online(CarrierCode::parse(carrier).unwrap()),
            date_pair: DatePair::new(day, None),
            duration_mins: duration,
            segments,
            pattern: PatternId(0),
            fare_path: Arc::new(PricedFarePath::new(vec![])),
        }
    }

    #[test]
    fn empty_statistics() {
        let stats = SearchStatistics::default();
        assert_eq!(stats.total_options(), 0);
        assert_eq!(stats.min_price(), None);
        assert_eq!(stats.avg_price(), None);
        assert_eq!(stats.avg_duration(), None);
    }

    #[test]
    fn aggregates() {
        let solutions = [
            solution(1, "BA", 100, 120, vec![1]),
            solution(2, "BA", 300, 240, vec![2]),
            solution(3, "LH", 200, 180, vec![1, 2]),
        ];
        let stats = SearchStatistics::from_solutions(&solutions);

        assert_eq!(stats.total_options(), 3);
        assert_eq!(stats.min_price(), Some(Money::from_major(100)));
        assert_eq!(stats.max_price(), Some(Money::from_major(300)));
        assert_eq!(stats.avg_price(), Some(200.0));
        assert_eq!(stats.min_duration(), Some(120));
        assert_eq!(stats.avg_duration(), Some(180.0));
        assert_eq!(stats.carrier_count(CarrierCode::parse("BA").unwrap()), 2);
        assert_eq!(stats.count_for(&Applicability::Interline), 0);

        let ba = stats
            .applicability(&Applicability::Online(CarrierCode::parse("BA").unwrap()))
            .unwrap();
        assert_eq!(ba.max_price, Money::from_major(300));
        assert_eq!(stats.date_pairs().count(), 1);
    }
}
