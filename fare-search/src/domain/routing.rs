//! Routing data: per-leg directional fare-market paths and candidate schedules.
//!
//! The routing provider hands the search a [`RoutingInput`]; [`RoutingData::build`]
//! validates it once and orders every candidate list by lower bound so that the
//! search can walk them cheapest-first. After construction the data is never
//! mutated, and search nodes refer into it by index.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{DomainError, FareMarket, FareMarketId, Money, Schedule, ScheduleId};

/// Fare construction of one leg: one or two fare markets, each priced with
/// one-way (OW) or half-round-trip (HRT) fares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolutionType {
    Ow,
    Hrt,
    OwOw,
    OwHrt,
    HrtOw,
    HrtHrt,
}

impl SolutionType {
    /// Number of fare markets a path of this type strings together.
    pub fn fare_market_count(self) -> usize {
        match self {
            SolutionType::Ow | SolutionType::Hrt => 1,
            _ => 2,
        }
    }

    /// A two-market path breaks the leg at an intermediate local point.
    pub fn requires_local(self) -> bool {
        self.fare_market_count() > 1
    }

    pub fn label(self) -> &'static str {
        match self {
            SolutionType::Ow => "OW",
            SolutionType::Hrt => "HRT",
            SolutionType::OwOw => "OW_OW",
            SolutionType::OwHrt => "OW_HRT",
            SolutionType::HrtOw => "HRT_OW",
            SolutionType::HrtHrt => "HRT_HRT",
        }
    }
}

impl fmt::Display for SolutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outbound or inbound leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LegIndex {
    Outbound,
    Inbound,
}

impl LegIndex {
    pub const ALL: [LegIndex; 2] = [LegIndex::Outbound, LegIndex::Inbound];

    pub fn index(self) -> usize {
        match self {
            LegIndex::Outbound => 0,
            LegIndex::Inbound => 1,
        }
    }
}

impl fmt::Display for LegIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegIndex::Outbound => f.write_str("outbound"),
            LegIndex::Inbound => f.write_str("inbound"),
        }
    }
}

/// Provider-assigned identifier of a directional fare-market path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathId(pub u32);

/// Dense index of a fare market inside one [`RoutingData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarketRef(u32);

impl MarketRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An ordered sequence of one or two fare-market positions covering a leg.
///
/// Each position carries its candidate fare markets sorted by lower bound,
/// so position candidate 0 is always the cheapest.
#[derive(Debug, Clone)]
pub struct DirectionalPath {
    pub id: PathId,
    pub solution_type: SolutionType,
    positions: Vec<Vec<MarketRef>>,
    lower_bound: Money,
}

impl DirectionalPath {
    pub fn positions(&self) -> &[Vec<MarketRef>] {
        &self.positions
    }

    /// Candidates for one position, cheapest first. Empty if out of range.
    pub fn candidates(&self, position: usize) -> &[MarketRef] {
        self.positions
            .get(position)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Sum of the cheapest candidate per position.
    pub fn lower_bound(&self) -> Money {
        self.lower_bound
    }
}

/// Everything known about one leg.
#[derive(Debug, Clone, Default)]
pub struct LegData {
    paths: Vec<DirectionalPath>,
    schedules: Vec<Schedule>,
}

impl LegData {
    /// Paths sorted by lower bound, then id.
    pub fn paths(&self) -> &[DirectionalPath] {
        &self.paths
    }

    pub fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }

    /// Indices (into [`paths`](Self::paths)) of paths of one solution type,
    /// in ascending lower-bound order.
    pub fn paths_of_type(&self, solution_type: SolutionType) -> Vec<usize> {
        self.paths
            .iter()
            .enumerate()
            .filter(|(_, p)| p.solution_type == solution_type)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Serialized routing input, as produced by the routing data provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingInput {
    pub fare_markets: Vec<FareMarket>,
    pub legs: Vec<LegInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegInput {
    #[serde(default)]
    pub paths: Vec<PathInput>,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathInput {
    pub id: u32,
    pub solution_type: SolutionType,
    /// Candidate fare markets per position.
    pub positions: Vec<Vec<FareMarketId>>,
}

/// Validated, read-only routing data shared by every node of a search.
#[derive(Debug, Clone)]
pub struct RoutingData {
    markets: Vec<FareMarket>,
    by_id: HashMap<FareMarketId, MarketRef>,
    legs: Vec<LegData>,
    schedules: HashMap<ScheduleId, (usize, usize)>,
}

impl RoutingData {
    /// Validate the provider's input and order all candidate lists.
    pub fn build(input: RoutingInput) -> Result<Self, DomainError> {
        if input.legs.is_empty() || input.legs.len() > 2 {
            return Err(DomainError::LegCount(input.legs.len()));
        }

        let mut by_id = HashMap::with_capacity(input.fare_markets.len());
        for (i, fm) in input.fare_markets.iter().enumerate() {
            if by_id.insert(fm.id, MarketRef(i as u32)).is_some() {
                return Err(DomainError::DuplicateFareMarket(fm.id));
            }
        }
        let markets = input.fare_markets;

        let mut schedules = HashMap::new();
        for (leg_idx, leg) in input.legs.iter().enumerate() {
            for (sched_idx, s) in leg.schedules.iter().enumerate() {
                if schedules.insert(s.id, (leg_idx, sched_idx)).is_some() {
                    return Err(DomainError::DuplicateSchedule(s.id));
                }
            }
        }
        for fm in &markets {
            if let Some(unknown) = fm.schedules.iter().find(|s| !schedules.contains_key(s)) {
                return Err(DomainError::UnknownSchedule(*unknown));
            }
        }

        let mut legs = Vec::with_capacity(input.legs.len());
        for leg in input.legs {
            let mut paths = Vec::with_capacity(leg.paths.len());
            for path in leg.paths {
                paths.push(build_path(path, &markets, &by_id)?);
            }
            paths.sort_by_key(|p| (p.lower_bound, p.id));
            legs.push(LegData {
                paths,
                schedules: leg.schedules,
            });
        }

        Ok(Self {
            markets,
            by_id,
            legs,
            schedules,
        })
    }

    /// Every fare market, in input order.
    pub fn fare_markets(&self) -> &[FareMarket] {
        &self.markets
    }

    pub fn market(&self, r: MarketRef) -> &FareMarket {
        &self.markets[r.index()]
    }

    pub fn market_ref(&self, id: FareMarketId) -> Option<MarketRef> {
        self.by_id.get(&id).copied()
    }

    pub fn leg_count(&self) -> usize {
        self.legs.len()
    }

    pub fn leg(&self, leg: LegIndex) -> Option<&LegData> {
        self.legs.get(leg.index())
    }

    pub fn schedule(&self, id: ScheduleId) -> Option<&Schedule> {
        let (leg, idx) = *self.schedules.get(&id)?;
        self.legs.get(leg)?.schedules.get(idx)
    }

    /// Schedules of `leg` that every one of `markets` applies to.
    pub fn applicable_schedules(&self, leg: LegIndex, markets: &[MarketRef]) -> Vec<&Schedule> {
        let Some(data) = self.leg(leg) else {
            return Vec::new();
        };
        data.schedules
            .iter()
            .filter(|s| markets.iter().all(|m| self.market(*m).applies_to(s.id)))
            .collect()
    }
}

fn build_path(
    path: PathInput,
    markets: &[FareMarket],
    by_id: &HashMap<FareMarketId, MarketRef>,
) -> Result<DirectionalPath, DomainError> {
    let expected = path.solution_type.fare_market_count();
    if path.positions.len() != expected {
        return Err(DomainError::PathShape {
            path: path.id,
            expected,
            found: path.positions.len(),
        });
    }

    let mut positions = Vec::with_capacity(expected);
    let mut lower_bound = Money::ZERO;
    for ids in path.positions {
        if ids.is_empty() {
            return Err(DomainError::EmptyPosition(path.id));
        }
        let mut refs = ids
            .into_iter()
            .map(|id| by_id.get(&id).copied().ok_or(DomainError::UnknownFareMarket(id)))
            .collect::<Result<Vec<_>, _>>()?;
        refs.sort_by_key(|r| {
            let fm = &markets[r.index()];
            (fm.lower_bound, fm.id)
        });
        refs.dedup();
        lower_bound += markets[refs[0].index()].lower_bound;
        positions.push(refs);
    }

    Ok(DirectionalPath {
        id: PathId(path.id),
        solution_type: path.solution_type,
        positions,
        lower_bound,
    })
}
