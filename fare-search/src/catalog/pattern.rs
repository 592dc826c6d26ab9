//! Solution patterns: how per-leg solution types compose into pricing units.

use std::fmt;

use crate::domain::{DomainError, FareTags, LegIndex, SolutionType};

/// A fare-market position within the (up to) two legs of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Outbound1,
    Outbound2,
    Inbound1,
    Inbound2,
}

impl Slot {
    pub const ALL: [Slot; 4] = [Slot::Outbound1, Slot::Outbound2, Slot::Inbound1, Slot::Inbound2];

    pub fn new(leg: LegIndex, position: usize) -> Option<Slot> {
        match (leg, position) {
            (LegIndex::Outbound, 0) => Some(Slot::Outbound1),
            (LegIndex::Outbound, 1) => Some(Slot::Outbound2),
            (LegIndex::Inbound, 0) => Some(Slot::Inbound1),
            (LegIndex::Inbound, 1) => Some(Slot::Inbound2),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn leg(self) -> LegIndex {
        match self {
            Slot::Outbound1 | Slot::Outbound2 => LegIndex::Outbound,
            Slot::Inbound1 | Slot::Inbound2 => LegIndex::Inbound,
        }
    }

    /// Position within the leg's directional path.
    pub fn position(self) -> usize {
        match self {
            Slot::Outbound1 | Slot::Inbound1 => 0,
            Slot::Outbound2 | Slot::Inbound2 => 1,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Slot::Outbound1 => "O1",
            Slot::Outbound2 => "O2",
            Slot::Inbound1 => "I1",
            Slot::Inbound2 => "I2",
        };
        f.write_str(s)
    }
}

/// Geometry of a pricing unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PuShape {
    OneWay,
    RoundTrip,
    OriginOpenJaw,
    TurnaroundOpenJaw,
    CircleTrip,
}

impl PuShape {
    fn accepts(self, slot_count: usize) -> bool {
        match self {
            PuShape::OneWay => slot_count == 1,
            PuShape::RoundTrip | PuShape::OriginOpenJaw | PuShape::TurnaroundOpenJaw => {
                slot_count == 2
            }
            PuShape::CircleTrip => (3..=4).contains(&slot_count),
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            PuShape::OneWay => "OW",
            PuShape::RoundTrip => "RT",
            PuShape::OriginOpenJaw => "OOJ",
            PuShape::TurnaroundOpenJaw => "TOJ",
            PuShape::CircleTrip => "CT",
        }
    }
}

/// One pricing unit of a pattern and the slots whose fare markets it combines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingUnitSpec {
    pub shape: PuShape,
    pub slots: Vec<Slot>,
}

/// Combinability-tag rule checked at the Route level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagRule {
    /// Any mix of fares.
    Unrestricted,
    /// Every component must offer a one-way sellable (tag 1 or 3) fare.
    OneWayOnly,
    /// At least one tag-2 fare among the components. For domestic returns
    /// every component must instead offer a tag-1 or tag-2 fare.
    AnyTag2,
    /// Exactly two components, one normal and one special.
    NormalPlusSpecial,
}

impl TagRule {
    pub fn check(self, tags: &[FareTags], domestic: bool) -> bool {
        match self {
            TagRule::Unrestricted => true,
            TagRule::OneWayOnly => tags.iter().all(FareTags::has_one_way_fares),
            TagRule::AnyTag2 if domestic => tags.iter().all(|t| t.tag1 || t.tag2),
            TagRule::AnyTag2 => tags.iter().any(|t| t.tag2),
            TagRule::NormalPlusSpecial => match tags {
                [a, b] => (a.normal && b.special) || (a.special && b.normal),
                _ => false,
            },
        }
    }
}

/// End-on-end indicator a pattern needs from its fare markets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EoeRequirement {
    Any,
    /// Pricing units are joined end-on-end; fares must permit it.
    Required,
    /// Fares must be combinable other than end-on-end.
    Forbidden,
}

/// Stable identifier of a pattern within its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternId(pub u16);

/// A named, legal way of composing outbound/inbound solution types into
/// pricing units.
#[derive(Debug, Clone)]
pub struct Pattern {
    id: PatternId,
    name: String,
    outbound: SolutionType,
    inbound: Option<SolutionType>,
    units: Vec<PricingUnitSpec>,
    tag_rule: TagRule,
    eoe: EoeRequirement,
}

impl Pattern {
    /// Start a pattern with no pricing units. The name is derived from the
    /// solution types; use [`named`](Self::named) to distinguish variants.
    pub fn new(outbound: SolutionType, inbound: Option<SolutionType>) -> Self {
        let name = match inbound {
            Some(i) => format!("{}/{}", outbound, i),
            None => outbound.to_string(),
        };
        Self {
            id: PatternId(0),
            name,
            outbound,
            inbound,
            units: Vec::new(),
            tag_rule: TagRule::Unrestricted,
            eoe: EoeRequirement::Any,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a pricing unit. Patterns with more than one unit default to
    /// requiring end-on-end combinable fares.
    pub fn unit(mut self, shape: PuShape, slots: &[Slot]) -> Self {
        self.units.push(PricingUnitSpec {
            shape,
            slots: slots.to_vec(),
        });
        if self.units.len() > 1 && self.eoe == EoeRequirement::Any {
            self.eoe = EoeRequirement::Required;
        }
        self
    }

    pub fn tag_rule(mut self, rule: TagRule) -> Self {
        self.tag_rule = rule;
        self
    }

    pub fn eoe(mut self, eoe: EoeRequirement) -> Self {
        self.eoe = eoe;
        self
    }

    pub(crate) fn with_id(mut self, id: PatternId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> PatternId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn outbound(&self) -> SolutionType {
        self.outbound
    }

    pub fn inbound(&self) -> Option<SolutionType> {
        self.inbound
    }

    pub fn solution_type(&self, leg: LegIndex) -> Option<SolutionType> {
        match leg {
            LegIndex::Outbound => Some(self.outbound),
            LegIndex::Inbound => self.inbound,
        }
    }

    pub fn leg_count(&self) -> usize {
        if self.inbound.is_some() { 2 } else { 1 }
    }

    pub fn units(&self) -> &[PricingUnitSpec] {
        &self.units
    }

    pub fn required_eoe(&self) -> EoeRequirement {
        self.eoe
    }

    pub fn rule(&self) -> TagRule {
        self.tag_rule
    }

    /// Slots the pattern binds, in left-to-right refinement order.
    pub fn slots(&self) -> Vec<Slot> {
        let mut slots = Vec::with_capacity(4);
        for leg in LegIndex::ALL {
            if let Some(t) = self.solution_type(leg) {
                for pos in 0..t.fare_market_count() {
                    slots.extend(Slot::new(leg, pos));
                }
            }
        }
        slots
    }

    /// True if any leg breaks at an intermediate local point. Such patterns
    /// are dropped once the search degrades to thru-only mode.
    pub fn requires_local(&self) -> bool {
        self.outbound.requires_local() || self.inbound.is_some_and(SolutionType::requires_local)
    }

    /// Route-level gate: the pattern's tag rule over the bound fare markets'
    /// tags, in slot order.
    pub fn validate(&self, bound: &[FareTags], domestic: bool) -> bool {
        bound.len() == self.slots().len() && self.tag_rule.check(bound, domestic)
    }

    /// Check that the pricing units cover every slot exactly once with a
    /// slot count their shape accepts.
    pub fn check_shape(&self) -> Result<(), DomainError> {
        let fail = |reason| DomainError::PatternShape {
            name: self.name.clone(),
            reason,
        };

        if self.units.is_empty() {
            return Err(fail("no pricing units"));
        }

        let expected = self.slots();
        let mut seen = [false; 4];
        for unit in &self.units {
            if !unit.shape.accepts(unit.slots.len()) {
                return Err(fail("pricing unit slot count does not fit its shape"));
            }
            for slot in &unit.slots {
                if !expected.contains(slot) {
                    return Err(fail("pricing unit uses a slot the solution types lack"));
                }
                if std::mem::replace(&mut seen[slot.index()], true) {
                    return Err(fail("slot used twice"));
                }
            }
        }
        if expected.iter().any(|s| !seen[s.index()]) {
            return Err(fail("slot not covered by any pricing unit"));
        }
        Ok(())
    }
}
