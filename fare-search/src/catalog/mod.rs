//! The solution catalog: the static registry of legal fare-construction
//! patterns.
//!
//! Built once at startup and shared by reference; nothing in here is mutated
//! after construction.

mod pattern;

pub use crate::domain::SolutionType;
pub use pattern::{EoeRequirement, Pattern, PatternId, PricingUnitSpec, PuShape, Slot, TagRule};

use crate::domain::DomainError;

/// Immutable registry of solution patterns.
#[derive(Debug, Clone)]
pub struct SolutionCatalog {
    patterns: Vec<Pattern>,
}

impl SolutionCatalog {
    /// Build a catalog, assigning ids in insertion order and checking every
    /// pattern's pricing-unit shape.
    pub fn new(patterns: Vec<Pattern>) -> Result<Self, DomainError> {
        let patterns = patterns
            .into_iter()
            .enumerate()
            .map(|(i, p)| p.with_id(PatternId(i as u16)))
            .collect::<Vec<_>>();
        for p in &patterns {
            p.check_shape()?;
        }
        Ok(Self { patterns })
    }

    /// The built-in pattern set for one-way and round-trip shopping.
    pub fn standard() -> Self {
        let patterns = standard_patterns()
            .into_iter()
            .enumerate()
            .map(|(i, p)| p.with_id(PatternId(i as u16)))
            .collect();
        Self { patterns }
    }

    /// All patterns, in id order. Each call starts a fresh iteration.
    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> + Clone {
        self.patterns.iter()
    }

    pub fn pattern(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn standard_patterns() -> Vec<Pattern> {
    use PuShape::*;
    use Slot::*;
    use SolutionType::*;

    vec![
        // One-way trips
        Pattern::new(Ow, None).unit(OneWay, &[Outbound1]),
        Pattern::new(OwOw, None)
            .unit(OneWay, &[Outbound1])
            .unit(OneWay, &[Outbound2]),
        // Round trips priced with one-way fares
        Pattern::new(Ow, Some(Ow))
            .unit(OneWay, &[Outbound1])
            .unit(OneWay, &[Inbound1]),
        Pattern::new(OwOw, Some(Ow))
            .unit(OneWay, &[Outbound1])
            .unit(OneWay, &[Outbound2])
            .unit(OneWay, &[Inbound1]),
        Pattern::new(Ow, Some(OwOw))
            .unit(OneWay, &[Outbound1])
            .unit(OneWay, &[Inbound1])
            .unit(OneWay, &[Inbound2]),
        Pattern::new(OwOw, Some(OwOw))
            .unit(OneWay, &[Outbound1])
            .unit(OneWay, &[Outbound2])
            .unit(OneWay, &[Inbound1])
            .unit(OneWay, &[Inbound2])
            .tag_rule(TagRule::OneWayOnly),
        // Round trips priced with half-round-trip fares
        Pattern::new(Hrt, Some(Hrt)).unit(RoundTrip, &[Outbound1, Inbound1]),
        Pattern::new(Hrt, Some(Hrt))
            .named("HRT/HRT OJ")
            .unit(OriginOpenJaw, &[Outbound1, Inbound1])
            .tag_rule(TagRule::NormalPlusSpecial),
        Pattern::new(HrtHrt, Some(HrtHrt))
            .unit(RoundTrip, &[Outbound1, Inbound2])
            .unit(RoundTrip, &[Outbound2, Inbound1]),
        Pattern::new(HrtHrt, Some(HrtHrt))
            .named("HRT_HRT/HRT_HRT CT")
            .unit(CircleTrip, &[Outbound1, Outbound2, Inbound1, Inbound2])
            .tag_rule(TagRule::AnyTag2),
        Pattern::new(HrtHrt, Some(Hrt)).unit(CircleTrip, &[Outbound1, Outbound2, Inbound1]),
        Pattern::new(Hrt, Some(HrtHrt)).unit(CircleTrip, &[Outbound1, Inbound1, Inbound2]),
        // Mixed one-way and half-round-trip components
        Pattern::new(OwHrt, Some(HrtOw))
            .unit(OneWay, &[Outbound1])
            .unit(RoundTrip, &[Outbound2, Inbound1])
            .unit(OneWay, &[Inbound2]),
        Pattern::new(HrtOw, Some(OwHrt))
            .unit(TurnaroundOpenJaw, &[Outbound1, Inbound2])
            .unit(OneWay, &[Outbound2])
            .unit(OneWay, &[Inbound1]),
        Pattern::new(HrtOw, Some(Hrt))
            .unit(TurnaroundOpenJaw, &[Outbound1, Inbound1])
            .unit(OneWay, &[Outbound2]),
        Pattern::new(Hrt, Some(OwHrt))
            .unit(OriginOpenJaw, &[Outbound1, Inbound2])
            .unit(OneWay, &[Inbound1]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_patterns_are_well_formed() {
        let catalog = SolutionCatalog::new(standard_patterns()).unwrap();
        assert_eq!(catalog.len(), 16);
        assert_eq!(SolutionCatalog::standard().len(), 16);
    }

    #[test]
    fn ids_follow_insertion_order() {
        let catalog = SolutionCatalog::standard();
        for (i, p) in catalog.patterns().enumerate() {
            assert_eq!(p.id(), PatternId(i as u16));
            assert_eq!(catalog.pattern(p.id()).unwrap().name(), p.name());
        }
        assert!(catalog.pattern(PatternId(99)).is_none());
    }

    #[test]
    fn iteration_is_restartable() {
        let catalog = SolutionCatalog::standard();
        let first: Vec<_> = catalog.patterns().map(Pattern::name).collect();
        let second: Vec<_> = catalog.patterns().map(Pattern::name).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_pattern_rejected() {
        let bad = Pattern::new(SolutionType::Ow, Some(SolutionType::Ow))
            .unit(PuShape::OneWay, &[Slot::Outbound1]);
        assert!(matches!(
            SolutionCatalog::new(vec![bad]),
            Err(DomainError::PatternShape { .. })
        ));
    }

    #[test]
    fn single_unit_patterns_accept_any_eoe() {
        let catalog = SolutionCatalog::standard();
        for p in catalog.patterns() {
            if p.units().len() == 1 {
                assert_eq!(p.required_eoe(), EoeRequirement::Any, "{}", p.name());
            } else {
                assert_eq!(p.required_eoe(), EoeRequirement::Required, "{}", p.name());
            }
        }
    }
}
