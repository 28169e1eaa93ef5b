use std::collections::HashMap;
use std::str::FromStr;

use rand::Rng;

use crate::catalog::FleetUnit;
use crate::model::*;

/// Rule for choosing among units that are free for the whole span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AllocationPolicy {
    /// Earliest unit in catalog order. Deterministic.
    #[default]
    FirstFit,
    /// Uniformly random free unit.
    RandomFit,
}

impl AllocationPolicy {
    pub fn pick<'a, R: Rng + ?Sized>(
        &self,
        candidates: &[&'a FleetUnit],
        rng: &mut R,
    ) -> Option<&'a FleetUnit> {
        match self {
            AllocationPolicy::FirstFit => candidates.first().copied(),
            AllocationPolicy::RandomFit if candidates.is_empty() => None,
            AllocationPolicy::RandomFit => Some(candidates[rng.gen_range(0..candidates.len())]),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationPolicy::FirstFit => "first-fit",
            AllocationPolicy::RandomFit => "random-fit",
        }
    }
}

impl FromStr for AllocationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first-fit" | "first_fit" | "first" => Ok(AllocationPolicy::FirstFit),
            "random-fit" | "random_fit" | "random" => Ok(AllocationPolicy::RandomFit),
            other => Err(format!("unknown allocation policy: {other}")),
        }
    }
}

/// Group committed reservations into per-unit schedules sorted by start.
pub fn unit_schedules(existing: &[Reservation]) -> HashMap<UnitId, UnitSchedule> {
    let mut schedules: HashMap<UnitId, UnitSchedule> = HashMap::new();
    for r in existing {
        schedules.entry(r.unit_id).or_default().insert(r.span);
    }
    schedules
}

/// Units with no reservation overlapping `span`, in catalog order.
pub fn free_units<'a>(
    units: &'a [FleetUnit],
    existing: &[Reservation],
    span: &DateSpan,
) -> Vec<&'a FleetUnit> {
    let schedules = unit_schedules(existing);
    units
        .iter()
        .filter(|u| schedules.get(&u.id).is_none_or(|s| s.is_free(span)))
        .collect()
}

/// Choose a unit for `span`, or `None` when every unit is busy.
pub fn resolve<'a, R: Rng + ?Sized>(
    units: &'a [FleetUnit],
    existing: &[Reservation],
    span: &DateSpan,
    policy: AllocationPolicy,
    rng: &mut R,
) -> Option<&'a FleetUnit> {
    if units.is_empty() {
        return None;
    }
    if policy == AllocationPolicy::FirstFit {
        // Short-circuit: stop at the first unit without a conflict.
        let schedules = unit_schedules(existing);
        return units
            .iter()
            .find(|u| schedules.get(&u.id).is_none_or(|s| s.is_free(span)));
    }
    let candidates = free_units(units, existing, span);
    policy.pick(&candidates, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use ulid::Ulid;

    use crate::catalog::FleetCatalog;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn span(a: &str, b: &str) -> DateSpan {
        DateSpan::new(d(a), d(b)).unwrap()
    }

    fn booked(unit_id: UnitId, a: &str, b: &str) -> Reservation {
        Reservation {
            id: Ulid::new(),
            category: "S-Presso".into(),
            unit_id,
            plate: String::new(),
            span: span(a, b),
            created_at: 0,
            customer: Customer::default(),
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    // ── first-fit ─────────────────────────────────────────

    #[test]
    fn no_reservations_returns_first_unit() {
        let catalog = FleetCatalog::builtin();
        let units = catalog.units_of("S-Presso");
        let unit = resolve(units, &[], &span("2024-06-01", "2024-06-05"), AllocationPolicy::FirstFit, &mut rng());
        assert_eq!(unit.unwrap().id, 101);
    }

    #[test]
    fn empty_catalog_returns_none() {
        let unit = resolve(&[], &[], &span("2024-06-01", "2024-06-05"), AllocationPolicy::FirstFit, &mut rng());
        assert!(unit.is_none());
        let unit = resolve(&[], &[], &span("2024-06-01", "2024-06-05"), AllocationPolicy::RandomFit, &mut rng());
        assert!(unit.is_none());
    }

    #[test]
    fn shared_boundary_day_skips_unit() {
        let catalog = FleetCatalog::builtin();
        let units = catalog.units_of("S-Presso");
        let existing = vec![booked(101, "2024-06-01", "2024-06-05")];
        let unit = resolve(units, &existing, &span("2024-06-05", "2024-06-07"), AllocationPolicy::FirstFit, &mut rng());
        assert_eq!(unit.unwrap().id, 102);
    }

    #[test]
    fn next_day_reuses_unit() {
        let catalog = FleetCatalog::builtin();
        let units = catalog.units_of("S-Presso");
        let existing = vec![booked(101, "2024-06-01", "2024-06-05")];
        let unit = resolve(units, &existing, &span("2024-06-06", "2024-06-10"), AllocationPolicy::FirstFit, &mut rng());
        assert_eq!(unit.unwrap().id, 101);
    }

    #[test]
    fn single_day_request_uses_inclusive_check() {
        let catalog = FleetCatalog::builtin();
        let units = catalog.units_of("Volvo");
        let existing = vec![booked(201, "2024-06-05", "2024-06-05")];
        let hit = resolve(units, &existing, &span("2024-06-05", "2024-06-05"), AllocationPolicy::FirstFit, &mut rng());
        assert!(hit.is_none());
        let miss = resolve(units, &existing, &span("2024-06-04", "2024-06-04"), AllocationPolicy::FirstFit, &mut rng());
        assert_eq!(miss.unwrap().id, 201);
    }

    #[test]
    fn all_units_busy_returns_none() {
        let catalog = FleetCatalog::builtin();
        let units = catalog.units_of("S-Presso");
        let existing: Vec<_> = (101..=105)
            .map(|id| booked(id, "2024-06-01", "2024-06-10"))
            .collect();
        let unit = resolve(units, &existing, &span("2024-06-03", "2024-06-04"), AllocationPolicy::FirstFit, &mut rng());
        assert!(unit.is_none());
    }

    #[test]
    fn first_fit_is_deterministic() {
        let catalog = FleetCatalog::builtin();
        let units = catalog.units_of("S-Presso");
        let existing = vec![
            booked(101, "2024-06-01", "2024-06-10"),
            booked(103, "2024-06-01", "2024-06-10"),
        ];
        let q = span("2024-06-02", "2024-06-03");
        for _ in 0..10 {
            let unit = resolve(units, &existing, &q, AllocationPolicy::FirstFit, &mut rand::thread_rng());
            assert_eq!(unit.unwrap().id, 102);
        }
    }

    #[test]
    fn reservations_of_unknown_units_are_ignored() {
        let catalog = FleetCatalog::builtin();
        let units = catalog.units_of("S-Presso");
        let existing = vec![booked(999, "2024-06-01", "2024-06-10")];
        let unit = resolve(units, &existing, &span("2024-06-02", "2024-06-03"), AllocationPolicy::FirstFit, &mut rng());
        assert_eq!(unit.unwrap().id, 101);
    }

    // ── free_units / random-fit ───────────────────────────

    #[test]
    fn free_units_in_catalog_order() {
        let catalog = FleetCatalog::builtin();
        let units = catalog.units_of("S-Presso");
        let existing = vec![
            booked(102, "2024-06-01", "2024-06-10"),
            booked(104, "2024-06-10", "2024-06-12"),
        ];
        let free: Vec<_> = free_units(units, &existing, &span("2024-06-08", "2024-06-10"))
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(free, vec![101, 103, 105]);
    }

    #[test]
    fn random_fit_only_returns_free_units() {
        let catalog = FleetCatalog::builtin();
        let units = catalog.units_of("S-Presso");
        let existing = vec![
            booked(101, "2024-06-01", "2024-06-10"),
            booked(102, "2024-06-01", "2024-06-10"),
            booked(105, "2024-06-01", "2024-06-10"),
        ];
        let q = span("2024-06-05", "2024-06-06");
        let mut rng = rng();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let unit = resolve(units, &existing, &q, AllocationPolicy::RandomFit, &mut rng).unwrap();
            assert!(unit.id == 103 || unit.id == 104, "picked busy unit {}", unit.id);
            seen.insert(unit.id);
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn random_fit_none_when_exhausted() {
        let catalog = FleetCatalog::builtin();
        let units = catalog.units_of("Volvo");
        let existing = vec![booked(201, "2024-06-01", "2024-06-10")];
        let unit = resolve(units, &existing, &span("2024-06-10", "2024-06-11"), AllocationPolicy::RandomFit, &mut rng());
        assert!(unit.is_none());
    }

    #[test]
    fn policy_parsing() {
        assert_eq!("first-fit".parse::<AllocationPolicy>().unwrap(), AllocationPolicy::FirstFit);
        assert_eq!("Random-Fit".parse::<AllocationPolicy>().unwrap(), AllocationPolicy::RandomFit);
        assert!("best-fit".parse::<AllocationPolicy>().is_err());
        assert_eq!(AllocationPolicy::default().as_str(), "first-fit");
    }
}
