use std::collections::HashMap;

use ulid::Ulid;

use crate::catalog::FleetUnit;
use crate::model::*;

use super::availability::{free_units, resolve};
use super::conflict::validate_span;
use super::{Engine, EngineError};

impl Engine {
    /// Which unit a submission would get right now. Takes no lock and writes
    /// nothing, so the answer may be stale by the time anything is submitted.
    pub async fn preview(
        &self,
        category: &str,
        span: DateSpan,
    ) -> Result<Option<FleetUnit>, EngineError> {
        let span = validate_span(span.start(), span.end())?;
        if !self.catalog.contains(category) {
            return Err(EngineError::UnknownCategory(category.to_string()));
        }
        let existing = self.store.all_of(category).await?;
        let mut rng = rand::thread_rng();
        Ok(resolve(
            self.catalog.units_of(category),
            &existing,
            &span,
            self.options.policy,
            &mut rng,
        )
        .cloned())
    }

    /// All units of `category` free for the whole span, in catalog order.
    pub async fn free_units(
        &self,
        category: &str,
        span: DateSpan,
    ) -> Result<Vec<FleetUnit>, EngineError> {
        let span = validate_span(span.start(), span.end())?;
        if !self.catalog.contains(category) {
            return Err(EngineError::UnknownCategory(category.to_string()));
        }
        let existing = self.store.all_of(category).await?;
        Ok(free_units(self.catalog.units_of(category), &existing, &span)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Free unit count per category for the span, in catalog order.
    pub async fn availability(&self, span: DateSpan) -> Result<Vec<(String, usize)>, EngineError> {
        let span = validate_span(span.start(), span.end())?;
        let mut out = Vec::new();
        for category in self.catalog.categories() {
            let existing = self.store.all_of(category).await?;
            let free = free_units(self.catalog.units_of(category), &existing, &span).len();
            out.push((category.to_string(), free));
        }
        Ok(out)
    }

    pub async fn reservations_of(&self, category: &str) -> Result<Vec<Reservation>, EngineError> {
        let mut list = self.store.all_of(category).await?;
        sort_for_ledger(&mut list);
        Ok(list)
    }

    /// Every reservation sorted by start date, ties by creation time.
    pub async fn ledger(&self) -> Result<Vec<Reservation>, EngineError> {
        let mut list = self.store.all().await?;
        sort_for_ledger(&mut list);
        Ok(list)
    }

    /// Pairs of reservations that share a unit and overlap. Always empty
    /// unless the store was written behind the engine's back.
    pub async fn audit_overlaps(&self) -> Result<Vec<(Ulid, Ulid)>, EngineError> {
        let mut by_unit: HashMap<UnitId, Vec<Reservation>> = HashMap::new();
        for r in self.store.all().await? {
            by_unit.entry(r.unit_id).or_default().push(r);
        }
        let mut conflicts = Vec::new();
        for list in by_unit.values_mut() {
            list.sort_by_key(|r| r.span.start());
            for (i, a) in list.iter().enumerate() {
                for b in &list[i + 1..] {
                    if b.span.start() > a.span.end() {
                        break;
                    }
                    conflicts.push((a.id, b.id));
                }
            }
        }
        Ok(conflicts)
    }
}

fn sort_for_ledger(list: &mut [Reservation]) {
    list.sort_by(|a, b| {
        a.span
            .start()
            .cmp(&b.span.start())
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
}
