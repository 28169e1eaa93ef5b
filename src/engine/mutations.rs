use std::time::Instant;

use tracing::{debug, info};
use ulid::Ulid;

use crate::model::*;

use super::availability::resolve;
use super::conflict::{now_ms, parse_date, validate_request, validate_span};
use super::{Engine, EngineError};

impl Engine {
    /// Allocate a unit for `request` and commit the reservation.
    ///
    /// The category lock is held from the store read through the append, so two
    /// submissions for the same category can never pick the same idle unit.
    pub async fn submit(&self, request: ReservationRequest) -> Result<Reservation, EngineError> {
        let started = Instant::now();
        let result = self.submit_inner(request).await;
        let outcome = match &result {
            Ok(_) => "committed",
            Err(e) => e.label(),
        };
        metrics::counter!(crate::observability::SUBMISSIONS_TOTAL, "outcome" => outcome)
            .increment(1);
        metrics::histogram!(crate::observability::SUBMIT_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        result
    }

    /// `submit` with boundary dates in `YYYY-MM-DD` form.
    pub async fn submit_raw(
        &self,
        category: &str,
        start: &str,
        end: &str,
        customer: Customer,
    ) -> Result<Reservation, EngineError> {
        let span = match (parse_date(start), parse_date(end)) {
            (Ok(s), Ok(e)) => validate_span(s, e),
            (Err(e), _) | (_, Err(e)) => Err(e),
        };
        let span = match span {
            Ok(span) => span,
            Err(e) => {
                metrics::counter!(crate::observability::SUBMISSIONS_TOTAL, "outcome" => e.label())
                    .increment(1);
                return Err(e);
            }
        };
        self.submit(ReservationRequest {
            category: category.to_string(),
            span,
            customer,
        })
        .await
    }

    async fn submit_inner(&self, request: ReservationRequest) -> Result<Reservation, EngineError> {
        validate_request(&self.catalog, &request)?;

        let guard = self.lock_category(&request.category).await?;

        let existing = self.store.all_of(&request.category).await?;
        let units = self.catalog.units_of(&request.category);
        let unit = {
            let mut rng = rand::thread_rng();
            resolve(units, &existing, &request.span, self.options.policy, &mut rng).cloned()
        };
        let Some(unit) = unit else {
            debug!(
                category = %request.category,
                start = %request.span.start(),
                end = %request.span.end(),
                "no free unit"
            );
            return Err(EngineError::NoAvailability {
                category: request.category,
            });
        };

        let reservation = Reservation {
            id: Ulid::new(),
            category: request.category,
            unit_id: unit.id,
            plate: unit.plate,
            span: request.span,
            created_at: now_ms(),
            customer: request.customer,
        };

        // The append runs in its own task that owns the lock guard: if our
        // caller is dropped mid-append, the lock stays held until the record
        // is durable and visible.
        let store = self.store.clone();
        let committed = reservation.clone();
        tokio::spawn(async move {
            let _guard = guard;
            store.append(committed).await
        })
        .await
        .map_err(|e| EngineError::Durability(format!("append task failed: {e}")))??;

        info!(
            id = %reservation.id,
            category = %reservation.category,
            unit = reservation.unit_id,
            plate = %reservation.plate,
            start = %reservation.span.start(),
            end = %reservation.span.end(),
            "reservation committed"
        );
        Ok(reservation)
    }
}
