use chrono::NaiveDate;

use crate::catalog::FleetCatalog;
use crate::limits::*;
use crate::model::*;

use super::EngineError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Ms)
        .unwrap_or(0)
}

/// Parse a boundary date in ISO-8601 `YYYY-MM-DD` form.
pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| EngineError::InvalidInterval(format!("{s:?}: {e}")))
}

pub(crate) fn validate_span(start: NaiveDate, end: NaiveDate) -> Result<DateSpan, EngineError> {
    let span = DateSpan::new(start, end).ok_or_else(|| {
        EngineError::InvalidInterval(format!("end {end} is before start {start}"))
    })?;
    if span.days() > MAX_BOOKING_DAYS {
        return Err(EngineError::LimitExceeded("booking too long"));
    }
    Ok(span)
}

/// Everything checkable without touching the store.
pub(crate) fn validate_request(
    catalog: &FleetCatalog,
    request: &ReservationRequest,
) -> Result<(), EngineError> {
    validate_span(request.span.start(), request.span.end())?;
    if request.category.is_empty() || !catalog.contains(&request.category) {
        return Err(EngineError::UnknownCategory(request.category.clone()));
    }
    if request
        .customer
        .fields()
        .iter()
        .any(|(_, v)| v.len() > MAX_CUSTOMER_FIELD_LEN)
    {
        return Err(EngineError::LimitExceeded("customer field too long"));
    }
    Ok(())
}
