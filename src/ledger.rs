//! Tabular audit view of committed reservations.

use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat};
use serde::Serialize;
use ulid::Ulid;

use crate::model::*;

/// Column order of the ledger.
pub const COLUMNS: [&str; 17] = [
    "booking_id",
    "created_at",
    "name",
    "surname",
    "email",
    "phone",
    "address",
    "pobox",
    "occupation",
    "workplace",
    "additional_driver",
    "start_date",
    "end_date",
    "days",
    "category",
    "unit_id",
    "plate",
];

/// One reservation flattened into the fixed ledger columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRow {
    pub booking_id: Ulid,
    /// RFC 3339, UTC.
    pub created_at: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub pobox: String,
    pub occupation: String,
    pub workplace: String,
    pub additional_driver: String,
    pub start_date: String,
    pub end_date: String,
    pub days: i64,
    pub category: String,
    pub unit_id: UnitId,
    pub plate: String,
}

impl From<&Reservation> for LedgerRow {
    fn from(r: &Reservation) -> Self {
        let created_at = DateTime::from_timestamp_millis(r.created_at)
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_default();
        let c = &r.customer;
        Self {
            booking_id: r.id,
            created_at,
            name: c.name.clone(),
            surname: c.surname.clone(),
            email: c.email.clone(),
            phone: c.phone.clone(),
            address: c.address.clone(),
            pobox: c.pobox.clone().unwrap_or_default(),
            occupation: c.occupation.clone().unwrap_or_default(),
            workplace: c.workplace.clone().unwrap_or_default(),
            additional_driver: c.additional_driver.clone().unwrap_or_default(),
            start_date: r.span.start().format("%Y-%m-%d").to_string(),
            end_date: r.span.end().format("%Y-%m-%d").to_string(),
            days: r.span.days(),
            category: r.category.clone(),
            unit_id: r.unit_id,
            plate: r.plate.clone(),
        }
    }
}

impl LedgerRow {
    /// Cell values in `COLUMNS` order.
    pub fn cells(&self) -> [String; 17] {
        [
            self.booking_id.to_string(),
            self.created_at.clone(),
            self.name.clone(),
            self.surname.clone(),
            self.email.clone(),
            self.phone.clone(),
            self.address.clone(),
            self.pobox.clone(),
            self.occupation.clone(),
            self.workplace.clone(),
            self.additional_driver.clone(),
            self.start_date.clone(),
            self.end_date.clone(),
            self.days.to_string(),
            self.category.clone(),
            self.unit_id.to_string(),
            self.plate.clone(),
        ]
    }
}

/// Tabs and line breaks inside a cell would shift columns.
fn clean_cell(cell: &str) -> String {
    cell.replace(['\t', '\n', '\r'], " ")
}

/// Write a header line and one tab-separated row per reservation, in the given order.
pub fn write_tsv<'a>(
    out: &mut impl Write,
    reservations: impl IntoIterator<Item = &'a Reservation>,
) -> io::Result<()> {
    writeln!(out, "{}", COLUMNS.join("\t"))?;
    for r in reservations {
        let cells = LedgerRow::from(r).cells();
        let line: Vec<String> = cells.iter().map(|c| clean_cell(c)).collect();
        writeln!(out, "{}", line.join("\t"))?;
    }
    Ok(())
}
