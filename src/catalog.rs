use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::limits::*;
use crate::model::UnitId;

/// One physical car. Defined at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetUnit {
    pub id: UnitId,
    pub category: String,
    pub plate: String,
}

/// On-disk shape of a fleet file: an ordered list of categories.
#[derive(Debug, Deserialize)]
struct CategorySpec {
    category: String,
    units: Vec<UnitSpec>,
}

#[derive(Debug, Deserialize)]
struct UnitSpec {
    id: UnitId,
    plate: String,
}

/// Read-only registry of categories and their units, in preference order.
#[derive(Debug, Clone, Default)]
pub struct FleetCatalog {
    order: Vec<String>,
    units: HashMap<String, Vec<FleetUnit>>,
}

impl FleetCatalog {
    /// Build a catalog from `(category, [(unit id, plate)])` groups.
    /// Rejects empty or oversized category names and duplicate unit ids.
    pub fn new<C, P>(groups: impl IntoIterator<Item = (C, Vec<(UnitId, P)>)>) -> io::Result<Self>
    where
        C: Into<String>,
        P: Into<String>,
    {
        let mut catalog = Self::default();
        let mut seen_ids = HashSet::new();
        for (category, units) in groups {
            let category: String = category.into();
            if category.is_empty() || category.len() > MAX_CATEGORY_LEN {
                return Err(invalid(format!("invalid category name {category:?}")));
            }
            if catalog.units.contains_key(&category) {
                return Err(invalid(format!("category {category} listed twice")));
            }
            if units.len() > MAX_UNITS_PER_CATEGORY {
                return Err(invalid(format!("too many units in {category}")));
            }
            let mut list = Vec::with_capacity(units.len());
            for (id, plate) in units {
                if !seen_ids.insert(id) {
                    return Err(invalid(format!("duplicate unit id {id}")));
                }
                list.push(FleetUnit {
                    id,
                    category: category.clone(),
                    plate: plate.into(),
                });
            }
            catalog.order.push(category.clone());
            catalog.units.insert(category, list);
        }
        Ok(catalog)
    }

    /// The fleet the rental desk started with.
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        catalog.push_builtin(
            "S-Presso",
            &[
                (101, "N140-374W"),
                (102, "N161-304W"),
                (103, "N150-785W"),
                (104, "N131-797W"),
                (105, "N160-343W"),
            ],
        );
        catalog.push_builtin("Volvo", &[(201, "Ann 8")]);
        catalog
    }

    fn push_builtin(&mut self, category: &str, units: &[(UnitId, &str)]) {
        self.order.push(category.to_string());
        self.units.insert(
            category.to_string(),
            units
                .iter()
                .map(|&(id, plate)| FleetUnit {
                    id,
                    category: category.to_string(),
                    plate: plate.to_string(),
                })
                .collect(),
        );
    }

    /// Load a fleet file:
    /// `[{"category": "Volvo", "units": [{"id": 201, "plate": "Ann 8"}]}]`.
    pub fn from_json(path: &Path) -> io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let specs: Vec<CategorySpec> = serde_json::from_slice(&bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Self::new(specs.into_iter().map(|c| {
            let units: Vec<(UnitId, String)> =
                c.units.into_iter().map(|u| (u.id, u.plate)).collect();
            (c.category, units)
        }))
    }

    /// Units of a category in catalog order. Unknown categories have none.
    pub fn units_of(&self, category: &str) -> &[FleetUnit] {
        self.units.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, category: &str) -> bool {
        self.units.contains_key(category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn unit(&self, id: UnitId) -> Option<&FleetUnit> {
        self.units.values().flatten().find(|u| u.id == id)
    }
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}
