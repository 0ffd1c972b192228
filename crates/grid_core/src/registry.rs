use crate::{DensityClass, EmissionProfile, EmissionRange};

/// Class assigned to any district missing from [`DISTRICT_CLASSES`].
pub const DEFAULT_CLASS: DensityClass = DensityClass::Rural;

/// Static district classification. Read-only for the life of the process.
const DISTRICT_CLASSES: &[(&str, DensityClass)] = &[
    ("Bengaluru Urban", DensityClass::Urban),
    ("Bangalore North", DensityClass::Urban),
    ("Bangalore East", DensityClass::Urban),
    ("Bangalore South", DensityClass::Urban),
    ("Defence Colony", DensityClass::Urban),
    ("Anekal", DensityClass::Urban),
    ("Yelahanka taluku", DensityClass::Urban),
    ("Thanisandra", DensityClass::Urban),
    ("Herohalli", DensityClass::Urban),
    ("Nagadevanahalli", DensityClass::Urban),
    ("Uttarahalli", DensityClass::Urban),
    ("Vasanthpura", DensityClass::Urban),
    ("Yelchenahalli", DensityClass::Urban),
    ("Jaraganahalli", DensityClass::Urban),
    ("Puttenahalli", DensityClass::Urban),
    ("Bilekhalli", DensityClass::Urban),
    ("Kodichikkanahalli", DensityClass::Urban),
    ("Hosakote", DensityClass::Suburban),
    ("Devanahalli", DensityClass::Suburban),
    ("Doddaballapura", DensityClass::Suburban),
    ("Nelmangala", DensityClass::Suburban),
    ("Ramanagara", DensityClass::Suburban),
    ("Chikkaballapura", DensityClass::Suburban),
    ("Kolar", DensityClass::Suburban),
    ("Tumakuru", DensityClass::Suburban),
];

/// Density class of `district`. Total: unknown names resolve to [`DEFAULT_CLASS`].
pub fn classify(district: &str) -> DensityClass {
    DISTRICT_CLASSES
        .iter()
        .find(|(name, _)| *name == district)
        .map_or(DEFAULT_CLASS, |(_, class)| *class)
}

/// Every district with an explicit classification, in table order.
pub fn registered_districts() -> impl Iterator<Item = &'static str> {
    DISTRICT_CLASSES.iter().map(|(name, _)| *name)
}

const fn range(min: f64, max: f64) -> EmissionRange {
    EmissionRange { min, max }
}

impl DensityClass {
    /// Baseline emission ranges (tonnes CO2 / year) for this class.
    pub const fn profile(self) -> EmissionProfile {
        match self {
            Self::Urban => EmissionProfile {
                transport: range(1500.0, 3000.0),
                industrial: range(2000.0, 5000.0),
                residential: range(800.0, 1500.0),
            },
            Self::Suburban => EmissionProfile {
                transport: range(800.0, 1800.0),
                industrial: range(500.0, 2000.0),
                residential: range(900.0, 1800.0),
            },
            Self::Rural => EmissionProfile {
                transport: range(200.0, 800.0),
                industrial: range(100.0, 1000.0),
                residential: range(1000.0, 2500.0),
            },
        }
    }
}
