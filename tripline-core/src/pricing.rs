use serde::Deserialize;

use crate::model::{PriceBreakdown, PriceBreakdownEntry};

/// Per-category fare multipliers applied to the base fare per person.
/// Config-sourced, not baked in; these defaults only apply when config
/// omits a value.
#[derive(Debug, Clone, Deserialize)]
pub struct FareMultipliers {
    #[serde(default = "default_adult_multiplier")]
    pub adult: f64,
    #[serde(default = "default_child_multiplier")]
    pub child: f64,
    #[serde(default = "default_infant_multiplier")]
    pub infant: f64,
}

fn default_adult_multiplier() -> f64 {
    1.0
}

fn default_child_multiplier() -> f64 {
    0.75
}

fn default_infant_multiplier() -> f64 {
    0.10
}

impl Default for FareMultipliers {
    fn default() -> Self {
        Self {
            adult: default_adult_multiplier(),
            child: default_child_multiplier(),
            infant: default_infant_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PassengerCounts {
    pub adults: u32,
    pub children: u32,
    pub infants: u32,
}

/// Compute the per-category fare breakdown. Pure and deterministic; a
/// zero-count category is omitted entirely rather than carried with a
/// zero total.
pub fn compute_breakdown(
    base_fare_per_person: f64,
    counts: PassengerCounts,
    multipliers: &FareMultipliers,
) -> PriceBreakdown {
    let entry = |count: u32, multiplier: f64| -> Option<PriceBreakdownEntry> {
        (count > 0).then(|| PriceBreakdownEntry {
            count,
            total: base_fare_per_person * multiplier * count as f64,
        })
    };

    let adults = entry(counts.adults, multipliers.adult);
    let children = entry(counts.children, multipliers.child);
    let infants = entry(counts.infants, multipliers.infant);

    let total_price = [&adults, &children, &infants]
        .iter()
        .filter_map(|e| e.as_ref().map(|e| e.total))
        .sum();

    PriceBreakdown {
        base_fare_per_person,
        adults,
        children,
        infants,
        total_price,
    }
}
