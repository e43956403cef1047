use rust_decimal::Decimal;
use serde::Serialize;

/// Fulfillment of a demand slice once allocations are prorated into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    Unfilled,
    PartiallyFilled,
    Filled,
    OverAllocated,
}

impl FulfillmentStatus {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Unfilled,
            Self::PartiallyFilled,
            Self::Filled,
            Self::OverAllocated,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Unfilled => "Unfilled",
            Self::PartiallyFilled => "Partially Filled",
            Self::Filled => "Filled",
            Self::OverAllocated => "Over Allocated",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unfilled => "unfilled",
            Self::PartiallyFilled => "partially_filled",
            Self::Filled => "filled",
            Self::OverAllocated => "over_allocated",
        }
    }
}

/// Compares allocated against demanded FTE exactly.
///
/// Callers that prorate must pass values on a common scale (for example FTE-days) so the
/// equality check is not disturbed by division.
pub fn classify(fte_demand: Decimal, fte_allocated: Decimal) -> FulfillmentStatus {
    if fte_allocated.is_zero() {
        FulfillmentStatus::Unfilled
    } else if fte_allocated < fte_demand {
        FulfillmentStatus::PartiallyFilled
    } else if fte_allocated == fte_demand {
        FulfillmentStatus::Filled
    } else {
        FulfillmentStatus::OverAllocated
    }
}

/// Severity of a period's allocation-minus-demand gap in the resource trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapBand {
    Surplus,
    Balanced,
    Deficit,
    Critical,
}

impl GapBand {
    pub const fn ordered() -> [Self; 4] {
        [Self::Surplus, Self::Balanced, Self::Deficit, Self::Critical]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Surplus => "Surplus",
            Self::Balanced => "Balanced",
            Self::Deficit => "Deficit",
            Self::Critical => "Critical",
        }
    }

    /// `gap` is allocation minus demand; positive values mean spare capacity.
    pub fn from_gap(gap: Decimal) -> Self {
        if gap >= Decimal::new(5, 1) {
            Self::Surplus
        } else if gap >= Decimal::new(-1, 1) {
            Self::Balanced
        } else if gap >= Decimal::new(-5, 1) {
            Self::Deficit
        } else {
            Self::Critical
        }
    }
}
