use chrono::Datelike;

use crate::model::{Cents, PriceBreakdown, Room, StaySpan};

// ── Special Price Resolver ────────────────────────────────────────

/// Pre-tax price for a stay, before VAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StayPrice {
    pub pre_tax: Cents,
    /// True when at least one night hit a weekday override. Diagnostics
    /// only — never drives control flow.
    pub special_applied: bool,
}

/// Walk the stay's nights: each night is priced at the weekday override if
/// one exists, the base price otherwise. No rounding happens here —
/// per-night prices are exact cents and the sum stays exact.
pub fn stay_price(room: &Room, span: &StaySpan) -> StayPrice {
    let mut pre_tax: Cents = 0;
    let mut special_applied = false;
    for date in span.dates() {
        match room.special_prices.get(date.weekday()) {
            Some(price) => {
                pre_tax += price;
                special_applied = true;
            }
            None => pre_tax += room.base_price,
        }
    }
    StayPrice {
        pre_tax,
        special_applied,
    }
}

// ── VAT Calculator ────────────────────────────────────────────────

/// `amount × rate%`, rounded half-up to whole cents.
fn vat_of(pre_tax: Cents, rate_percent: i64) -> Cents {
    (pre_tax * rate_percent + 50) / 100
}

/// Tourist bookings are VAT-exempt; everyone else pays the configured rate.
pub fn apply_vat(stay: StayPrice, tourist: bool, rate_percent: i64) -> PriceBreakdown {
    let vat_amount = if tourist {
        0
    } else {
        vat_of(stay.pre_tax, rate_percent)
    };
    PriceBreakdown {
        base_price: stay.pre_tax,
        vat_rate_percent: rate_percent,
        vat_amount,
        total_price: stay.pre_tax + vat_amount,
        special_applied: stay.special_applied,
    }
}

/// Full per-room quote: resolver then VAT.
pub fn quote(room: &Room, span: &StaySpan, tourist: bool, rate_percent: i64) -> PriceBreakdown {
    apply_vat(stay_price(room, span), tourist, rate_percent)
}
