//! Rolling-play entries and their commission.

use crate::domain::{CustomerId, Decimal, StaffId, TimeMs, TripId};
use serde::{Deserialize, Serialize};

/// A rolling-play record. `commission_earned` is fixed at write time with the
/// rate that applied then; later rate changes never rewrite it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingEntry {
    pub id: i64,
    pub trip_id: TripId,
    pub customer_id: CustomerId,
    pub staff_id: Option<StaffId>,
    pub game_type: String,
    pub rolling_amount: Decimal,
    pub commission_rate: Decimal,
    pub commission_earned: Decimal,
    pub recorded_at: TimeMs,
}

/// Input for recording a rolling entry. The commission is derived, not supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRollingEntry {
    pub trip_id: TripId,
    pub customer_id: CustomerId,
    pub staff_id: Option<StaffId>,
    pub game_type: String,
    pub rolling_amount: Decimal,
    pub commission_rate: Decimal,
}

impl NewRollingEntry {
    pub fn commission_earned(&self) -> Decimal {
        commission_for(self.rolling_amount, self.commission_rate)
    }
}

/// Commission on a rolling amount at a fractional rate, rounded to cents.
pub fn commission_for(rolling_amount: Decimal, commission_rate: Decimal) -> Decimal {
    (rolling_amount * commission_rate).round_dp(2)
}
