use crate::domain::{CustomerId, CustomerTripStats, Decimal, TripId, TripStats};
use std::collections::BTreeSet;

/// Sums member customers' stats into trip totals.
///
/// Rows for customers that are not in `members` are ignored, and an empty
/// member set forces every total to zero rather than leaving stale sums.
pub fn aggregate_trip(
    trip_id: TripId,
    members: &BTreeSet<CustomerId>,
    customer_stats: &[CustomerTripStats],
) -> TripStats {
    if members.is_empty() {
        return TripStats::zeroed(trip_id);
    }

    let mut stats = TripStats::zeroed(trip_id);
    stats.customer_count = members.len() as i64;

    for row in customer_stats
        .iter()
        .filter(|s| s.trip_id == trip_id && members.contains(&s.customer_id))
    {
        stats.total_buy_in += row.total_buy_in;
        stats.total_cash_out += row.total_cash_out;
        stats.total_win_loss += row.total_win_loss;
    }
    stats.net_profit = stats.total_win_loss;
    stats
}

/// Net result of a single member, zero when the member has no stats row yet.
pub fn member_net_result(customer_stats: &[CustomerTripStats], customer_id: CustomerId) -> Decimal {
    customer_stats
        .iter()
        .find(|s| s.customer_id == customer_id)
        .map(|s| s.net_result)
        .unwrap_or_default()
}
