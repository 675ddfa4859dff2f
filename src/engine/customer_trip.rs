use crate::domain::{
    CustomerId, CustomerTripStats, Decimal, RollingEntry, Transaction, TransactionKind,
    TransactionStatus, TripId,
};
use tracing::warn;

/// Folds one customer's ledger facts for one trip into a stats row.
///
/// Non-completed transactions are ignored. Unsupported kinds are logged and
/// skipped so that a single unexpected row never blocks the recompute.
pub fn aggregate_customer_trip(
    trip_id: TripId,
    customer_id: CustomerId,
    transactions: &[Transaction],
    rolling: &[RollingEntry],
) -> CustomerTripStats {
    let mut total_buy_in = Decimal::zero();
    let mut total_cash_out = Decimal::zero();

    for tx in transactions {
        if tx.status != TransactionStatus::Completed {
            continue;
        }
        match &tx.kind {
            TransactionKind::BuyIn => total_buy_in += tx.amount,
            TransactionKind::CashOut => total_cash_out += tx.amount,
            TransactionKind::Unsupported(raw) => {
                warn!(
                    trip_id = %trip_id,
                    customer_id = %customer_id,
                    transaction_id = tx.id,
                    kind = %raw,
                    "Skipping transaction with unsupported kind"
                );
            }
        }
    }

    let rolling_amount: Decimal = rolling.iter().map(|r| r.rolling_amount).sum();
    let total_commission_earned: Decimal = rolling.iter().map(|r| r.commission_earned).sum();

    let total_win_loss = total_buy_in - total_cash_out;
    let net_result = total_win_loss - total_commission_earned;

    CustomerTripStats {
        trip_id,
        customer_id,
        total_buy_in,
        total_cash_out,
        total_win_loss,
        rolling_amount,
        total_commission_earned,
        net_result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeMs;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn tx(id: i64, kind: TransactionKind, amount: &str, status: TransactionStatus) -> Transaction {
        Transaction {
            id,
            trip_id: TripId::new(1),
            customer_id: CustomerId::new(1),
            agent_id: None,
            amount: d(amount),
            kind,
            status,
            created_at: TimeMs::new(0),
        }
    }

    fn rolling(id: i64, amount: &str, commission: &str) -> RollingEntry {
        RollingEntry {
            id,
            trip_id: TripId::new(1),
            customer_id: CustomerId::new(1),
            staff_id: None,
            game_type: "baccarat".to_string(),
            rolling_amount: d(amount),
            commission_rate: d("0.014"),
            commission_earned: d(commission),
            recorded_at: TimeMs::new(0),
        }
    }

    #[test]
    fn test_no_facts_yields_zero_row() {
        let stats = aggregate_customer_trip(TripId::new(1), CustomerId::new(1), &[], &[]);
        assert_eq!(stats, CustomerTripStats::zeroed(TripId::new(1), CustomerId::new(1)));
    }

    #[test]
    fn test_win_loss_and_net_result() {
        let txs = vec![
            tx(1, TransactionKind::BuyIn, "1000", TransactionStatus::Completed),
            tx(2, TransactionKind::BuyIn, "500", TransactionStatus::Completed),
            tx(3, TransactionKind::CashOut, "300", TransactionStatus::Completed),
        ];
        let rolls = vec![rolling(1, "10000", "140"), rolling(2, "5000", "70")];

        let stats = aggregate_customer_trip(TripId::new(1), CustomerId::new(1), &txs, &rolls);
        assert_eq!(stats.total_buy_in, d("1500"));
        assert_eq!(stats.total_cash_out, d("300"));
        assert_eq!(stats.total_win_loss, d("1200"));
        assert_eq!(stats.rolling_amount, d("15000"));
        assert_eq!(stats.total_commission_earned, d("210"));
        assert_eq!(stats.net_result, d("990"));
    }

    #[test]
    fn test_pending_and_cancelled_are_ignored() {
        let txs = vec![
            tx(1, TransactionKind::BuyIn, "1000", TransactionStatus::Completed),
            tx(2, TransactionKind::BuyIn, "9999", TransactionStatus::Pending),
            tx(3, TransactionKind::CashOut, "9999", TransactionStatus::Cancelled),
        ];
        let stats = aggregate_customer_trip(TripId::new(1), CustomerId::new(1), &txs, &[]);
        assert_eq!(stats.total_buy_in, d("1000"));
        assert_eq!(stats.total_cash_out, Decimal::zero());
    }

    #[test]
    fn test_unsupported_kind_is_skipped_not_fatal() {
        let txs = vec![
            tx(1, TransactionKind::BuyIn, "1000", TransactionStatus::Completed),
            tx(
                2,
                TransactionKind::Unsupported("marker".to_string()),
                "5000",
                TransactionStatus::Completed,
            ),
            tx(3, TransactionKind::CashOut, "400", TransactionStatus::Completed),
        ];
        let stats = aggregate_customer_trip(TripId::new(1), CustomerId::new(1), &txs, &[]);
        assert_eq!(stats.total_win_loss, d("600"));
        assert_eq!(stats.net_result, d("600"));
    }

    #[test]
    fn test_recompute_is_deterministic() {
        let txs = vec![tx(1, TransactionKind::CashOut, "800", TransactionStatus::Completed)];
        let rolls = vec![rolling(1, "2500.50", "35.01")];
        let a = aggregate_customer_trip(TripId::new(1), CustomerId::new(1), &txs, &rolls);
        let b = aggregate_customer_trip(TripId::new(1), CustomerId::new(1), &txs, &rolls);
        assert_eq!(a, b);
    }
}
