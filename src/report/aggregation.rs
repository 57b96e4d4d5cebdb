//! Pure aggregation functions behind the reports page and its CSV exports.

use std::collections::BTreeMap;

use serde::Deserialize;
use time::{Date, Duration};

use crate::transaction::Transaction;

/// The net movement of a single day: the signed sum of every transaction
/// dated that day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyMovement {
    /// The day.
    pub fecha: Date,
    /// The signed sum of the day's transactions.
    pub total: f64,
}

/// Total income and expenses over a range. `expenses` is reported as a
/// positive magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncomeExpenseSplit {
    /// The sum of all positive amounts.
    pub income: f64,
    /// The magnitude of the sum of all negative amounts.
    pub expenses: f64,
}

/// Sum transactions into one net movement per day, ordered by date ascending.
///
/// Days without transactions produce no entry rather than a zero entry.
pub fn daily_movements(transactions: &[Transaction]) -> Vec<DailyMovement> {
    let mut totals: BTreeMap<Date, f64> = BTreeMap::new();

    for transaction in transactions {
        *totals.entry(transaction.fecha).or_insert(0.0) += transaction.monto;
    }

    totals
        .into_iter()
        .map(|(fecha, total)| DailyMovement { fecha, total })
        .collect()
}

/// Split transactions into total income and total expenses.
pub fn income_expense_split(transactions: &[Transaction]) -> IncomeExpenseSplit {
    let income = transactions
        .iter()
        .filter(|t| t.monto > 0.0)
        .map(|t| t.monto)
        .sum();
    let expenses = transactions
        .iter()
        .filter(|t| t.monto < 0.0)
        .map(|t| t.monto)
        .sum::<f64>()
        .abs();

    IncomeExpenseSplit { income, expenses }
}

/// The signed sum of all transactions.
pub fn current_balance(transactions: &[Transaction]) -> f64 {
    transactions.iter().map(|t| t.monto).sum()
}

/// The date-range query parameters shared by the reports page and the CSV
/// exports.
///
/// The raw values stay strings so an empty or malformed date from the filter
/// form falls back to the default range instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RangeQuery {
    /// The inclusive start of the range as "YYYY-MM-DD". Defaults to one
    /// year before today.
    pub start_date: Option<String>,
    /// The inclusive end of the range as "YYYY-MM-DD". Defaults to today.
    pub end_date: Option<String>,
}

impl RangeQuery {
    /// Resolve the query against `today`, filling in the default range of
    /// the last 365 days.
    pub fn resolve(&self, today: Date) -> (Date, Date) {
        let start = parse_fecha(self.start_date.as_deref())
            .unwrap_or_else(|| today.saturating_sub(Duration::days(365)));
        let end = parse_fecha(self.end_date.as_deref()).unwrap_or(today);

        (start, end)
    }
}

fn parse_fecha(raw: Option<&str>) -> Option<Date> {
    raw.and_then(|raw| Date::parse(raw.trim(), crate::transaction::FECHA_FORMAT).ok())
}

#[cfg(test)]
mod aggregation_tests {
    use time::macros::date;

    use crate::{transaction::Transaction, user::UserID};

    use super::{
        RangeQuery, current_balance, daily_movements, income_expense_split,
    };

    fn transaction(monto: f64, fecha: time::Date) -> Transaction {
        Transaction {
            id: 1,
            concepto: "Movimiento".to_owned(),
            monto,
            fecha,
            user_id: UserID::new(1),
        }
    }

    #[test]
    fn daily_movements_sums_per_day_in_ascending_order() {
        let transactions = vec![
            transaction(100.0, date!(2024 - 01 - 15)),
            transaction(-40.0, date!(2024 - 01 - 15)),
            transaction(10.0, date!(2024 - 01 - 10)),
        ];

        let movements = daily_movements(&transactions);

        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].fecha, date!(2024 - 01 - 10));
        assert_eq!(movements[0].total, 10.0);
        assert_eq!(movements[1].fecha, date!(2024 - 01 - 15));
        assert_eq!(movements[1].total, 60.0);
    }

    #[test]
    fn daily_movements_of_nothing_is_empty() {
        assert!(daily_movements(&[]).is_empty());
    }

    #[test]
    fn split_reports_expenses_as_positive_magnitude() {
        let transactions = vec![
            transaction(1500.50, date!(2024 - 01 - 15)),
            transaction(-350.25, date!(2024 - 01 - 16)),
            transaction(-149.75, date!(2024 - 01 - 17)),
        ];

        let split = income_expense_split(&transactions);

        assert_eq!(split.income, 1500.50);
        assert_eq!(split.expenses, 500.0);
    }

    #[test]
    fn balance_is_the_signed_sum() {
        let transactions = vec![
            transaction(1500.50, date!(2024 - 01 - 15)),
            transaction(-350.25, date!(2024 - 01 - 16)),
        ];

        assert_eq!(current_balance(&transactions), 1150.25);
    }

    #[test]
    fn range_query_defaults_to_the_last_year() {
        let query = RangeQuery::default();

        let (start, end) = query.resolve(date!(2024 - 06 - 01));

        assert_eq!(end, date!(2024 - 06 - 01));
        assert_eq!(start, date!(2023 - 06 - 02));
    }

    #[test]
    fn range_query_keeps_explicit_bounds() {
        let query = RangeQuery {
            start_date: Some("2024-01-01".to_owned()),
            end_date: Some("2024-01-31".to_owned()),
        };

        let (start, end) = query.resolve(date!(2024 - 06 - 01));

        assert_eq!(start, date!(2024 - 01 - 01));
        assert_eq!(end, date!(2024 - 01 - 31));
    }

    #[test]
    fn malformed_dates_fall_back_to_the_default_range() {
        let query = RangeQuery {
            start_date: Some("01/06/2024".to_owned()),
            end_date: Some(String::new()),
        };

        let (start, end) = query.resolve(date!(2024 - 06 - 01));

        assert_eq!(end, date!(2024 - 06 - 01));
        assert_eq!(start, date!(2023 - 06 - 02));
    }
}
