//! Subscription detection and budget analytics
//!
//! Operates on the persisted collection, never on raw text. Detection
//! looks for vendors whose charges are consistent in amount (low
//! coefficient of variation) and regular in cadence (average date gap
//! inside a weekly or monthly window). Candidates are ephemeral: computed
//! on demand, never stored.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::models::{
    BurnRate, BurnRateStatus, Confidence, Frequency, ReceiptRecord, SubscriptionCandidate,
};

/// Thresholds for recurring-charge detection
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    /// Maximum stddev/mean of the vendor's amounts (0.15 = 15%)
    pub max_amount_cv: f64,
    /// Average date gap window treated as monthly, in days
    pub monthly_gap: (f64, f64),
    /// Average date gap window treated as weekly, in days
    pub weekly_gap: (f64, f64),
    /// Average gaps above this label as Monthly, below as Weekly
    pub monthly_cutoff_days: f64,
    /// Transactions required for High confidence
    pub high_confidence_txns: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            max_amount_cv: 0.15,
            monthly_gap: (26.0, 34.0),
            weekly_gap: (6.0, 8.0),
            monthly_cutoff_days: 20.0,
            high_confidence_txns: 4,
        }
    }
}

/// Flag vendors whose persisted receipts look like recurring charges.
///
/// Records whose date does not parse are ignored; a vendor needs at least
/// two dated transactions to establish a pattern. Results are sorted by
/// vendor for deterministic output.
pub fn detect_subscriptions(
    records: &[ReceiptRecord],
    config: &SubscriptionConfig,
) -> Vec<SubscriptionCandidate> {
    let mut by_vendor: HashMap<&str, Vec<(NaiveDate, f64)>> = HashMap::new();
    for record in records {
        if let Some(date) = record.parsed_date() {
            by_vendor
                .entry(record.vendor.as_str())
                .or_default()
                .push((date, record.amount));
        }
    }

    let mut candidates = Vec::new();

    for (vendor, mut txs) in by_vendor {
        if txs.len() < 2 {
            continue;
        }

        let amounts: Vec<f64> = txs.iter().map(|(_, a)| *a).collect();
        let mean = amounts.iter().sum::<f64>() / amounts.len() as f64;
        if mean == 0.0 {
            continue;
        }

        // Small fluctuations are fine (currency conversion, slight bill
        // changes); variable spending is not a subscription.
        let cv = sample_stddev(&amounts) / mean;
        if cv >= config.max_amount_cv {
            debug!(vendor, cv, "amount variance too high, skipping");
            continue;
        }

        txs.sort_by_key(|(date, _)| *date);
        let gaps: Vec<i64> = txs
            .windows(2)
            .map(|w| (w[1].0 - w[0].0).num_days())
            .collect();
        if gaps.is_empty() {
            continue;
        }

        let avg_gap = gaps.iter().sum::<i64>() as f64 / gaps.len() as f64;
        let monthly = config.monthly_gap.0 <= avg_gap && avg_gap <= config.monthly_gap.1;
        let weekly = config.weekly_gap.0 <= avg_gap && avg_gap <= config.weekly_gap.1;
        if !monthly && !weekly {
            debug!(vendor, avg_gap, "gap cadence outside weekly/monthly windows");
            continue;
        }

        let Some(&(last_seen, _)) = txs.last() else {
            continue;
        };

        let frequency = if avg_gap > config.monthly_cutoff_days {
            Frequency::Monthly
        } else {
            Frequency::Weekly
        };
        let confidence = if txs.len() >= config.high_confidence_txns {
            Confidence::High
        } else {
            Confidence::Medium
        };

        debug!(
            vendor,
            avg_amount = mean,
            avg_gap,
            "recurring charge candidate"
        );

        candidates.push(SubscriptionCandidate {
            vendor: vendor.to_string(),
            avg_amount: mean,
            frequency,
            next_due: last_seen + Duration::days(avg_gap as i64),
            confidence,
        });
    }

    candidates.sort_by(|a, b| a.vendor.cmp(&b.vendor));
    candidates
}

const DAYS_IN_MONTH: u32 = 30;

/// Project full-month spend from a partial month, against a budget.
pub fn calculate_burn_rate(
    current_spend: f64,
    monthly_budget: f64,
    days_passed: u32,
) -> Option<BurnRate> {
    calculate_burn_rate_with_days(current_spend, monthly_budget, days_passed, DAYS_IN_MONTH)
}

/// Burn rate over a custom period length. Returns None when there is no
/// budget to measure against.
pub fn calculate_burn_rate_with_days(
    current_spend: f64,
    monthly_budget: f64,
    days_passed: u32,
    days_in_month: u32,
) -> Option<BurnRate> {
    if monthly_budget <= 0.0 {
        return None;
    }

    let spend_per_day = current_spend / days_passed.max(1) as f64;
    let projected = spend_per_day * days_in_month as f64;

    let status = if projected > monthly_budget {
        BurnRateStatus::OverBudget
    } else if projected < monthly_budget * 0.8 {
        BurnRateStatus::UnderBudget
    } else {
        BurnRateStatus::OnTrack
    };

    Some(BurnRate {
        budget: monthly_budget,
        current: current_spend,
        remaining: monthly_budget - current_spend,
        percent_used: (current_spend / monthly_budget * 100.0).min(100.0),
        status,
        projected,
    })
}

/// Project next month's spend from the trailing 30 days' daily average.
///
/// Returns `(projected_spend, daily_average)`; both zero when no record
/// carries a parseable date.
pub fn predict_next_month_spending(records: &[ReceiptRecord]) -> (f64, f64) {
    let dated: Vec<(NaiveDate, f64)> = records
        .iter()
        .filter_map(|r| r.parsed_date().map(|d| (d, r.amount)))
        .collect();

    let Some(last) = dated.iter().map(|(date, _)| *date).max() else {
        return (0.0, 0.0);
    };
    let start = last - Duration::days(30);

    let recent_total: f64 = dated
        .iter()
        .filter(|(date, _)| *date >= start)
        .map(|(_, amount)| amount)
        .sum();

    let days_present = ((last - start).num_days() + 1).max(1);
    let daily_avg = recent_total / days_present as f64;
    (daily_avg * 30.0, daily_avg)
}

/// Case-insensitive vendor/category filter. An empty keyword matches
/// everything.
pub fn search_receipts<'a>(records: &'a [ReceiptRecord], keyword: &str) -> Vec<&'a ReceiptRecord> {
    if keyword.is_empty() {
        return records.iter().collect();
    }
    let keyword = keyword.to_lowercase();
    records
        .iter()
        .filter(|r| {
            r.vendor.to_lowercase().contains(&keyword)
                || r.category.as_str().to_lowercase().contains(&keyword)
        })
        .collect()
}

/// Sample standard deviation (n - 1 denominator), zero for fewer than two
/// values.
fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values
        .iter()
        .map(|v| (v - mean).powi(2))
        .sum::<f64>()
        / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn receipt(vendor: &str, date: &str, amount: f64) -> ReceiptRecord {
        ReceiptRecord {
            bill_id: format!("{}-{}", vendor, date),
            vendor: vendor.to_string(),
            date: date.to_string(),
            time: None,
            payment: None,
            subtotal: amount,
            tax: 0.0,
            amount,
            category: Category::Uncategorized,
            items: vec![],
        }
    }

    #[test]
    fn test_monthly_subscription_high_confidence() {
        let records = vec![
            receipt("StreamFlix", "2024-01-01", 100.0),
            receipt("StreamFlix", "2024-01-31", 102.0),
            receipt("StreamFlix", "2024-03-02", 98.0),
            receipt("StreamFlix", "2024-04-01", 101.0),
        ];
        let candidates = detect_subscriptions(&records, &SubscriptionConfig::default());

        assert_eq!(candidates.len(), 1);
        let sub = &candidates[0];
        assert_eq!(sub.vendor, "StreamFlix");
        assert_eq!(sub.frequency, Frequency::Monthly);
        assert_eq!(sub.confidence, Confidence::High);
        assert!((sub.avg_amount - 100.25).abs() < 0.01);
        // avg gap 30.33 days, truncated to 30
        assert_eq!(
            sub.next_due,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
    }

    #[test]
    fn test_weekly_subscription_medium_confidence() {
        let records = vec![
            receipt("Veg Box", "2024-01-01", 50.0),
            receipt("Veg Box", "2024-01-08", 50.0),
            receipt("Veg Box", "2024-01-15", 50.0),
        ];
        let candidates = detect_subscriptions(&records, &SubscriptionConfig::default());

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].frequency, Frequency::Weekly);
        assert_eq!(candidates[0].confidence, Confidence::Medium);
        assert_eq!(
            candidates[0].next_due,
            NaiveDate::from_ymd_opt(2024, 1, 22).unwrap()
        );
    }

    #[test]
    fn test_close_gap_not_emitted() {
        // 3-day gap sits outside both the weekly and monthly windows
        let records = vec![
            receipt("Corner Shop", "2024-01-01", 20.0),
            receipt("Corner Shop", "2024-01-04", 20.0),
        ];
        assert!(detect_subscriptions(&records, &SubscriptionConfig::default()).is_empty());
    }

    #[test]
    fn test_variable_amounts_not_emitted() {
        let records = vec![
            receipt("Grocer", "2024-01-01", 100.0),
            receipt("Grocer", "2024-01-31", 200.0),
        ];
        assert!(detect_subscriptions(&records, &SubscriptionConfig::default()).is_empty());
    }

    #[test]
    fn test_single_transaction_not_emitted() {
        let records = vec![receipt("StreamFlix", "2024-01-01", 100.0)];
        assert!(detect_subscriptions(&records, &SubscriptionConfig::default()).is_empty());
    }

    #[test]
    fn test_unparseable_dates_ignored() {
        let records = vec![
            receipt("StreamFlix", "garbage", 100.0),
            receipt("StreamFlix", "2024-01-01", 100.0),
        ];
        // only one dated transaction survives, not enough for a pattern
        assert!(detect_subscriptions(&records, &SubscriptionConfig::default()).is_empty());
    }

    #[test]
    fn test_burn_rate_over_budget() {
        let rate = calculate_burn_rate(4000.0, 5000.0, 10).unwrap();
        assert_eq!(rate.projected, 12000.0);
        assert_eq!(rate.status, BurnRateStatus::OverBudget);
        assert_eq!(rate.remaining, 1000.0);
        assert_eq!(rate.percent_used, 80.0);
    }

    #[test]
    fn test_burn_rate_under_budget() {
        let rate = calculate_burn_rate(1000.0, 5000.0, 10).unwrap();
        assert_eq!(rate.projected, 3000.0);
        assert_eq!(rate.status, BurnRateStatus::UnderBudget);
    }

    #[test]
    fn test_burn_rate_on_track() {
        let rate = calculate_burn_rate(1400.0, 5000.0, 10).unwrap();
        assert_eq!(rate.projected, 4200.0);
        assert_eq!(rate.status, BurnRateStatus::OnTrack);
    }

    #[test]
    fn test_burn_rate_requires_budget() {
        assert!(calculate_burn_rate(100.0, 0.0, 5).is_none());
        assert!(calculate_burn_rate(100.0, -10.0, 5).is_none());
    }

    #[test]
    fn test_burn_rate_zero_days_counts_as_one() {
        let rate = calculate_burn_rate(100.0, 5000.0, 0).unwrap();
        assert_eq!(rate.projected, 3000.0);
    }

    #[test]
    fn test_burn_rate_percent_used_capped() {
        let rate = calculate_burn_rate(6000.0, 5000.0, 10).unwrap();
        assert_eq!(rate.percent_used, 100.0);
    }

    #[test]
    fn test_predict_next_month_spending() {
        let records = vec![
            receipt("A", "2024-01-01", 100.0),
            receipt("B", "2024-01-31", 210.0),
        ];
        let (projected, daily_avg) = predict_next_month_spending(&records);
        // 310 over a 31-day window
        assert_eq!(daily_avg, 10.0);
        assert_eq!(projected, 300.0);
    }

    #[test]
    fn test_predict_next_month_empty() {
        assert_eq!(predict_next_month_spending(&[]), (0.0, 0.0));
    }

    #[test]
    fn test_search_matches_vendor_and_category() {
        let mut cafe = receipt("Green Leaf Cafe", "2024-01-01", 20.0);
        cafe.category = Category::Food;
        let shop = receipt("Acme Traders", "2024-01-02", 30.0);
        let records = vec![cafe, shop];

        assert_eq!(search_receipts(&records, "leaf").len(), 1);
        assert_eq!(search_receipts(&records, "food").len(), 1);
        assert_eq!(search_receipts(&records, "").len(), 2);
        assert!(search_receipts(&records, "zzz").is_empty());
    }

    #[test]
    fn test_sample_stddev() {
        assert_eq!(sample_stddev(&[100.0]), 0.0);
        let sd = sample_stddev(&[100.0, 102.0, 98.0, 101.0]);
        assert!((sd - 1.7078).abs() < 0.001);
    }
}
