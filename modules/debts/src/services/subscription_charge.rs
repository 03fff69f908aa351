//! Subscription charge points
//!
//! Decides whether a billing month is a month in which a member's recurring
//! subscription fee falls due. January is the start of every period.

use crate::models::{RecurrencePeriod, SubscriptionType};

/// True when `month` (1-12) is a charge point for the given recurrence
///
/// Custom periods recur every `period_months` months counted from January;
/// a missing or non-positive length never falls due.
pub fn is_charge_month(period: RecurrencePeriod, period_months: Option<i32>, month: u32) -> bool {
    match period {
        RecurrencePeriod::Monthly => true,
        RecurrencePeriod::Yearly => month == 1,
        RecurrencePeriod::Quarterly => matches!(month, 1 | 4 | 7 | 10),
        RecurrencePeriod::Custom => match period_months {
            Some(n) if n > 0 => (month as i64 - 1) % n as i64 == 0,
            _ => false,
        },
    }
}

/// Amount owed for the subscription in `month`, in minor units
pub fn charge_for_month(subscription: Option<&SubscriptionType>, month: u32) -> i64 {
    match subscription {
        Some(sub) if sub.is_active && is_charge_month(sub.period, sub.period_months, month) => {
            sub.amount_minor
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn subscription(period: RecurrencePeriod, period_months: Option<i32>) -> SubscriptionType {
        SubscriptionType {
            id: Uuid::new_v4(),
            society_id: Uuid::new_v4(),
            name: "Cuota".to_string(),
            amount_minor: 6000,
            period,
            period_months,
            is_active: true,
        }
    }

    fn charged_months(sub: &SubscriptionType) -> Vec<u32> {
        (1..=12)
            .filter(|m| charge_for_month(Some(sub), *m) > 0)
            .collect()
    }

    #[test]
    fn test_monthly_charges_every_month() {
        let sub = subscription(RecurrencePeriod::Monthly, None);
        assert_eq!(charged_months(&sub), (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn test_yearly_charges_january_only() {
        let sub = subscription(RecurrencePeriod::Yearly, None);
        assert_eq!(charge_for_month(Some(&sub), 1), 6000);
        assert_eq!(charge_for_month(Some(&sub), 6), 0);
        assert_eq!(charged_months(&sub), vec![1]);
    }

    #[test]
    fn test_quarterly_charges_quarter_starts() {
        let sub = subscription(RecurrencePeriod::Quarterly, None);
        assert_eq!(charged_months(&sub), vec![1, 4, 7, 10]);
    }

    #[test]
    fn test_custom_three_months_matches_quarterly() {
        let sub = subscription(RecurrencePeriod::Custom, Some(3));
        assert_eq!(charged_months(&sub), vec![1, 4, 7, 10]);
    }

    #[test]
    fn test_custom_other_lengths() {
        assert_eq!(
            charged_months(&subscription(RecurrencePeriod::Custom, Some(2))),
            vec![1, 3, 5, 7, 9, 11]
        );
        assert_eq!(
            charged_months(&subscription(RecurrencePeriod::Custom, Some(6))),
            vec![1, 7]
        );
        assert_eq!(
            charged_months(&subscription(RecurrencePeriod::Custom, Some(1))),
            (1..=12).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_custom_without_length_never_charges() {
        assert!(charged_months(&subscription(RecurrencePeriod::Custom, None)).is_empty());
        assert!(charged_months(&subscription(RecurrencePeriod::Custom, Some(0))).is_empty());
    }

    #[test]
    fn test_missing_or_inactive_subscription_is_free() {
        assert_eq!(charge_for_month(None, 1), 0);

        let mut sub = subscription(RecurrencePeriod::Monthly, None);
        sub.is_active = false;
        assert_eq!(charge_for_month(Some(&sub), 1), 0);
    }
}
