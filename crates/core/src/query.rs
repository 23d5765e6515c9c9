//! Filtering and ordering of order lists.

use std::cmp::Ordering;

use crate::types::Order;

/// Status and delivery-date filter. Empty fields match everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFilter<S> {
    pub status: Option<S>,
    /// Exact `YYYY-MM-DD` match against `delivery_date`.
    pub date: Option<String>,
}

impl<S> Default for OrderFilter<S> {
    fn default() -> Self {
        Self {
            status: None,
            date: None,
        }
    }
}

impl<S: PartialEq> OrderFilter<S> {
    /// Whether an order passes the filter.
    #[must_use]
    pub fn matches(&self, order: &Order<S>) -> bool {
        self.status.as_ref().is_none_or(|s| *s == order.status)
            && self
                .date
                .as_deref()
                .is_none_or(|d| d == order.delivery_date)
    }

    /// Filter and sort a slice of orders for display.
    #[must_use]
    pub fn apply<'a>(&self, orders: &'a [Order<S>]) -> Vec<&'a Order<S>> {
        let mut selected: Vec<&Order<S>> = orders.iter().filter(|o| self.matches(o)).collect();
        selected.sort_by(|a, b| compare_delivery(a, b));
        selected
    }
}

/// Sort orders by delivery date and time, earliest first.
///
/// Orders whose date or time does not parse go last, keeping their
/// relative order.
pub fn sort_by_delivery<S>(orders: &mut [Order<S>]) {
    orders.sort_by(compare_delivery);
}

fn compare_delivery<S>(a: &Order<S>, b: &Order<S>) -> Ordering {
    match (a.delivery_datetime(), b.delivery_datetime()) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{LocalOrder, LocalStatus, OrderId};
    use chrono::Utc;

    fn order(id: &str, date: &str, time: &str, status: LocalStatus) -> LocalOrder {
        Order {
            id: OrderId::new(id),
            customer_name: "Cliente".to_owned(),
            customer_phone: None,
            delivery_date: date.to_owned(),
            delivery_time: time.to_owned(),
            items: Vec::new(),
            notes: None,
            total_amount: None,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ids(orders: &[LocalOrder]) -> Vec<&str> {
        orders.iter().map(|o| o.id.as_str()).collect()
    }

    #[test]
    fn test_sort_by_delivery_invalid_last() {
        let mut orders = vec![
            order("bad", "mañana", "10:00", LocalStatus::Pendiente),
            order("late", "2026-06-02", "08:00", LocalStatus::Pendiente),
            order("early", "2026-06-01", "18:30", LocalStatus::Pendiente),
            order("bad-time", "2026-06-01", "noon", LocalStatus::Pendiente),
            order("first", "2026-06-01", "07:00", LocalStatus::Pendiente),
        ];

        sort_by_delivery(&mut orders);
        assert_eq!(ids(&orders), ["first", "early", "late", "bad", "bad-time"]);
    }

    #[test]
    fn test_missing_time_sorts_as_midnight() {
        let mut orders = vec![
            order("morning", "2026-06-01", "06:00", LocalStatus::Pendiente),
            order("no-time", "2026-06-01", "", LocalStatus::Pendiente),
        ];
        sort_by_delivery(&mut orders);
        assert_eq!(ids(&orders), ["no-time", "morning"]);
    }

    #[test]
    fn test_filter_by_status_and_date() {
        let orders = vec![
            order("a", "2026-06-01", "10:00", LocalStatus::Pendiente),
            order("b", "2026-06-01", "09:00", LocalStatus::Completado),
            order("c", "2026-06-02", "09:00", LocalStatus::Pendiente),
        ];

        let all = OrderFilter::default().apply(&orders);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id.as_str(), "b");

        let pending = OrderFilter {
            status: Some(LocalStatus::Pendiente),
            date: None,
        }
        .apply(&orders);
        assert_eq!(pending.len(), 2);

        let pending_first_day = OrderFilter {
            status: Some(LocalStatus::Pendiente),
            date: Some("2026-06-01".to_owned()),
        }
        .apply(&orders);
        assert_eq!(pending_first_day.len(), 1);
        assert_eq!(pending_first_day[0].id.as_str(), "a");
    }
}
