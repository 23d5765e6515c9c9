//! Order records.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::id::OrderId;
use super::status::{LocalStatus, OrderStatus, StatusWorkflow};

/// One line of an order.
///
/// Quantities are free text ("12 unidades", "2 kg"), and so are prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Product name.
    pub product: String,
    /// Quantity or weight, as entered.
    pub quantity: String,
    /// Line price, as entered.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub price: Option<String>,
}

/// A bakery delivery order.
///
/// Generic over the status workflow so the server and the standalone
/// variant share one record shape. See [`ServerOrder`] and [`LocalOrder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "S: Deserialize<'de> + Default"))]
pub struct Order<S> {
    pub id: OrderId,
    pub customer_name: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub customer_phone: Option<String>,
    /// `YYYY-MM-DD`.
    pub delivery_date: String,
    /// `HH:MM`.
    pub delivery_time: String,
    pub items: Vec<OrderItem>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub notes: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub total_amount: Option<String>,
    #[serde(default)]
    pub status: S,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation; the merge algorithm compares it.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Order as stored by the server.
pub type ServerOrder = Order<OrderStatus>;

/// Order as stored by the standalone variant.
pub type LocalOrder = Order<LocalStatus>;

impl<S: StatusWorkflow> Order<S> {
    /// Move to the next workflow state and refresh `updated_at`.
    pub fn advance_status(&mut self, now: DateTime<Utc>) -> S {
        self.status = self.status.next();
        self.updated_at = now;
        self.status.clone()
    }
}

impl<S> Order<S> {
    /// Parsed delivery date, if it is a valid `YYYY-MM-DD` date.
    #[must_use]
    pub fn delivery_day(&self) -> Option<NaiveDate> {
        parse_delivery_date(&self.delivery_date)
    }

    /// Combined delivery date and time.
    ///
    /// A missing time counts as midnight. Returns `None` when either part
    /// does not parse.
    #[must_use]
    pub fn delivery_datetime(&self) -> Option<NaiveDateTime> {
        let date = self.delivery_day()?;
        let time = if self.delivery_time.trim().is_empty() {
            NaiveTime::MIN
        } else {
            NaiveTime::parse_from_str(self.delivery_time.trim(), "%H:%M").ok()?
        };
        Some(date.and_time(time))
    }

    /// Whether the record carries no real modification time.
    #[must_use]
    pub fn has_unknown_update_time(&self) -> bool {
        self.updated_at == DateTime::<Utc>::UNIX_EPOCH
    }

    /// Strip a time suffix from `delivery_date` (`2026-05-01T00:00:00.000Z`
    /// becomes `2026-05-01`).
    pub fn normalize_delivery_date(&mut self) {
        if let Some((date, _)) = self.delivery_date.split_once('T') {
            self.delivery_date = date.to_owned();
        }
    }

    /// Drop a seconds component from `delivery_time` (`09:30:00` becomes `09:30`).
    pub fn normalize_delivery_time(&mut self) {
        let mut parts = self.delivery_time.splitn(3, ':');
        if let (Some(hours), Some(minutes), Some(_)) = (parts.next(), parts.next(), parts.next()) {
            self.delivery_time = format!("{hours}:{minutes}");
        }
    }
}

fn parse_delivery_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Deserialize `""` and whitespace-only strings as `None`.
fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Deserialize an RFC 3339 timestamp, mapping missing or malformed values to the epoch.
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let parsed = value
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));
    Ok(parsed.unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> LocalOrder {
        let ts = Utc.with_ymd_and_hms(2026, 4, 2, 9, 30, 0).unwrap();
        Order {
            id: OrderId::new("abc"),
            customer_name: "Marta".to_owned(),
            customer_phone: None,
            delivery_date: "2026-04-03".to_owned(),
            delivery_time: "10:15".to_owned(),
            items: vec![OrderItem {
                product: "Empanadas".to_owned(),
                quantity: "12".to_owned(),
                price: Some("$5000".to_owned()),
            }],
            notes: None,
            total_amount: None,
            status: LocalStatus::Pendiente,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_serializes_camel_case() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["customerName"], "Marta");
        assert_eq!(value["deliveryDate"], "2026-04-03");
        assert_eq!(value["status"], "pendiente");
        assert_eq!(value["updatedAt"], "2026-04-02T09:30:00Z");
        assert!(value.get("notes").is_none());
    }

    #[test]
    fn test_deserializes_browser_shape() {
        let order: LocalOrder = serde_json::from_value(json!({
            "id": "lx1abc",
            "customerName": "Pedro",
            "customerPhone": "",
            "deliveryDate": "2026-04-05",
            "deliveryTime": "08:00",
            "items": [{"product": "Pan", "quantity": "2 kg", "price": ""}],
            "notes": "",
            "totalAmount": "",
            "status": "en_proceso",
            "createdAt": "2026-04-01T10:00:00.000Z",
            "updatedAt": "2026-04-01T11:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(order.customer_phone, None);
        assert_eq!(order.items[0].price, None);
        assert_eq!(order.total_amount, None);
        assert_eq!(order.status, LocalStatus::EnProceso);
        assert_eq!(
            order.updated_at,
            Utc.with_ymd_and_hms(2026, 4, 1, 11, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_missing_timestamps_become_epoch() {
        let order: LocalOrder = serde_json::from_value(json!({
            "id": "x",
            "customerName": "Ana",
            "deliveryDate": "2026-04-05",
            "deliveryTime": "08:00",
            "items": [],
            "updatedAt": "yesterday"
        }))
        .unwrap();

        assert!(order.has_unknown_update_time());
        assert_eq!(order.created_at, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(order.status, LocalStatus::Pendiente);
    }

    #[test]
    fn test_unknown_status_round_trips_and_restarts() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["status"] = json!("entregado");
        let mut order: LocalOrder = serde_json::from_value(value).unwrap();
        assert_eq!(order.status, LocalStatus::Unknown("entregado".to_owned()));
        assert_eq!(serde_json::to_value(&order).unwrap()["status"], "entregado");

        let later = Utc.with_ymd_and_hms(2026, 4, 2, 10, 0, 0).unwrap();
        assert_eq!(order.advance_status(later), LocalStatus::Pendiente);
    }

    #[test]
    fn test_null_status_decodes_as_pending() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["status"] = serde_json::Value::Null;
        let order: LocalOrder = serde_json::from_value(value).unwrap();
        assert_eq!(order.status, LocalStatus::Pendiente);
    }

    #[test]
    fn test_advance_status_refreshes_updated_at() {
        let mut order = sample();
        let later = Utc.with_ymd_and_hms(2026, 4, 2, 10, 0, 0).unwrap();
        assert_eq!(order.advance_status(later), LocalStatus::EnProceso);
        assert_eq!(order.updated_at, later);
    }

    #[test]
    fn test_delivery_datetime() {
        let mut order = sample();
        assert_eq!(
            order.delivery_datetime().unwrap().to_string(),
            "2026-04-03 10:15:00"
        );

        order.delivery_time = String::new();
        assert_eq!(
            order.delivery_datetime().unwrap().to_string(),
            "2026-04-03 00:00:00"
        );

        order.delivery_date = "03/04/2026".to_owned();
        assert!(order.delivery_datetime().is_none());
    }

    #[test]
    fn test_normalize_delivery_date() {
        let mut order = sample();
        order.delivery_date = "2026-04-03T00:00:00.000Z".to_owned();
        order.normalize_delivery_date();
        assert_eq!(order.delivery_date, "2026-04-03");
    }

    #[test]
    fn test_normalize_delivery_time() {
        let mut order = sample();
        order.delivery_time = "09:30:00".to_owned();
        order.normalize_delivery_time();
        assert_eq!(order.delivery_time, "09:30");

        order.normalize_delivery_time();
        assert_eq!(order.delivery_time, "09:30");
    }
}
