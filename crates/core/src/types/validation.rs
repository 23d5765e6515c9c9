//! Order input validation.
//!
//! An [`OrderDraft`] is what a client submits when creating or editing an
//! order. [`OrderDraft::validate`] trims every field, checks it against a
//! set of [`DraftRules`], and reports every failing field at once.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::order::OrderItem;
use super::status::StatusWorkflow;

/// Maximum customer name length.
pub const MAX_CUSTOMER_NAME: usize = 100;
/// Maximum phone number length.
pub const MAX_CUSTOMER_PHONE: usize = 20;
/// Maximum notes length.
pub const MAX_NOTES: usize = 500;

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field path (e.g. `customerName`, `items[1].product`).
    pub field: String,
    /// User-facing message.
    pub message: String,
}

/// All fields that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed: {}", summary(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    /// Returns the individual field errors.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Whether a given field failed.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

/// Which checks to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftRules {
    /// Enforce length limits and the `HH:MM` time format.
    pub enforce_limits: bool,
    /// Reject delivery dates before today.
    pub reject_past_dates: bool,
    /// Drop item rows with a blank product or quantity instead of rejecting them.
    pub drop_blank_items: bool,
}

impl DraftRules {
    /// Rules applied by the HTTP API.
    pub const SERVER: Self = Self {
        enforce_limits: true,
        reject_past_dates: true,
        drop_blank_items: false,
    };

    /// Rules applied by the standalone order book.
    pub const LOCAL: Self = Self {
        enforce_limits: false,
        reject_past_dates: false,
        drop_blank_items: true,
    };
}

/// Raw order input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub delivery_date: String,
    #[serde(default)]
    pub delivery_time: String,
    #[serde(default)]
    pub items: Vec<ItemDraft>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub total_amount: Option<String>,
    /// Optional explicit status, as a wire name.
    #[serde(default)]
    pub status: Option<String>,
}

/// Raw item input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub price: Option<String>,
}

/// A draft that passed validation. Every string is trimmed and optional
/// blanks are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidOrder<S> {
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub delivery_date: String,
    pub delivery_time: String,
    pub items: Vec<OrderItem>,
    pub notes: Option<String>,
    pub total_amount: Option<String>,
    pub status: Option<S>,
}

impl OrderDraft {
    /// Validate the draft.
    ///
    /// `today` is the first acceptable delivery date when
    /// [`DraftRules::reject_past_dates`] is set.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] listing every failing field.
    pub fn validate<S: StatusWorkflow>(
        &self,
        rules: DraftRules,
        today: NaiveDate,
    ) -> Result<ValidOrder<S>, ValidationErrors> {
        let mut errors = Vec::new();
        let mut fail = |field: &str, message: &str| {
            errors.push(FieldError {
                field: field.to_owned(),
                message: message.to_owned(),
            });
        };

        let customer_name = self.customer_name.trim().to_owned();
        if customer_name.is_empty() {
            fail("customerName", "customer name is required");
        } else if rules.enforce_limits && customer_name.chars().count() > MAX_CUSTOMER_NAME {
            fail(
                "customerName",
                "customer name cannot exceed 100 characters",
            );
        }

        let customer_phone = trimmed(self.customer_phone.as_deref());
        if rules.enforce_limits
            && customer_phone
                .as_ref()
                .is_some_and(|p| p.chars().count() > MAX_CUSTOMER_PHONE)
        {
            fail("customerPhone", "phone cannot exceed 20 characters");
        }

        let delivery_date = self.delivery_date.trim().to_owned();
        if delivery_date.is_empty() {
            fail("deliveryDate", "delivery date is required");
        } else {
            match NaiveDate::parse_from_str(&delivery_date, "%Y-%m-%d") {
                Ok(date) if delivery_date.len() == 10 => {
                    if rules.reject_past_dates && date < today {
                        fail("deliveryDate", "delivery date cannot be before today");
                    }
                }
                _ => fail("deliveryDate", "delivery date must be YYYY-MM-DD"),
            }
        }

        let mut delivery_time = self.delivery_time.trim().to_owned();
        if delivery_time.is_empty() {
            fail("deliveryTime", "delivery time is required");
        } else if rules.enforce_limits {
            match parse_clock(&delivery_time) {
                Some(time) => delivery_time = time.format("%H:%M").to_string(),
                None => fail("deliveryTime", "delivery time must be HH:MM"),
            }
        }

        let mut items = Vec::with_capacity(self.items.len());
        for (index, item) in self.items.iter().enumerate() {
            let product = item.product.trim();
            let quantity = item.quantity.trim();

            if rules.drop_blank_items && (product.is_empty() || quantity.is_empty()) {
                continue;
            }
            if product.is_empty() {
                fail(
                    &format!("items[{index}].product"),
                    "product name is required",
                );
            }
            if quantity.is_empty() {
                fail(&format!("items[{index}].quantity"), "quantity is required");
            }

            items.push(OrderItem {
                product: product.to_owned(),
                quantity: quantity.to_owned(),
                price: trimmed(item.price.as_deref()),
            });
        }
        if items.is_empty() {
            fail("items", "at least one product is required");
        }

        let notes = trimmed(self.notes.as_deref());
        if rules.enforce_limits && notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES) {
            fail("notes", "notes cannot exceed 500 characters");
        }

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match S::parse(raw) {
                Ok(status) => Some(status),
                Err(_) => {
                    fail("status", "invalid status");
                    None
                }
            },
        };

        if !errors.is_empty() {
            return Err(ValidationErrors(errors));
        }

        Ok(ValidOrder {
            customer_name,
            customer_phone,
            delivery_date,
            delivery_time,
            items,
            notes,
            total_amount: trimmed(self.total_amount.as_deref()),
            status,
        })
    }
}

/// Parse `H:MM` or `HH:MM` with hours 0-23 and minutes 00-59.
fn parse_clock(s: &str) -> Option<NaiveTime> {
    let (hours, minutes) = s.split_once(':')?;
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return None;
    }
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}
