//! Order status workflows.
//!
//! The two variants use different workflows. Both cycle: advancing past the
//! last state starts over at `pendiente`.
//!
//! | Variant    | Sequence                                                       |
//! |------------|----------------------------------------------------------------|
//! | Server     | pendiente → confirmado → en_preparacion → listo → entregado    |
//! | Standalone | pendiente → en_proceso → completado → cancelado                |
//!
//! Deserialization never fails on a status string. A missing or `null`
//! status decodes as the initial state. The standalone workflow keeps any
//! other unrecognised value as [`LocalStatus::Unknown`] so it is written back
//! unchanged; the server workflow maps it to the initial state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid status: {0}")]
pub struct InvalidStatus(pub String);

/// A fixed, cyclic status sequence.
pub trait StatusWorkflow: Clone + Eq + Default + fmt::Debug + Send + Sync + 'static {
    /// Every state, in workflow order. The first entry is the initial state.
    const SEQUENCE: &'static [Self];

    /// Wire name of the state (e.g. `en_preparacion`).
    fn as_str(&self) -> &str;

    /// Human-readable label for the state.
    fn label(&self) -> &str;

    /// The state that follows this one, wrapping around at the end.
    /// A state outside [`Self::SEQUENCE`] advances to the initial state.
    #[must_use]
    fn next(&self) -> Self {
        let position = Self::SEQUENCE.iter().position(|s| s == self);
        position
            .and_then(|i| Self::SEQUENCE.get((i + 1) % Self::SEQUENCE.len()))
            .cloned()
            .unwrap_or_default()
    }

    /// Parse a wire name.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidStatus`] if `s` names no state of this workflow.
    fn parse(s: &str) -> Result<Self, InvalidStatus> {
        Self::SEQUENCE
            .iter()
            .find(|state| state.as_str() == s)
            .cloned()
            .ok_or_else(|| InvalidStatus(s.to_owned()))
    }

    /// Decode a stored value that may name no state of this workflow.
    #[must_use]
    fn from_wire(raw: String) -> Self {
        Self::parse(&raw).unwrap_or_default()
    }

    /// Advance from a raw status string. Unknown values restart the workflow.
    #[must_use]
    fn advance_raw(s: &str) -> Self {
        Self::parse(s).map_or_else(|_| Self::default(), |status| status.next())
    }
}

/// Server-side order workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
pub enum OrderStatus {
    /// Received, not yet confirmed with the customer.
    #[default]
    Pendiente,
    /// Confirmed with the customer.
    Confirmado,
    /// Being baked or packed.
    EnPreparacion,
    /// Ready for delivery.
    Listo,
    /// Delivered.
    Entregado,
}

impl StatusWorkflow for OrderStatus {
    const SEQUENCE: &'static [Self] = &[
        Self::Pendiente,
        Self::Confirmado,
        Self::EnPreparacion,
        Self::Listo,
        Self::Entregado,
    ];

    fn as_str(&self) -> &str {
        match self {
            Self::Pendiente => "pendiente",
            Self::Confirmado => "confirmado",
            Self::EnPreparacion => "en_preparacion",
            Self::Listo => "listo",
            Self::Entregado => "entregado",
        }
    }

    fn label(&self) -> &str {
        match self {
            Self::Pendiente => "Pendiente",
            Self::Confirmado => "Confirmado",
            Self::EnPreparacion => "En Preparación",
            Self::Listo => "Listo",
            Self::Entregado => "Entregado",
        }
    }
}

/// Standalone (local storage) order workflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum LocalStatus {
    /// Received.
    #[default]
    Pendiente,
    /// Being worked on.
    EnProceso,
    /// Done.
    Completado,
    /// Cancelled.
    Cancelado,
    /// A value written by another client. Kept verbatim, never matched by a
    /// status filter, and advanced to [`LocalStatus::Pendiente`].
    Unknown(String),
}

impl StatusWorkflow for LocalStatus {
    const SEQUENCE: &'static [Self] = &[
        Self::Pendiente,
        Self::EnProceso,
        Self::Completado,
        Self::Cancelado,
    ];

    fn as_str(&self) -> &str {
        match self {
            Self::Pendiente => "pendiente",
            Self::EnProceso => "en_proceso",
            Self::Completado => "completado",
            Self::Cancelado => "cancelado",
            Self::Unknown(raw) => raw,
        }
    }

    fn label(&self) -> &str {
        match self {
            Self::Pendiente => "Pendiente",
            Self::EnProceso => "En Proceso",
            Self::Completado => "Completado",
            Self::Cancelado => "Cancelado",
            Self::Unknown(raw) => raw,
        }
    }

    fn from_wire(raw: String) -> Self {
        Self::parse(&raw).unwrap_or(Self::Unknown(raw))
    }
}

macro_rules! impl_status_traits {
    ($name:ty) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = InvalidStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <Self as StatusWorkflow>::parse(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = Option::<String>::deserialize(deserializer)?;
                Ok(raw.map(<Self as StatusWorkflow>::from_wire).unwrap_or_default())
            }
        }
    };
}

impl_status_traits!(OrderStatus);
impl_status_traits!(LocalStatus);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_server_workflow_cycles() {
        let mut status = OrderStatus::default();
        let mut seen = vec![status];
        for _ in 0..4 {
            status = status.next();
            seen.push(status);
        }
        assert_eq!(seen, OrderStatus::SEQUENCE);
        assert_eq!(OrderStatus::Entregado.next(), OrderStatus::Pendiente);
    }

    #[test]
    fn test_local_workflow_cycles() {
        assert_eq!(LocalStatus::Pendiente.next(), LocalStatus::EnProceso);
        assert_eq!(LocalStatus::EnProceso.next(), LocalStatus::Completado);
        assert_eq!(LocalStatus::Completado.next(), LocalStatus::Cancelado);
        assert_eq!(LocalStatus::Cancelado.next(), LocalStatus::Pendiente);
    }

    #[test]
    fn test_advance_raw_unknown_restarts() {
        assert_eq!(OrderStatus::advance_raw("listo"), OrderStatus::Entregado);
        assert_eq!(OrderStatus::advance_raw("en_proceso"), OrderStatus::Pendiente);
        assert_eq!(LocalStatus::advance_raw("bogus"), LocalStatus::Pendiente);
    }

    #[test]
    fn test_from_str_strict() {
        assert_eq!(
            "en_preparacion".parse::<OrderStatus>().unwrap(),
            OrderStatus::EnPreparacion
        );
        let err = "cancelado".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid status: cancelado");
    }

    #[test]
    fn test_serde_wire_names() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::EnPreparacion).unwrap(),
            "\"en_preparacion\""
        );
        let status: LocalStatus = serde_json::from_str("\"en_proceso\"").unwrap();
        assert_eq!(status, LocalStatus::EnProceso);
    }

    #[test]
    fn test_foreign_local_status_is_kept() {
        let status: LocalStatus = serde_json::from_str("\"confirmado\"").unwrap();
        assert_eq!(status, LocalStatus::Unknown("confirmado".to_owned()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"confirmado\"");
        assert_eq!(status.next(), LocalStatus::Pendiente);
        assert!("confirmado".parse::<LocalStatus>().is_err());
    }

    #[test]
    fn test_foreign_server_status_restarts() {
        let status: OrderStatus = serde_json::from_str("\"en_proceso\"").unwrap();
        assert_eq!(status, OrderStatus::Pendiente);
    }

    #[test]
    fn test_null_status_is_initial_state() {
        let status: LocalStatus = serde_json::from_str("null").unwrap();
        assert_eq!(status, LocalStatus::Pendiente);
        let status: OrderStatus = serde_json::from_str("null").unwrap();
        assert_eq!(status, OrderStatus::Pendiente);
    }

    #[test]
    fn test_labels() {
        assert_eq!(OrderStatus::EnPreparacion.label(), "En Preparación");
        assert_eq!(LocalStatus::EnProceso.to_string(), "en_proceso");
    }
}
