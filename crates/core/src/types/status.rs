//! Role and status enums for users and orders.
//!
//! All of these serialize as `SCREAMING_SNAKE_CASE` strings on the wire and
//! map to Postgres enum types of the same spelling.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The wire spelling of this variant.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
    SuperAdmin,
}

string_enum!(UserRole, "user role", {
    Customer => "CUSTOMER",
    Admin => "ADMIN",
    SuperAdmin => "SUPER_ADMIN",
});

impl UserRole {
    /// Whether this role may use the admin surface.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }

    /// Whether this role may delete accounts.
    #[must_use]
    pub const fn is_super_admin(&self) -> bool {
        matches!(self, Self::SuperAdmin)
    }
}

/// Order fulfillment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

string_enum!(OrderStatus, "order status", {
    Pending => "PENDING",
    Confirmed => "CONFIRMED",
    Processing => "PROCESSING",
    Shipped => "SHIPPED",
    Delivered => "DELIVERED",
    Cancelled => "CANCELLED",
    Refunded => "REFUNDED",
});

impl OrderStatus {
    /// Customers may cancel an order only before it is processed.
    #[must_use]
    pub const fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Cancelled and refunded orders have released their stock or money and
    /// never leave that state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }

    /// Whether an admin may move an order from `self` to `next`.
    /// Re-applying the current status is always allowed.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        *self == next || !self.is_terminal()
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

string_enum!(PaymentStatus, "payment status", {
    Pending => "PENDING",
    Paid => "PAID",
    Failed => "FAILED",
    Refunded => "REFUNDED",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_screaming_snake() {
        let json = serde_json::to_string(&UserRole::SuperAdmin).unwrap();
        assert_eq!(json, "\"SUPER_ADMIN\"");
        let back: UserRole = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(back, UserRole::Admin);
    }

    #[test]
    fn test_role_privileges() {
        assert!(!UserRole::Customer.is_admin());
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::Admin.is_super_admin());
        assert!(UserRole::SuperAdmin.is_admin());
        assert!(UserRole::SuperAdmin.is_super_admin());
    }

    #[test]
    fn test_cancellable_statuses() {
        let cancellable: Vec<_> = OrderStatus::ALL
            .iter()
            .filter(|s| s.is_cancellable())
            .copied()
            .collect();
        assert_eq!(cancellable, vec![OrderStatus::Pending, OrderStatus::Confirmed]);
    }

    #[test]
    fn test_terminal_statuses_stay_put() {
        for next in OrderStatus::ALL {
            assert_eq!(
                OrderStatus::Cancelled.can_transition_to(*next),
                *next == OrderStatus::Cancelled
            );
            assert_eq!(
                OrderStatus::Refunded.can_transition_to(*next),
                *next == OrderStatus::Refunded
            );
        }
        assert!(OrderStatus::Delivered.can_transition_to(OrderStatus::Refunded));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_from_str_matches_display() {
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), *status);
        }
        for status in PaymentStatus::ALL {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn test_from_str_unknown() {
        let err = "SHIPPING".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown order status: SHIPPING");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(UserRole::default(), UserRole::Customer);
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(PaymentStatus::default(), PaymentStatus::Pending);
    }
}
