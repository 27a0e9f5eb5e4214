//! Admin dashboard aggregates.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use emporium_core::ledger::{EntryKind, LedgerEntry, LedgerSummary};
use emporium_core::{LedgerEntryId, OrderId, OrderStatus, PaymentStatus, ProductId};

use super::order::AdminOrder;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_products: i64,
    pub total_orders: i64,
    /// Sum of totals of delivered orders.
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub images: Vec<String>,
    pub total_sold: i64,
    pub order_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent_orders: Vec<AdminOrder>,
    pub top_products: Vec<TopProduct>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// Activity over a trailing window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub period_days: i64,
    pub order_count: i64,
    pub revenue: Decimal,
    pub new_users: i64,
    pub orders_by_status: Vec<StatusCount>,
}

const SALES_CATEGORY: &str = "sales";
const REFUNDS_CATEGORY: &str = "refunds";

/// The money side of an order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderPayment {
    pub id: OrderId,
    pub order_number: String,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl OrderPayment {
    /// Ledger entries recorded for this order.
    ///
    /// Paid orders are approved income. Unpaid orders are pending income
    /// until cancelled or failed, then rejected. A refund adds an approved
    /// expense on top of the income it reverses.
    #[must_use]
    pub fn ledger_entries(&self) -> Vec<LedgerEntry> {
        let date = self.created_at.date_naive();
        let Ok(sale) = LedgerEntry::new(
            EntryKind::Income,
            self.total,
            &format!("Order {}", self.order_number),
            SALES_CATEGORY,
            date,
        ) else {
            return Vec::new();
        };
        let sale = LedgerEntry {
            id: LedgerEntryId::from_uuid(self.id.as_uuid()),
            ..sale
        };

        match self.payment_status {
            PaymentStatus::Paid => vec![sale.approve()],
            PaymentStatus::Pending if self.status == OrderStatus::Cancelled => {
                vec![sale.reject()]
            }
            PaymentStatus::Pending => vec![sale],
            PaymentStatus::Failed => vec![sale.reject()],
            PaymentStatus::Refunded => {
                let refund = LedgerEntry::new(
                    EntryKind::Expense,
                    self.total,
                    &format!("Refund of order {}", self.order_number),
                    REFUNDS_CATEGORY,
                    date,
                )
                .map(LedgerEntry::approve);
                std::iter::once(sale.approve()).chain(refund).collect()
            }
        }
    }
}

/// Ledger totals over a trailing window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    pub period_days: i64,
    pub summary: LedgerSummary,
}

impl Ledger {
    #[must_use]
    pub fn from_orders(period_days: i64, orders: &[OrderPayment]) -> Self {
        let entries: Vec<LedgerEntry> = orders.iter().flat_map(OrderPayment::ledger_entries).collect();
        Self {
            period_days,
            summary: LedgerSummary::from_entries(&entries),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order(total: i64, status: OrderStatus, payment_status: PaymentStatus) -> OrderPayment {
        OrderPayment {
            id: OrderId::new(),
            order_number: "ORD-1700000000000-ABCDEFGHI".to_string(),
            total: Decimal::new(total, 2),
            status,
            payment_status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_only_paid_orders_count_as_income() {
        let orders = [
            order(13_200, OrderStatus::Delivered, PaymentStatus::Paid),
            order(5_950, OrderStatus::Pending, PaymentStatus::Pending),
            order(4_000, OrderStatus::Cancelled, PaymentStatus::Pending),
            order(2_500, OrderStatus::Pending, PaymentStatus::Failed),
        ];
        let ledger = Ledger::from_orders(30, &orders);

        assert_eq!(ledger.summary.total_income, Decimal::new(13_200, 2));
        assert_eq!(ledger.summary.total_expenses, Decimal::ZERO);
        assert_eq!(ledger.summary.pending_count, 1);
        assert_eq!(ledger.summary.net, Decimal::new(13_200, 2));
    }

    #[test]
    fn test_refund_nets_out_its_sale() {
        let refunded = order(5_000, OrderStatus::Refunded, PaymentStatus::Refunded);
        let entries = refunded.ledger_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id.as_uuid(), refunded.id.as_uuid());

        let ledger = Ledger::from_orders(30, &[refunded]);
        assert_eq!(ledger.summary.total_income, Decimal::new(5_000, 2));
        assert_eq!(ledger.summary.total_expenses, Decimal::new(5_000, 2));
        assert_eq!(ledger.summary.net, Decimal::ZERO);
        assert_eq!(ledger.summary.by_category["refunds"], Decimal::new(-5_000, 2));
    }

    #[test]
    fn test_ledger_serializes_camel_case() {
        let ledger = Ledger::from_orders(
            30,
            &[order(1_000, OrderStatus::Confirmed, PaymentStatus::Paid)],
        );
        let json = serde_json::to_value(ledger).unwrap();
        assert_eq!(json["periodDays"], 30);
        assert_eq!(json["summary"]["totalIncome"], "10.00");
        assert_eq!(json["summary"]["byCategory"]["sales"], "10.00");
    }
}
