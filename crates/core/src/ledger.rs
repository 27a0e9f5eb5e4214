//! Income/expense ledger for the accounting dashboard.
//!
//! Entries start out `Pending` and only `Approved` entries count toward
//! totals. The summary is a pure fold over entries; persistence lives
//! elsewhere.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::LedgerEntryId;

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Income,
    Expense,
}

/// Review state of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Errors raised when recording an entry.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("amount must be greater than zero")]
    NonPositiveAmount,
    #[error("description is required")]
    MissingDescription,
    #[error("category is required")]
    MissingCategory,
}

/// A single income or expense record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub kind: EntryKind,
    pub amount: Decimal,
    pub description: String,
    pub category: String,
    pub date: NaiveDate,
    pub status: EntryStatus,
}

impl LedgerEntry {
    /// Record a new pending entry.
    ///
    /// # Errors
    ///
    /// Returns an error when the amount is not positive or the description
    /// or category is blank.
    pub fn new(
        kind: EntryKind,
        amount: Decimal,
        description: &str,
        category: &str,
        date: NaiveDate,
    ) -> Result<Self, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount);
        }
        let description = description.trim();
        if description.is_empty() {
            return Err(LedgerError::MissingDescription);
        }
        let category = category.trim();
        if category.is_empty() {
            return Err(LedgerError::MissingCategory);
        }

        Ok(Self {
            id: LedgerEntryId::new(),
            kind,
            amount,
            description: description.to_owned(),
            category: category.to_owned(),
            date,
            status: EntryStatus::Pending,
        })
    }

    #[must_use]
    pub fn approve(self) -> Self {
        Self {
            status: EntryStatus::Approved,
            ..self
        }
    }

    #[must_use]
    pub fn reject(self) -> Self {
        Self {
            status: EntryStatus::Rejected,
            ..self
        }
    }

    /// Signed contribution to net: income positive, expense negative.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            EntryKind::Income => self.amount,
            EntryKind::Expense => -self.amount,
        }
    }
}

/// Totals over a set of ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net: Decimal,
    pub pending_count: usize,
    /// Signed approved totals per category.
    pub by_category: BTreeMap<String, Decimal>,
}

impl LedgerSummary {
    /// Summarize entries. Rejected entries are ignored entirely.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        let mut summary = Self::default();

        for entry in entries {
            match entry.status {
                EntryStatus::Pending => summary.pending_count += 1,
                EntryStatus::Rejected => {}
                EntryStatus::Approved => {
                    match entry.kind {
                        EntryKind::Income => summary.total_income += entry.amount,
                        EntryKind::Expense => summary.total_expenses += entry.amount,
                    }
                    *summary
                        .by_category
                        .entry(entry.category.clone())
                        .or_default() += entry.signed_amount();
                }
            }
        }

        summary.net = summary.total_income - summary.total_expenses;
        summary
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn entry(kind: EntryKind, amount: &str, category: &str) -> LedgerEntry {
        LedgerEntry::new(kind, Decimal::from_str(amount).unwrap(), "entry", category, date())
            .unwrap()
    }

    #[test]
    fn test_new_entry_is_pending() {
        let e = entry(EntryKind::Income, "5000", "Sales Revenue");
        assert_eq!(e.status, EntryStatus::Pending);
    }

    #[test]
    fn test_new_entry_validation() {
        assert_eq!(
            LedgerEntry::new(EntryKind::Expense, Decimal::ZERO, "x", "y", date()),
            Err(LedgerError::NonPositiveAmount)
        );
        assert_eq!(
            LedgerEntry::new(EntryKind::Expense, Decimal::ONE, " ", "y", date()),
            Err(LedgerError::MissingDescription)
        );
        assert_eq!(
            LedgerEntry::new(EntryKind::Expense, Decimal::ONE, "x", "", date()),
            Err(LedgerError::MissingCategory)
        );
    }

    #[test]
    fn test_only_approved_entries_count() {
        let entries = vec![
            entry(EntryKind::Income, "5000", "Sales Revenue").approve(),
            entry(EntryKind::Expense, "250", "Office Supplies"),
            entry(EntryKind::Expense, "1200", "Marketing").approve(),
            entry(EntryKind::Expense, "999", "Marketing").reject(),
        ];

        let summary = LedgerSummary::from_entries(&entries);
        assert_eq!(summary.total_income, Decimal::from(5000));
        assert_eq!(summary.total_expenses, Decimal::from(1200));
        assert_eq!(summary.net, Decimal::from(3800));
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.by_category.get("Marketing"), Some(&Decimal::from(-1200)));
        assert!(!summary.by_category.contains_key("Office Supplies"));
    }

    #[test]
    fn test_empty_ledger() {
        let summary = LedgerSummary::from_entries(&[]);
        assert_eq!(summary, LedgerSummary::default());
    }
}
