use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{BillingPlanLineItem, ItemCategory, LineKey, LineStatus};

/// Annotated line as returned by the backend simulation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffLineItem {
    pub billing_date: NaiveDate,
    pub item_category: ItemCategory,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_prorated: bool,
    #[serde(default)]
    pub status: LineStatus,
    pub suggested_amount: Decimal,
    #[serde(default)]
    pub existing_amount: Option<Decimal>,
    #[serde(default)]
    pub diff_amount: Decimal,
    #[serde(default)]
    pub is_different: bool,
}

impl DiffLineItem {
    /// Annotate a simulated line against the stored amount, if any.
    pub fn annotate(simulated: &BillingPlanLineItem, existing_amount: Option<Decimal>) -> Self {
        let suggested_amount = simulated.amount;
        let diff_amount = existing_amount
            .map(|existing| suggested_amount - existing)
            .unwrap_or(suggested_amount);
        let is_different = existing_amount.map_or(true, |existing| existing != suggested_amount);

        Self {
            billing_date: simulated.billing_date,
            item_category: simulated.item_category.clone(),
            amount: existing_amount.unwrap_or(suggested_amount),
            description: simulated.description.clone(),
            is_prorated: simulated.is_prorated,
            status: simulated.status,
            suggested_amount,
            existing_amount,
            diff_amount,
            is_different,
        }
    }
}

/// Payload of `POST /billing-plans/:id/simulate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResponse {
    #[serde(default)]
    pub items: Option<Vec<DiffLineItem>>,
}

/// How a simulated line relates to the stored plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineChange {
    Unchanged { amount: Decimal },
    Changed { existing: Decimal, suggested: Decimal },
    New { suggested: Decimal },
}

impl LineChange {
    pub fn classify(existing: Option<Decimal>, suggested: Decimal) -> Self {
        match existing {
            None => LineChange::New { suggested },
            Some(existing) if existing != suggested => LineChange::Changed {
                existing,
                suggested,
            },
            Some(amount) => LineChange::Unchanged { amount },
        }
    }

    pub fn is_different(&self) -> bool {
        !matches!(self, LineChange::Unchanged { .. })
    }

    /// Signed change the simulation proposes.
    pub fn delta(&self) -> Decimal {
        match *self {
            LineChange::Unchanged { .. } => Decimal::ZERO,
            LineChange::Changed {
                existing,
                suggested,
            } => suggested - existing,
            LineChange::New { suggested } => suggested,
        }
    }

    /// Amount to persist, or `None` when the line should be dropped.
    pub fn resolve(&self, accepted: bool) -> Option<Decimal> {
        match *self {
            LineChange::Unchanged { amount } => Some(amount),
            LineChange::Changed {
                existing,
                suggested,
            } => Some(if accepted { suggested } else { existing }),
            LineChange::New { suggested } => accepted.then_some(suggested),
        }
    }
}

/// Line fields shared by the stored and simulated versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineTemplate {
    pub billing_date: NaiveDate,
    pub item_category: ItemCategory,
    pub description: String,
    pub is_prorated: bool,
    pub status: LineStatus,
}

impl LineTemplate {
    fn with_amount(&self, amount: Decimal) -> BillingPlanLineItem {
        BillingPlanLineItem {
            billing_date: self.billing_date,
            item_category: self.item_category.clone(),
            amount,
            description: self.description.clone(),
            is_prorated: self.is_prorated,
            status: self.status,
        }
    }
}

/// A reviewed line: stable key, shared fields, and its classified change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffLine {
    pub key: LineKey,
    pub template: LineTemplate,
    pub change: LineChange,
}

impl DiffLine {
    pub fn is_different(&self) -> bool {
        self.change.is_different()
    }

    pub fn resolve(&self, accepted: bool) -> Option<BillingPlanLineItem> {
        self.change
            .resolve(accepted)
            .map(|amount| self.template.with_amount(amount))
    }
}

/// Convert backend annotations into keyed, classified lines.
///
/// Classification follows the amounts; a disagreeing `isDifferent` flag is logged and ignored.
pub fn lines_from_wire(items: Vec<DiffLineItem>) -> Vec<DiffLine> {
    let keys = LineKey::assign(
        items
            .iter()
            .map(|item| (item.billing_date, item.item_category.clone())),
    );

    items
        .into_iter()
        .zip(keys)
        .map(|(item, key)| {
            let change = LineChange::classify(item.existing_amount, item.suggested_amount);
            if change.is_different() != item.is_different {
                warn!(
                    line = %key,
                    reported = item.is_different,
                    derived = change.is_different(),
                    "simulation difference flag disagrees with amounts"
                );
            }

            DiffLine {
                key,
                template: LineTemplate {
                    billing_date: item.billing_date,
                    item_category: item.item_category,
                    description: item.description,
                    is_prorated: item.is_prorated,
                    status: item.status,
                },
                change,
            }
        })
        .collect()
}

/// Final item list: suggested if accepted, else existing, else dropped.
pub fn resolve_lines(
    lines: &[DiffLine],
    acceptance: &BTreeMap<LineKey, bool>,
) -> Vec<BillingPlanLineItem> {
    lines
        .iter()
        .filter_map(|line| {
            let accepted = acceptance.get(&line.key).copied().unwrap_or(false);
            line.resolve(accepted)
        })
        .collect()
}

/// Result of comparing a stored item list with a freshly generated one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub lines: Vec<DiffLineItem>,
    /// Stored lines the simulation no longer produces.
    pub retired: Vec<BillingPlanLineItem>,
}

/// Annotate `simulated` against `existing`, matching lines by [`LineKey`].
pub fn reconcile(
    existing: &[BillingPlanLineItem],
    simulated: &[BillingPlanLineItem],
) -> Reconciliation {
    let mut stored: HashMap<LineKey, &BillingPlanLineItem> =
        LineKey::of_items(existing).into_iter().zip(existing).collect();
    let simulated_keys = LineKey::of_items(simulated);

    let lines = simulated
        .iter()
        .zip(simulated_keys)
        .map(|(item, key)| {
            let existing_amount = stored.remove(&key).map(|stored| stored.amount);
            DiffLineItem::annotate(item, existing_amount)
        })
        .collect();

    let mut retired: Vec<BillingPlanLineItem> = stored.into_values().cloned().collect();
    retired.sort_by(|a, b| {
        (a.billing_date, &a.item_category).cmp(&(b.billing_date, &b.item_category))
    });

    Reconciliation { lines, retired }
}
