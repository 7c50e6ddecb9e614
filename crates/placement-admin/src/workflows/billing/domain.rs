use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for billing plans held by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillingPlanId(pub String);

impl fmt::Display for BillingPlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fee category of a scheduled line item.
///
/// Codes this crate does not know are kept verbatim in [`ItemCategory::Other`] so they travel
/// back to the backend unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemCategory {
    ServiceFee,
    ArcFee,
    DormitoryFee,
    HealthCheckFee,
    InsuranceFee,
    Other(String),
}

impl ItemCategory {
    pub fn code(&self) -> &str {
        match self {
            ItemCategory::ServiceFee => "SERVICE_FEE",
            ItemCategory::ArcFee => "ARC_FEE",
            ItemCategory::DormitoryFee => "DORMITORY_FEE",
            ItemCategory::HealthCheckFee => "HEALTH_CHECK_FEE",
            ItemCategory::InsuranceFee => "INSURANCE_FEE",
            ItemCategory::Other(code) => code,
        }
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ItemCategory {
    type Err = LineKeyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "" => Err(LineKeyError::EmptyCategory),
            "SERVICE_FEE" => Ok(ItemCategory::ServiceFee),
            "ARC_FEE" => Ok(ItemCategory::ArcFee),
            "DORMITORY_FEE" => Ok(ItemCategory::DormitoryFee),
            "HEALTH_CHECK_FEE" => Ok(ItemCategory::HealthCheckFee),
            "INSURANCE_FEE" => Ok(ItemCategory::InsuranceFee),
            other => Ok(ItemCategory::Other(other.to_string())),
        }
    }
}

impl Serialize for ItemCategory {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for ItemCategory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Lifecycle of a single scheduled charge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineStatus {
    #[default]
    Pending,
    Confirmed,
    Invoiced,
    Cancelled,
}

/// Lifecycle of the plan as a whole.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    #[default]
    Draft,
    Active,
    Closed,
}

/// Whether an operator still has to look at the plan after regeneration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    #[default]
    NeedsReview,
    Reviewed,
}

/// One scheduled charge in a billing plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingPlanLineItem {
    pub billing_date: NaiveDate,
    pub item_category: ItemCategory,
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_prorated: bool,
    #[serde(default)]
    pub status: LineStatus,
}

/// Billing schedule attached to a worker's deployment contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingPlan {
    pub id: BillingPlanId,
    #[serde(default)]
    pub worker_id: Option<String>,
    #[serde(default)]
    pub status: PlanStatus,
    #[serde(default)]
    pub review_status: ReviewStatus,
    #[serde(default)]
    pub items: Vec<BillingPlanLineItem>,
}

impl BillingPlan {
    pub fn needs_review(&self) -> bool {
        self.review_status == ReviewStatus::NeedsReview
    }

    pub fn total(&self) -> Decimal {
        self.items.iter().map(|item| item.amount).sum()
    }
}

/// Stable identity of a line across simulations, independent of list position.
///
/// Lines are matched on billing date and category; `occurrence` separates repeated
/// date/category pairs in list order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineKey {
    pub billing_date: NaiveDate,
    pub category: ItemCategory,
    pub occurrence: u16,
}

impl LineKey {
    /// Keys for lines given as `(billing_date, category)` pairs, in the same order.
    pub fn assign<I>(lines: I) -> Vec<LineKey>
    where
        I: IntoIterator<Item = (NaiveDate, ItemCategory)>,
    {
        let mut seen: HashMap<(NaiveDate, ItemCategory), u16> = HashMap::new();
        lines
            .into_iter()
            .map(|(billing_date, category)| {
                let counter = seen.entry((billing_date, category.clone())).or_insert(0);
                let key = LineKey {
                    billing_date,
                    category,
                    occurrence: *counter,
                };
                *counter = counter.saturating_add(1);
                key
            })
            .collect()
    }

    pub fn of_items(items: &[BillingPlanLineItem]) -> Vec<LineKey> {
        Self::assign(
            items
                .iter()
                .map(|item| (item.billing_date, item.item_category.clone())),
        )
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.billing_date.format("%Y-%m-%d"),
            self.category.code(),
            self.occurrence
        )
    }
}

impl FromStr for LineKey {
    type Err = LineKeyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        // Unknown category codes may themselves contain ':', so split from both ends.
        let malformed = || LineKeyError::Malformed(raw.to_string());
        let (date, rest) = raw.trim().split_once(':').ok_or_else(malformed)?;
        let (category, occurrence) = rest.rsplit_once(':').ok_or_else(malformed)?;

        let billing_date =
            NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| malformed())?;
        let category = category.parse()?;
        let occurrence = occurrence.parse::<u16>().map_err(|_| malformed())?;

        Ok(LineKey {
            billing_date,
            category,
            occurrence,
        })
    }
}

impl Serialize for LineKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LineKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineKeyError {
    #[error("line key '{0}' must look like YYYY-MM-DD:CATEGORY:N")]
    Malformed(String),
    #[error("line key has an empty item category")]
    EmptyCategory,
}
