//! Domain models for Billfold

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single purchased item extracted from a receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub price: f64,
}

impl LineItem {
    /// Uniqueness key within one receipt: lowercased name plus price in cents.
    pub fn dedup_key(&self) -> (String, i64) {
        (self.name.to_lowercase(), (self.price * 100.0).round() as i64)
    }
}

/// Payment method used on a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Upi => "upi",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "card" | "credit" | "debit" => Ok(Self::Card),
            "upi" => Ok(Self::Upi),
            _ => Err(format!("Unknown payment method: {}", s)),
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Spending category assigned to a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Category {
    Utility,
    Food,
    Grocery,
    Medical,
    Travel,
    Shopping,
    Entertainment,
    #[default]
    Uncategorized,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utility => "Utility",
            Self::Food => "Food",
            Self::Grocery => "Grocery",
            Self::Medical => "Medical",
            Self::Travel => "Travel",
            Self::Shopping => "Shopping",
            Self::Entertainment => "Entertainment",
            Self::Uncategorized => "Uncategorized",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "utility" => Ok(Self::Utility),
            "food" => Ok(Self::Food),
            "grocery" => Ok(Self::Grocery),
            "medical" => Ok(Self::Medical),
            "travel" => Ok(Self::Travel),
            "shopping" => Ok(Self::Shopping),
            "entertainment" => Ok(Self::Entertainment),
            "uncategorized" => Ok(Self::Uncategorized),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured receipt extracted from OCR text
///
/// The parser always produces a complete record: fields it cannot recover
/// fall back to documented defaults. Records built outside the parser may
/// carry empty strings for `bill_id`/`vendor`/`date`, which the validator
/// treats as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    /// Unique identifier; synthesized as `BILL-<6 digits>` when not found
    pub bill_id: String,
    pub vendor: String,
    /// ISO `YYYY-MM-DD`
    pub date: String,
    /// 12-hour clock, e.g. `03:45 PM`; None when not found
    pub time: Option<String>,
    pub payment: Option<PaymentMethod>,
    pub subtotal: f64,
    pub tax: f64,
    /// Grand total
    pub amount: f64,
    pub category: Category,
    /// Insertion order matches text order
    pub items: Vec<LineItem>,
}

impl ReceiptRecord {
    /// Parse the record's date string; None when it is not valid ISO.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }
}

/// Outcome of one validation check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Success,
    Error,
}

/// A single entry in a validation report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub title: String,
    pub status: CheckStatus,
    pub message: String,
}

/// Ordered validation results plus the overall verdict
///
/// Created fresh per validation call and never mutated afterwards. The
/// report is advisory: callers persist the record regardless of `passed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checks: Vec<ValidationCheck>,
    pub passed: bool,
}

/// Billing cadence of a detected subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Detection confidence for a subscription candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recurring-charge candidate derived from the persisted collection
///
/// Ephemeral: computed on demand and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionCandidate {
    pub vendor: String,
    pub avg_amount: f64,
    pub frequency: Frequency,
    pub next_due: NaiveDate,
    pub confidence: Confidence,
}

/// Budget pacing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurnRateStatus {
    OverBudget,
    UnderBudget,
    OnTrack,
}

impl BurnRateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OverBudget => "Over Budget",
            Self::UnderBudget => "Under Budget",
            Self::OnTrack => "On Track",
        }
    }
}

impl std::fmt::Display for BurnRateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Burn-rate projection for a partial budget period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurnRate {
    pub budget: f64,
    pub current: f64,
    pub remaining: f64,
    /// Capped at 100
    pub percent_used: f64,
    pub status: BurnRateStatus,
    pub projected: f64,
}
