//! Billfold Core Library
//!
//! Shared functionality for the Billfold receipt vault:
//! - Heuristic parser turning noisy OCR text into structured receipt records
//! - Advisory validation reports (required fields, date format, totals, tax rate, duplicates)
//! - Persistence seam consumed by storage collaborators
//! - Subscription detection and burn-rate analytics over the saved collection
//! - Decoding helpers for AI-assisted receipt normalization
//!
//! The crate owns no I/O: OCR, AI chat, and the database are external
//! collaborators reached through traits, and every operation in scope is
//! synchronous.

pub mod ai;
pub mod analytics;
pub mod error;
pub mod extract;
pub mod models;
pub mod parse;
pub mod store;
pub mod validate;

pub use ai::{parse_receipt_response, DraftItem, ReceiptDraft};
pub use analytics::{
    calculate_burn_rate, calculate_burn_rate_with_days, detect_subscriptions,
    predict_next_month_spending, search_receipts, SubscriptionConfig,
};
pub use error::{Error, Result};
pub use extract::{Entity, EntityExtractor, EntityKind};
pub use models::{
    BurnRate, BurnRateStatus, Category, CheckStatus, Confidence, Frequency, LineItem,
    PaymentMethod, ReceiptRecord, SubscriptionCandidate, ValidationCheck, ValidationReport,
};
pub use parse::{detect_category, ReceiptParser, UNKNOWN_VENDOR};
pub use store::{MemoryStore, ReceiptStore};
pub use validate::{totals_consistent, validate_receipt, ValidationConfig};
