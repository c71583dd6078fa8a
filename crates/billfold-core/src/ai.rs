//! Parsing helpers for AI-assisted receipt normalization
//!
//! AI model responses often wrap the JSON payload in extra prose. These
//! helpers extract the payload into a draft with optional fields, then
//! funnel the draft through the same defaulting pipeline as the text
//! parser so every extraction path agrees on one output schema. The AI
//! client itself lives outside this crate.

use std::collections::HashSet;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{LineItem, ReceiptRecord};
use crate::parse::{
    detect_category, normalize_date, normalize_time, round2, today_iso, ReceiptParser,
    UNKNOWN_VENDOR,
};

/// A partially-extracted receipt as returned by an AI model
///
/// Every field is optional; [`ReceiptDraft::into_record`] applies the
/// documented defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ReceiptDraft {
    #[serde(default, alias = "store", alias = "merchant")]
    pub vendor: Option<String>,
    #[serde(default)]
    pub bill_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub payment: Option<String>,
    #[serde(default)]
    pub subtotal: Option<f64>,
    #[serde(default)]
    pub tax: Option<f64>,
    #[serde(default, alias = "amount")]
    pub total: Option<f64>,
    #[serde(default)]
    pub items: Vec<DraftItem>,
}

/// An item row inside an AI response
#[derive(Debug, Deserialize)]
pub struct DraftItem {
    #[serde(alias = "description")]
    pub name: String,
    #[serde(alias = "amount")]
    pub price: f64,
}

impl ReceiptDraft {
    /// Normalize the draft into a complete record, applying the same
    /// fallbacks, rounding, and reconstruction priority as the text
    /// parser. Category resolves from the vendor name plus item names
    /// since no raw text is available here.
    pub fn into_record(self, parser: &ReceiptParser) -> ReceiptRecord {
        let vendor = self
            .vendor
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_VENDOR.to_string());
        let bill_id = self
            .bill_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| parser.next_bill_id());
        let date = self
            .date
            .as_deref()
            .and_then(normalize_date)
            .unwrap_or_else(today_iso);
        let time = self.time.as_deref().and_then(normalize_time);
        let payment = self.payment.as_deref().and_then(|p| p.parse().ok());

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for draft in self.items {
            let item = LineItem {
                name: draft.name.trim().to_string(),
                price: round2(draft.price),
            };
            if item.price > 0.0 && !item.name.is_empty() && seen.insert(item.dedup_key()) {
                items.push(item);
            }
        }

        let mut tax = self.tax.unwrap_or(0.0);
        let mut subtotal = self.subtotal.unwrap_or(0.0);
        let mut total = self.total.unwrap_or(0.0);

        if tax > total && total > 0.0 {
            tax = 0.0;
        }
        if subtotal == 0.0 && total > 0.0 {
            subtotal = total - tax;
        }
        if subtotal == 0.0 && !items.is_empty() {
            subtotal = items.iter().map(|i| i.price).sum();
        }
        if total == 0.0 {
            total = subtotal + tax;
        }

        let item_text = items
            .iter()
            .map(|i| i.name.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let category = detect_category(&vendor, &item_text);

        ReceiptRecord {
            bill_id,
            vendor,
            date,
            time,
            payment,
            subtotal: round2(subtotal),
            tax: round2(tax),
            amount: round2(total),
            category,
            items,
        }
    }
}

/// Extract the receipt JSON from an AI response
pub fn parse_receipt_response(response: &str) -> Result<ReceiptDraft> {
    let response = response.trim();
    let start = response.find('{');
    let end = response.rfind('}');

    match (start, end) {
        (Some(s), Some(e)) if s < e => {
            let json_str = &response[s..=e];
            serde_json::from_str(json_str)
                .map_err(|e| Error::InvalidData(format!("Invalid receipt JSON from AI: {}", e)))
        }
        _ => Err(Error::InvalidData(
            "No JSON found in AI receipt response".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, PaymentMethod};

    fn fixed_id_parser() -> ReceiptParser {
        ReceiptParser::new().with_id_source(|| "BILL-000001".to_string())
    }

    #[test]
    fn test_parse_receipt_response() {
        let response = r#"{
            "store": "Apollo Pharmacy",
            "date": "27/01/2024",
            "payment": "card",
            "items": [
                {"description": "Paracetamol", "amount": 3.50},
                {"description": "Bandages", "amount": 2.00}
            ],
            "subtotal": 5.50,
            "tax": 0.44,
            "total": 5.94
        }"#;
        let draft = parse_receipt_response(response).unwrap();
        assert_eq!(draft.vendor.as_deref(), Some("Apollo Pharmacy"));
        assert_eq!(draft.items.len(), 2);
        assert_eq!(draft.total, Some(5.94));
    }

    #[test]
    fn test_parse_receipt_response_with_prose() {
        let response = "Here is the extraction:\n{\"store\": \"Corner Shop\", \"total\": 10.0}\nDone!";
        let draft = parse_receipt_response(response).unwrap();
        assert_eq!(draft.vendor.as_deref(), Some("Corner Shop"));
        assert_eq!(draft.total, Some(10.0));
    }

    #[test]
    fn test_parse_receipt_response_without_json() {
        assert!(parse_receipt_response("no payload here").is_err());
    }

    #[test]
    fn test_empty_draft_gets_defaults() {
        let record = ReceiptDraft::default().into_record(&fixed_id_parser());
        assert_eq!(record.bill_id, "BILL-000001");
        assert_eq!(record.vendor, UNKNOWN_VENDOR);
        assert_eq!(record.date, today_iso());
        assert_eq!(record.amount, 0.0);
        assert_eq!(record.category, Category::Uncategorized);
    }

    #[test]
    fn test_draft_normalizes_like_text_pipeline() {
        let response = r#"{
            "store": "Apollo Pharmacy",
            "date": "27/01/2024",
            "payment": "card",
            "items": [{"description": "Paracetamol", "amount": 3.50}],
            "tax": 0.44,
            "total": 5.94
        }"#;
        let record = parse_receipt_response(response)
            .unwrap()
            .into_record(&fixed_id_parser());

        assert_eq!(record.date, "2024-01-27");
        assert_eq!(record.payment, Some(PaymentMethod::Card));
        assert_eq!(record.category, Category::Medical);
        assert_eq!(record.subtotal, 5.50);
        assert_eq!(record.amount, 5.94);
    }

    #[test]
    fn test_draft_items_deduplicate() {
        let draft = ReceiptDraft {
            total: Some(10.0),
            items: vec![
                DraftItem {
                    name: "Coffee".into(),
                    price: 3.5,
                },
                DraftItem {
                    name: "coffee".into(),
                    price: 3.5,
                },
            ],
            ..Default::default()
        };
        let record = draft.into_record(&fixed_id_parser());
        assert_eq!(record.items.len(), 1);
    }

    #[test]
    fn test_draft_total_reconstructed_from_items() {
        let draft = ReceiptDraft {
            items: vec![DraftItem {
                name: "Bread".into(),
                price: 35.0,
            }],
            tax: Some(2.8),
            ..Default::default()
        };
        let record = draft.into_record(&fixed_id_parser());
        assert_eq!(record.subtotal, 35.0);
        assert_eq!(record.amount, 37.8);
    }
}
