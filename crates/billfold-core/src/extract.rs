//! Entity-extractor seam for last-resort field recovery
//!
//! When the regex stages come up empty, the parser can consult an external
//! named-entity recognizer. The recognizer itself (spaCy, an LLM, anything
//! that can label spans) lives outside this crate; implementations only
//! need to return typed entities for a block of text.

/// Entity types the parser knows how to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Organization / store name
    Org,
    /// A date expression in any format
    Date,
    /// A time-of-day expression
    Time,
}

/// A labeled span of text
#[derive(Debug, Clone)]
pub struct Entity {
    pub kind: EntityKind,
    pub text: String,
}

/// External named-entity recognition capability
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Vec<Entity>;
}
