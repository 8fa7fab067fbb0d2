//! Statistics page layout preference

use serde::{Deserialize, Serialize};

/// Cards on the statistics page that a user may reorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKey {
    Revenue,
    Sold,
    Instock,
}

impl CardKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardKey::Revenue => "revenue",
            CardKey::Sold => "sold",
            CardKey::Instock => "instock",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "revenue" => Some(CardKey::Revenue),
            "sold" => Some(CardKey::Sold),
            "instock" => Some(CardKey::Instock),
            _ => None,
        }
    }
}

pub const DEFAULT_CARD_ORDER: [CardKey; 3] = [CardKey::Revenue, CardKey::Sold, CardKey::Instock];

/// Validate a submitted card order: exactly the three known keys, each once
pub fn parse_card_order(order: &[String]) -> Result<[CardKey; 3], crate::DomainError> {
    if order.len() != 3 {
        return Err(crate::DomainError::InvalidCardOrder);
    }
    let mut keys = DEFAULT_CARD_ORDER;
    for (slot, raw) in keys.iter_mut().zip(order) {
        *slot = CardKey::parse(raw).ok_or(crate::DomainError::InvalidCardOrder)?;
    }
    if keys[0] == keys[1] || keys[1] == keys[2] || keys[0] == keys[2] {
        return Err(crate::DomainError::InvalidCardOrder);
    }
    Ok(keys)
}

/// Read a stored order, falling back to the default when it is missing or malformed
pub fn card_order_or_default(stored: Option<&[String]>) -> Vec<String> {
    let keys = stored
        .and_then(|s| parse_card_order(s).ok())
        .unwrap_or(DEFAULT_CARD_ORDER);
    keys.iter().map(|k| k.as_str().to_string()).collect()
}
