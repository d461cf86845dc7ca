//! Item row token classification.

use rust_decimal::Decimal;

use super::amounts::parse_amount;
use super::patterns::{NUMBER_TOKEN, TAX_EXEMPT_MARKERS, TAX_RATE_TOKEN};

/// A classified item-row token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Plain decimal number (quantity, price, amount, tax).
    Number(Decimal),
    /// Percent-suffixed number, i.e. a tax rate.
    TaxRate(String),
    /// Tax exemption marker printed in the rate column.
    TaxExempt(String),
    /// Recognised unit of measure.
    Unit(String),
    /// Anything else; candidates for the model field.
    Text(String),
}

impl Token {
    /// Whether the token takes part in quantity/price reasoning.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Token::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Whitelist of unit-of-measure tokens, matched case-insensitively.
#[derive(Debug, Clone)]
pub struct UnitTable {
    units: Vec<String>,
}

impl UnitTable {
    pub fn new<I, S>(units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            units: units
                .into_iter()
                .map(|u| u.as_ref().trim().to_lowercase())
                .filter(|u| !u.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        let token = token.trim().to_lowercase();
        self.units.iter().any(|u| *u == token)
    }

    /// Classify one token.
    pub fn classify(&self, token: &str) -> Token {
        let token = token.trim();

        if NUMBER_TOKEN.is_match(token) {
            if let Some(n) = parse_amount(token) {
                return Token::Number(n);
            }
        }
        if TAX_RATE_TOKEN.is_match(token) {
            return Token::TaxRate(token.to_string());
        }
        if TAX_EXEMPT_MARKERS.contains(&token) {
            return Token::TaxExempt(token.to_string());
        }
        if self.contains(token) {
            return Token::Unit(token.to_string());
        }
        Token::Text(token.to_string())
    }

    /// Split fragments on whitespace and classify every piece.
    pub fn tokenize<'a, I>(&self, fragments: I) -> Vec<Token>
    where
        I: IntoIterator<Item = &'a str>,
    {
        fragments
            .into_iter()
            .flat_map(str::split_whitespace)
            .map(|t| self.classify(t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::ExtractionConfig;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn table() -> UnitTable {
        UnitTable::new(&ExtractionConfig::default().units)
    }

    #[test]
    fn test_classify() {
        let table = table();
        assert_eq!(table.classify("10"), Token::Number(Decimal::from(10)));
        assert_eq!(
            table.classify("-5.25"),
            Token::Number(Decimal::from_str("-5.25").unwrap())
        );
        assert_eq!(table.classify("13%"), Token::TaxRate("13%".to_string()));
        assert_eq!(table.classify("免税"), Token::TaxExempt("免税".to_string()));
        assert_eq!(table.classify("盒"), Token::Unit("盒".to_string()));
        assert_eq!(table.classify("KG"), Token::Unit("KG".to_string()));
        assert_eq!(table.classify("H910Plus"), Token::Text("H910Plus".to_string()));
        assert_eq!(table.classify("１２"), Token::Text("１２".to_string()));
    }

    #[test]
    fn test_tokenize_splits_fragments() {
        let tokens = table().tokenize(["500ml 瓶", " 2 ", "13%"]);
        assert_eq!(
            tokens,
            vec![
                Token::Text("500ml".to_string()),
                Token::Unit("瓶".to_string()),
                Token::Number(Decimal::from(2)),
                Token::TaxRate("13%".to_string()),
            ]
        );
    }

    #[test]
    fn test_multi_glyph_units_are_whole_tokens() {
        let table = table();
        assert!(table.contains("kg"));
        assert!(!table.contains("个个"));
        assert!(!table.contains("箱子"));
    }
}
