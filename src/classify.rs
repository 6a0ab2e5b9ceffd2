//! A tailor-made match engine to route payables to a payment group by vendor name.

use crate::Cell;

/// The payment group of beverage and wine suppliers.
pub const BEVERAGES_GROUP: &str = "1106020000";
/// The payment group of every other supplier.
pub const GENERAL_GROUP: &str = "1106010000";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Statement {
    pub operation: Operation,
    pub value: String,
}

/// All operations compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Operation {
    Contains,
    Equals,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rule {
    /// All statements have to be true for a match
    pub statements: Vec<Statement>,
    /// The payment group to assign if the rule matches.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Engine {
    pub rules: Vec<Rule>,
    /// The payment group of vendors no rule matches.
    pub default: String,
}

impl Default for Engine {
    fn default() -> Self {
        let contains = |keyword: &str| Rule {
            statements: vec![Statement {
                operation: Operation::Contains,
                value: keyword.into(),
            }],
            value: BEVERAGES_GROUP.into(),
        };
        Engine {
            rules: vec![contains("BEBIDAS"), contains("VINHO")],
            default: GENERAL_GROUP.into(),
        }
    }
}

impl Statement {
    /// `vendor` is expected to be upper-cased already.
    pub fn matches(&self, vendor: &str) -> bool {
        let value = self.value.to_uppercase();
        match self.operation {
            Operation::Contains => vendor.contains(&value),
            Operation::Equals => vendor == value,
            Operation::StartsWith => vendor.starts_with(&value),
            Operation::EndsWith => vendor.ends_with(&value),
        }
    }
}

impl Rule {
    pub fn matches(&self, vendor: &str) -> bool {
        self.statements.iter().all(|stm| stm.matches(vendor))
    }
}

impl Engine {
    pub fn matching_rule(&self, vendor: &str) -> Option<&Rule> {
        let vendor = vendor.trim().to_uppercase();
        self.rules
            .iter()
            .find_map(|rule| rule.matches(&vendor).then_some(rule))
    }

    /// Return the payment group for the vendor-name `cell`.
    ///
    /// Only text is matched against the rules, anything else lands in the default group.
    pub fn classify(&self, cell: &Cell) -> &str {
        cell.as_text()
            .and_then(|vendor| self.matching_rule(vendor))
            .map_or(self.default.as_str(), |rule| rule.value.as_str())
    }
}
