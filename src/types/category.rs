use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Canonical expense classification.
///
/// Serialized with its Chinese display label, which is what stored expense
/// rows and parsed voice input carry. Budget breakdowns key the same
/// categories by their English name (see [`ExpenseCategory::key`]).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum ExpenseCategory {
    #[serde(rename = "交通")]
    Transportation,
    #[serde(rename = "住宿")]
    Accommodation,
    #[serde(rename = "餐饮")]
    Food,
    #[serde(rename = "景点")]
    Attractions,
    #[serde(rename = "购物")]
    Shopping,
    #[serde(rename = "其他")]
    Other,
}

impl ExpenseCategory {
    /// All categories in reporting order
    pub const ALL: [ExpenseCategory; 6] = [
        ExpenseCategory::Transportation,
        ExpenseCategory::Accommodation,
        ExpenseCategory::Food,
        ExpenseCategory::Attractions,
        ExpenseCategory::Shopping,
        ExpenseCategory::Other,
    ];

    /// Chinese display label
    pub fn label(self) -> &'static str {
        match self {
            ExpenseCategory::Transportation => "交通",
            ExpenseCategory::Accommodation => "住宿",
            ExpenseCategory::Food => "餐饮",
            ExpenseCategory::Attractions => "景点",
            ExpenseCategory::Shopping => "购物",
            ExpenseCategory::Other => "其他",
        }
    }

    /// Budget breakdown key
    pub fn key(self) -> &'static str {
        match self {
            ExpenseCategory::Transportation => "transportation",
            ExpenseCategory::Accommodation => "accommodation",
            ExpenseCategory::Food => "food",
            ExpenseCategory::Attractions => "attractions",
            ExpenseCategory::Shopping => "shopping",
            ExpenseCategory::Other => "other",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.label() == label)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.key() == key)
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExpenseCategory {
    type Err = String;

    /// Accepts either the display label or the breakdown key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::from_label(trimmed)
            .or_else(|| Self::from_key(&trimmed.to_lowercase()))
            .ok_or_else(|| {
                let labels: Vec<&str> = Self::ALL.iter().map(|c| c.label()).collect();
                format!(
                    "invalid category '{}'; must be one of: {}",
                    s,
                    labels.join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_and_key_pairs() {
        assert_eq!(ExpenseCategory::Food.label(), "餐饮");
        assert_eq!(ExpenseCategory::Food.key(), "food");
        assert_eq!(
            ExpenseCategory::from_key("attractions"),
            Some(ExpenseCategory::Attractions)
        );
        assert_eq!(
            ExpenseCategory::from_label("住宿"),
            Some(ExpenseCategory::Accommodation)
        );
    }

    #[test]
    fn test_parse_accepts_both_forms() {
        assert_eq!("交通".parse::<ExpenseCategory>(), Ok(ExpenseCategory::Transportation));
        assert_eq!("Shopping".parse::<ExpenseCategory>(), Ok(ExpenseCategory::Shopping));
        assert!("飞机".parse::<ExpenseCategory>().is_err());
    }

    #[test]
    fn test_serde_uses_label() {
        let json = serde_json::to_string(&ExpenseCategory::Other).unwrap();
        assert_eq!(json, "\"其他\"");

        let parsed: ExpenseCategory = serde_json::from_str("\"景点\"").unwrap();
        assert_eq!(parsed, ExpenseCategory::Attractions);
    }
}
