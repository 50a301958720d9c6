//! Portion scaling
//!
//! A food's stored values describe its medium (reference) portion. Every food
//! is scaled with the same fixed multiplier table.

use serde::{Deserialize, Serialize};

use crate::models::Nutrition;
use super::body::round1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortionSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl PortionSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortionSize::Small => "small",
            PortionSize::Medium => "medium",
            PortionSize::Large => "large",
        }
    }

    /// Strict parse; `None` for anything but small/medium/large
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "small" => Some(PortionSize::Small),
            "medium" => Some(PortionSize::Medium),
            "large" => Some(PortionSize::Large),
            _ => None,
        }
    }

    /// Lenient parse used for stored and user-entered labels
    ///
    /// Unknown labels are treated as medium.
    pub fn from_str(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            tracing::warn!("Unknown portion size '{}', treating as medium", s);
            PortionSize::Medium
        })
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            PortionSize::Small => 0.75,
            PortionSize::Medium => 1.0,
            PortionSize::Large => 1.5,
        }
    }
}

/// Per-reference-portion nutrition of one food
///
/// Macro fields are optional; a missing value counts as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodNutrition {
    pub name: String,
    pub calories: i64,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
}

impl FoodNutrition {
    /// Nutrition for the requested portion
    ///
    /// Calories are rounded to whole kcal, the rest to one decimal.
    pub fn for_portion(&self, portion: PortionSize) -> Nutrition {
        let multiplier = portion.multiplier();
        let scale = |value: Option<f64>| round1(value.unwrap_or(0.0) * multiplier);

        Nutrition {
            calories: (self.calories as f64 * multiplier).round() as i64,
            protein: scale(self.protein),
            carbs: scale(self.carbs),
            fat: scale(self.fat),
            fiber: scale(self.fiber),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rice() -> FoodNutrition {
        FoodNutrition {
            name: "Rice".to_string(),
            calories: 200,
            protein: Some(4.3),
            carbs: Some(44.5),
            fat: Some(0.4),
            fiber: Some(0.6),
        }
    }

    #[test]
    fn test_calories_per_portion() {
        let food = rice();
        assert_eq!(food.for_portion(PortionSize::Small).calories, 150);
        assert_eq!(food.for_portion(PortionSize::Medium).calories, 200);
        assert_eq!(food.for_portion(PortionSize::Large).calories, 300);
    }

    #[test]
    fn test_macros_rounded_to_one_decimal() {
        let large = rice().for_portion(PortionSize::Large);
        assert_eq!(large.protein, 6.5);   // 6.45
        assert_eq!(large.carbs, 66.8);    // 66.75
        assert_eq!(large.fat, 0.6);
        assert_eq!(large.fiber, 0.9);

        let small = rice().for_portion(PortionSize::Small);
        assert_eq!(small.protein, 3.2);   // 3.225
        assert_eq!(small.carbs, 33.4);    // 33.375
    }

    #[test]
    fn test_calories_round_to_nearest() {
        let food = FoodNutrition { name: "Idli".to_string(), calories: 39, ..Default::default() };
        // 29.25 and 58.5
        assert_eq!(food.for_portion(PortionSize::Small).calories, 29);
        assert_eq!(food.for_portion(PortionSize::Large).calories, 59);
    }

    #[test]
    fn test_missing_macros_scale_to_zero() {
        let food = FoodNutrition { name: "Tea".to_string(), calories: 30, ..Default::default() };
        let n = food.for_portion(PortionSize::Large);
        assert_eq!(n.calories, 45);
        assert_eq!(n.protein, 0.0);
        assert_eq!(n.fiber, 0.0);
    }

    #[test]
    fn test_unknown_portion_defaults_to_medium() {
        assert_eq!(PortionSize::from_str("LARGE"), PortionSize::Large);
        assert_eq!(PortionSize::from_str("jumbo"), PortionSize::Medium);
        assert_eq!(PortionSize::from_str(""), PortionSize::Medium);
        assert_eq!(PortionSize::parse("jumbo"), None);
    }
}
