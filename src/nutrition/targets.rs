//! Calorie and macronutrient targets
//!
//! Basal metabolic rate (Mifflin-St Jeor), total daily energy expenditure and
//! the daily calorie/macro targets derived from them.
//!
//! The goal adjustment is additive: a 500 kcal deficit for weight loss and a
//! 500 kcal surplus for gain.

use serde::{Deserialize, Serialize};

/// Calorie offset applied for weight loss / gain goals
pub const GOAL_CALORIE_OFFSET: f64 = 500.0;

/// Protein grams per kilogram of body weight
pub const PROTEIN_G_PER_KG: f64 = 1.6;
/// Share of calories from carbohydrate
pub const CARBS_CALORIE_SHARE: f64 = 0.5;
/// Share of calories from fat
pub const FAT_CALORIE_SHARE: f64 = 0.25;
pub const KCAL_PER_G_CARBS: f64 = 4.0;
pub const KCAL_PER_G_FAT: f64 = 9.0;

/// Multiplier used when an activity level is not recognized
pub const DEFAULT_ACTIVITY_MULTIPLIER: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Other,
}

impl Gender {
    /// "male" in any case is male; any other non-blank value is other
    pub fn from_str(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.eq_ignore_ascii_case("male") {
            Some(Gender::Male)
        } else {
            Some(Gender::Other)
        }
    }

    /// Constant term of the Mifflin-St Jeor equation
    fn bmr_offset(&self) -> f64 {
        match self {
            Gender::Male => 5.0,
            Gender::Other => -161.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sedentary" => Some(ActivityLevel::Sedentary),
            "light" => Some(ActivityLevel::Light),
            "moderate" => Some(ActivityLevel::Moderate),
            "active" => Some(ActivityLevel::Active),
            "very active" | "very_active" => Some(ActivityLevel::VeryActive),
            _ => None,
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }
}

/// Activity multiplier for a free-form label
///
/// Unknown labels fall back to the sedentary multiplier.
pub fn activity_multiplier(label: &str) -> f64 {
    match ActivityLevel::from_str(label) {
        Some(level) => level.multiplier(),
        None => {
            tracing::warn!(
                "Unknown activity level '{}', using multiplier {}",
                label,
                DEFAULT_ACTIVITY_MULTIPLIER
            );
            DEFAULT_ACTIVITY_MULTIPLIER
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthGoal {
    WeightLoss,
    Maintenance,
    Gain,
}

impl HealthGoal {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', " ").as_str() {
            "weight loss" => Some(HealthGoal::WeightLoss),
            "maintenance" => Some(HealthGoal::Maintenance),
            "gain" | "weight gain" => Some(HealthGoal::Gain),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthGoal::WeightLoss => "weight loss",
            HealthGoal::Maintenance => "maintenance",
            HealthGoal::Gain => "gain",
        }
    }

    /// Additive calorie adjustment for this goal
    pub fn calorie_adjustment(&self) -> f64 {
        match self {
            HealthGoal::WeightLoss => -GOAL_CALORIE_OFFSET,
            HealthGoal::Maintenance => 0.0,
            HealthGoal::Gain => GOAL_CALORIE_OFFSET,
        }
    }
}

/// Anthropometric snapshot of a user
///
/// Categorical fields are kept as the raw labels the user entered so that
/// unknown activity levels can fall back at calculation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyProfile {
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub activity_level: Option<String>,
    pub health_goal: Option<String>,
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

impl BodyProfile {
    /// Mifflin-St Jeor basal metabolic rate in kcal/day
    pub fn bmr(&self) -> Option<f64> {
        let weight = positive(self.weight_kg)?;
        let height = positive(self.height_cm)?;
        let age = self.age.filter(|a| *a > 0)? as f64;
        let gender = Gender::from_str(self.gender.as_deref()?)?;

        Some(calculate_bmr(weight, height, age, gender))
    }

    /// BMR scaled by the activity multiplier
    pub fn tdee(&self) -> Option<f64> {
        let bmr = self.bmr()?;
        let activity = self.activity_level.as_deref()?;
        Some(bmr * activity_multiplier(activity))
    }

    /// Daily calorie target after the goal adjustment, truncated to whole kcal
    ///
    /// `None` when the adjusted target is not a positive calorie count.
    pub fn daily_calorie_target(&self) -> Option<i64> {
        let tdee = self.tdee()?;
        let label = self.health_goal.as_deref()?;
        let goal = HealthGoal::from_str(label).unwrap_or_else(|| {
            tracing::warn!("Unknown health goal '{}', applying no adjustment", label);
            HealthGoal::Maintenance
        });

        let target = (tdee + goal.calorie_adjustment()) as i64;
        if target <= 0 {
            tracing::warn!("Calorie target {} kcal is not positive, leaving targets unset", target);
            return None;
        }
        Some(target)
    }

    /// Full macro targets, or `None` when any required field is missing
    pub fn macro_targets(&self) -> Option<MacroTargets> {
        let calories = self.daily_calorie_target()?;
        let weight = positive(self.weight_kg)?;
        Some(MacroTargets::from_calories(calories, weight))
    }
}

/// BMR for already validated inputs
pub fn calculate_bmr(weight_kg: f64, height_cm: f64, age: f64, gender: Gender) -> f64 {
    10.0 * weight_kg + 6.25 * height_cm - 5.0 * age + gender.bmr_offset()
}

/// Daily calorie and macronutrient targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub calories: i64,
    pub protein_g: i64,
    pub carbs_g: i64,
    pub fat_g: i64,
}

impl MacroTargets {
    pub const DEFAULT_CALORIES: i64 = 2000;
    pub const DEFAULT_PROTEIN_G: i64 = 125;
    pub const DEFAULT_CARBS_G: i64 = 250;
    pub const DEFAULT_FAT_G: i64 = 55;

    pub fn from_calories(calories: i64, weight_kg: f64) -> Self {
        let kcal = calories as f64;
        Self {
            calories,
            protein_g: (weight_kg * PROTEIN_G_PER_KG) as i64,
            carbs_g: (kcal * CARBS_CALORIE_SHARE / KCAL_PER_G_CARBS) as i64,
            fat_g: (kcal * FAT_CALORIE_SHARE / KCAL_PER_G_FAT) as i64,
        }
    }
}

impl Default for MacroTargets {
    fn default() -> Self {
        Self {
            calories: Self::DEFAULT_CALORIES,
            protein_g: Self::DEFAULT_PROTEIN_G,
            carbs_g: Self::DEFAULT_CARBS_G,
            fat_g: Self::DEFAULT_FAT_G,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_profile(goal: &str) -> BodyProfile {
        BodyProfile {
            height_cm: Some(175.0),
            weight_kg: Some(70.0),
            age: Some(25),
            gender: Some("male".to_string()),
            activity_level: Some("moderate".to_string()),
            health_goal: Some(goal.to_string()),
        }
    }

    #[test]
    fn test_bmr_and_tdee_reference_values() {
        let profile = reference_profile("maintenance");
        assert_eq!(profile.bmr(), Some(1673.75));
        let tdee = profile.tdee().unwrap();
        assert!((tdee - 2594.3125).abs() < 1e-9);
    }

    #[test]
    fn test_bmr_at_age_thirty() {
        let mut profile = reference_profile("weight loss");
        profile.age = Some(30);
        assert_eq!(profile.bmr(), Some(1648.75));
        assert!((profile.tdee().unwrap() - 2555.5625).abs() < 1e-9);
        assert_eq!(profile.daily_calorie_target(), Some(2055));
    }

    #[test]
    fn test_additive_goal_policy() {
        assert_eq!(reference_profile("weight loss").daily_calorie_target(), Some(2094));
        assert_eq!(reference_profile("maintenance").daily_calorie_target(), Some(2594));
        assert_eq!(reference_profile("gain").daily_calorie_target(), Some(3094));
    }

    #[test]
    fn test_female_bmr_offset() {
        let mut profile = reference_profile("maintenance");
        profile.gender = Some("female".to_string());
        assert_eq!(profile.bmr(), Some(1507.75));
    }

    #[test]
    fn test_macro_targets_truncate() {
        let targets = reference_profile("weight loss").macro_targets().unwrap();
        assert_eq!(targets.calories, 2094);
        assert_eq!(targets.protein_g, 112);
        assert_eq!(targets.carbs_g, 261);
        assert_eq!(targets.fat_g, 58);
    }

    #[test]
    fn test_missing_field_is_undefined() {
        let mut profile = reference_profile("gain");
        profile.age = None;
        assert_eq!(profile.bmr(), None);
        assert_eq!(profile.macro_targets(), None);

        let mut profile = reference_profile("gain");
        profile.gender = Some("  ".to_string());
        assert_eq!(profile.bmr(), None);

        let mut profile = reference_profile("gain");
        profile.activity_level = None;
        assert!(profile.bmr().is_some());
        assert_eq!(profile.tdee(), None);

        let mut profile = reference_profile("gain");
        profile.health_goal = None;
        assert_eq!(profile.daily_calorie_target(), None);
    }

    #[test]
    fn test_non_positive_inputs_are_undefined() {
        let mut profile = reference_profile("gain");
        profile.weight_kg = Some(-70.0);
        assert_eq!(profile.bmr(), None);

        let mut profile = reference_profile("gain");
        profile.height_cm = Some(0.0);
        assert_eq!(profile.bmr(), None);

        let mut profile = reference_profile("gain");
        profile.age = Some(0);
        assert_eq!(profile.bmr(), None);
    }

    #[test]
    fn test_non_positive_calorie_target_is_undefined() {
        let profile = BodyProfile {
            height_cm: Some(50.0),
            weight_kg: Some(20.0),
            age: Some(100),
            gender: Some("female".to_string()),
            activity_level: Some("sedentary".to_string()),
            health_goal: Some("weight loss".to_string()),
        };
        assert!(profile.tdee().is_some());
        assert_eq!(profile.daily_calorie_target(), None);
        assert_eq!(profile.macro_targets(), None);

        // 20 kg, 150 cm, age 20, female: BMR 876.5, TDEE 1051.8
        let mut profile = profile;
        profile.height_cm = Some(150.0);
        profile.age = Some(20);
        assert_eq!(profile.daily_calorie_target(), Some(551));
    }

    #[test]
    fn test_activity_multiplier_lookup() {
        assert_eq!(activity_multiplier("Sedentary"), 1.2);
        assert_eq!(activity_multiplier("LIGHT"), 1.375);
        assert_eq!(activity_multiplier("very active"), 1.9);
        assert_eq!(activity_multiplier("very_active"), 1.9);
        assert_eq!(activity_multiplier("couch potato"), DEFAULT_ACTIVITY_MULTIPLIER);
    }

    #[test]
    fn test_unknown_goal_applies_no_adjustment() {
        assert_eq!(reference_profile("bulk").daily_calorie_target(), Some(2594));
    }

    #[test]
    fn test_default_targets() {
        let targets = MacroTargets::default();
        assert_eq!(targets.calories, 2000);
        assert_eq!(targets.protein_g, 125);
        assert_eq!(targets.carbs_g, 250);
        assert_eq!(targets.fat_g, 55);
    }
}
