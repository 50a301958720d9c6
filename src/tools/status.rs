//! Meal Tracker Status Tool
//!
//! Runtime status of the service and the meal logging guide.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

use crate::build_info::BuildInfo;
use crate::db::{migrations, Database};
use crate::models::Food;

/// Meal logging instructions for AI assistants
pub const MEAL_INSTRUCTIONS: &str = r#"
# Meal Tracker Logging Instructions

## Overview

Meals are logged per user as a set of foods from the cafeteria catalog, each
with a portion size. Nutrition is always derived from the catalog values, so
fixing a food's numbers fixes every meal that uses it.

## Workflow

1. Find the food: `search_foods` with the dish name. Pass `locale` (hi, kn,
   ta, te, mr, gu, es) to search by the local name as well as the English one.
2. If the dish is missing, add it with `add_food` (calories in kcal and
   protein/carbs/fat/fiber in grams, all for a MEDIUM portion).
3. Log the meal with `log_meal`:
   - `date`: YYYY-MM-DD
   - `meal_type`: breakfast, lunch, dinner or snack
   - `items`: list of `{ "food_id": 12, "portion_size": "small" }`

To log a dish that may not be in the catalog, use `log_custom_meal` with the
dish `name`, its `calories` and macros for a medium portion, and a
`portion_size`. A food with the same name is reused as stored; otherwise the
dish is saved as your custom food.

Browse the cafeteria with `menu`, which groups dishes into beverages, main
courses, sides and snacks.

## Portion Sizes

| Portion | Multiplier |
|---------|------------|
| small   | 0.75       |
| medium  | 1.0        |
| large   | 1.5        |

Calories are rounded to whole kcal, macros to one decimal.

## Targets

Set the profile once with `update_profile` (height_cm, weight_kg, age, gender,
activity_level, health_goal). Targets are recalculated whenever the profile is
complete:
- Activity: sedentary 1.2, light 1.375, moderate 1.55, active 1.725, very active 1.9
- Goal: weight loss -500 kcal, maintenance 0, gain +500 kcal
- Protein 1.6 g/kg, carbs 50% and fat 25% of calories

Users without targets are measured against 2000 kcal, 125 g protein, 250 g
carbs and 55 g fat.

## Dashboard

- `daily_nutrition`: totals for a date with progress toward targets
- `weekly_nutrition`: the 7 days ending today, ready for charts
- `meal_distribution`: calories per meal type for a date
- `generate_weekly_chart`: PNG chart of the week
- `list_achievements`: meal-count milestones

## Notes

- Meal types other than the four above are stored as "unspecified"; they count
  toward daily totals but not toward the meal distribution.
- Foods used in logged meals cannot be deleted.
"#;

/// Runtime status of the Meal Tracker service
#[derive(Debug, Clone, Serialize)]
pub struct MealTrackStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub schema_version: Option<i32>,
    pub food_count: Option<i64>,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub default_locale: String,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
    default_locale: String,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf, default_locale: String) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
            default_locale,
        }
    }

    /// Collect status; database figures are omitted when unavailable
    pub fn get_status(&self, database: &Database) -> MealTrackStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let (schema_version, food_count) = match database.get_conn() {
            Ok(conn) => (
                migrations::get_schema_version(&conn).ok(),
                Food::count(&conn).ok(),
            ),
            Err(e) => {
                tracing::warn!("Status could not reach the database: {}", e);
                (None, None)
            }
        };

        MealTrackStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            schema_version,
            food_count,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: std::process::id(),
            default_locale: self.default_locale.clone(),
        }
    }
}
