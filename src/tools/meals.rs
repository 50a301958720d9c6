//! Meal MCP Tools
//!
//! Tools for logging meals and browsing meal history.

use chrono::{Local, NaiveTime, Timelike};
use serde::Serialize;

use crate::db::Database;
use crate::models::{
    check_achievements, Achievement, CustomMealCreate, FoodCreate, Meal, MealCreate, MealDetail,
    MealItemCreate, MealType, Nutrition, TIME_FORMAT,
};
use crate::nutrition::PortionSize;
use super::foods::validate_nutrition;
use super::parse_date;

/// Longest range meal_history returns in one call
pub const MAX_HISTORY_DAYS: i64 = 366;

/// Response for log_meal
#[derive(Debug, Serialize)]
pub struct LogMealResponse {
    pub meal: MealDetail,
    /// Achievements unlocked by this meal
    pub new_achievements: Vec<Achievement>,
}

/// Response for log_custom_meal
#[derive(Debug, Serialize)]
pub struct LogCustomMealResponse {
    pub meal: MealDetail,
    pub food_id: i64,
    /// Whether the dish was new and added as a custom food
    pub food_created: bool,
    pub new_achievements: Vec<Achievement>,
}

/// Nutrition of a dish given by name, per medium portion
#[derive(Debug, Clone, Default)]
pub struct CustomDish {
    pub name: String,
    pub calories: i64,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
}

/// Response for meal_history
#[derive(Debug, Serialize)]
pub struct MealHistoryResponse {
    pub user_id: i64,
    pub start_date: String,
    pub end_date: String,
    pub meals: Vec<MealDetail>,
    pub total: Nutrition,
}

fn parse_time(value: Option<&str>) -> Result<NaiveTime, String> {
    match value {
        Some(v) => {
            let v = v.trim();
            NaiveTime::parse_from_str(v, TIME_FORMAT)
                .or_else(|_| NaiveTime::parse_from_str(v, "%H:%M"))
                .map_err(|_| format!("Invalid time '{}', expected HH:MM or HH:MM:SS", v))
        }
        None => {
            let now = Local::now().time();
            NaiveTime::from_hms_opt(now.hour(), now.minute(), now.second())
                .ok_or_else(|| "Failed to read the current time".to_string())
        }
    }
}

// ============================================================================
// Meal Tools
// ============================================================================

/// Log a meal made of (food_id, portion) pairs
///
/// Unknown meal types are stored as "unspecified" and unknown portion labels
/// as medium.
pub fn log_meal(
    db: &Database,
    user_id: i64,
    date: &str,
    time: Option<&str>,
    meal_type: &str,
    items: &[(i64, String)],
    notes: Option<String>,
    locale: &str,
) -> Result<LogMealResponse, String> {
    if items.is_empty() {
        return Err("A meal needs at least one food item".to_string());
    }

    let data = MealCreate {
        user_id,
        date: parse_date(date)?,
        time: parse_time(time)?,
        meal_type: MealType::from_str(meal_type),
        notes,
        items: items
            .iter()
            .map(|(food_id, portion)| MealItemCreate {
                food_id: *food_id,
                portion_size: PortionSize::from_str(portion),
            })
            .collect(),
    };

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let meal = Meal::create(&conn, &data).map_err(|e| format!("Failed to log meal: {}", e))?;

    let detail = meal
        .detail(&conn, locale)
        .map_err(|e| format!("Failed to load meal: {}", e))?;

    let new_achievements = check_achievements(&conn, user_id)
        .map_err(|e| format!("Failed to check achievements: {}", e))?
        .into_iter()
        .copied()
        .collect();

    Ok(LogMealResponse {
        meal: detail,
        new_achievements,
    })
}

/// Log one dish by name at a portion size
///
/// An existing food with that name is reused with its stored nutrition;
/// otherwise the dish is added as the user's custom food first.
pub fn log_custom_meal(
    db: &Database,
    user_id: i64,
    date: &str,
    time: Option<&str>,
    meal_type: &str,
    dish: CustomDish,
    portion: &str,
    notes: Option<String>,
    locale: &str,
) -> Result<LogCustomMealResponse, String> {
    if dish.name.trim().is_empty() {
        return Err("Dish name must not be empty".to_string());
    }
    validate_nutrition(
        Some(dish.calories),
        [("protein", dish.protein), ("carbs", dish.carbs), ("fat", dish.fat), ("fiber", None)],
    )?;

    let data = CustomMealCreate {
        user_id,
        date: parse_date(date)?,
        time: parse_time(time)?,
        meal_type: MealType::from_str(meal_type),
        notes,
        food: FoodCreate {
            name: dish.name,
            calories: dish.calories,
            protein: dish.protein,
            carbs: dish.carbs,
            fat: dish.fat,
            ..Default::default()
        },
        portion_size: PortionSize::from_str(portion),
    };

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let logged = Meal::create_custom(&conn, &data).map_err(|e| format!("Failed to log meal: {}", e))?;

    let detail = logged
        .meal
        .detail(&conn, locale)
        .map_err(|e| format!("Failed to load meal: {}", e))?;

    let new_achievements = check_achievements(&conn, user_id)
        .map_err(|e| format!("Failed to check achievements: {}", e))?
        .into_iter()
        .copied()
        .collect();

    Ok(LogCustomMealResponse {
        meal: detail,
        food_id: logged.food_id,
        food_created: logged.food_created,
        new_achievements,
    })
}

pub fn get_meal(db: &Database, id: i64, locale: &str) -> Result<Option<MealDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let meal = Meal::get_by_id(&conn, id).map_err(|e| format!("Failed to get meal: {}", e))?;

    meal.map(|m| {
        m.detail(&conn, locale)
            .map_err(|e| format!("Failed to load meal: {}", e))
    })
    .transpose()
}

pub fn delete_meal(db: &Database, id: i64) -> Result<bool, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    Meal::delete(&conn, id).map_err(|e| format!("Failed to delete meal: {}", e))
}

/// Meals of a user between two dates, inclusive
pub fn meal_history(
    db: &Database,
    user_id: i64,
    start_date: &str,
    end_date: &str,
    locale: &str,
) -> Result<MealHistoryResponse, String> {
    let start = parse_date(start_date)?;
    let end = parse_date(end_date)?;
    if start > end {
        return Err(format!("start_date {} is after end_date {}", start, end));
    }
    if (end - start).num_days() >= MAX_HISTORY_DAYS {
        return Err(format!("Date range is limited to {} days", MAX_HISTORY_DAYS));
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let meals = Meal::list_for_user(&conn, user_id, start, end)
        .map_err(|e| format!("Failed to list meals: {}", e))?;

    let details = meals
        .iter()
        .map(|m| m.detail(&conn, locale))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("Failed to load meals: {}", e))?;

    let total = details.iter().map(|d| d.nutrition).sum();

    Ok(MealHistoryResponse {
        user_id,
        start_date: start.to_string(),
        end_date: end.to_string(),
        meals: details,
        total,
    })
}
