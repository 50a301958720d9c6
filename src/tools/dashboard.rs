//! Dashboard MCP Tools
//!
//! Daily totals against targets, the seven-day series behind the charts,
//! calories per meal type, and achievements.

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::Database;
use crate::models::{list_earned, Achievement, EarnedAchievement, Meal, Nutrition, UserProfile, ACHIEVEMENTS};
use crate::nutrition::{
    daily_totals, meal_type_distribution, weekly_series, DailyTotals, MacroTargets,
    MealTypeDistribution, WeeklyChartData,
};
use super::date_or_today;

/// Share of a target reached, in percent (one decimal)
fn percent_of(actual: f64, target: i64) -> Option<f64> {
    if target <= 0 {
        return None;
    }
    Some(crate::nutrition::round1(actual / target as f64 * 100.0))
}

/// Progress against each target
#[derive(Debug, Serialize)]
pub struct TargetProgress {
    pub calories_percent: Option<f64>,
    pub protein_percent: Option<f64>,
    pub carbs_percent: Option<f64>,
    pub fat_percent: Option<f64>,
    pub calories_remaining: i64,
}

impl TargetProgress {
    fn new(nutrition: &Nutrition, targets: &MacroTargets) -> Self {
        Self {
            calories_percent: percent_of(nutrition.calories as f64, targets.calories),
            protein_percent: percent_of(nutrition.protein, targets.protein_g),
            carbs_percent: percent_of(nutrition.carbs, targets.carbs_g),
            fat_percent: percent_of(nutrition.fat, targets.fat_g),
            calories_remaining: targets.calories - nutrition.calories,
        }
    }
}

/// Response for daily_nutrition
#[derive(Debug, Serialize)]
pub struct DailyNutritionResponse {
    pub user_id: i64,
    pub date: NaiveDate,
    pub nutrition: Nutrition,
    pub targets: MacroTargets,
    pub progress: TargetProgress,
}

/// Response for weekly_nutrition
#[derive(Debug, Serialize)]
pub struct WeeklyNutritionResponse {
    pub user_id: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub days: Vec<DailyTotals>,
    pub total: Nutrition,
    pub targets: MacroTargets,
    pub chart: WeeklyChartData,
}

/// Response for meal_distribution
#[derive(Debug, Serialize)]
pub struct MealDistributionResponse {
    pub user_id: i64,
    pub date: NaiveDate,
    pub calories: MealTypeDistribution,
    pub total_calories: i64,
}

/// An achievement with the user's progress toward it
#[derive(Debug, Serialize)]
pub struct AchievementProgress {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub earned: bool,
    pub earned_at: Option<String>,
    pub meals_remaining: i64,
}

/// Response for list_achievements
#[derive(Debug, Serialize)]
pub struct AchievementsResponse {
    pub user_id: i64,
    pub meal_count: i64,
    pub achievements: Vec<AchievementProgress>,
}

// ============================================================================
// Dashboard Tools
// ============================================================================

/// Totals for one date, compared with the user's targets
pub fn daily_nutrition(
    db: &Database,
    user_id: i64,
    date: Option<&str>,
) -> Result<DailyNutritionResponse, String> {
    let date = date_or_today(date)?;
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let nutrition = daily_totals(&*conn, user_id, date)
        .map_err(|e| format!("Failed to total meals: {}", e))?;

    let targets = UserProfile::get(&conn, user_id)
        .map_err(|e| format!("Failed to get profile: {}", e))?
        .map(|p| p.effective_targets())
        .unwrap_or_default();

    Ok(DailyNutritionResponse {
        user_id,
        date,
        progress: TargetProgress::new(&nutrition, &targets),
        nutrition,
        targets,
    })
}

/// Seven days ending `today`, with targets for plotting
pub fn weekly_nutrition(
    db: &Database,
    user_id: i64,
    today: Option<&str>,
) -> Result<WeeklyNutritionResponse, String> {
    let today = date_or_today(today)?;
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let series = weekly_series(&*conn, user_id, today)
        .map_err(|e| format!("Failed to build weekly series: {}", e))?;

    Ok(WeeklyNutritionResponse {
        user_id,
        start_date: series.start(),
        end_date: series.end(),
        total: series.total(),
        targets: series.targets,
        chart: series.chart_data(),
        days: series.days,
    })
}

/// Calories per meal type on one date
pub fn meal_distribution(
    db: &Database,
    user_id: i64,
    date: Option<&str>,
) -> Result<MealDistributionResponse, String> {
    let date = date_or_today(date)?;
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let calories = meal_type_distribution(&*conn, user_id, date)
        .map_err(|e| format!("Failed to compute distribution: {}", e))?;

    Ok(MealDistributionResponse {
        user_id,
        date,
        total_calories: calories.total(),
        calories,
    })
}

/// All milestones, earned or not
pub fn list_achievements(db: &Database, user_id: i64) -> Result<AchievementsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let meal_count = Meal::count_for_user(&conn, user_id)
        .map_err(|e| format!("Failed to count meals: {}", e))?;
    let earned: Vec<EarnedAchievement> = list_earned(&conn, user_id)
        .map_err(|e| format!("Failed to list achievements: {}", e))?;

    let achievements = ACHIEVEMENTS
        .iter()
        .map(|a| {
            let earned_at = earned
                .iter()
                .find(|e| e.achievement.id == a.id)
                .map(|e| e.earned_at.clone());
            AchievementProgress {
                achievement: *a,
                earned: earned_at.is_some(),
                earned_at,
                meals_remaining: (a.requirement - meal_count).max(0),
            }
        })
        .collect();

    Ok(AchievementsResponse {
        user_id,
        meal_count,
        achievements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Food, FoodCreate, ProfileUpdate};
    use crate::tools::meals::log_meal;

    fn database() -> (Database, i64) {
        let db = Database::in_memory().unwrap();
        let id = db
            .with_conn(|conn| {
                crate::db::migrations::run_migrations(conn)?;
                let food = Food::create(conn, &FoodCreate {
                    name: "Thali".to_string(),
                    calories: 600,
                    protein: Some(20.0),
                    carbs: Some(90.0),
                    fat: Some(18.0),
                    ..Default::default()
                })?;
                Ok(food.id)
            })
            .unwrap();
        (db, id)
    }

    fn log(db: &Database, food: i64, date: &str, meal_type: &str, portion: &str) {
        log_meal(db, 1, date, Some("12:00"), meal_type, &[(food, portion.to_string())], None, "en").unwrap();
    }

    #[test]
    fn test_daily_nutrition_with_default_targets() {
        let (db, thali) = database();
        log(&db, thali, "2026-10-18", "lunch", "medium");
        log(&db, thali, "2026-10-17", "lunch", "medium");

        let response = daily_nutrition(&db, 1, Some("2026-10-18")).unwrap();
        assert_eq!(response.nutrition.calories, 600);
        assert_eq!(response.targets, MacroTargets::default());
        assert_eq!(response.progress.calories_percent, Some(30.0));
        assert_eq!(response.progress.calories_remaining, 1400);
        assert_eq!(response.progress.protein_percent, Some(16.0));
    }

    #[test]
    fn test_weekly_uses_profile_targets() {
        let (db, thali) = database();
        db.with_conn(|conn| {
            UserProfile::upsert(conn, 1, &ProfileUpdate {
                height_cm: Some(175.0),
                weight_kg: Some(70.0),
                age: Some(25),
                gender: Some("male".to_string()),
                activity_level: Some("moderate".to_string()),
                health_goal: Some("maintenance".to_string()),
            })
        })
        .unwrap();
        log(&db, thali, "2026-10-12", "dinner", "large");
        log(&db, thali, "2026-10-11", "dinner", "large");

        let response = weekly_nutrition(&db, 1, Some("2026-10-18")).unwrap();
        assert_eq!(response.days.len(), 7);
        assert_eq!(response.start_date, NaiveDate::from_ymd_opt(2026, 10, 12));
        assert_eq!(response.chart.calories, vec![900, 0, 0, 0, 0, 0, 0]);
        assert_eq!(response.targets.calories, 2594);
        assert_eq!(response.total.calories, 900);
    }

    #[test]
    fn test_meal_distribution() {
        let (db, thali) = database();
        log(&db, thali, "2026-10-18", "breakfast", "small");
        log(&db, thali, "2026-10-18", "dinner", "medium");
        log(&db, thali, "2026-10-18", "midnight feast", "large");

        let response = meal_distribution(&db, 1, Some("2026-10-18")).unwrap();
        assert_eq!(response.calories.breakfast, 450);
        assert_eq!(response.calories.dinner, 600);
        assert_eq!(response.calories.lunch, 0);
        assert_eq!(response.total_calories, 1050);
    }

    #[test]
    fn test_achievement_progress() {
        let (db, thali) = database();
        log(&db, thali, "2026-10-18", "lunch", "medium");

        let response = list_achievements(&db, 1).unwrap();
        assert_eq!(response.meal_count, 1);
        assert_eq!(response.achievements.len(), 4);
        assert!(response.achievements[0].earned);
        assert!(!response.achievements[1].earned);
        assert_eq!(response.achievements[1].meals_remaining, 9);
    }

    #[test]
    fn test_percent_of_zero_target() {
        assert_eq!(percent_of(10.0, 0), None);
    }
}
