//! Meal Tracker MCP Server Implementation
//!
//! Implements the MCP server with all Meal Tracker tools.

use std::collections::BTreeMap;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::db::Database;
use crate::models::{is_supported_locale, FoodCreate, FoodUpdate, MealType, PortionGrams, ProfileUpdate};
use crate::nutrition::{BodyProfile, HealthGoal, PortionSize};
use crate::tools::status::StatusTracker;
use crate::tools::{dashboard, foods, meals, profile, reports};

/// Meal Tracker MCP Service
#[derive(Clone)]
pub struct MealTrackService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    /// Locale for food names when a call does not pass one
    default_locale: String,
    tool_router: ToolRouter<MealTrackService>,
}

impl MealTrackService {
    pub fn new(config: &Config, database: Database) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(
                config.database_path.clone(),
                config.locale.clone(),
            ))),
            database,
            default_locale: config.locale.clone(),
            tool_router: Self::tool_router(),
        }
    }

    /// Requested locale if supported, else the configured default
    fn locale(&self, requested: Option<&str>) -> String {
        match requested.map(str::trim).filter(|l| !l.is_empty()) {
            Some(l) if is_supported_locale(l) => l.to_string(),
            Some(l) => {
                tracing::warn!("Unsupported locale '{}', using {}", l, self.default_locale);
                self.default_locale.clone()
            }
            None => self.default_locale.clone(),
        }
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn not_found(kind: &str, id: i64) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(format!(
        r#"{{"error": "{} not found", "id": {}}}"#,
        kind, id
    ))]))
}

fn default_user_id() -> i64 { 1 }

// ============================================================================
// Profile Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateProfileParams {
    /// User ID (default 1)
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    /// Height in centimetres
    pub height_cm: Option<f64>,
    /// Weight in kilograms
    pub weight_kg: Option<f64>,
    /// Age in years
    pub age: Option<i64>,
    /// "male" or "female"
    pub gender: Option<String>,
    /// sedentary, light, moderate, active, very active
    pub activity_level: Option<String>,
    /// weight loss, maintenance, gain
    pub health_goal: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetProfileParams {
    /// User ID (default 1)
    #[serde(default = "default_user_id")]
    pub user_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CalculateTargetsParams {
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub activity_level: Option<String>,
    /// weight loss, maintenance (default), gain
    pub health_goal: Option<String>,
}

// ============================================================================
// Food Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddFoodParams {
    /// English dish name (must be unique)
    pub name: String,
    /// Category (default "other")
    pub category: Option<String>,
    /// Calories (kcal) for a medium portion
    pub calories: i64,
    /// Grams per medium portion
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    /// Serving weights in grams, for display
    pub portion_small_g: Option<f64>,
    pub portion_medium_g: Option<f64>,
    pub portion_large_g: Option<f64>,
    /// Localized names keyed by locale, e.g. {"hi": "इडली"}
    pub localized_names: Option<BTreeMap<String, String>>,
    /// User who added this custom dish
    pub created_by: Option<i64>,
    /// Locale for the returned display name
    pub locale: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchFoodsParams {
    pub query: String,
    /// Also match localized names in this locale
    pub locale: Option<String>,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

fn default_search_limit() -> i64 { 20 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetFoodParams {
    pub id: i64,
    pub locale: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListFoodsParams {
    pub locale: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_list_limit() -> i64 { 50 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MenuParams {
    /// Locale for dish names
    pub locale: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateFoodParams {
    pub id: i64,
    pub name: Option<String>,
    pub category: Option<String>,
    pub calories: Option<i64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    /// Localized names to set; locales not listed are kept
    pub localized_names: Option<BTreeMap<String, String>>,
    pub locale: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteFoodParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ImportCatalogParams {
    /// Full path to the catalog CSV file
    pub file_path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchCatalogParams {
    /// Full path to the catalog CSV file
    pub file_path: String,
    pub query: String,
    pub locale: Option<String>,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

// ============================================================================
// Meal Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MealItemParams {
    pub food_id: i64,
    /// small, medium (default) or large
    #[serde(default = "default_portion")]
    pub portion_size: String,
}

fn default_portion() -> String { PortionSize::Medium.as_str().to_string() }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LogMealParams {
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    /// Date in ISO format: YYYY-MM-DD
    pub date: String,
    /// Time as HH:MM or HH:MM:SS (default now)
    pub time: Option<String>,
    /// breakfast, lunch, dinner, snack
    pub meal_type: String,
    pub items: Vec<MealItemParams>,
    pub notes: Option<String>,
    pub locale: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LogCustomMealParams {
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    /// Date in ISO format: YYYY-MM-DD
    pub date: String,
    /// Time as HH:MM or HH:MM:SS (default now)
    pub time: Option<String>,
    /// breakfast, lunch, dinner, snack (default snack)
    #[serde(default = "default_custom_meal_type")]
    pub meal_type: String,
    /// Dish name; an existing food with this name is reused
    pub name: String,
    /// Calories (kcal) for a medium portion, used when the dish is new
    pub calories: i64,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    /// small, medium (default) or large
    #[serde(default = "default_portion")]
    pub portion_size: String,
    pub notes: Option<String>,
    pub locale: Option<String>,
}

fn default_custom_meal_type() -> String { MealType::Snack.as_str().to_string() }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetMealParams {
    pub id: i64,
    pub locale: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteMealParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MealHistoryParams {
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    /// Start date (inclusive), YYYY-MM-DD
    pub start_date: String,
    /// End date (inclusive), YYYY-MM-DD
    pub end_date: String,
    pub locale: Option<String>,
}

// ============================================================================
// Dashboard Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DateParams {
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    /// Date in ISO format: YYYY-MM-DD (default today)
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UserParams {
    #[serde(default = "default_user_id")]
    pub user_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct WeeklyChartParams {
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    /// Last day of the week shown, YYYY-MM-DD (default today)
    pub date: Option<String>,
    /// Where to write the PNG file
    pub output_path: String,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl MealTrackService {
    // --- Status ---

    #[tool(description = "Get the current status of the Meal Tracker service including build info and database status")]
    async fn mealtrack_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(&self.database);
        json_result(&status)
    }

    #[tool(description = "Get step-by-step instructions for logging meals. Call this when starting a new logging session or when unsure how to use the meal tools.")]
    fn meal_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::MEAL_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(MEAL_INSTRUCTIONS)]))
    }

    // --- Profile ---

    #[tool(description = "Update body measurements and goal. Recalculates BMI, BMR, TDEE and calorie/macro targets when the profile is complete.")]
    fn update_profile(&self, Parameters(p): Parameters<UpdateProfileParams>) -> Result<CallToolResult, McpError> {
        let data = ProfileUpdate {
            height_cm: p.height_cm, weight_kg: p.weight_kg, age: p.age,
            gender: p.gender, activity_level: p.activity_level, health_goal: p.health_goal,
        };
        let result = profile::update_profile(&self.database, p.user_id, data).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get a user's profile with BMI, energy figures and targets")]
    fn get_profile(&self, Parameters(p): Parameters<GetProfileParams>) -> Result<CallToolResult, McpError> {
        let result = profile::get_profile(&self.database, p.user_id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(resp) => json_result(&resp),
            None => not_found("Profile", p.user_id),
        }
    }

    #[tool(description = "Calculate BMI, BMR, TDEE and macro targets for the given measurements without saving them")]
    fn calculate_targets(&self, Parameters(p): Parameters<CalculateTargetsParams>) -> Result<CallToolResult, McpError> {
        let body = BodyProfile {
            height_cm: p.height_cm, weight_kg: p.weight_kg, age: p.age,
            gender: p.gender, activity_level: p.activity_level,
            health_goal: p.health_goal.or_else(|| Some(HealthGoal::Maintenance.as_str().to_string())),
        };
        json_result(&profile::calculate_targets(&body))
    }

    // --- Foods ---

    #[tool(description = "Add a food with nutrition for a medium portion and optional localized names")]
    fn add_food(&self, Parameters(p): Parameters<AddFoodParams>) -> Result<CallToolResult, McpError> {
        let locale = self.locale(p.locale.as_deref());
        let data = FoodCreate {
            name: p.name, category: p.category, calories: p.calories,
            protein: p.protein, carbs: p.carbs, fat: p.fat, fiber: p.fiber,
            portion_grams: PortionGrams { small: p.portion_small_g, medium: p.portion_medium_g, large: p.portion_large_g },
            localized_names: p.localized_names.unwrap_or_default(),
            is_custom: p.created_by.is_some(),
            created_by: p.created_by,
        };
        let result = foods::add_food(&self.database, data, &locale).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Search foods by English name, or also by localized name when a locale is given")]
    fn search_foods(&self, Parameters(p): Parameters<SearchFoodsParams>) -> Result<CallToolResult, McpError> {
        let locale = self.locale(p.locale.as_deref());
        let result = foods::search_foods(&self.database, &p.query, &locale, p.limit).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get a food with nutrition for every portion size and its meal usage")]
    fn get_food(&self, Parameters(p): Parameters<GetFoodParams>) -> Result<CallToolResult, McpError> {
        let locale = self.locale(p.locale.as_deref());
        let result = foods::get_food(&self.database, p.id, &locale).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(food) => json_result(&food),
            None => not_found("Food", p.id),
        }
    }

    #[tool(description = "List foods with pagination")]
    fn list_foods(&self, Parameters(p): Parameters<ListFoodsParams>) -> Result<CallToolResult, McpError> {
        let locale = self.locale(p.locale.as_deref());
        let result = foods::list_foods(&self.database, &locale, p.limit, p.offset).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Cafeteria menu: every food grouped into beverages, main courses, sides and snacks")]
    fn menu(&self, Parameters(p): Parameters<MenuParams>) -> Result<CallToolResult, McpError> {
        let locale = self.locale(p.locale.as_deref());
        let result = foods::menu(&self.database, &locale).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Update a food. Logged meals pick up the new values since meal nutrition is derived on read.")]
    fn update_food(&self, Parameters(p): Parameters<UpdateFoodParams>) -> Result<CallToolResult, McpError> {
        let locale = self.locale(p.locale.as_deref());
        let data = FoodUpdate {
            name: p.name, category: p.category, calories: p.calories,
            protein: p.protein, carbs: p.carbs, fat: p.fat, fiber: p.fiber,
            localized_names: p.localized_names,
        };
        let result = foods::update_food(&self.database, p.id, data, &locale).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(food) => json_result(&food),
            None => not_found("Food", p.id),
        }
    }

    #[tool(description = "Delete a food (only allowed if no logged meal uses it)")]
    fn delete_food(&self, Parameters(p): Parameters<DeleteFoodParams>) -> Result<CallToolResult, McpError> {
        let result = foods::delete_food(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Import foods from a catalog CSV (Dish Name, Calories (kcal), Protein (g), Carbohydrate (g), Fats (g), Fibre (g), name_<locale>). Existing names are skipped.")]
    fn import_catalog(&self, Parameters(p): Parameters<ImportCatalogParams>) -> Result<CallToolResult, McpError> {
        let result = foods::import_catalog(&self.database, &p.file_path).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Search a catalog CSV file without importing it")]
    fn search_catalog(&self, Parameters(p): Parameters<SearchCatalogParams>) -> Result<CallToolResult, McpError> {
        let locale = self.locale(p.locale.as_deref());
        let limit = usize::try_from(p.limit).unwrap_or(1);
        let result = foods::search_catalog(&p.file_path, &p.query, &locale, limit).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Meals ---

    #[tool(description = "Log a meal: a date, meal type and list of foods with portion sizes. Returns the meal with derived nutrition and any newly unlocked achievements.")]
    fn log_meal(&self, Parameters(p): Parameters<LogMealParams>) -> Result<CallToolResult, McpError> {
        let locale = self.locale(p.locale.as_deref());
        let items: Vec<(i64, String)> = p.items.into_iter().map(|i| (i.food_id, i.portion_size)).collect();
        let result = meals::log_meal(
            &self.database, p.user_id, &p.date, p.time.as_deref(), &p.meal_type, &items, p.notes, &locale,
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Log one dish by name at a portion size. Reuses the food with that name if it exists, otherwise adds it as the user's custom food from the given calories and macros.")]
    fn log_custom_meal(&self, Parameters(p): Parameters<LogCustomMealParams>) -> Result<CallToolResult, McpError> {
        let locale = self.locale(p.locale.as_deref());
        let dish = meals::CustomDish {
            name: p.name, calories: p.calories, protein: p.protein, carbs: p.carbs, fat: p.fat,
        };
        let result = meals::log_custom_meal(
            &self.database, p.user_id, &p.date, p.time.as_deref(), &p.meal_type, dish, &p.portion_size, p.notes, &locale,
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get a meal by ID with its items and nutrition")]
    fn get_meal(&self, Parameters(p): Parameters<GetMealParams>) -> Result<CallToolResult, McpError> {
        let locale = self.locale(p.locale.as_deref());
        let result = meals::get_meal(&self.database, p.id, &locale).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(meal) => json_result(&meal),
            None => not_found("Meal", p.id),
        }
    }

    #[tool(description = "Delete a meal and its items")]
    fn delete_meal(&self, Parameters(p): Parameters<DeleteMealParams>) -> Result<CallToolResult, McpError> {
        let deleted = meals::delete_meal(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&serde_json::json!({ "success": deleted, "id": p.id }))
    }

    #[tool(description = "List a user's meals between two dates (inclusive) with totals")]
    fn meal_history(&self, Parameters(p): Parameters<MealHistoryParams>) -> Result<CallToolResult, McpError> {
        let locale = self.locale(p.locale.as_deref());
        let result = meals::meal_history(&self.database, p.user_id, &p.start_date, &p.end_date, &locale)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Dashboard ---

    #[tool(description = "Nutrition totals for one date with progress toward the user's targets")]
    fn daily_nutrition(&self, Parameters(p): Parameters<DateParams>) -> Result<CallToolResult, McpError> {
        let result = dashboard::daily_nutrition(&self.database, p.user_id, p.date.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Daily totals for the 7 days ending on the given date (default today), with targets and chart-ready series")]
    fn weekly_nutrition(&self, Parameters(p): Parameters<DateParams>) -> Result<CallToolResult, McpError> {
        let result = dashboard::weekly_nutrition(&self.database, p.user_id, p.date.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Calories per meal type (breakfast, lunch, dinner, snack) for one date")]
    fn meal_distribution(&self, Parameters(p): Parameters<DateParams>) -> Result<CallToolResult, McpError> {
        let result = dashboard::meal_distribution(&self.database, p.user_id, p.date.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "List meal-count achievements with the user's progress")]
    fn list_achievements(&self, Parameters(p): Parameters<UserParams>) -> Result<CallToolResult, McpError> {
        let result = dashboard::list_achievements(&self.database, p.user_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Render the week's calories (actual vs target) to a PNG chart file")]
    fn generate_weekly_chart(&self, Parameters(p): Parameters<WeeklyChartParams>) -> Result<CallToolResult, McpError> {
        let result = reports::generate_weekly_chart_report(&self.database, p.user_id, p.date.as_deref(), &p.output_path)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for MealTrackService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mealtrack".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Meal Tracker".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Meal Tracker - cafeteria meal logging and nutrition analytics. \
                 IMPORTANT: Call meal_instructions before logging meals. \
                 Profile: update_profile/get_profile, calculate_targets. \
                 Foods: add/search/get/list/update/delete_food, menu, import_catalog, search_catalog. \
                 Meals: log_meal, log_custom_meal, get_meal/delete_meal, meal_history. \
                 Dashboard: daily_nutrition, weekly_nutrition, meal_distribution, list_achievements, generate_weekly_chart. \
                 Most tools take user_id (default 1) and an optional locale for food names."
                    .into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn service(locale: &str) -> MealTrackService {
        let config = Config {
            database_path: PathBuf::from(":memory:"),
            locale: locale.to_string(),
            catalog_path: None,
        };
        MealTrackService::new(&config, Database::in_memory().unwrap())
    }

    #[test]
    fn test_locale_resolution() {
        let service = service("hi");
        assert_eq!(service.locale(None), "hi");
        assert_eq!(service.locale(Some("ta")), "ta");
        assert_eq!(service.locale(Some(" ")), "hi");
        assert_eq!(service.locale(Some("fr")), "hi");
    }

    #[test]
    fn test_server_info() {
        let info = service("en").get_info();
        assert_eq!(info.server_info.name, "mealtrack");
        let instructions = info.instructions.unwrap();
        assert!(instructions.contains("log_meal"));
        assert!(instructions.contains("log_custom_meal"));
        assert!(instructions.contains("menu"));
    }

    #[test]
    fn test_custom_meal_params_defaults() {
        let p: LogCustomMealParams = serde_json::from_value(serde_json::json!({
            "date": "2026-10-18",
            "name": "Masala Chai",
            "calories": 110
        }))
        .unwrap();
        assert_eq!(p.user_id, 1);
        assert_eq!(p.meal_type, "snack");
        assert_eq!(p.portion_size, "medium");
        assert!(p.protein.is_none());
    }
}
