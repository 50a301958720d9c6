//! Food MCP Tools
//!
//! Tools for managing the food catalog.

use serde::Serialize;

use crate::catalog::{self, CatalogRow, ImportSummary, MenuSection};
use crate::db::Database;
use crate::models::{Food, FoodCreate, FoodUpdate, Nutrition};
use crate::nutrition::PortionSize;

/// Nutrition of a food at each portion size
#[derive(Debug, Serialize)]
pub struct PortionBreakdown {
    pub small: Nutrition,
    pub medium: Nutrition,
    pub large: Nutrition,
}

impl PortionBreakdown {
    fn for_food(food: &Food) -> Self {
        Self {
            small: food.nutrition_for(PortionSize::Small),
            medium: food.nutrition_for(PortionSize::Medium),
            large: food.nutrition_for(PortionSize::Large),
        }
    }
}

/// Food with display name, portion breakdown and usage
#[derive(Debug, Serialize)]
pub struct FoodDetail {
    pub display_name: String,
    #[serde(flatten)]
    pub food: Food,
    pub portions: PortionBreakdown,
    pub meal_usage_count: i64,
}

/// Food summary for search results and listings
#[derive(Debug, Serialize)]
pub struct FoodSummary {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub category: String,
    pub calories: i64,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub is_custom: bool,
}

impl FoodSummary {
    fn from_food(food: Food, locale: &str) -> Self {
        Self {
            display_name: food.display_name(locale).to_string(),
            id: food.id,
            name: food.name,
            category: food.category,
            calories: food.calories,
            protein: food.protein,
            carbs: food.carbs,
            fat: food.fat,
            is_custom: food.is_custom,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchFoodsResponse {
    pub query: String,
    pub locale: String,
    pub results: Vec<FoodSummary>,
}

#[derive(Debug, Serialize)]
pub struct ListFoodsResponse {
    pub foods: Vec<FoodSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct DeleteFoodResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ImportCatalogResponse {
    pub success: bool,
    pub file_path: String,
    pub total_rows: usize,
    #[serde(flatten)]
    pub summary: ImportSummary,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SearchCatalogResponse {
    pub file_path: String,
    pub query: String,
    pub results: Vec<CatalogRow>,
}

/// Foods listed under one menu section
#[derive(Debug, Serialize)]
pub struct MenuSectionListing {
    pub section: MenuSection,
    pub foods: Vec<FoodSummary>,
}

#[derive(Debug, Serialize)]
pub struct MenuResponse {
    pub locale: String,
    pub sections: Vec<MenuSectionListing>,
    pub total: usize,
}

/// Menu section of a stored food; categories outside the menu are classified by name
fn menu_section(food: &Food) -> MenuSection {
    MenuSection::from_str(&food.category).unwrap_or_else(|| MenuSection::classify(&food.name))
}

fn detail(conn: &rusqlite::Connection, food: Food, locale: &str) -> Result<FoodDetail, String> {
    let meal_usage_count = Food::usage_count(conn, food.id)
        .map_err(|e| format!("Failed to count food usage: {}", e))?;

    Ok(FoodDetail {
        display_name: food.display_name(locale).to_string(),
        portions: PortionBreakdown::for_food(&food),
        meal_usage_count,
        food,
    })
}

pub(crate) fn validate_nutrition(
    calories: Option<i64>,
    macros: [(&str, Option<f64>); 4],
) -> Result<(), String> {
    if calories.is_some_and(|c| c < 0) {
        return Err("calories must not be negative".to_string());
    }
    for (field, value) in macros {
        if value.is_some_and(|v| v < 0.0 || !v.is_finite()) {
            return Err(format!("{} must be a non-negative number", field));
        }
    }
    Ok(())
}

// ============================================================================
// Food Tools
// ============================================================================

/// Add a food (catalog entry or a user's custom dish)
pub fn add_food(db: &Database, data: FoodCreate, locale: &str) -> Result<FoodDetail, String> {
    validate_nutrition(
        Some(data.calories),
        [("protein", data.protein), ("carbs", data.carbs), ("fat", data.fat), ("fiber", data.fiber)],
    )?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if Food::get_by_name(&conn, &data.name)
        .map_err(|e| format!("Failed to check food name: {}", e))?
        .is_some()
    {
        return Err(format!("A food named '{}' already exists", data.name.trim()));
    }

    let food = Food::create(&conn, &data).map_err(|e| format!("Failed to add food: {}", e))?;
    detail(&conn, food, locale)
}

/// Search foods by English or localized name
pub fn search_foods(
    db: &Database,
    query: &str,
    locale: &str,
    limit: i64,
) -> Result<SearchFoodsResponse, String> {
    let limit = limit.clamp(1, 100);
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let foods = Food::search(&conn, query, locale, limit)
        .map_err(|e| format!("Failed to search foods: {}", e))?;

    Ok(SearchFoodsResponse {
        query: query.to_string(),
        locale: locale.to_string(),
        results: foods.into_iter().map(|f| FoodSummary::from_food(f, locale)).collect(),
    })
}

pub fn get_food(db: &Database, id: i64, locale: &str) -> Result<Option<FoodDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let food = Food::get_by_id(&conn, id).map_err(|e| format!("Failed to get food: {}", e))?;

    food.map(|f| detail(&conn, f, locale)).transpose()
}

pub fn list_foods(
    db: &Database,
    locale: &str,
    limit: i64,
    offset: i64,
) -> Result<ListFoodsResponse, String> {
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let foods = Food::list(&conn, limit, offset)
        .map_err(|e| format!("Failed to list foods: {}", e))?;
    let total = Food::count(&conn).map_err(|e| format!("Failed to count foods: {}", e))?;

    Ok(ListFoodsResponse {
        foods: foods.into_iter().map(|f| FoodSummary::from_food(f, locale)).collect(),
        total,
        limit,
        offset,
    })
}

/// Every food grouped into beverages, main courses, sides and snacks
pub fn menu(db: &Database, locale: &str) -> Result<MenuResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let foods = Food::all(&conn).map_err(|e| format!("Failed to list foods: {}", e))?;
    let total = foods.len();

    let mut sections: Vec<MenuSectionListing> = MenuSection::ALL
        .iter()
        .map(|&section| MenuSectionListing { section, foods: Vec::new() })
        .collect();

    for food in foods {
        let section = menu_section(&food);
        if let Some(listing) = sections.iter_mut().find(|l| l.section == section) {
            listing.foods.push(FoodSummary::from_food(food, locale));
        }
    }

    Ok(MenuResponse {
        locale: locale.to_string(),
        sections,
        total,
    })
}

pub fn update_food(
    db: &Database,
    id: i64,
    data: FoodUpdate,
    locale: &str,
) -> Result<Option<FoodDetail>, String> {
    validate_nutrition(
        data.calories,
        [("protein", data.protein), ("carbs", data.carbs), ("fat", data.fat), ("fiber", data.fiber)],
    )?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let updated = Food::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update food: {}", e))?;

    updated.map(|f| detail(&conn, f, locale)).transpose()
}

/// Delete a food that no logged meal uses
pub fn delete_food(db: &Database, id: i64) -> Result<DeleteFoodResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let deleted = Food::delete(&conn, id).map_err(|e| format!("Failed to delete food: {}", e))?;

    Ok(if deleted {
        DeleteFoodResponse { success: true, message: format!("Food {} deleted", id) }
    } else {
        DeleteFoodResponse { success: false, message: format!("Food not found with id: {}", id) }
    })
}

/// Import a catalog CSV, adding foods whose names are new
pub fn import_catalog(db: &Database, file_path: &str) -> Result<ImportCatalogResponse, String> {
    let rows = catalog::load_catalog(file_path)
        .map_err(|e| format!("Failed to read catalog {}: {}", file_path, e))?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let summary = catalog::import_rows(&conn, &rows)
        .map_err(|e| format!("Failed to import catalog: {}", e))?;

    Ok(ImportCatalogResponse {
        success: true,
        file_path: file_path.to_string(),
        total_rows: rows.len(),
        message: format!(
            "Imported {} foods, skipped {} already present",
            summary.inserted, summary.skipped
        ),
        summary,
    })
}

/// Search a catalog CSV without importing it
pub fn search_catalog(
    file_path: &str,
    query: &str,
    locale: &str,
    limit: usize,
) -> Result<SearchCatalogResponse, String> {
    let rows = catalog::load_catalog(file_path)
        .map_err(|e| format!("Failed to read catalog {}: {}", file_path, e))?;

    let results = catalog::search_catalog(&rows, query, locale)
        .into_iter()
        .take(limit.max(1))
        .cloned()
        .collect();

    Ok(SearchCatalogResponse {
        file_path: file_path.to_string(),
        query: query.to_string(),
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn database() -> Database {
        let db = Database::in_memory().unwrap();
        db.with_conn(crate::db::migrations::run_migrations).unwrap();
        db
    }

    fn idli() -> FoodCreate {
        let mut names = BTreeMap::new();
        names.insert("kn".to_string(), "ಇಡ್ಲಿ".to_string());
        FoodCreate {
            name: "Idli".to_string(),
            calories: 58,
            protein: Some(2.0),
            carbs: Some(12.0),
            fat: Some(0.4),
            localized_names: names,
            ..Default::default()
        }
    }

    #[test]
    fn test_add_and_get_food() {
        let db = database();
        let added = add_food(&db, idli(), "kn").unwrap();
        assert_eq!(added.display_name, "ಇಡ್ಲಿ");
        assert_eq!(added.portions.small.calories, 44);
        assert_eq!(added.portions.large.calories, 87);
        assert_eq!(added.meal_usage_count, 0);

        let fetched = get_food(&db, added.food.id, "en").unwrap().unwrap();
        assert_eq!(fetched.display_name, "Idli");
        assert!(get_food(&db, 999, "en").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let db = database();
        add_food(&db, idli(), "en").unwrap();
        let err = add_food(&db, FoodCreate { name: "idli".to_string(), ..idli() }, "en").unwrap_err();
        assert!(err.contains("already exists"));
    }

    #[test]
    fn test_negative_values_rejected() {
        let db = database();
        let err = add_food(&db, FoodCreate { fat: Some(-1.0), ..idli() }, "en").unwrap_err();
        assert!(err.contains("fat"));
    }

    #[test]
    fn test_search_and_list() {
        let db = database();
        add_food(&db, idli(), "en").unwrap();
        add_food(&db, FoodCreate { name: "Vada".to_string(), calories: 97, ..Default::default() }, "en").unwrap();

        let response = search_foods(&db, "ಇಡ್", "kn", 10).unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].name, "Idli");

        let listing = list_foods(&db, "en", 1, 0).unwrap();
        assert_eq!(listing.foods.len(), 1);
        assert_eq!(listing.total, 2);
    }

    #[test]
    fn test_update_and_delete() {
        let db = database();
        let id = add_food(&db, idli(), "en").unwrap().food.id;

        let updated = update_food(&db, id, FoodUpdate { calories: Some(60), ..Default::default() }, "en")
            .unwrap()
            .unwrap();
        assert_eq!(updated.portions.medium.calories, 60);

        assert!(delete_food(&db, id).unwrap().success);
        assert!(!delete_food(&db, id).unwrap().success);
    }

    #[test]
    fn test_menu_groups_foods_by_section() {
        let db = database();
        add_food(&db, idli(), "en").unwrap();
        add_food(&db, FoodCreate { name: "Filter Coffee".to_string(), calories: 90, ..Default::default() }, "en").unwrap();
        add_food(&db, FoodCreate { name: "Curd Rice".to_string(), calories: 250, ..Default::default() }, "en").unwrap();
        add_food(&db, FoodCreate {
            name: "Chapati".to_string(),
            category: Some("side".to_string()),
            calories: 120,
            ..Default::default()
        }, "en").unwrap();

        let response = menu(&db, "kn").unwrap();
        assert_eq!(response.total, 4);

        let names = |section: MenuSection| -> Vec<String> {
            response
                .sections
                .iter()
                .find(|l| l.section == section)
                .map(|l| l.foods.iter().map(|f| f.display_name.clone()).collect())
                .unwrap_or_default()
        };
        assert_eq!(names(MenuSection::Beverage), vec!["Filter Coffee"]);
        assert_eq!(names(MenuSection::MainCourse), vec!["Curd Rice"]);
        assert_eq!(names(MenuSection::Side), vec!["Chapati"]);
        assert_eq!(names(MenuSection::Snack), vec!["ಇಡ್ಲಿ"]);
        assert_eq!(response.sections[0].section, MenuSection::Beverage);
    }

    #[test]
    fn test_update_to_taken_name_rejected() {
        let db = database();
        add_food(&db, idli(), "en").unwrap();
        let vada = add_food(&db, FoodCreate { name: "Vada".to_string(), calories: 97, ..Default::default() }, "en")
            .unwrap()
            .food
            .id;

        let err = update_food(&db, vada, FoodUpdate { name: Some("IDLI".to_string()), ..Default::default() }, "en")
            .unwrap_err();
        assert!(err.contains("already exists"));
    }

    #[test]
    fn test_import_missing_catalog() {
        let db = database();
        let err = import_catalog(&db, "/nonexistent/food_data.csv").unwrap_err();
        assert!(err.contains("Failed to read catalog"));
    }
}
