//! Food model
//!
//! A food with nutrition for its reference (medium) portion and optional
//! localized names.

use std::collections::BTreeMap;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use crate::models::Nutrition;
use crate::nutrition::{FoodNutrition, PortionSize};

/// Default locale; foods always carry a name in it
pub const DEFAULT_LOCALE: &str = "en";

/// Locales with name columns in the catalog
pub const SUPPORTED_LOCALES: &[&str] = &["en", "es", "hi", "kn", "ta", "te", "mr", "gu"];

pub fn is_supported_locale(locale: &str) -> bool {
    SUPPORTED_LOCALES.contains(&locale)
}

/// Declared serving weights in grams
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PortionGrams {
    pub small: Option<f64>,
    pub medium: Option<f64>,
    pub large: Option<f64>,
}

impl PortionGrams {
    pub fn get(&self, portion: PortionSize) -> Option<f64> {
        match portion {
            PortionSize::Small => self.small,
            PortionSize::Medium => self.medium,
            PortionSize::Large => self.large,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Food {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub calories: i64,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub portion_grams: PortionGrams,
    /// Non-English names keyed by locale
    pub localized_names: BTreeMap<String, String>,
    pub is_custom: bool,
    pub created_by: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a food
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoodCreate {
    pub name: String,
    pub category: Option<String>,
    pub calories: i64,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    #[serde(default)]
    pub portion_grams: PortionGrams,
    #[serde(default)]
    pub localized_names: BTreeMap<String, String>,
    #[serde(default)]
    pub is_custom: bool,
    pub created_by: Option<i64>,
}

/// Data for updating a food
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoodUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub calories: Option<i64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    /// Replaces the given locales; other locales are kept
    pub localized_names: Option<BTreeMap<String, String>>,
}

/// Escape LIKE wildcards so the query matches literally
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Food {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            category: row.get("category")?,
            calories: row.get("calories")?,
            protein: row.get("protein")?,
            carbs: row.get("carbs")?,
            fat: row.get("fat")?,
            fiber: row.get("fiber")?,
            portion_grams: PortionGrams {
                small: row.get("portion_small_g")?,
                medium: row.get("portion_medium_g")?,
                large: row.get("portion_large_g")?,
            },
            localized_names: BTreeMap::new(),
            is_custom: row.get("is_custom")?,
            created_by: row.get("created_by")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn with_names(mut self, conn: &Connection) -> DbResult<Self> {
        let mut stmt = conn.prepare("SELECT locale, name FROM food_names WHERE food_id = ?1")?;
        self.localized_names = stmt
            .query_map([self.id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(self)
    }

    fn save_names(conn: &Connection, id: i64, names: &BTreeMap<String, String>) -> DbResult<()> {
        for (locale, name) in names {
            if locale == DEFAULT_LOCALE || name.trim().is_empty() {
                continue;
            }
            if !is_supported_locale(locale) {
                tracing::warn!("Ignoring name for unsupported locale '{}'", locale);
                continue;
            }
            conn.execute(
                r#"
                INSERT INTO food_names (food_id, locale, name) VALUES (?1, ?2, ?3)
                ON CONFLICT(food_id, locale) DO UPDATE SET name = excluded.name
                "#,
                params![id, locale, name.trim()],
            )?;
        }
        Ok(())
    }

    /// Insert a food and its names without opening a transaction
    pub(crate) fn insert(conn: &Connection, data: &FoodCreate) -> DbResult<i64> {
        let name = data.name.trim();
        if name.is_empty() {
            return Err(DbError::Invalid("food name must not be empty".to_string()));
        }

        conn.execute(
            r#"
            INSERT INTO foods (
                name, category, calories, protein, carbs, fat, fiber,
                portion_small_g, portion_medium_g, portion_large_g,
                is_custom, created_by
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                name,
                data.category.as_deref().unwrap_or("other"),
                data.calories,
                data.protein,
                data.carbs,
                data.fat,
                data.fiber,
                data.portion_grams.small,
                data.portion_grams.medium,
                data.portion_grams.large,
                data.is_custom,
                data.created_by,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::save_names(conn, id, &data.localized_names)?;
        Ok(id)
    }

    /// Create a new food
    pub fn create(conn: &Connection, data: &FoodCreate) -> DbResult<Self> {
        let tx = conn.unchecked_transaction()?;
        let id = Self::insert(&tx, data)?;
        tx.commit()?;

        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::NotFound(format!("food {}", id)))
    }

    /// Get a food by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM foods WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(food) => Ok(Some(food.with_names(conn)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a food by exact English name, ignoring case
    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM foods WHERE name = ?1 COLLATE NOCASE ORDER BY id LIMIT 1"
        )?;

        let result = stmt.query_row([name.trim()], Self::from_row);
        match result {
            Ok(food) => Ok(Some(food.with_names(conn)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Search by English name, or by the localized name for a non-English locale
    pub fn search(conn: &Connection, query: &str, locale: &str, limit: i64) -> DbResult<Vec<Self>> {
        let pattern = format!("%{}%", escape_like(query.trim()));
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT f.* FROM foods f
            LEFT JOIN food_names n ON n.food_id = f.id AND n.locale = ?2
            WHERE f.name LIKE ?1 ESCAPE '\' OR n.name LIKE ?1 ESCAPE '\'
            ORDER BY f.name
            LIMIT ?3
            "#,
        )?;

        let foods = stmt
            .query_map(params![pattern, locale, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        foods.into_iter().map(|f| f.with_names(conn)).collect()
    }

    /// List foods ordered by name
    pub fn list(conn: &Connection, limit: i64, offset: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM foods ORDER BY name LIMIT ?1 OFFSET ?2")?;

        let foods = stmt
            .query_map(params![limit, offset], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        foods.into_iter().map(|f| f.with_names(conn)).collect()
    }

    /// Every food, ordered by name
    pub fn all(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM foods ORDER BY name")?;

        let foods = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        foods.into_iter().map(|f| f.with_names(conn)).collect()
    }

    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count = conn.query_row("SELECT COUNT(*) FROM foods", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Update a food
    pub fn update(conn: &Connection, id: i64, data: &FoodUpdate) -> DbResult<Option<Self>> {
        if Self::get_by_id(conn, id)?.is_none() {
            return Ok(None);
        }

        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref name) = data.name {
            if name.trim().is_empty() {
                return Err(DbError::Invalid("food name must not be empty".to_string()));
            }
            let taken: Option<i64> = conn
                .query_row(
                    "SELECT id FROM foods WHERE name = ?1 COLLATE NOCASE AND id != ?2 LIMIT 1",
                    params![name.trim(), id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(other) = taken {
                return Err(DbError::Invalid(format!(
                    "food '{}' already exists with id {}",
                    name.trim(),
                    other
                )));
            }
            params_vec.push(Box::new(name.trim().to_string()));
            updates.push(format!("name = ?{}", params_vec.len()));
        }
        if let Some(ref category) = data.category {
            params_vec.push(Box::new(category.clone()));
            updates.push(format!("category = ?{}", params_vec.len()));
        }
        if let Some(calories) = data.calories {
            params_vec.push(Box::new(calories));
            updates.push(format!("calories = ?{}", params_vec.len()));
        }
        for (column, value) in [
            ("protein", data.protein),
            ("carbs", data.carbs),
            ("fat", data.fat),
            ("fiber", data.fiber),
        ] {
            if let Some(v) = value {
                params_vec.push(Box::new(v));
                updates.push(format!("{} = ?{}", column, params_vec.len()));
            }
        }

        let tx = conn.unchecked_transaction()?;
        if !updates.is_empty() {
            updates.push("updated_at = datetime('now')".to_string());
            params_vec.push(Box::new(id));
            let sql = format!(
                "UPDATE foods SET {} WHERE id = ?{}",
                updates.join(", "),
                params_vec.len()
            );
            let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
            tx.execute(&sql, params_refs.as_slice())?;
        }
        if let Some(ref names) = data.localized_names {
            Self::save_names(&tx, id, names)?;
        }
        tx.commit()?;

        Self::get_by_id(conn, id)
    }

    /// Number of meal items referencing this food
    pub fn usage_count(conn: &Connection, id: i64) -> DbResult<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM meal_items WHERE food_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete a food; refused while any logged meal uses it
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let used = Self::usage_count(conn, id)?;
        if used > 0 {
            return Err(DbError::Invalid(format!(
                "food {} is used by {} logged meal item(s)",
                id, used
            )));
        }

        let rows = conn.execute("DELETE FROM foods WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Name in `locale`, falling back to the English name
    pub fn display_name(&self, locale: &str) -> &str {
        if locale == DEFAULT_LOCALE {
            return &self.name;
        }
        self.localized_names
            .get(locale)
            .map(String::as_str)
            .unwrap_or(&self.name)
    }

    /// Declared weight of a serving, if the catalog provided one
    pub fn serving_grams(&self, portion: PortionSize) -> Option<f64> {
        self.portion_grams.get(portion)
    }

    pub fn nutrition_profile(&self) -> FoodNutrition {
        FoodNutrition {
            name: self.name.clone(),
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
            fiber: self.fiber,
        }
    }

    pub fn nutrition_for(&self, portion: PortionSize) -> Nutrition {
        self.nutrition_profile().for_portion(portion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;

    fn masala_dosa() -> FoodCreate {
        let mut names = BTreeMap::new();
        names.insert("hi".to_string(), "मसाला डोसा".to_string());
        names.insert("kn".to_string(), "ಮಸಾಲೆ ದೋಸೆ".to_string());
        FoodCreate {
            name: "Masala Dosa".to_string(),
            calories: 168,
            protein: Some(3.9),
            carbs: Some(29.0),
            fat: Some(3.7),
            fiber: None,
            portion_grams: PortionGrams { small: Some(80.0), medium: Some(120.0), large: Some(180.0) },
            localized_names: names,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_and_get() {
        let conn = test_connection();
        let food = Food::create(&conn, &masala_dosa()).unwrap();

        let loaded = Food::get_by_id(&conn, food.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Masala Dosa");
        assert_eq!(loaded.category, "other");
        assert_eq!(loaded.fiber, None);
        assert_eq!(loaded.localized_names.len(), 2);
        assert_eq!(loaded.serving_grams(PortionSize::Large), Some(180.0));
    }

    #[test]
    fn test_display_name_falls_back_to_english() {
        let conn = test_connection();
        let food = Food::create(&conn, &masala_dosa()).unwrap();
        assert_eq!(food.display_name("hi"), "मसाला डोसा");
        assert_eq!(food.display_name("en"), "Masala Dosa");
        assert_eq!(food.display_name("ta"), "Masala Dosa");
    }

    #[test]
    fn test_search_by_localized_name() {
        let conn = test_connection();
        Food::create(&conn, &masala_dosa()).unwrap();
        Food::create(&conn, &FoodCreate { name: "Plain Rice".to_string(), calories: 200, ..Default::default() }).unwrap();

        assert_eq!(Food::search(&conn, "dosa", "en", 10).unwrap().len(), 1);
        assert_eq!(Food::search(&conn, "डोसा", "hi", 10).unwrap().len(), 1);
        assert!(Food::search(&conn, "डोसा", "ta", 10).unwrap().is_empty());
        assert_eq!(Food::search(&conn, "", "en", 10).unwrap().len(), 2);
    }

    #[test]
    fn test_get_by_name_ignores_case() {
        let conn = test_connection();
        Food::create(&conn, &masala_dosa()).unwrap();
        assert!(Food::get_by_name(&conn, "masala dosa").unwrap().is_some());
        assert!(Food::get_by_name(&conn, "idli").unwrap().is_none());
    }

    #[test]
    fn test_update_fields_and_names() {
        let conn = test_connection();
        let food = Food::create(&conn, &masala_dosa()).unwrap();

        let mut names = BTreeMap::new();
        names.insert("ta".to_string(), "மசாலா தோசை".to_string());
        let updated = Food::update(&conn, food.id, &FoodUpdate {
            calories: Some(170),
            fiber: Some(1.2),
            localized_names: Some(names),
            ..Default::default()
        }).unwrap().unwrap();

        assert_eq!(updated.calories, 170);
        assert_eq!(updated.fiber, Some(1.2));
        assert_eq!(updated.protein, Some(3.9));
        assert_eq!(updated.localized_names.len(), 3);

        assert!(Food::update(&conn, 9999, &FoodUpdate::default()).unwrap().is_none());
    }

    #[test]
    fn test_search_treats_wildcards_literally() {
        let conn = test_connection();
        Food::create(&conn, &masala_dosa()).unwrap();
        Food::create(&conn, &FoodCreate { name: "Dal 50% Less Oil".to_string(), calories: 120, ..Default::default() }).unwrap();

        assert!(Food::search(&conn, "_", "en", 10).unwrap().is_empty());
        assert_eq!(Food::search(&conn, "50%", "en", 10).unwrap().len(), 1);
        assert_eq!(Food::search(&conn, "%", "hi", 10).unwrap().len(), 1);
        assert_eq!(escape_like(r"a\b_c%"), r"a\\b\_c\%");
    }

    #[test]
    fn test_rename_to_existing_name_rejected() {
        let conn = test_connection();
        Food::create(&conn, &masala_dosa()).unwrap();
        let rice = Food::create(&conn, &FoodCreate { name: "Plain Rice".to_string(), calories: 200, ..Default::default() }).unwrap();

        let err = Food::update(&conn, rice.id, &FoodUpdate {
            name: Some("MASALA DOSA".to_string()),
            ..Default::default()
        });
        assert!(matches!(err, Err(DbError::Invalid(_))));
        assert_eq!(Food::get_by_id(&conn, rice.id).unwrap().unwrap().name, "Plain Rice");

        // Changing only the case of its own name is fine
        let renamed = Food::update(&conn, rice.id, &FoodUpdate {
            name: Some("plain rice".to_string()),
            ..Default::default()
        }).unwrap().unwrap();
        assert_eq!(renamed.name, "plain rice");
    }

    #[test]
    fn test_empty_name_rejected() {
        let conn = test_connection();
        let err = Food::create(&conn, &FoodCreate { name: "  ".to_string(), ..Default::default() });
        assert!(matches!(err, Err(DbError::Invalid(_))));
    }

    #[test]
    fn test_nutrition_for_portion() {
        let conn = test_connection();
        let food = Food::create(&conn, &masala_dosa()).unwrap();
        let small = food.nutrition_for(PortionSize::Small);
        assert_eq!(small.calories, 126);
        assert_eq!(small.fiber, 0.0);
    }
}
