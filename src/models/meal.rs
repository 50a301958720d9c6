//! Meal model
//!
//! A logged meal: a dated, typed set of foods with the portion eaten of each.
//! Meal nutrition is never stored; it is derived from the items on read.

use chrono::{NaiveDate, NaiveTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use crate::nutrition::{
    meal_totals, FoodNutrition, MealLine, MealRecord, MealSource, PortionSize,
};
use super::{Food, FoodCreate, Nutrition};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Meal type enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    Unspecified,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
            MealType::Unspecified => "unspecified",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => MealType::Breakfast,
            "lunch" => MealType::Lunch,
            "dinner" => MealType::Dinner,
            "snack" => MealType::Snack,
            _ => MealType::Unspecified,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub meal_type: MealType,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealItem {
    pub id: i64,
    pub meal_id: i64,
    pub food_id: i64,
    pub portion_size: PortionSize,
}

/// Meal item to add when logging a meal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealItemCreate {
    pub food_id: i64,
    #[serde(default)]
    pub portion_size: PortionSize,
}

/// Data for logging a meal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealCreate {
    pub user_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub meal_type: MealType,
    pub notes: Option<String>,
    pub items: Vec<MealItemCreate>,
}

/// Data for logging one dish by name, creating it if unknown
#[derive(Debug, Clone)]
pub struct CustomMealCreate {
    pub user_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub meal_type: MealType,
    pub notes: Option<String>,
    /// Nutrition per medium portion, used only when the dish is new
    pub food: FoodCreate,
    pub portion_size: PortionSize,
}

/// A logged custom meal and the food it used
#[derive(Debug, Clone)]
pub struct CustomMeal {
    pub meal: Meal,
    pub food_id: i64,
    pub food_created: bool,
}

/// Meal item with its food resolved, for display
#[derive(Debug, Clone, Serialize)]
pub struct MealItemDetail {
    pub id: i64,
    pub food_id: i64,
    pub food_name: String,
    pub portion_size: PortionSize,
    pub serving_grams: Option<f64>,
    pub nutrition: Nutrition,
}

/// Meal with resolved items and derived totals
#[derive(Debug, Clone, Serialize)]
pub struct MealDetail {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub meal_type: MealType,
    pub notes: Option<String>,
    pub items: Vec<MealItemDetail>,
    pub nutrition: Nutrition,
}

fn conversion_error(idx: usize, e: chrono::ParseError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn parse_date(s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| conversion_error(0, e))
}

fn parse_time(s: &str) -> rusqlite::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FORMAT).map_err(|e| conversion_error(0, e))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

impl Meal {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let meal_type: String = row.get("meal_type")?;
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            date: parse_date(&row.get::<_, String>("date")?)?,
            time: parse_time(&row.get::<_, String>("time")?)?,
            meal_type: MealType::from_str(&meal_type),
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Insert a meal and its items without opening a transaction
    fn insert(conn: &Connection, data: &MealCreate) -> DbResult<i64> {
        conn.execute(
            r#"
            INSERT INTO meals (user_id, date, time, meal_type, notes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                data.user_id,
                format_date(data.date),
                data.time.format(TIME_FORMAT).to_string(),
                data.meal_type.as_str(),
                data.notes,
            ],
        )?;
        let meal_id = conn.last_insert_rowid();

        for item in &data.items {
            if Food::get_by_id(conn, item.food_id)?.is_none() {
                return Err(DbError::NotFound(format!("food {}", item.food_id)));
            }
            conn.execute(
                "INSERT INTO meal_items (meal_id, food_id, portion_size) VALUES (?1, ?2, ?3)",
                params![meal_id, item.food_id, item.portion_size.as_str()],
            )?;
        }

        Ok(meal_id)
    }

    /// Log a meal and its items in one transaction
    pub fn create(conn: &Connection, data: &MealCreate) -> DbResult<Self> {
        let tx = conn.unchecked_transaction()?;
        let meal_id = Self::insert(&tx, data)?;
        tx.commit()?;
        tracing::debug!(meal_id, items = data.items.len(), "Logged meal");

        Self::get_by_id(conn, meal_id)?.ok_or_else(|| DbError::NotFound(format!("meal {}", meal_id)))
    }

    /// Log a single dish by name
    ///
    /// A food with the same name (ignoring case) is reused as stored; otherwise
    /// the given nutrition becomes a new custom food owned by the user. The
    /// food and the meal are written in one transaction.
    pub fn create_custom(conn: &Connection, data: &CustomMealCreate) -> DbResult<CustomMeal> {
        let tx = conn.unchecked_transaction()?;

        let (food_id, food_created) = match Food::get_by_name(&tx, &data.food.name)? {
            Some(food) => (food.id, false),
            None => {
                let food = FoodCreate {
                    is_custom: true,
                    created_by: Some(data.user_id),
                    ..data.food.clone()
                };
                (Food::insert(&tx, &food)?, true)
            }
        };

        let meal_id = Self::insert(&tx, &MealCreate {
            user_id: data.user_id,
            date: data.date,
            time: data.time,
            meal_type: data.meal_type,
            notes: data.notes.clone(),
            items: vec![MealItemCreate { food_id, portion_size: data.portion_size }],
        })?;
        tx.commit()?;

        if food_created {
            tracing::info!(food_id, user_id = data.user_id, "Created custom food '{}'", data.food.name.trim());
        }

        let meal = Self::get_by_id(conn, meal_id)?
            .ok_or_else(|| DbError::NotFound(format!("meal {}", meal_id)))?;
        Ok(CustomMeal { meal, food_id, food_created })
    }

    /// Get a meal by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM meals WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(meal) => Ok(Some(meal)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Meals of a user within `start..=end`, oldest first
    pub fn list_for_user(
        conn: &Connection,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM meals
            WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
            ORDER BY date, time, id
            "#,
        )?;

        let meals = stmt
            .query_map(params![user_id, format_date(start), format_date(end)], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(meals)
    }

    /// Total meals ever logged by a user
    pub fn count_for_user(conn: &Connection, user_id: i64) -> DbResult<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM meals WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn items(conn: &Connection, meal_id: i64) -> DbResult<Vec<MealItem>> {
        let mut stmt = conn.prepare("SELECT * FROM meal_items WHERE meal_id = ?1 ORDER BY id")?;

        let items = stmt
            .query_map([meal_id], |row| {
                let portion: String = row.get("portion_size")?;
                Ok(MealItem {
                    id: row.get("id")?,
                    meal_id: row.get("meal_id")?,
                    food_id: row.get("food_id")?,
                    portion_size: PortionSize::from_str(&portion),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Resolve items and totals, naming foods in `locale`
    pub fn detail(&self, conn: &Connection, locale: &str) -> DbResult<MealDetail> {
        let mut items = Vec::new();
        for item in Self::items(conn, self.id)? {
            let food = Food::get_by_id(conn, item.food_id)?
                .ok_or_else(|| DbError::NotFound(format!("food {}", item.food_id)))?;
            items.push(MealItemDetail {
                id: item.id,
                food_id: food.id,
                food_name: food.display_name(locale).to_string(),
                portion_size: item.portion_size,
                serving_grams: food.serving_grams(item.portion_size),
                nutrition: food.nutrition_for(item.portion_size),
            });
        }

        let nutrition = items.iter().map(|i| i.nutrition).sum();

        Ok(MealDetail {
            id: self.id,
            user_id: self.user_id,
            date: self.date,
            time: self.time,
            meal_type: self.meal_type,
            notes: self.notes.clone(),
            items,
            nutrition,
        })
    }

    /// Delete a meal; its items go with it
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM meals WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Meal snapshots with foods joined in, for aggregation
    pub fn records_for_user(
        conn: &Connection,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<MealRecord>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT m.id AS meal_id, m.date, m.meal_type,
                   i.portion_size, f.name, f.calories, f.protein, f.carbs, f.fat, f.fiber
            FROM meals m
            LEFT JOIN meal_items i ON i.meal_id = m.id
            LEFT JOIN foods f ON f.id = i.food_id
            WHERE m.user_id = ?1 AND m.date >= ?2 AND m.date <= ?3
            ORDER BY m.date, m.time, m.id, i.id
            "#,
        )?;

        let mut rows = stmt.query(params![user_id, format_date(start), format_date(end)])?;
        let mut records: Vec<MealRecord> = Vec::new();
        let mut current_id: Option<i64> = None;

        while let Some(row) = rows.next()? {
            let meal_id: i64 = row.get("meal_id")?;
            if current_id != Some(meal_id) {
                let meal_type: String = row.get("meal_type")?;
                records.push(MealRecord {
                    date: parse_date(&row.get::<_, String>("date")?)?,
                    meal_type: MealType::from_str(&meal_type),
                    items: Vec::new(),
                });
                current_id = Some(meal_id);
            }

            // Meals without items produce one row of NULLs
            let Some(name) = row.get::<_, Option<String>>("name")? else {
                continue;
            };
            let portion: String = row.get("portion_size")?;
            let line = MealLine {
                food: FoodNutrition {
                    name,
                    calories: row.get("calories")?,
                    protein: row.get("protein")?,
                    carbs: row.get("carbs")?,
                    fat: row.get("fat")?,
                    fiber: row.get("fiber")?,
                },
                portion: PortionSize::from_str(&portion),
            };
            if let Some(record) = records.last_mut() {
                record.items.push(line);
            }
        }

        Ok(records)
    }
}

impl MealSource for Connection {
    type Error = DbError;

    fn fetch_meals(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MealRecord>, DbError> {
        Meal::records_for_user(self, user_id, start, end)
    }
}

/// Totals of a single stored meal
pub fn meal_nutrition(conn: &Connection, meal_id: i64) -> DbResult<Nutrition> {
    let mut lines = Vec::new();
    for item in Meal::items(conn, meal_id)? {
        let food = Food::get_by_id(conn, item.food_id)?
            .ok_or_else(|| DbError::NotFound(format!("food {}", item.food_id)))?;
        lines.push(MealLine { food: food.nutrition_profile(), portion: item.portion_size });
    }
    Ok(meal_totals(&lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use crate::nutrition::{daily_totals, meal_type_distribution};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    fn add_food(conn: &Connection, name: &str, calories: i64, protein: Option<f64>) -> i64 {
        Food::create(conn, &FoodCreate {
            name: name.to_string(),
            calories,
            protein,
            ..Default::default()
        })
        .unwrap()
        .id
    }

    fn log(conn: &Connection, user_id: i64, on: &str, meal_type: MealType, items: Vec<(i64, PortionSize)>) -> Meal {
        Meal::create(conn, &MealCreate {
            user_id,
            date: date(on),
            time: noon(),
            meal_type,
            notes: None,
            items: items
                .into_iter()
                .map(|(food_id, portion_size)| MealItemCreate { food_id, portion_size })
                .collect(),
        })
        .unwrap()
    }

    #[test]
    fn test_meal_type_from_str() {
        assert_eq!(MealType::from_str("Breakfast"), MealType::Breakfast);
        assert_eq!(MealType::from_str(" snack "), MealType::Snack);
        assert_eq!(MealType::from_str("brunch"), MealType::Unspecified);
    }

    #[test]
    fn test_create_and_detail() {
        let conn = test_connection();
        let rice = add_food(&conn, "Rice", 200, Some(4.0));
        let dal = add_food(&conn, "Dal", 150, None);

        let meal = log(&conn, 1, "2026-10-18", MealType::Lunch, vec![
            (rice, PortionSize::Large),
            (dal, PortionSize::Small),
        ]);
        assert_eq!(meal.meal_type, MealType::Lunch);
        assert_eq!(meal.time, noon());

        let detail = meal.detail(&conn, "en").unwrap();
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].food_name, "Rice");
        assert_eq!(detail.nutrition.calories, 300 + 113);
        assert_eq!(detail.nutrition.protein, 6.0);
        assert_eq!(meal_nutrition(&conn, meal.id).unwrap(), detail.nutrition);
    }

    #[test]
    fn test_unknown_food_rolls_back() {
        let conn = test_connection();
        let result = Meal::create(&conn, &MealCreate {
            user_id: 1,
            date: date("2026-10-18"),
            time: noon(),
            meal_type: MealType::Dinner,
            notes: None,
            items: vec![MealItemCreate { food_id: 42, portion_size: PortionSize::Medium }],
        });
        assert!(matches!(result, Err(DbError::NotFound(_))));
        assert_eq!(Meal::count_for_user(&conn, 1).unwrap(), 0);
    }

    fn custom(name: &str, calories: i64) -> CustomMealCreate {
        CustomMealCreate {
            user_id: 3,
            date: date("2026-10-18"),
            time: noon(),
            meal_type: MealType::Snack,
            notes: None,
            food: FoodCreate {
                name: name.to_string(),
                calories,
                protein: Some(4.0),
                ..Default::default()
            },
            portion_size: PortionSize::Large,
        }
    }

    #[test]
    fn test_custom_meal_creates_food() {
        let conn = test_connection();
        let logged = Meal::create_custom(&conn, &custom("Home Upma", 200)).unwrap();

        assert!(logged.food_created);
        let food = Food::get_by_id(&conn, logged.food_id).unwrap().unwrap();
        assert!(food.is_custom);
        assert_eq!(food.created_by, Some(3));
        assert_eq!(meal_nutrition(&conn, logged.meal.id).unwrap().calories, 300);
        assert_eq!(logged.meal.meal_type, MealType::Snack);
    }

    #[test]
    fn test_custom_meal_reuses_existing_food() {
        let conn = test_connection();
        let poha = add_food(&conn, "Poha", 180, Some(3.5));

        let logged = Meal::create_custom(&conn, &custom("POHA", 999)).unwrap();
        assert!(!logged.food_created);
        assert_eq!(logged.food_id, poha);
        assert_eq!(Food::count(&conn).unwrap(), 1);
        assert_eq!(meal_nutrition(&conn, logged.meal.id).unwrap().calories, 270);
        assert!(!Food::get_by_id(&conn, poha).unwrap().unwrap().is_custom);
    }

    #[test]
    fn test_custom_meal_with_blank_name_writes_nothing() {
        let conn = test_connection();
        assert!(matches!(Meal::create_custom(&conn, &custom("  ", 100)), Err(DbError::Invalid(_))));
        assert_eq!(Food::count(&conn).unwrap(), 0);
        assert_eq!(Meal::count_for_user(&conn, 3).unwrap(), 0);
    }

    #[test]
    fn test_records_respect_user_and_range() {
        let conn = test_connection();
        let idli = add_food(&conn, "Idli", 40, Some(2.0));

        log(&conn, 1, "2026-10-16", MealType::Breakfast, vec![(idli, PortionSize::Medium)]);
        log(&conn, 1, "2026-10-18", MealType::Breakfast, vec![(idli, PortionSize::Large), (idli, PortionSize::Medium)]);
        log(&conn, 1, "2026-10-18", MealType::Snack, vec![]);
        log(&conn, 2, "2026-10-18", MealType::Breakfast, vec![(idli, PortionSize::Medium)]);

        let records = conn.fetch_meals(1, date("2026-10-17"), date("2026-10-18")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].items.len(), 2);
        assert!(records[1].items.is_empty());

        let totals = daily_totals(&conn, 1, date("2026-10-18")).unwrap();
        assert_eq!(totals.calories, 100);
        assert_eq!(totals.protein, 5.0);
    }

    #[test]
    fn test_distribution_ignores_legacy_meal_type() {
        let conn = test_connection();
        let pancakes = add_food(&conn, "Pancakes", 300, None);
        let meal = log(&conn, 1, "2026-10-18", MealType::Breakfast, vec![(pancakes, PortionSize::Medium)]);
        log(&conn, 1, "2026-10-18", MealType::Dinner, vec![(pancakes, PortionSize::Small)]);

        conn.execute("UPDATE meals SET meal_type = 'brunch' WHERE id = ?1", [meal.id]).unwrap();

        let distribution = meal_type_distribution(&conn, 1, date("2026-10-18")).unwrap();
        assert_eq!(distribution.breakfast, 0);
        assert_eq!(distribution.dinner, 225);
        assert_eq!(distribution.total(), 225);
    }

    #[test]
    fn test_legacy_portion_label_counts_as_medium() {
        let conn = test_connection();
        let roti = add_food(&conn, "Roti", 120, None);
        let meal = log(&conn, 1, "2026-10-18", MealType::Lunch, vec![(roti, PortionSize::Large)]);
        conn.execute("UPDATE meal_items SET portion_size = 'jumbo' WHERE meal_id = ?1", [meal.id]).unwrap();

        assert_eq!(meal_nutrition(&conn, meal.id).unwrap().calories, 120);
    }

    #[test]
    fn test_delete_cascades_items() {
        let conn = test_connection();
        let roti = add_food(&conn, "Roti", 120, None);
        let meal = log(&conn, 1, "2026-10-18", MealType::Lunch, vec![(roti, PortionSize::Medium)]);

        assert!(Food::delete(&conn, roti).is_err());
        assert!(Meal::delete(&conn, meal.id).unwrap());
        assert!(Meal::items(&conn, meal.id).unwrap().is_empty());
        assert!(Food::delete(&conn, roti).unwrap());
    }
}
