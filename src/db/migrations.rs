//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!("Applied schema migration v1");
    }

    debug_assert_eq!(get_schema_version(conn)?, SCHEMA_VERSION);
    Ok(())
}

/// Highest applied migration, 0 for a fresh database
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- FOODS
        -- Nutrition per reference (medium) portion
        -- ============================================
        CREATE TABLE foods (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,                  -- English name
            category TEXT NOT NULL DEFAULT 'other',

            calories INTEGER NOT NULL DEFAULT 0, -- kcal
            protein REAL,                        -- grams
            carbs REAL,                          -- grams
            fat REAL,                            -- grams
            fiber REAL,                          -- grams

            -- Declared serving weights, display only
            portion_small_g REAL,
            portion_medium_g REAL,
            portion_large_g REAL,

            is_custom INTEGER NOT NULL DEFAULT 0,
            created_by INTEGER,                  -- user id for custom foods
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_foods_name ON foods(name);

        -- ============================================
        -- FOOD NAMES
        -- Localized names, one per locale
        -- ============================================
        CREATE TABLE food_names (
            food_id INTEGER NOT NULL REFERENCES foods(id) ON DELETE CASCADE,
            locale TEXT NOT NULL,
            name TEXT NOT NULL,
            PRIMARY KEY (food_id, locale)
        );

        -- ============================================
        -- USER PROFILES
        -- ============================================
        CREATE TABLE user_profiles (
            user_id INTEGER PRIMARY KEY,
            height_cm REAL,
            weight_kg REAL,
            age INTEGER,
            gender TEXT,
            activity_level TEXT,
            health_goal TEXT,

            -- Stored targets, NULL until computable
            target_calories INTEGER,
            target_protein INTEGER,
            target_carbs INTEGER,
            target_fat INTEGER,

            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- MEALS
        -- ============================================
        CREATE TABLE meals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            date TEXT NOT NULL,                  -- ISO date: "2026-10-18"
            time TEXT NOT NULL,                  -- "12:30:00"
            meal_type TEXT NOT NULL,             -- free-form, usually breakfast/lunch/dinner/snack
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_meals_user_date ON meals(user_id, date);

        CREATE TABLE meal_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meal_id INTEGER NOT NULL REFERENCES meals(id) ON DELETE CASCADE,
            food_id INTEGER NOT NULL REFERENCES foods(id) ON DELETE RESTRICT,
            portion_size TEXT NOT NULL DEFAULT 'medium'
        );

        CREATE INDEX idx_meal_items_meal ON meal_items(meal_id);
        CREATE INDEX idx_meal_items_food ON meal_items(food_id);

        -- ============================================
        -- ACHIEVEMENTS
        -- ============================================
        CREATE TABLE user_achievements (
            user_id INTEGER NOT NULL,
            achievement_id INTEGER NOT NULL,
            earned_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (user_id, achievement_id)
        );
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }
}
