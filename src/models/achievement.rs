//! Achievement model
//!
//! Milestones unlocked by the number of meals a user has logged.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::DbResult;
use super::Meal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Achievement {
    pub id: i64,
    pub name: &'static str,
    pub description: &'static str,
    /// Meals that must be logged to earn it
    pub requirement: i64,
}

pub const ACHIEVEMENTS: [Achievement; 4] = [
    Achievement { id: 1, name: "First Meal", description: "Log your first meal", requirement: 1 },
    Achievement { id: 2, name: "Regular Tracker", description: "Log 10 meals", requirement: 10 },
    Achievement { id: 3, name: "Committed Tracker", description: "Log 30 meals", requirement: 30 },
    Achievement { id: 4, name: "Nutrition Master", description: "Log 100 meals", requirement: 100 },
];

impl Achievement {
    pub fn by_id(id: i64) -> Option<&'static Achievement> {
        ACHIEVEMENTS.iter().find(|a| a.id == id)
    }
}

/// Achievements reached at `meal_count` that are not yet earned
pub fn newly_unlocked(meal_count: i64, already_earned: &[i64]) -> Vec<&'static Achievement> {
    ACHIEVEMENTS
        .iter()
        .filter(|a| meal_count >= a.requirement && !already_earned.contains(&a.id))
        .collect()
}

/// An achievement a user has earned
#[derive(Debug, Clone, Serialize)]
pub struct EarnedAchievement {
    pub achievement: Achievement,
    pub earned_at: String,
}

/// Achievement ids earned by a user
pub fn earned_ids(conn: &Connection, user_id: i64) -> DbResult<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT achievement_id FROM user_achievements WHERE user_id = ?1 ORDER BY achievement_id",
    )?;

    let ids = stmt
        .query_map([user_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ids)
}

pub fn list_earned(conn: &Connection, user_id: i64) -> DbResult<Vec<EarnedAchievement>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT achievement_id, earned_at FROM user_achievements
        WHERE user_id = ?1
        ORDER BY achievement_id
        "#,
    )?;

    let rows = stmt
        .query_map([user_id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    // Ids from retired milestones are skipped
    Ok(rows
        .into_iter()
        .filter_map(|(id, earned_at)| {
            Achievement::by_id(id).map(|a| EarnedAchievement { achievement: *a, earned_at })
        })
        .collect())
}

/// Award every milestone the user has reached, returning the new ones
pub fn check_achievements(conn: &Connection, user_id: i64) -> DbResult<Vec<&'static Achievement>> {
    let meal_count = Meal::count_for_user(conn, user_id)?;
    let earned = earned_ids(conn, user_id)?;
    let unlocked = newly_unlocked(meal_count, &earned);

    for achievement in &unlocked {
        conn.execute(
            "INSERT OR IGNORE INTO user_achievements (user_id, achievement_id) VALUES (?1, ?2)",
            params![user_id, achievement.id],
        )?;
        tracing::info!(user_id, achievement = achievement.name, "Achievement unlocked");
    }

    Ok(unlocked)
}
