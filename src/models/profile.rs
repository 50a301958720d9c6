//! User profile model
//!
//! Body measurements plus the calorie and macro targets derived from them.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use crate::nutrition::{
    bmi_with_category, BmiCategory, BodyProfile, HealthGoal, MacroTargets, ProfileSnapshot,
    ProfileSource,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub body: BodyProfile,
    /// Stored targets; absent until the profile was complete once
    pub targets: Option<MacroTargets>,
    pub updated_at: String,
}

/// Partial profile update; `None` keeps the stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub activity_level: Option<String>,
    pub health_goal: Option<String>,
}

impl UserProfile {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let calories: Option<i64> = row.get("target_calories")?;
        let protein: Option<i64> = row.get("target_protein")?;
        let carbs: Option<i64> = row.get("target_carbs")?;
        let fat: Option<i64> = row.get("target_fat")?;

        let targets = match (calories, protein, carbs, fat) {
            (Some(calories), Some(protein_g), Some(carbs_g), Some(fat_g)) => Some(MacroTargets {
                calories,
                protein_g,
                carbs_g,
                fat_g,
            }),
            _ => None,
        };

        Ok(Self {
            user_id: row.get("user_id")?,
            body: BodyProfile {
                height_cm: row.get("height_cm")?,
                weight_kg: row.get("weight_kg")?,
                age: row.get("age")?,
                gender: row.get("gender")?,
                activity_level: row.get("activity_level")?,
                health_goal: row.get("health_goal")?,
            },
            targets,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn get(conn: &Connection, user_id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM user_profiles WHERE user_id = ?1")?;

        let result = stmt.query_row([user_id], Self::from_row);
        match result {
            Ok(profile) => Ok(Some(profile)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Merge an update into the stored profile (creating it if needed)
    ///
    /// Targets are recomputed when the merged profile is complete. An
    /// incomplete profile keeps whatever targets it had before.
    pub fn upsert(conn: &Connection, user_id: i64, data: &ProfileUpdate) -> DbResult<Self> {
        let existing = Self::get(conn, user_id)?;
        let mut body = existing.as_ref().map(|p| p.body.clone()).unwrap_or_default();

        if let Some(v) = data.height_cm {
            body.height_cm = Some(v);
        }
        if let Some(v) = data.weight_kg {
            body.weight_kg = Some(v);
        }
        if let Some(v) = data.age {
            body.age = Some(v);
        }
        if let Some(v) = &data.gender {
            body.gender = Some(v.clone());
        }
        if let Some(v) = &data.activity_level {
            body.activity_level = Some(v.clone());
        }
        if let Some(v) = &data.health_goal {
            body.health_goal = Some(v.clone());
        }
        if body.health_goal.is_none() {
            body.health_goal = Some(HealthGoal::Maintenance.as_str().to_string());
        }

        let targets = match body.macro_targets() {
            Some(t) => Some(t),
            None => {
                tracing::debug!(user_id, "Profile incomplete, keeping stored targets");
                existing.and_then(|p| p.targets)
            }
        };

        conn.execute(
            r#"
            INSERT INTO user_profiles (
                user_id, height_cm, weight_kg, age, gender, activity_level, health_goal,
                target_calories, target_protein, target_carbs, target_fat
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(user_id) DO UPDATE SET
                height_cm = excluded.height_cm,
                weight_kg = excluded.weight_kg,
                age = excluded.age,
                gender = excluded.gender,
                activity_level = excluded.activity_level,
                health_goal = excluded.health_goal,
                target_calories = excluded.target_calories,
                target_protein = excluded.target_protein,
                target_carbs = excluded.target_carbs,
                target_fat = excluded.target_fat,
                updated_at = datetime('now')
            "#,
            params![
                user_id,
                body.height_cm,
                body.weight_kg,
                body.age,
                body.gender,
                body.activity_level,
                body.health_goal,
                targets.map(|t| t.calories),
                targets.map(|t| t.protein_g),
                targets.map(|t| t.carbs_g),
                targets.map(|t| t.fat_g),
            ],
        )?;

        Self::get(conn, user_id)?.ok_or_else(|| DbError::NotFound(format!("profile {}", user_id)))
    }

    pub fn bmi(&self) -> Option<(f64, BmiCategory)> {
        bmi_with_category(self.body.weight_kg, self.body.height_cm)
    }

    /// Targets to measure against, falling back to the defaults
    pub fn effective_targets(&self) -> MacroTargets {
        self.targets.unwrap_or_default()
    }

    pub fn to_snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            body: self.body.clone(),
            targets: self.targets,
        }
    }
}

impl ProfileSource for Connection {
    type Error = DbError;

    fn fetch_profile(&self, user_id: i64) -> Result<Option<ProfileSnapshot>, DbError> {
        Ok(UserProfile::get(self, user_id)?.map(|p| p.to_snapshot()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;

    fn complete_update() -> ProfileUpdate {
        ProfileUpdate {
            height_cm: Some(175.0),
            weight_kg: Some(70.0),
            age: Some(25),
            gender: Some("male".to_string()),
            activity_level: Some("moderate".to_string()),
            health_goal: Some("weight loss".to_string()),
        }
    }

    #[test]
    fn test_missing_profile() {
        let conn = test_connection();
        assert!(UserProfile::get(&conn, 1).unwrap().is_none());
        assert!(conn.fetch_profile(1).unwrap().is_none());
    }

    #[test]
    fn test_upsert_computes_targets() {
        let conn = test_connection();
        let profile = UserProfile::upsert(&conn, 1, &complete_update()).unwrap();

        assert_eq!(
            profile.targets,
            Some(MacroTargets { calories: 2094, protein_g: 112, carbs_g: 261, fat_g: 58 })
        );
        let (bmi, category) = profile.bmi().unwrap();
        assert_eq!(bmi, 22.9);
        assert_eq!(category, BmiCategory::NormalWeight);
    }

    #[test]
    fn test_goal_defaults_to_maintenance() {
        let conn = test_connection();
        let update = ProfileUpdate { health_goal: None, ..complete_update() };
        let profile = UserProfile::upsert(&conn, 1, &update).unwrap();

        assert_eq!(profile.body.health_goal.as_deref(), Some("maintenance"));
        assert_eq!(profile.targets.map(|t| t.calories), Some(2594));
    }

    #[test]
    fn test_partial_update_merges_and_recomputes() {
        let conn = test_connection();
        UserProfile::upsert(&conn, 1, &complete_update()).unwrap();

        let profile = UserProfile::upsert(&conn, 1, &ProfileUpdate {
            health_goal: Some("gain".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(profile.body.height_cm, Some(175.0));
        assert_eq!(profile.targets.map(|t| t.calories), Some(3094));
    }

    #[test]
    fn test_incomplete_profile_has_no_targets() {
        let conn = test_connection();
        let profile = UserProfile::upsert(&conn, 1, &ProfileUpdate {
            weight_kg: Some(70.0),
            ..Default::default()
        })
        .unwrap();

        assert!(profile.targets.is_none());
        assert!(profile.bmi().is_none());
        assert_eq!(profile.effective_targets(), MacroTargets::default());
    }

    #[test]
    fn test_invalid_values_keep_previous_targets() {
        let conn = test_connection();
        let first = UserProfile::upsert(&conn, 1, &complete_update()).unwrap();

        let profile = UserProfile::upsert(&conn, 1, &ProfileUpdate {
            weight_kg: Some(0.0),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(profile.targets, first.targets);
        assert!(profile.bmi().is_none());
    }

    #[test]
    fn test_snapshot_through_source() {
        let conn = test_connection();
        UserProfile::upsert(&conn, 7, &complete_update()).unwrap();

        let snapshot = conn.fetch_profile(7).unwrap().unwrap();
        assert_eq!(snapshot.body.age, Some(25));
        assert_eq!(snapshot.targets.map(|t| t.fat_g), Some(58));
    }
}
