//! Profile MCP Tools
//!
//! Body measurements, BMI and the calorie/macro targets derived from them.

use serde::Serialize;

use crate::db::Database;
use crate::models::{ProfileUpdate, UserProfile};
use crate::nutrition::{BodyProfile, MacroTargets};

/// BMI with its category label
#[derive(Debug, Serialize)]
pub struct BmiSummary {
    pub value: f64,
    pub category: &'static str,
}

/// Energy figures for a body profile; each is absent when inputs are missing
#[derive(Debug, Serialize)]
pub struct EnergySummary {
    pub bmr: Option<f64>,
    pub tdee: Option<f64>,
    pub daily_calorie_target: Option<i64>,
    pub macro_targets: Option<MacroTargets>,
}

impl EnergySummary {
    fn from_body(body: &BodyProfile) -> Self {
        Self {
            bmr: body.bmr(),
            tdee: body.tdee(),
            daily_calorie_target: body.daily_calorie_target(),
            macro_targets: body.macro_targets(),
        }
    }
}

/// Response for get_profile / update_profile
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: i64,
    pub profile: BodyProfile,
    pub bmi: Option<BmiSummary>,
    pub energy: EnergySummary,
    /// Stored targets, or the defaults when none were ever computed
    pub targets: MacroTargets,
    pub targets_are_default: bool,
    pub updated_at: String,
}

impl ProfileResponse {
    fn from_profile(profile: UserProfile) -> Self {
        let bmi = profile.bmi().map(|(value, category)| BmiSummary {
            value,
            category: category.label(),
        });

        Self {
            user_id: profile.user_id,
            energy: EnergySummary::from_body(&profile.body),
            bmi,
            targets: profile.effective_targets(),
            targets_are_default: profile.targets.is_none(),
            profile: profile.body,
            updated_at: profile.updated_at,
        }
    }
}

/// Response for calculate_targets
#[derive(Debug, Serialize)]
pub struct CalculateTargetsResponse {
    pub bmi: Option<BmiSummary>,
    pub energy: EnergySummary,
}

// ============================================================================
// Profile Tools
// ============================================================================

pub fn get_profile(db: &Database, user_id: i64) -> Result<Option<ProfileResponse>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let profile = UserProfile::get(&conn, user_id)
        .map_err(|e| format!("Failed to get profile: {}", e))?;

    Ok(profile.map(ProfileResponse::from_profile))
}

/// Update profile fields and recompute targets
pub fn update_profile(
    db: &Database,
    user_id: i64,
    data: ProfileUpdate,
) -> Result<ProfileResponse, String> {
    if let Some(h) = data.height_cm {
        if h <= 0.0 {
            return Err("height_cm must be greater than 0".to_string());
        }
    }
    if let Some(w) = data.weight_kg {
        if w <= 0.0 {
            return Err("weight_kg must be greater than 0".to_string());
        }
    }
    if let Some(a) = data.age {
        if a <= 0 {
            return Err("age must be greater than 0".to_string());
        }
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let profile = UserProfile::upsert(&conn, user_id, &data)
        .map_err(|e| format!("Failed to update profile: {}", e))?;

    Ok(ProfileResponse::from_profile(profile))
}

/// Compute BMI and targets for measurements without storing anything
pub fn calculate_targets(body: &BodyProfile) -> CalculateTargetsResponse {
    let bmi = crate::nutrition::bmi_with_category(body.weight_kg, body.height_cm)
        .map(|(value, category)| BmiSummary { value, category: category.label() });

    CalculateTargetsResponse {
        bmi,
        energy: EnergySummary::from_body(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database() -> Database {
        let db = Database::in_memory().unwrap();
        db.with_conn(crate::db::migrations::run_migrations).unwrap();
        db
    }

    #[test]
    fn test_update_and_get_profile() {
        let db = database();
        assert!(get_profile(&db, 1).unwrap().is_none());

        let response = update_profile(&db, 1, ProfileUpdate {
            height_cm: Some(175.0),
            weight_kg: Some(70.0),
            age: Some(30),
            gender: Some("male".to_string()),
            activity_level: Some("moderate".to_string()),
            health_goal: Some("weight loss".to_string()),
        })
        .unwrap();

        assert_eq!(response.energy.bmr, Some(1648.75));
        assert_eq!(response.targets.calories, 2055);
        assert!(!response.targets_are_default);
        let bmi = response.bmi.unwrap();
        assert_eq!(bmi.value, 22.9);
        assert_eq!(bmi.category, "Normal weight");

        let stored = get_profile(&db, 1).unwrap().unwrap();
        assert_eq!(stored.targets.calories, 2055);
    }

    #[test]
    fn test_incomplete_profile_reports_defaults() {
        let db = database();
        let response = update_profile(&db, 2, ProfileUpdate {
            height_cm: Some(160.0),
            ..Default::default()
        })
        .unwrap();

        assert!(response.targets_are_default);
        assert_eq!(response.targets, MacroTargets::default());
        assert!(response.energy.bmr.is_none());
        assert!(response.bmi.is_none());
    }

    #[test]
    fn test_rejects_non_positive_measurements() {
        let db = database();
        let err = update_profile(&db, 1, ProfileUpdate {
            weight_kg: Some(-3.0),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.contains("weight_kg"));
    }

    #[test]
    fn test_calculate_targets_without_store() {
        let response = calculate_targets(&BodyProfile {
            height_cm: Some(165.0),
            weight_kg: Some(60.0),
            age: Some(25),
            gender: Some("female".to_string()),
            activity_level: Some("sedentary".to_string()),
            health_goal: Some("maintenance".to_string()),
        });

        // 600 + 1031.25 - 125 - 161
        assert_eq!(response.energy.bmr, Some(1345.25));
        assert_eq!(response.energy.daily_calorie_target, Some(1614));
        assert!(response.bmi.is_some());
    }
}
