//! Meal, daily and weekly aggregation
//!
//! Everything here is recomputed from meal snapshots on every call. Nothing is
//! cached, so the same meals always produce the same totals.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{MealType, Nutrition};
use super::portion::{FoodNutrition, PortionSize};
use super::targets::{BodyProfile, MacroTargets};

/// Number of days in the rolling window, today included
pub const WEEK_DAYS: i64 = 7;

/// One food on a meal, with the portion that was eaten
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealLine {
    pub food: FoodNutrition,
    pub portion: PortionSize,
}

impl MealLine {
    pub fn nutrition(&self) -> Nutrition {
        self.food.for_portion(self.portion)
    }
}

/// Snapshot of a logged meal with its line items already resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub items: Vec<MealLine>,
}

impl MealRecord {
    pub fn nutrition(&self) -> Nutrition {
        meal_totals(&self.items)
    }
}

/// Sum of the scaled line items of one meal
pub fn meal_totals(items: &[MealLine]) -> Nutrition {
    items.iter().map(MealLine::nutrition).sum()
}

/// Sum over every meal in the slice, regardless of date
pub fn sum_meals(meals: &[MealRecord]) -> Nutrition {
    meals.iter().map(MealRecord::nutrition).sum()
}

/// Sum over the meals logged on `date`
pub fn sum_meals_on(meals: &[MealRecord], date: NaiveDate) -> Nutrition {
    meals
        .iter()
        .filter(|m| m.date == date)
        .map(MealRecord::nutrition)
        .sum()
}

/// Source of meal snapshots
pub trait MealSource {
    type Error;

    /// All meals of `user_id` dated within `start..=end`
    fn fetch_meals(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MealRecord>, Self::Error>;
}

/// Stored profile: body measurements plus the targets saved with them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub body: BodyProfile,
    pub targets: Option<MacroTargets>,
}

/// Source of user profiles
pub trait ProfileSource {
    type Error;

    fn fetch_profile(&self, user_id: i64) -> Result<Option<ProfileSnapshot>, Self::Error>;
}

/// Total nutrition for one user on one calendar date
pub fn daily_totals<S: MealSource>(
    source: &S,
    user_id: i64,
    date: NaiveDate,
) -> Result<Nutrition, S::Error> {
    let meals = source.fetch_meals(user_id, date, date)?;
    Ok(sum_meals_on(&meals, date))
}

/// Totals for one date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyTotals {
    pub date: NaiveDate,
    pub nutrition: Nutrition,
}

/// Seven consecutive daily totals ending today, with the targets to plot against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyNutritionSeries {
    pub days: Vec<DailyTotals>,
    pub targets: MacroTargets,
}

/// Column-oriented form of the weekly series, one vector per chart line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyChartData {
    pub dates: Vec<String>,
    pub calories: Vec<i64>,
    pub protein: Vec<f64>,
    pub carbs: Vec<f64>,
    pub fat: Vec<f64>,
    pub target_calories: i64,
    pub target_protein: i64,
    pub target_carbs: i64,
    pub target_fat: i64,
}

impl WeeklyNutritionSeries {
    pub fn start(&self) -> Option<NaiveDate> {
        self.days.first().map(|d| d.date)
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.days.last().map(|d| d.date)
    }

    pub fn total(&self) -> Nutrition {
        self.days.iter().map(|d| d.nutrition).sum()
    }

    pub fn chart_data(&self) -> WeeklyChartData {
        WeeklyChartData {
            dates: self.days.iter().map(|d| d.date.format("%Y-%m-%d").to_string()).collect(),
            calories: self.days.iter().map(|d| d.nutrition.calories).collect(),
            protein: self.days.iter().map(|d| d.nutrition.protein).collect(),
            carbs: self.days.iter().map(|d| d.nutrition.carbs).collect(),
            fat: self.days.iter().map(|d| d.nutrition.fat).collect(),
            target_calories: self.targets.calories,
            target_protein: self.targets.protein_g,
            target_carbs: self.targets.carbs_g,
            target_fat: self.targets.fat_g,
        }
    }
}

/// The `WEEK_DAYS` dates ending at `today`, oldest first
pub fn week_ending(today: NaiveDate) -> Vec<NaiveDate> {
    (0..WEEK_DAYS)
        .rev()
        .map(|offset| today - Duration::days(offset))
        .collect()
}

/// Build the weekly series from meals already fetched for the window
///
/// Meals outside the window are ignored.
pub fn weekly_series_from(
    meals: &[MealRecord],
    today: NaiveDate,
    targets: MacroTargets,
) -> WeeklyNutritionSeries {
    let days = week_ending(today)
        .into_iter()
        .map(|date| DailyTotals {
            date,
            nutrition: sum_meals_on(meals, date),
        })
        .collect();

    WeeklyNutritionSeries { days, targets }
}

/// Weekly series for a user, with stored targets or the defaults
pub fn weekly_series<S>(
    source: &S,
    user_id: i64,
    today: NaiveDate,
) -> Result<WeeklyNutritionSeries, <S as MealSource>::Error>
where
    S: MealSource + ProfileSource<Error = <S as MealSource>::Error>,
{
    let start = today - Duration::days(WEEK_DAYS - 1);
    let meals = source.fetch_meals(user_id, start, today)?;

    let targets = source
        .fetch_profile(user_id)?
        .and_then(|p| p.targets)
        .unwrap_or_default();

    Ok(weekly_series_from(&meals, today, targets))
}

/// Calories per fixed meal category for one day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealTypeDistribution {
    pub breakfast: i64,
    pub lunch: i64,
    pub dinner: i64,
    pub snack: i64,
}

impl MealTypeDistribution {
    /// Add calories to the bucket for `meal_type`
    ///
    /// Returns false (and changes nothing) for meal types outside the four
    /// buckets.
    pub fn record(&mut self, meal_type: &MealType, calories: i64) -> bool {
        let bucket = match meal_type {
            MealType::Breakfast => &mut self.breakfast,
            MealType::Lunch => &mut self.lunch,
            MealType::Dinner => &mut self.dinner,
            MealType::Snack => &mut self.snack,
            MealType::Unspecified => return false,
        };
        *bucket += calories;
        true
    }

    pub fn total(&self) -> i64 {
        self.breakfast + self.lunch + self.dinner + self.snack
    }
}

/// Distribution over the meals logged on `date`
pub fn distribution_from(meals: &[MealRecord], date: NaiveDate) -> MealTypeDistribution {
    let mut distribution = MealTypeDistribution::default();
    for meal in meals.iter().filter(|m| m.date == date) {
        if !distribution.record(&meal.meal_type, meal.nutrition().calories) {
            tracing::debug!("Skipping meal with unrecognized type on {}", date);
        }
    }
    distribution
}

/// Calories by meal type for one user on one date
pub fn meal_type_distribution<S: MealSource>(
    source: &S,
    user_id: i64,
    date: NaiveDate,
) -> Result<MealTypeDistribution, S::Error> {
    let meals = source.fetch_meals(user_id, date, date)?;
    Ok(distribution_from(&meals, date))
}
