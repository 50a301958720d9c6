//! Nutrition calculation module
//!
//! Pure computations over already-fetched data: BMI, calorie and macro
//! targets, portion scaling, and meal/day/week aggregation.

pub mod aggregate;
pub mod body;
pub mod portion;
pub mod targets;

pub use aggregate::{
    daily_totals, distribution_from, meal_totals, meal_type_distribution, sum_meals,
    sum_meals_on, week_ending, weekly_series, weekly_series_from, DailyTotals, MealLine,
    MealRecord, MealSource, MealTypeDistribution, ProfileSnapshot, ProfileSource,
    WeeklyChartData, WeeklyNutritionSeries, WEEK_DAYS,
};
pub use body::{bmi_with_category, calculate_bmi, round1, BmiCategory};
pub use portion::{FoodNutrition, PortionSize};
pub use targets::{
    activity_multiplier, calculate_bmr, ActivityLevel, BodyProfile, Gender, HealthGoal,
    MacroTargets,
};
