//! Data models
//!
//! Rust structs representing database entities.

mod achievement;
mod food;
mod meal;
mod nutrition;
mod profile;

pub use achievement::{
    check_achievements, earned_ids, list_earned, newly_unlocked, Achievement,
    EarnedAchievement, ACHIEVEMENTS,
};
pub use food::{
    is_supported_locale, Food, FoodCreate, FoodUpdate, PortionGrams, DEFAULT_LOCALE,
    SUPPORTED_LOCALES,
};
pub use meal::{
    meal_nutrition, CustomMeal, CustomMealCreate, Meal, MealCreate, MealDetail, MealItem,
    MealItemCreate, MealItemDetail, MealType, DATE_FORMAT, TIME_FORMAT,
};
pub use nutrition::Nutrition;
pub use profile::{ProfileUpdate, UserProfile};
