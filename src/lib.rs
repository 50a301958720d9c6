//! Meal Tracker Library
//!
//! Nutrition computation for cafeteria meal logging: BMI and calorie targets,
//! portion scaling, daily and weekly aggregation, backed by SQLite and served
//! over MCP.

pub mod build_info;
pub mod catalog;
pub mod config;
pub mod db;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod tools;
