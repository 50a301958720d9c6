//! Food catalog import
//!
//! Reads the cafeteria dish catalog (CSV) and seeds the foods table from it.
//! Numeric cells are coerced leniently: blank or malformed values become 0.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::DbResult;
use crate::models::{is_supported_locale, Food, FoodCreate, PortionGrams, DEFAULT_LOCALE};

pub const NAME_COLUMN: &str = "Dish Name";
pub const CALORIES_COLUMN: &str = "Calories (kcal)";
pub const PROTEIN_COLUMN: &str = "Protein (g)";
pub const CARBS_COLUMN: &str = "Carbohydrate (g)";
pub const FAT_COLUMN: &str = "Fats (g)";
pub const FIBER_COLUMN: &str = "Fibre (g)";
pub const PORTION_SMALL_COLUMN: &str = "Portion Small (g)";
pub const PORTION_MEDIUM_COLUMN: &str = "Portion Medium (g)";
pub const PORTION_LARGE_COLUMN: &str = "Portion Large (g)";

/// Prefix of localized name columns, e.g. `name_hi`
const LOCALIZED_NAME_PREFIX: &str = "name_";

/// Name keywords per menu section, checked in section order
const BEVERAGE_KEYWORDS: &[&str] = &["tea", "coffee", "drink", "juice", "punch", "lemonade"];
const MAIN_COURSE_KEYWORDS: &[&str] = &["rice", "curry", "dal", "meal"];
const SIDE_KEYWORDS: &[&str] = &["bread", "roti", "naan"];

/// Section of the cafeteria menu a dish is listed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuSection {
    Beverage,
    MainCourse,
    Side,
    Snack,
}

impl MenuSection {
    /// Menu order
    pub const ALL: [MenuSection; 4] = [
        MenuSection::Beverage,
        MenuSection::MainCourse,
        MenuSection::Side,
        MenuSection::Snack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MenuSection::Beverage => "beverage",
            MenuSection::MainCourse => "main_course",
            MenuSection::Side => "side",
            MenuSection::Snack => "snack",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "beverage" => Some(MenuSection::Beverage),
            "main_course" => Some(MenuSection::MainCourse),
            "side" => Some(MenuSection::Side),
            "snack" => Some(MenuSection::Snack),
            _ => None,
        }
    }

    /// Section for a dish name by keyword; anything unmatched is a snack
    ///
    /// Keywords match anywhere in the lowercased name, so "Steamed Rice"
    /// lands under beverages through "tea".
    pub fn classify(name: &str) -> Self {
        let name = name.to_lowercase();
        let has_any = |keywords: &[&str]| keywords.iter().any(|k| name.contains(k));

        if has_any(BEVERAGE_KEYWORDS) {
            MenuSection::Beverage
        } else if has_any(MAIN_COURSE_KEYWORDS) {
            MenuSection::MainCourse
        } else if has_any(SIDE_KEYWORDS) {
            MenuSection::Side
        } else {
            MenuSection::Snack
        }
    }
}

/// One dish from the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogRow {
    pub name: String,
    pub calories: i64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub localized_names: BTreeMap<String, String>,
    pub portion_grams: PortionGrams,
}

/// Column positions resolved from the header row
struct Columns {
    name: Option<usize>,
    calories: Option<usize>,
    protein: Option<usize>,
    carbs: Option<usize>,
    fat: Option<usize>,
    fiber: Option<usize>,
    portion_small: Option<usize>,
    portion_medium: Option<usize>,
    portion_large: Option<usize>,
    localized: Vec<(String, usize)>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let localized = headers
            .iter()
            .enumerate()
            .filter_map(|(idx, h)| {
                let locale = h.trim().strip_prefix(LOCALIZED_NAME_PREFIX)?;
                if locale == DEFAULT_LOCALE || !is_supported_locale(locale) {
                    tracing::debug!("Ignoring catalog column '{}'", h);
                    return None;
                }
                Some((locale.to_string(), idx))
            })
            .collect();

        Self {
            name: find(NAME_COLUMN),
            calories: find(CALORIES_COLUMN),
            protein: find(PROTEIN_COLUMN),
            carbs: find(CARBS_COLUMN),
            fat: find(FAT_COLUMN),
            fiber: find(FIBER_COLUMN),
            portion_small: find(PORTION_SMALL_COLUMN),
            portion_medium: find(PORTION_MEDIUM_COLUMN),
            portion_large: find(PORTION_LARGE_COLUMN),
            localized,
        }
    }
}

fn cell<'r>(record: &'r StringRecord, idx: Option<usize>) -> Option<&'r str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Parse a numeric cell; blank and malformed values are 0
fn number(record: &StringRecord, idx: Option<usize>, column: &str) -> f64 {
    let Some(raw) = cell(record, idx) else {
        return 0.0;
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            tracing::debug!("Malformed value '{}' in column '{}', using 0", raw, column);
            0.0
        }
    }
}

/// Serving weight cell; blank or invalid means no declared weight
fn grams(record: &StringRecord, idx: Option<usize>) -> Option<f64> {
    cell(record, idx)
        .and_then(|raw| raw.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
}

impl CatalogRow {
    fn from_record(columns: &Columns, record: &StringRecord) -> Option<Self> {
        let name = cell(record, columns.name)?.to_string();

        let localized_names = columns
            .localized
            .iter()
            .filter_map(|(locale, idx)| {
                cell(record, Some(*idx)).map(|v| (locale.clone(), v.to_string()))
            })
            .collect();

        Some(Self {
            name,
            calories: number(record, columns.calories, CALORIES_COLUMN).round() as i64,
            protein: number(record, columns.protein, PROTEIN_COLUMN),
            carbs: number(record, columns.carbs, CARBS_COLUMN),
            fat: number(record, columns.fat, FAT_COLUMN),
            fiber: number(record, columns.fiber, FIBER_COLUMN),
            localized_names,
            portion_grams: PortionGrams {
                small: grams(record, columns.portion_small),
                medium: grams(record, columns.portion_medium),
                large: grams(record, columns.portion_large),
            },
        })
    }

    /// Case-insensitive substring match on the English name, or on the
    /// localized name for a non-English locale
    pub fn matches(&self, query: &str, locale: &str) -> bool {
        let query = query.to_lowercase();
        if self.name.to_lowercase().contains(&query) {
            return true;
        }
        locale != DEFAULT_LOCALE
            && self
                .localized_names
                .get(locale)
                .is_some_and(|n| n.to_lowercase().contains(&query))
    }

    pub fn to_food_create(&self) -> FoodCreate {
        FoodCreate {
            name: self.name.clone(),
            category: Some(MenuSection::classify(&self.name).as_str().to_string()),
            calories: self.calories,
            protein: Some(self.protein),
            carbs: Some(self.carbs),
            fat: Some(self.fat),
            fiber: Some(self.fiber),
            portion_grams: self.portion_grams,
            localized_names: self.localized_names.clone(),
            is_custom: false,
            created_by: None,
        }
    }
}

/// Parse catalog rows from CSV text
///
/// Rows without a dish name are skipped.
pub fn read_catalog<R: Read>(reader: R) -> DbResult<Vec<CatalogRow>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = Columns::from_headers(reader.headers()?);
    if columns.name.is_none() {
        tracing::warn!("Catalog has no '{}' column", NAME_COLUMN);
    }

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        match CatalogRow::from_record(&columns, &record) {
            Some(row) => rows.push(row),
            None => tracing::debug!("Skipping catalog row {} without a dish name", line + 1),
        }
    }

    Ok(rows)
}

pub fn load_catalog<P: AsRef<Path>>(path: P) -> DbResult<Vec<CatalogRow>> {
    let file = std::fs::File::open(path.as_ref())?;
    read_catalog(file)
}

/// Catalog rows matching `query`, in file order
pub fn search_catalog<'a>(rows: &'a [CatalogRow], query: &str, locale: &str) -> Vec<&'a CatalogRow> {
    rows.iter().filter(|r| r.matches(query, locale)).collect()
}

/// Outcome of a catalog import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
}

/// Insert rows whose name is not yet in the foods table
pub fn import_rows(conn: &Connection, rows: &[CatalogRow]) -> DbResult<ImportSummary> {
    let mut summary = ImportSummary::default();

    for row in rows {
        if Food::get_by_name(conn, &row.name)?.is_some() {
            summary.skipped += 1;
            continue;
        }
        Food::create(conn, &row.to_food_create())?;
        summary.inserted += 1;
    }

    Ok(summary)
}

/// Load a catalog file and import it
pub fn import_catalog<P: AsRef<Path>>(conn: &Connection, path: P) -> DbResult<ImportSummary> {
    let path = path.as_ref();
    let rows = load_catalog(path)?;
    let summary = import_rows(conn, &rows)?;

    tracing::info!(
        "Imported catalog {}: {} inserted, {} skipped",
        path.display(),
        summary.inserted,
        summary.skipped
    );
    Ok(summary)
}
