//! Catalog search: filters, the sort allow-list and the SQL builder.
//!
//! Every filter value goes through [`QueryBuilder::push_bind`]. The only
//! text spliced into the statement is a `&'static str` picked from
//! [`CarSort`], so a client-supplied sort name can change which fixed
//! `ORDER BY` is used but never the SQL itself.

use std::fmt::Display;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use sqlx::{Postgres, QueryBuilder};

/// Default page size.
pub const DEFAULT_LIMIT: i64 = 30;

/// Largest page a caller may request.
pub const MAX_LIMIT: i64 = 250;

const SELECT_AVAILABLE: &str = "SELECT id, name, make, model, year, price, mileage, image_url \
     FROM mecar.car WHERE is_available = TRUE";

/// Deserialize empty query values as `None` instead of failing to parse.
fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Optional search filters, each independently applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarFilters {
    /// Case-insensitive substring match against name, make, model and year.
    #[serde(default, alias = "q", deserialize_with = "empty_string_as_none")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub make: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub min_price: Option<Decimal>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub max_price: Option<Decimal>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub min_mileage: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub max_mileage: Option<i32>,
    /// Sort name, resolved through [`CarSort::parse`].
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub limit: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub offset: Option<i64>,
}

impl CarFilters {
    /// Page size after defaulting and clamping to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Offset after clamping negatives to zero.
    #[must_use]
    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// The resolved sort order.
    #[must_use]
    pub fn sort(&self) -> CarSort {
        self.sort.as_deref().map_or_else(CarSort::default, CarSort::parse)
    }
}

/// Allow-listed result orderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CarSort {
    #[default]
    IdAsc,
    PriceAsc,
    PriceDesc,
    YearAsc,
    YearDesc,
    MileageAsc,
    MileageDesc,
}

impl CarSort {
    /// Parse from a query parameter value. Unknown names yield the default.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "price_asc" | "price-ascending" => Self::PriceAsc,
            "price_desc" | "price-descending" => Self::PriceDesc,
            "year_asc" | "year-ascending" => Self::YearAsc,
            "year_desc" | "year-descending" => Self::YearDesc,
            "mileage_asc" | "mileage-ascending" => Self::MileageAsc,
            "mileage_desc" | "mileage-descending" => Self::MileageDesc,
            _ => Self::IdAsc,
        }
    }

    /// Convert to query parameter value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IdAsc => "id_asc",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::YearAsc => "year_asc",
            Self::YearDesc => "year_desc",
            Self::MileageAsc => "mileage_asc",
            Self::MileageDesc => "mileage_desc",
        }
    }

    /// The `ORDER BY` clause for this sort. Ties break on id so pages are
    /// stable.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::IdAsc => " ORDER BY id ASC",
            Self::PriceAsc => " ORDER BY price ASC, id ASC",
            Self::PriceDesc => " ORDER BY price DESC, id ASC",
            Self::YearAsc => " ORDER BY year ASC, id ASC",
            Self::YearDesc => " ORDER BY year DESC, id ASC",
            Self::MileageAsc => " ORDER BY mileage ASC, id ASC",
            Self::MileageDesc => " ORDER BY mileage DESC, id ASC",
        }
    }
}

/// Escape `LIKE` metacharacters so user text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Build the parameterized search statement for `filters`.
///
/// Only available cars are eligible.
#[must_use]
pub fn build_search_query(filters: &CarFilters) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(SELECT_AVAILABLE);

    if let Some(text) = filters.text.as_deref() {
        let pattern = format!("%{}%", escape_like(text));
        qb.push(" AND (name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR make ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR model ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR CAST(year AS TEXT) ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
    if let Some(make) = &filters.make {
        qb.push(" AND make = ").push_bind(make.clone());
    }
    if let Some(model) = &filters.model {
        qb.push(" AND model = ").push_bind(model.clone());
    }
    if let Some(year) = filters.year {
        qb.push(" AND year = ").push_bind(year);
    }
    if let Some(min_price) = filters.min_price {
        qb.push(" AND price >= ").push_bind(min_price);
    }
    if let Some(max_price) = filters.max_price {
        qb.push(" AND price <= ").push_bind(max_price);
    }
    if let Some(min_mileage) = filters.min_mileage {
        qb.push(" AND mileage >= ").push_bind(min_mileage);
    }
    if let Some(max_mileage) = filters.max_mileage {
        qb.push(" AND mileage <= ").push_bind(max_mileage);
    }

    qb.push(filters.sort().order_by());
    qb.push(" LIMIT ").push_bind(filters.effective_limit());
    qb.push(" OFFSET ").push_bind(filters.effective_offset());

    qb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filters() {
        let qb = build_search_query(&CarFilters::default());
        assert_eq!(
            qb.sql(),
            "SELECT id, name, make, model, year, price, mileage, image_url \
             FROM mecar.car WHERE is_available = TRUE ORDER BY id ASC LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn test_all_filters_are_bound() {
        let filters = CarFilters {
            text: Some("civic".to_owned()),
            make: Some("Honda".to_owned()),
            model: Some("Civic".to_owned()),
            year: Some(2019),
            min_price: Some(Decimal::new(10_000, 0)),
            max_price: Some(Decimal::new(20_000, 0)),
            min_mileage: Some(0),
            max_mileage: Some(90_000),
            sort: Some("price_desc".to_owned()),
            limit: Some(10),
            offset: Some(20),
        };
        let qb = build_search_query(&filters);
        let sql = qb.sql();

        assert!(sql.contains("name ILIKE $1"));
        assert!(sql.contains("CAST(year AS TEXT) ILIKE $4"));
        assert!(sql.contains("make = $5"));
        assert!(sql.contains("model = $6"));
        assert!(sql.contains("year = $7"));
        assert!(sql.contains("price >= $8"));
        assert!(sql.contains("price <= $9"));
        assert!(sql.contains("mileage >= $10"));
        assert!(sql.contains("mileage <= $11"));
        assert!(sql.ends_with("ORDER BY price DESC, id ASC LIMIT $12 OFFSET $13"));
        assert!(!sql.contains("civic"));
        assert!(!sql.contains("Honda"));
    }

    #[test]
    fn test_hostile_sort_falls_back_to_default() {
        let hostile = [
            "price; DROP TABLE mecar.car; --",
            "id DESC",
            "(SELECT 1)",
            "PRICE_ASC",
            "",
        ];

        for value in hostile {
            let filters = CarFilters {
                sort: Some(value.to_owned()),
                ..CarFilters::default()
            };
            assert_eq!(filters.sort(), CarSort::IdAsc, "{value:?}");

            let qb = build_search_query(&filters);
            assert!(qb.sql().contains(" ORDER BY id ASC LIMIT $1"), "{value:?}");
            assert!(!qb.sql().contains("DROP"));
        }
    }

    #[test]
    fn test_hostile_text_is_bound_not_spliced() {
        let filters = CarFilters {
            text: Some("' OR 1=1 --".to_owned()),
            ..CarFilters::default()
        };
        let qb = build_search_query(&filters);
        assert!(!qb.sql().contains("1=1"));
    }

    #[test]
    fn test_sort_round_trip_names() {
        let all = [
            CarSort::IdAsc,
            CarSort::PriceAsc,
            CarSort::PriceDesc,
            CarSort::YearAsc,
            CarSort::YearDesc,
            CarSort::MileageAsc,
            CarSort::MileageDesc,
        ];
        for sort in all {
            assert_eq!(CarSort::parse(sort.as_str()), sort);
        }
    }

    #[test]
    fn test_limit_and_offset_clamping() {
        let mut filters = CarFilters::default();
        assert_eq!(filters.effective_limit(), DEFAULT_LIMIT);
        assert_eq!(filters.effective_offset(), 0);

        filters.limit = Some(0);
        filters.offset = Some(-5);
        assert_eq!(filters.effective_limit(), 1);
        assert_eq!(filters.effective_offset(), 0);

        filters.limit = Some(10_000);
        assert_eq!(filters.effective_limit(), MAX_LIMIT);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("civic"), "civic");
    }

    #[test]
    fn test_empty_query_values_are_none() {
        let filters: CarFilters =
            serde_json::from_str(r#"{"year": "", "min_price": " ", "make": "Honda"}"#).unwrap();
        assert_eq!(filters.year, None);
        assert_eq!(filters.min_price, None);
        assert_eq!(filters.make.as_deref(), Some("Honda"));
    }
}
