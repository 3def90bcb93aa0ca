//! Seed the car catalog from a YAML file.
//!
//! ```yaml
//! cars:
//!   - name: Civic EX
//!     make: Honda
//!     model: Civic
//!     year: 2019
//!     price: "18500.00"
//!     mileage: 42000
//!     image_url: civic.jpg
//! ```
//!
//! The whole file is validated before connecting, and inserted in one
//! transaction.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use mecar_api::config::DatabaseConfig;
use mecar_api::db;

/// Earliest plausible model year.
const MIN_YEAR: i32 = 1886;

/// Latest accepted model year.
const MAX_YEAR: i32 = 2100;

/// Seed file contents.
#[derive(Debug, Deserialize)]
pub struct CarSeedFile {
    pub cars: Vec<SeedCar>,
}

/// One car to insert.
#[derive(Debug, Deserialize)]
pub struct SeedCar {
    pub name: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: Decimal,
    pub mileage: i32,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Check every car, returning one message per problem.
#[must_use]
pub fn validate(file: &CarSeedFile) -> Vec<String> {
    let mut errors = Vec::new();

    for (i, car) in file.cars.iter().enumerate() {
        let at = format!("cars[{i}] ({})", car.name);

        for (field, value) in [("name", &car.name), ("make", &car.make), ("model", &car.model)] {
            if value.trim().is_empty() {
                errors.push(format!("{at}: {field} is empty"));
            }
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&car.year) {
            errors.push(format!("{at}: year {} out of range", car.year));
        }
        if car.price.is_sign_negative() {
            errors.push(format!("{at}: price is negative"));
        }
        if car.mileage < 0 {
            errors.push(format!("{at}: mileage is negative"));
        }
    }

    errors
}

/// Load cars from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, validation fails,
/// or database operations fail.
pub async fn cars(file_path: &str, clear_existing: bool) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading cars from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: CarSeedFile = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    info!(cars = seed.cars.len(), "Seed file validated");

    let config = DatabaseConfig::from_env()?;
    let pool = db::create_pool(&config).await?;
    let mut tx = pool.begin().await?;

    if clear_existing {
        // Sold cars are referenced by purchases and stay
        let cleared = sqlx::query(
            r"
            DELETE FROM mecar.car c
            WHERE NOT EXISTS (SELECT 1 FROM mecar.purchase p WHERE p.car_id = c.id)
            ",
        )
        .execute(&mut *tx)
        .await?;
        info!(cleared = cleared.rows_affected(), "Cleared unsold cars");
    }

    for car in &seed.cars {
        sqlx::query(
            r"
            INSERT INTO mecar.car (name, make, model, year, price, mileage, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(car.name.trim())
        .bind(car.make.trim())
        .bind(car.model.trim())
        .bind(car.year)
        .bind(car.price)
        .bind(car.mileage)
        .bind(car.image_url.as_deref())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!("Seeding complete!");
    info!("  Cars inserted: {}", seed.cars.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
cars:
  - name: Civic EX
    make: Honda
    model: Civic
    year: 2019
    price: "18500.00"
    mileage: 42000
    image_url: civic.jpg
  - name: Model 3
    make: Tesla
    model: "3"
    year: 2021
    price: "31999.99"
    mileage: 15000
"#;

    #[test]
    fn test_parse_sample() {
        let seed: CarSeedFile = serde_yaml::from_str(SAMPLE).unwrap();

        assert_eq!(seed.cars.len(), 2);
        assert_eq!(seed.cars[0].price, Decimal::new(1_850_000, 2));
        assert_eq!(seed.cars[1].image_url, None);
        assert!(validate(&seed).is_empty());
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let seed = CarSeedFile {
            cars: vec![SeedCar {
                name: " ".to_owned(),
                make: "Ford".to_owned(),
                model: String::new(),
                year: 1700,
                price: Decimal::new(-1, 0),
                mileage: -5,
                image_url: None,
            }],
        };

        let errors = validate(&seed);
        assert_eq!(errors.len(), 5, "{errors:?}");
    }
}
