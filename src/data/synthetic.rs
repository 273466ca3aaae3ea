//! Synthetic job-description generation.
//!
//! Produces seeded records whose salary range is a deterministic function of a
//! few words in the text (role, seniority, city) times log-normal noise, so a
//! regressor has a real signal to learn. Used for smoke runs (`--synthetic N`)
//! and tests that must not depend on external data files.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::Record;
use crate::error::AppError;

/// Role name and base annual salary.
const ROLES: [(&str, f64); 6] = [
    ("data engineer", 70_000.0),
    ("software developer", 65_000.0),
    ("nurse", 48_000.0),
    ("accountant", 52_000.0),
    ("warehouse operative", 26_000.0),
    ("product manager", 80_000.0),
];

/// Seniority prefix and salary multiplier.
const LEVELS: [(&str, f64); 4] = [
    ("junior", 0.75),
    ("", 1.0),
    ("senior", 1.35),
    ("lead", 1.6),
];

/// City and cost-of-living multiplier.
const CITIES: [(&str, f64); 4] = [
    ("london", 1.25),
    ("manchester", 1.0),
    ("leeds", 0.95),
    ("remote", 1.05),
];

const SKILLS: [&str; 8] = [
    "python", "sql", "excel", "communication", "teamwork", "kubernetes", "forklift", "budgeting",
];

/// Relative log-volatility of the salary level.
const LEVEL_NOISE: f64 = 0.05;

/// Generate `count` records from `seed`.
pub fn generate_records(count: usize, seed: u64) -> Result<Vec<Record>, AppError> {
    if count == 0 {
        return Err(AppError::input("Synthetic record count must be > 0."));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, LEVEL_NOISE)
        .map_err(|e| AppError::numeric(format!("Noise distribution error: {e}")))?;

    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let (role, base) = ROLES[rng.gen_range(0..ROLES.len())];
        let (level, level_mult) = LEVELS[rng.gen_range(0..LEVELS.len())];
        let (city, city_mult) = CITIES[rng.gen_range(0..CITIES.len())];
        let skill_a = SKILLS[rng.gen_range(0..SKILLS.len())];
        let skill_b = SKILLS[rng.gen_range(0..SKILLS.len())];

        let midpoint = base * level_mult * city_mult * noise.sample(&mut rng).exp();
        let half_width = midpoint * rng.gen_range(0.05..0.2);

        let title = if level.is_empty() {
            role.to_string()
        } else {
            format!("{level} {role}")
        };
        let text = format!(
            "We are hiring a {title} based in {city}. You will need {skill_a} and {skill_b} skills."
        );

        records.push(Record {
            text,
            target_lower: (midpoint - half_width).round(),
            target_upper: (midpoint + half_width).round(),
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_ordered_and_positive() {
        let records = generate_records(200, 413).unwrap();
        assert_eq!(records.len(), 200);
        for r in &records {
            assert!(r.target_lower > 0.0);
            assert!(r.target_lower <= r.target_upper);
            assert!(!r.text.is_empty());
        }
    }

    #[test]
    fn generation_is_seeded() {
        assert_eq!(generate_records(20, 5).unwrap(), generate_records(20, 5).unwrap());
        assert_ne!(generate_records(20, 5).unwrap(), generate_records(20, 6).unwrap());
    }

    #[test]
    fn zero_count_is_rejected() {
        assert_eq!(generate_records(0, 1).unwrap_err().exit_code(), 2);
    }
}
