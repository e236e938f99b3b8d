//! Defensive checks at the engine boundary. Ingestion is expected to have
//! validated already; anything that slips through fails here with
//! `InvalidInput` or `InvalidConfig` instead of producing a wrong number.

use crate::error::DacError;
use dacforge_schemas::{configuration::Configuration, cycle::CycleRecord, weekly::WeeklyEntry};

pub fn non_negative(field: &str, value: f64, context: &str) -> Result<(), DacError> {
    if !value.is_finite() {
        return Err(DacError::invalid_input(field, context, "value is not a finite number"));
    }
    if value < 0.0 {
        return Err(DacError::invalid_input(
            field,
            context,
            format!("must be non-negative, got {}", value),
        ));
    }
    Ok(())
}

pub fn validate_cycle(record: &CycleRecord) -> Result<(), DacError> {
    let context = format!("cycle {} on {}", record.cycle_number, record.machine);
    for (field, value) in record.numeric_fields() {
        non_negative(&field, value, &context)?;
    }
    Ok(())
}

pub fn validate_entry(entry: &WeeklyEntry) -> Result<(), DacError> {
    let context = format!("weekly entry for {}", entry.week_start);
    non_negative("liquefied_co2_kg", entry.liquefied_co2_kg, &context)?;
    non_negative("liquefaction_energy_kwh", entry.liquefaction_energy_kwh, &context)
}

pub fn validate_configuration(config: &Configuration) -> Result<(), DacError> {
    let factors = [
        ("grid_emission_factor", config.grid_emission_factor),
        (
            "alternate_thermal_emission_factor",
            config.alternate_thermal_emission_factor,
        ),
        (
            "weekly_infrastructure_charge_kg",
            config.weekly_infrastructure_charge_kg,
        ),
        ("weekly_sorbent_charge_kg", config.weekly_sorbent_charge_kg),
    ];
    for (name, value) in factors {
        if !value.is_finite() || value < 0.0 {
            return Err(DacError::InvalidConfig(format!(
                "'{}' must be a non-negative number, got {}",
                name, value
            )));
        }
    }
    for (material, value) in &config.material_emission_factors {
        if !value.is_finite() || *value < 0.0 {
            return Err(DacError::InvalidConfig(format!(
                "emission factor for material '{}' must be non-negative, got {}",
                material, value
            )));
        }
    }
    if config.infrastructure_lifetime_weeks == 0 {
        return Err(DacError::InvalidConfig(
            "infrastructure_lifetime_weeks must be positive".to_string(),
        ));
    }
    if config.sorbent_lifetime_weeks == 0 {
        return Err(DacError::InvalidConfig(
            "sorbent_lifetime_weeks must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn negative_value_names_the_field() {
        let err = non_negative("bag_co2_kg", -1.0, "cycle 3 on NM1").unwrap_err();
        match err {
            DacError::InvalidInput { field, context, .. } => {
                assert_eq!(field, "bag_co2_kg");
                assert_eq!(context, "cycle 3 on NM1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn nan_is_rejected() {
        assert!(non_negative("steam_kg", f64::NAN, "x").is_err());
    }

    #[test]
    fn negative_liquefied_entry_is_rejected() {
        let entry = WeeklyEntry::new(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(), -5.0);
        assert!(matches!(
            validate_entry(&entry),
            Err(DacError::InvalidInput { .. })
        ));
    }

    #[test]
    fn zero_lifetime_is_a_config_error() {
        let mut config = Configuration::default();
        config.sorbent_lifetime_weeks = 0;
        assert!(matches!(
            validate_configuration(&config),
            Err(DacError::InvalidConfig(_))
        ));
        assert!(validate_configuration(&Configuration::default()).is_ok());
    }
}
