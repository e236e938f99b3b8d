use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Separately metered auxiliary loads for one cycle (fans, vacuum pumps, cooling tower).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuxiliaryEnergy {
    pub components: BTreeMap<String, f64>,
}

impl AuxiliaryEnergy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, name: &str, kwh: f64) -> Self {
        self.components.insert(name.to_string(), kwh);
        self
    }

    pub fn total_kwh(&self) -> f64 {
        self.components.values().sum()
    }
}

/// One adsorption / desorption / liquefaction cycle of a single module.
///
/// `(cycle_number, machine)` identifies a cycle; records are immutable once imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub cycle_number: u32,
    pub machine: String,
    pub start_time: NaiveDateTime,
    pub ads_co2_kg: f64,
    pub des_co2_kg: f64,
    pub bag_co2_kg: f64,
    pub thermal_energy_kwh: f64,
    /// `None` when the auxiliary loads were not separately metered for this cycle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary: Option<AuxiliaryEnergy>,
    /// Plant meter total for the cycle, used only when `auxiliary` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_energy_kwh: Option<f64>,
    pub steam_kg: f64,
}

impl CycleRecord {
    pub fn key(&self) -> (u32, &str) {
        (self.cycle_number, self.machine.as_str())
    }

    /// Every numeric field with its name, auxiliary components prefixed with `auxiliary.`.
    pub fn numeric_fields(&self) -> Vec<(String, f64)> {
        let mut fields = vec![
            ("ads_co2_kg".to_string(), self.ads_co2_kg),
            ("des_co2_kg".to_string(), self.des_co2_kg),
            ("bag_co2_kg".to_string(), self.bag_co2_kg),
            ("thermal_energy_kwh".to_string(), self.thermal_energy_kwh),
            ("steam_kg".to_string(), self.steam_kg),
        ];
        if let Some(total) = self.total_energy_kwh {
            fields.push(("total_energy_kwh".to_string(), total));
        }
        if let Some(aux) = &self.auxiliary {
            for (name, kwh) in &aux.components {
                fields.push((format!("auxiliary.{}", name), *kwh));
            }
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record() -> CycleRecord {
        CycleRecord {
            cycle_number: 12,
            machine: "NM1".to_string(),
            start_time: NaiveDate::from_ymd_opt(2024, 3, 4)
                .unwrap()
                .and_hms_opt(6, 30, 0)
                .unwrap(),
            ads_co2_kg: 10.0,
            des_co2_kg: 9.0,
            bag_co2_kg: 8.5,
            thermal_energy_kwh: 120.0,
            auxiliary: Some(
                AuxiliaryEnergy::new()
                    .with_component("ct", 4.0)
                    .with_component("nm1_fan", 6.5),
            ),
            total_energy_kwh: None,
            steam_kg: 30.0,
        }
    }

    #[test]
    fn auxiliary_total_sums_components() {
        assert_eq!(record().auxiliary.unwrap().total_kwh(), 10.5);
    }

    #[test]
    fn numeric_fields_include_auxiliary_components() {
        let fields = record().numeric_fields();
        assert!(fields.iter().any(|(name, v)| name == "auxiliary.ct" && *v == 4.0));
        assert!(!fields.iter().any(|(name, _)| name == "total_energy_kwh"));
    }

    #[test]
    fn unmetered_cycle_deserializes_without_auxiliary() {
        let json = r#"{
            "cycle_number": 1, "machine": "NM2", "start_time": "2024-03-05T00:00:00",
            "ads_co2_kg": 1.0, "des_co2_kg": 1.0, "bag_co2_kg": 1.0,
            "thermal_energy_kwh": 2.0, "total_energy_kwh": 3.0, "steam_kg": 0.0
        }"#;
        let parsed: CycleRecord = serde_json::from_str(json).unwrap();
        assert!(parsed.auxiliary.is_none());
        assert_eq!(parsed.total_energy_kwh, Some(3.0));
        assert_eq!(parsed.key(), (1, "NM2"));
    }
}
