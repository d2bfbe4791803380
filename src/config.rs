//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run parameters shared by every policy.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Dataset generator parameters.
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Peak-shaving policy parameters.
    #[serde(default)]
    pub peak_shaving: PeakShavingConfig,
    /// Floor-tracking policy parameters.
    #[serde(default)]
    pub floor_tracking: FloorTrackingConfig,
}

/// Run parameters shared by every policy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Master seed for dataset generation.
    pub seed: u64,
    /// Scenario length in hours (must be > 0).
    pub hours: usize,
    /// Upper clamp applied to every hour's grid draw (kW).
    pub physical_max_draw_kw: f64,
    /// Strategy id: `"baseline"`, `"peak_shaving"`, or `"floor_tracking"`.
    pub policy: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            hours: 72,
            physical_max_draw_kw: 5.0,
            policy: "baseline".to_string(),
        }
    }
}

/// Dataset generator parameters.
///
/// Values are given in kW and converted to milli-kW integers before any
/// arithmetic, so the generated scenario does not depend on float rounding.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Mean hourly demand (kW).
    pub base_kw: f64,
    /// Peak deviation of the diurnal pattern (kW).
    pub diurnal_amplitude_kw: f64,
    /// Half-width of the uniform hourly perturbation (kW).
    pub noise_kw: f64,
    /// Smallest gap between demand and the comfort floor (kW).
    pub comfort_margin_low_min_kw: f64,
    /// Largest gap between demand and the comfort floor (kW).
    pub comfort_margin_low_max_kw: f64,
    /// Smallest gap between demand and the comfort ceiling (kW).
    pub comfort_margin_high_min_kw: f64,
    /// Largest gap between demand and the comfort ceiling (kW).
    pub comfort_margin_high_max_kw: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_kw: 0.96,
            diurnal_amplitude_kw: 0.30,
            noise_kw: 0.05,
            comfort_margin_low_min_kw: 0.15,
            comfort_margin_low_max_kw: 0.30,
            comfort_margin_high_min_kw: 0.20,
            comfort_margin_high_max_kw: 0.45,
        }
    }
}

/// Peak-shaving policy parameters (virtual battery).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PeakShavingConfig {
    /// Storage capacity (kWh).
    pub capacity_kwh: f64,
    /// Initial state of charge (0.0–1.0).
    pub initial_soc: f64,
    /// Maximum charging power (kW).
    pub max_charge_kw: f64,
    /// Maximum discharging power (kW).
    pub max_discharge_kw: f64,
    /// Charge efficiency (0.0–1.0].
    pub eta_charge: f64,
    /// Discharge efficiency (0.0–1.0].
    pub eta_discharge: f64,
    /// Hours of visible history averaged into the shaving target.
    pub lookback_hours: usize,
}

impl Default for PeakShavingConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 2.0,
            initial_soc: 0.5,
            max_charge_kw: 0.5,
            max_discharge_kw: 0.5,
            eta_charge: 0.95,
            eta_discharge: 0.95,
            lookback_hours: 24,
        }
    }
}

/// Floor-tracking policy parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FloorTrackingConfig {
    /// Largest change in adjustment between consecutive hours (kW).
    pub ramp_limit_kw: f64,
    /// Distance kept above the comfort floor (kW).
    pub headroom_kw: f64,
}

impl Default for FloorTrackingConfig {
    fn default() -> Self {
        Self {
            ramp_limit_kw: 0.10,
            headroom_kw: 0.02,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.hours"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    /// Builds an error for `field`.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the tight-comfort preset: narrow comfort band around demand.
    pub fn tight_comfort() -> Self {
        Self {
            generator: GeneratorConfig {
                comfort_margin_low_min_kw: 0.05,
                comfort_margin_low_max_kw: 0.10,
                comfort_margin_high_min_kw: 0.05,
                comfort_margin_high_max_kw: 0.10,
                ..GeneratorConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the high-variance preset: stronger diurnal swing and noise.
    pub fn high_variance() -> Self {
        Self {
            generator: GeneratorConfig {
                base_kw: 1.40,
                diurnal_amplitude_kw: 0.50,
                noise_kw: 0.15,
                ..GeneratorConfig::default()
            },
            peak_shaving: PeakShavingConfig {
                capacity_kwh: 4.0,
                max_charge_kw: 1.0,
                max_discharge_kw: 1.0,
                ..PeakShavingConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "tight_comfort", "high_variance"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "tight_comfort" => Ok(Self::tight_comfort()),
            "high_variance" => Ok(Self::high_variance()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all sections and returns every error found.
    ///
    /// Returns an empty vector if the configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.hours == 0 {
            errors.push(ConfigError::new("simulation.hours", "must be > 0"));
        }
        if !(s.physical_max_draw_kw.is_finite() && s.physical_max_draw_kw > 0.0) {
            errors.push(ConfigError::new(
                "simulation.physical_max_draw_kw",
                "must be a finite number > 0",
            ));
        }
        if !crate::policy::POLICY_IDS.contains(&s.policy.as_str()) {
            errors.push(ConfigError::new(
                "simulation.policy",
                format!(
                    "must be one of {}, got \"{}\"",
                    crate::policy::POLICY_IDS.join(", "),
                    s.policy
                ),
            ));
        }

        errors.extend(self.generator.validate());
        errors.extend(self.peak_shaving.validate());
        errors.extend(self.floor_tracking.validate());
        errors
    }
}

impl GeneratorConfig {
    /// Validates generator parameters.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let fields = [
            ("generator.base_kw", self.base_kw),
            ("generator.diurnal_amplitude_kw", self.diurnal_amplitude_kw),
            ("generator.noise_kw", self.noise_kw),
            ("generator.comfort_margin_low_min_kw", self.comfort_margin_low_min_kw),
            ("generator.comfort_margin_low_max_kw", self.comfort_margin_low_max_kw),
            ("generator.comfort_margin_high_min_kw", self.comfort_margin_high_min_kw),
            ("generator.comfort_margin_high_max_kw", self.comfort_margin_high_max_kw),
        ];
        for (field, value) in fields {
            if !(value.is_finite() && (0.0..=1_000.0).contains(&value)) {
                errors.push(ConfigError::new(field, "must be a finite number in [0, 1000]"));
            }
        }
        if !errors.is_empty() {
            return errors;
        }

        // Centring can shift an hour by up to one more amplitude+noise swing.
        let worst_swing = 2.0 * (self.diurnal_amplitude_kw + self.noise_kw);
        if self.base_kw <= worst_swing {
            errors.push(ConfigError::new(
                "generator.base_kw",
                format!("must be > 2 x (diurnal_amplitude_kw + noise_kw) = {worst_swing:.3}"),
            ));
        }
        if self.comfort_margin_low_min_kw > self.comfort_margin_low_max_kw {
            errors.push(ConfigError::new(
                "generator.comfort_margin_low_min_kw",
                "must be <= generator.comfort_margin_low_max_kw",
            ));
        }
        if self.comfort_margin_high_min_kw > self.comfort_margin_high_max_kw {
            errors.push(ConfigError::new(
                "generator.comfort_margin_high_min_kw",
                "must be <= generator.comfort_margin_high_max_kw",
            ));
        }
        errors
    }
}

impl PeakShavingConfig {
    /// Validates storage parameters.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if !(self.capacity_kwh.is_finite() && self.capacity_kwh > 0.0) {
            errors.push(ConfigError::new("peak_shaving.capacity_kwh", "must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.initial_soc) {
            errors.push(ConfigError::new("peak_shaving.initial_soc", "must be in [0.0, 1.0]"));
        }
        if !(self.max_charge_kw.is_finite() && self.max_charge_kw >= 0.0) {
            errors.push(ConfigError::new("peak_shaving.max_charge_kw", "must be >= 0"));
        }
        if !(self.max_discharge_kw.is_finite() && self.max_discharge_kw >= 0.0) {
            errors.push(ConfigError::new("peak_shaving.max_discharge_kw", "must be >= 0"));
        }
        if !(self.eta_charge > 0.0 && self.eta_charge <= 1.0) {
            errors.push(ConfigError::new("peak_shaving.eta_charge", "must be in (0.0, 1.0]"));
        }
        if !(self.eta_discharge > 0.0 && self.eta_discharge <= 1.0) {
            errors.push(ConfigError::new("peak_shaving.eta_discharge", "must be in (0.0, 1.0]"));
        }
        if self.lookback_hours == 0 {
            errors.push(ConfigError::new("peak_shaving.lookback_hours", "must be > 0"));
        }
        errors
    }
}

impl FloorTrackingConfig {
    /// Validates ramp parameters.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if !(self.ramp_limit_kw.is_finite() && self.ramp_limit_kw > 0.0) {
            errors.push(ConfigError::new("floor_tracking.ramp_limit_kw", "must be > 0"));
        }
        if !(self.headroom_kw.is_finite() && self.headroom_kw >= 0.0) {
            errors.push(ConfigError::new("floor_tracking.headroom_kw", "must be >= 0"));
        }
        errors
    }
}
