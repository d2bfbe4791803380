//! Seeded, platform-independent scenario generation.
//!
//! Every quantity is computed in integer milli-units (milli-kW, centi-°C,
//! centi-%) from a ChaCha8 stream seeded with the caller's seed, and only
//! converted to `f64` at the end. Hours are produced in blocks of one day;
//! the demand perturbations within each block are re-centred so the block's
//! demand sums to exactly `base_kw × block_len`.
//!
//! Per-hour draw order (part of the format, do not reorder):
//! noise, low margin, high margin, temperature jitter, humidity jitter.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::GeneratorConfig;
use crate::error::{DuelError, Result};
use crate::timestamp::Timestamp;

use super::types::{Dataset, HourRecord, WeatherFeatures};

/// First hour of every generated scenario (2025-09-17T00:00:00Z), in Unix
/// seconds.
pub const SCENARIO_START_EPOCH: i64 = 1_758_067_200;

const HOURS_PER_DAY: usize = 24;

/// Diurnal demand shape in permille of the configured amplitude, by hour of
/// day. Night trough, morning shoulder, evening peak. Sums to zero.
const DIURNAL_PERMILLE: [i64; HOURS_PER_DAY] = [
    -600, -750, -850, -900, -850, -600, -150, 300, 350, 300, 150, 100, //
    50, 100, 50, 100, 350, 750, 1000, 800, 550, 200, -100, -350,
];

/// Outdoor temperature profile in centi-°C, by hour of day.
const TEMPERATURE_CENTI_C: [i64; HOURS_PER_DAY] = [
    2100, 2255, 2400, 2524, 2620, 2680, 2700, 2680, 2620, 2524, 2400, 2255, //
    2100, 1945, 1800, 1676, 1580, 1520, 1500, 1520, 1580, 1676, 1800, 1945,
];

const TEMPERATURE_JITTER_CENTI_C: i64 = 50;
const HUMIDITY_BASE_CENTI_PCT: i64 = 5_500;
const HUMIDITY_JITTER_CENTI_PCT: i64 = 1_000;

/// Time-of-use tariff in milli-$/kWh by hour of day.
fn tariff_milli(hour_of_day: usize) -> i64 {
    match hour_of_day {
        17..=20 => 400,
        7..=16 => 180,
        _ => 80,
    }
}

/// Generator parameters converted to integer milli-kW.
#[derive(Debug, Clone, Copy)]
struct FixedPointParams {
    base: i64,
    amplitude: i64,
    noise: i64,
    margin_low: (i64, i64),
    margin_high: (i64, i64),
}

impl FixedPointParams {
    fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            base: to_milli(config.base_kw),
            amplitude: to_milli(config.diurnal_amplitude_kw),
            noise: to_milli(config.noise_kw),
            margin_low: (
                to_milli(config.comfort_margin_low_min_kw),
                to_milli(config.comfort_margin_low_max_kw),
            ),
            margin_high: (
                to_milli(config.comfort_margin_high_min_kw),
                to_milli(config.comfort_margin_high_max_kw),
            ),
        }
    }
}

fn to_milli(kw: f64) -> i64 {
    (kw * 1_000.0).round() as i64
}

fn from_milli(milli: i64) -> f64 {
    milli as f64 / 1_000.0
}

fn from_centi(centi: i64) -> f64 {
    centi as f64 / 100.0
}

/// Random draws for one hour, in the documented order.
#[derive(Debug, Clone, Copy)]
struct HourDraw {
    noise: i64,
    margin_low: i64,
    margin_high: i64,
    temperature_jitter: i64,
    humidity_jitter: i64,
}

impl HourDraw {
    fn sample(rng: &mut ChaCha8Rng, p: &FixedPointParams) -> Self {
        Self {
            noise: rng.random_range(-p.noise..=p.noise),
            margin_low: rng.random_range(p.margin_low.0..=p.margin_low.1),
            margin_high: rng.random_range(p.margin_high.0..=p.margin_high.1),
            temperature_jitter: rng
                .random_range(-TEMPERATURE_JITTER_CENTI_C..=TEMPERATURE_JITTER_CENTI_C),
            humidity_jitter: rng
                .random_range(-HUMIDITY_JITTER_CENTI_PCT..=HUMIDITY_JITTER_CENTI_PCT),
        }
    }
}

/// Generates the scenario for `(seed, hours)` with default parameters.
///
/// # Errors
///
/// Returns `ConfigurationError` if `hours` is zero.
///
/// # Examples
///
/// ```
/// use duel_sim::dataset::generate;
///
/// let a = generate(42, 72).unwrap();
/// let b = generate(42, 72).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 72);
/// ```
pub fn generate(seed: u64, hours: usize) -> Result<Dataset> {
    generate_with(&GeneratorConfig::default(), seed, hours)
}

/// Generates the scenario for `(seed, hours)` with explicit parameters.
///
/// # Errors
///
/// Returns `ConfigurationError` if `hours` is zero or `config` is invalid.
pub fn generate_with(config: &GeneratorConfig, seed: u64, hours: usize) -> Result<Dataset> {
    if hours == 0 {
        return Err(DuelError::config("hours", "must be > 0"));
    }
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(DuelError::InvalidScenario(errors));
    }

    let start = Timestamp::from_epoch_seconds(SCENARIO_START_EPOCH)
        .map_err(|e| DuelError::config("timestamp", e.to_string()))?;
    let params = FixedPointParams::from_config(config);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut records = Vec::with_capacity(hours);

    let mut block_start = 0;
    while block_start < hours {
        let block_len = HOURS_PER_DAY.min(hours - block_start);
        let draws: Vec<HourDraw> = (0..block_len)
            .map(|_| HourDraw::sample(&mut rng, &params))
            .collect();
        let offsets = centred_offsets(block_start, &draws, &params);

        for (k, (draw, offset)) in draws.iter().zip(offsets).enumerate() {
            let index = block_start + k;
            let timestamp = start
                .plus_hours(index as i64)
                .map_err(|e| DuelError::config("hours", e.to_string()))?;
            records.push(build_record(index, &timestamp, draw, offset, &params));
        }
        debug!(block_start, block_len, "generated scenario block");
        block_start += block_len;
    }

    info!(seed, hours, "generated dataset");
    Dataset::from_records(records)
}

/// Demand offsets for one block, shifted so they sum to exactly zero.
fn centred_offsets(block_start: usize, draws: &[HourDraw], p: &FixedPointParams) -> Vec<i64> {
    let raw: Vec<i64> = draws
        .iter()
        .enumerate()
        .map(|(k, draw)| {
            let hour_of_day = (block_start + k) % HOURS_PER_DAY;
            p.amplitude * DIURNAL_PERMILLE[hour_of_day] / 1_000 + draw.noise
        })
        .collect();

    let n = raw.len() as i64;
    let sum: i64 = raw.iter().sum();
    let shift = sum.div_euclid(n);
    let remainder = sum.rem_euclid(n);

    raw.iter()
        .enumerate()
        .map(|(k, offset)| offset - shift - i64::from((k as i64) < remainder))
        .collect()
}

fn build_record(
    index: usize,
    timestamp: &Timestamp,
    draw: &HourDraw,
    offset: i64,
    p: &FixedPointParams,
) -> HourRecord {
    let hour_of_day = index % HOURS_PER_DAY;
    let demand = (p.base + offset).max(0);
    let low = (demand - draw.margin_low).max(0);
    let high = demand + draw.margin_high;

    HourRecord {
        index,
        timestamp: timestamp.to_iso8601(),
        baseline_demand_kw: from_milli(demand),
        comfort_bound_low: from_milli(low),
        comfort_bound_high: from_milli(high),
        weather_features: WeatherFeatures {
            temperature_c: from_centi(TEMPERATURE_CENTI_C[hour_of_day] + draw.temperature_jitter),
            humidity_pct: from_centi(HUMIDITY_BASE_CENTI_PCT + draw.humidity_jitter),
        },
        tariff_per_kwh: from_milli(tariff_milli(hour_of_day)),
    }
}

/// Regenerates `(seed, dataset.len())` and checks it matches `dataset`.
///
/// # Errors
///
/// Returns `DeterminismViolation` naming the first differing hour and field,
/// or any error `generate_with` would return.
pub fn verify_reproducible(config: &GeneratorConfig, seed: u64, dataset: &Dataset) -> Result<()> {
    let regenerated = generate_with(config, seed, dataset.len())?;
    for (expected, actual) in regenerated.records().iter().zip(dataset.records()) {
        if let Some(field) = first_difference(expected, actual) {
            return Err(DuelError::DeterminismViolation {
                seed,
                hour_index: expected.index,
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

fn first_difference(a: &HourRecord, b: &HourRecord) -> Option<&'static str> {
    if a.index != b.index {
        Some("index")
    } else if a.timestamp != b.timestamp {
        Some("timestamp")
    } else if a.baseline_demand_kw.to_bits() != b.baseline_demand_kw.to_bits() {
        Some("demand_kw")
    } else if a.comfort_bound_low.to_bits() != b.comfort_bound_low.to_bits() {
        Some("comfort_bound_low")
    } else if a.comfort_bound_high.to_bits() != b.comfort_bound_high.to_bits() {
        Some("comfort_bound_high")
    } else if a.weather_features != b.weather_features {
        Some("weather_features")
    } else if a.tariff_per_kwh.to_bits() != b.tariff_per_kwh.to_bits() {
        Some("tariff_per_kwh")
    } else {
        None
    }
}
