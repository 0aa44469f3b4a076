//! Bühlmann ZHL-16C decompression model with gradient factors.
//!
//! Integrates a 16-compartment N2/He tissue model over an irregularly
//! sampled depth profile using the Schreiner equation (inspired pressure
//! varying linearly between samples), then derives the ceiling and the
//! next decompression stop.

use crate::error::DecoError;
use crate::models::{GasMix, ProfilePoint};

// ============================================================================
// Physical Constants
// ============================================================================

/// Water vapour pressure in the lungs (bar), at 37°C.
const P_WATER_VAPOR: f64 = 0.0627;

/// Pressure increase per metre of fresh water (bar/m).
const BAR_PER_METER: f64 = 0.0980665;

/// Surface pressure (bar).
const SURFACE_PRESSURE: f64 = 1.0;

/// Gradient factor floor applied before dividing by it.
const MIN_GRADIENT_FACTOR: f64 = 0.01;

/// Default maximum O2 partial pressure for MOD (bar).
pub const DEFAULT_PPO2_MAX: f64 = 1.4;

// ============================================================================
// ZHL-16C Compartment Constants (compartments 1, 1b, 2..15)
// ============================================================================

/// Number of tissue compartments.
pub const NUM_COMPARTMENTS: usize = 16;

/// N2 half-times in minutes.
const N2_HALF_TIMES: [f64; NUM_COMPARTMENTS] = [
    4.0, 5.0, 8.0, 12.5, 18.5, 27.0, 38.3, 54.3, 77.0, 109.0, 146.0, 187.0, 239.0, 305.0, 390.0,
    498.0,
];

/// He half-times in minutes.
const HE_HALF_TIMES: [f64; NUM_COMPARTMENTS] = [
    1.51, 1.88, 3.02, 4.72, 6.99, 10.21, 14.48, 20.53, 29.11, 41.20, 55.19, 70.69, 90.34, 115.29,
    147.42, 188.24,
];

/// N2 'a' coefficients (bar).
const A_N2: [f64; NUM_COMPARTMENTS] = [
    1.2599, 1.1696, 1.0000, 0.8618, 0.7562, 0.6200, 0.5043, 0.4410, 0.4000, 0.3750, 0.3500, 0.3295,
    0.3065, 0.2835, 0.2610, 0.2480,
];

/// N2 'b' coefficients (dimensionless).
const B_N2: [f64; NUM_COMPARTMENTS] = [
    0.5050, 0.5578, 0.6514, 0.7222, 0.7825, 0.8126, 0.8434, 0.8693, 0.8910, 0.9092, 0.9222, 0.9319,
    0.9403, 0.9477, 0.9544, 0.9602,
];

/// He 'a' coefficients (bar).
const A_HE: [f64; NUM_COMPARTMENTS] = [
    1.7424, 1.6189, 1.3830, 1.1919, 1.0458, 0.9220, 0.8205, 0.7305, 0.6502, 0.5950, 0.5545, 0.5333,
    0.5189, 0.5181, 0.5176, 0.5172,
];

/// He 'b' coefficients (dimensionless).
const B_HE: [f64; NUM_COMPARTMENTS] = [
    0.4245, 0.4770, 0.5747, 0.6527, 0.7223, 0.7582, 0.7957, 0.8279, 0.8553, 0.8757, 0.8903, 0.8997,
    0.9073, 0.9122, 0.9171, 0.9217,
];

// ============================================================================
// FFI Types
// ============================================================================

/// Gradient factor pair, both within (0, 1] and `low <= high`.
#[derive(Debug, Clone, Copy, PartialEq, uniffi::Record)]
pub struct GradientFactors {
    pub low: f64,
    pub high: f64,
}

impl GradientFactors {
    pub fn new(low: f64, high: f64) -> Result<Self, DecoError> {
        for value in [low, high] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(DecoError::InvalidGradientFactor { value });
            }
        }
        if low > high {
            return Err(DecoError::GradientFactorOrder { low, high });
        }
        Ok(Self { low, high })
    }

    /// Gradient factor interpolated by absolute depth over 0–100 m.
    ///
    /// Note: standard GF practice interpolates between the first stop and
    /// the surface; this model keeps the absolute-depth interpolation.
    pub fn at_depth(&self, depth_m: f64) -> f64 {
        (self.low + (self.high - self.low) * (1.0 - depth_m / 100.0)).clamp(0.0, 1.0)
    }
}

/// Tunables of the ceiling computation.
#[derive(Debug, Clone, Copy, PartialEq, uniffi::Record)]
pub struct DecoParameters {
    pub gradient_factors: GradientFactors,
    /// Stops are rounded up to a multiple of this depth (m).
    pub stop_interval_m: f64,
}

impl Default for DecoParameters {
    fn default() -> Self {
        Self {
            gradient_factors: GradientFactors {
                low: 0.30,
                high: 0.85,
            },
            stop_interval_m: 3.0,
        }
    }
}

/// A duration this model version declares but does not resolve.
#[derive(Debug, Clone, Copy, PartialEq, uniffi::Enum)]
pub enum DecoTime {
    NotComputed,
    Minutes { value: u32 },
}

/// Decompression state at the last profile sample.
#[derive(Debug, Clone, Copy, PartialEq, uniffi::Record)]
pub struct DecoResult {
    /// Shallowest tolerated depth (m), 0 when a direct ascent is allowed.
    pub ceiling_m: f64,
    /// Next stop depth, `None` when the diver may surface directly.
    pub next_stop_m: Option<f64>,
    /// Index (0–15) of the compartment setting the ceiling.
    pub leading_compartment: u8,
    pub ndl: DecoTime,
    pub stop_time: DecoTime,
}

// ============================================================================
// Tissue State
// ============================================================================

/// State of the 16 tissue compartments.
#[derive(Debug, Clone)]
pub(crate) struct TissueState {
    /// N2 partial pressure in each compartment (bar).
    pub(crate) p_n2: [f64; NUM_COMPARTMENTS],
    /// He partial pressure in each compartment (bar).
    pub(crate) p_he: [f64; NUM_COMPARTMENTS],
}

impl TissueState {
    /// Initialise tissues in equilibrium with the gas breathed at `depth_m`.
    fn equilibrium(depth_m: f64, gas: &GasMix) -> Self {
        let ambient = ambient_pressure(depth_m);
        TissueState {
            p_n2: [inspired_pressure(ambient, gas.n2); NUM_COMPARTMENTS],
            p_he: [inspired_pressure(ambient, gas.he); NUM_COMPARTMENTS],
        }
    }

    /// Update all compartments over `dt_sec` while ambient pressure moves
    /// linearly from `start_ambient` to `end_ambient`.
    fn update(&mut self, dt_sec: f64, start_ambient: f64, end_ambient: f64, gas: &GasMix) {
        if dt_sec <= 0.0 {
            return;
        }
        let n2_start = inspired_pressure(start_ambient, gas.n2);
        let n2_rate = (inspired_pressure(end_ambient, gas.n2) - n2_start) / dt_sec;
        let he_start = inspired_pressure(start_ambient, gas.he);
        let he_rate = (inspired_pressure(end_ambient, gas.he) - he_start) / dt_sec;

        for i in 0..NUM_COMPARTMENTS {
            // N2
            let k_n2 = decay_constant(N2_HALF_TIMES[i]);
            self.p_n2[i] = schreiner(self.p_n2[i], n2_start, n2_rate, k_n2, dt_sec);

            // He
            let k_he = decay_constant(HE_HALF_TIMES[i]);
            self.p_he[i] = schreiner(self.p_he[i], he_start, he_rate, k_he, dt_sec);
        }
    }

    /// Weighted (a, b) for a compartment; pure N2 values if it holds no gas.
    fn coefficients(&self, i: usize) -> (f64, f64) {
        let p_total = self.p_n2[i] + self.p_he[i];
        if p_total > 1e-10 {
            let a = (A_N2[i] * self.p_n2[i] + A_HE[i] * self.p_he[i]) / p_total;
            let b = (B_N2[i] * self.p_n2[i] + B_HE[i] * self.p_he[i]) / p_total;
            (a, b)
        } else {
            (A_N2[i], B_N2[i])
        }
    }

    /// Highest minimum tolerated ambient pressure over all compartments,
    /// with the index of the compartment that sets it.
    fn ceiling_ambient(&self, gf: f64) -> (f64, usize) {
        let mut ceiling = f64::NEG_INFINITY;
        let mut leading = 0;
        for i in 0..NUM_COMPARTMENTS {
            let (a, b) = self.coefficients(i);
            let p_total = self.p_n2[i] + self.p_he[i];
            let amb_min = (p_total - a * gf) / (b * gf);
            if amb_min > ceiling {
                ceiling = amb_min;
                leading = i;
            }
        }
        (ceiling, leading)
    }
}

/// Decay constant (1/s) for a half-time in minutes.
fn decay_constant(half_time_min: f64) -> f64 {
    std::f64::consts::LN_2 / (half_time_min * 60.0)
}

/// Schreiner equation for a linearly changing inspired pressure.
fn schreiner(p_tissue: f64, p_inspired_start: f64, rate: f64, k: f64, dt_sec: f64) -> f64 {
    p_inspired_start
        + rate * (dt_sec - 1.0 / k)
        + (p_tissue - p_inspired_start - rate / k) * (-k * dt_sec).exp()
}

/// Ambient pressure (bar) at a fresh-water depth.
pub fn ambient_pressure(depth_m: f64) -> f64 {
    SURFACE_PRESSURE + depth_m * BAR_PER_METER
}

fn depth_from_ambient(ambient: f64) -> f64 {
    (ambient - SURFACE_PRESSURE) / BAR_PER_METER
}

/// Inspired partial pressure of a gas fraction, net of water vapour.
fn inspired_pressure(ambient: f64, fraction: f64) -> f64 {
    ((ambient - P_WATER_VAPOR) * fraction).max(0.0)
}

// ============================================================================
// Model
// ============================================================================

/// Ceiling computation for one breathing gas.
#[derive(Debug, Clone, Copy)]
pub struct DecompressionModel {
    gas: GasMix,
    params: DecoParameters,
}

impl DecompressionModel {
    pub fn new(gas: GasMix, params: DecoParameters) -> Self {
        Self { gas, params }
    }

    /// Integrate the tissues over `profile`, or `None` with fewer than two samples.
    ///
    /// Samples whose time does not advance are skipped.
    pub(crate) fn integrate(&self, profile: &[ProfilePoint]) -> Option<TissueState> {
        if profile.len() < 2 {
            return None;
        }
        let mut tissues = TissueState::equilibrium(profile[0].depth_m, &self.gas);
        for pair in profile.windows(2) {
            let (prev, cur) = (pair[0], pair[1]);
            let dt_sec = cur.t_sec - prev.t_sec;
            tissues.update(
                dt_sec,
                ambient_pressure(prev.depth_m),
                ambient_pressure(cur.depth_m),
                &self.gas,
            );
        }
        Some(tissues)
    }

    /// Ceiling and next stop at the last sample of `profile`.
    ///
    /// Returns `None` (no decompression data yet) for an empty or
    /// single-sample profile.
    pub fn evaluate(&self, profile: &[ProfilePoint]) -> Option<DecoResult> {
        let tissues = self.integrate(profile)?;
        let current_depth = profile.last().map(|p| p.depth_m).unwrap_or_default();
        let gf = self
            .params
            .gradient_factors
            .at_depth(current_depth)
            .max(MIN_GRADIENT_FACTOR);

        let (ceiling_ambient, leading) = tissues.ceiling_ambient(gf);
        let ceiling_m = depth_from_ambient(ceiling_ambient).max(0.0);
        let next_stop_m = if ceiling_m <= 0.0 {
            None
        } else {
            let interval = self.params.stop_interval_m;
            Some((ceiling_m / interval).ceil() * interval)
        };

        Some(DecoResult {
            ceiling_m,
            next_stop_m,
            leading_compartment: leading as u8,
            ndl: DecoTime::NotComputed,
            stop_time: DecoTime::NotComputed,
        })
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Compute the ceiling and next stop for a profile breathed on `gas`.
///
/// The gas fractions are normalized to sum to 1.
#[uniffi::export]
pub fn compute_deco(
    profile: Vec<ProfilePoint>,
    gas: GasMix,
    params: DecoParameters,
) -> Result<Option<DecoResult>, DecoError> {
    let gas = GasMix::from_fractions(gas.o2, gas.n2, gas.he)?;
    GradientFactors::new(params.gradient_factors.low, params.gradient_factors.high)?;
    Ok(DecompressionModel::new(gas, params).evaluate(&profile))
}

/// Maximum operating depth (whole metres) for an O2 fraction.
#[uniffi::export]
pub fn max_operating_depth(o2_fraction: f64, ppo2_max: f64) -> Result<i32, DecoError> {
    if !(o2_fraction > 0.0 && o2_fraction <= 1.0) {
        return Err(DecoError::InvalidO2Fraction {
            fraction: o2_fraction,
        });
    }
    Ok((((ppo2_max / o2_fraction) - 1.0) * 10.0).floor() as i32)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn point(t_sec: f64, depth_m: f64) -> ProfilePoint {
        ProfilePoint { t_sec, depth_m }
    }

    fn air_model() -> DecompressionModel {
        DecompressionModel::new(GasMix::AIR, DecoParameters::default())
    }

    #[test]
    fn test_mod_known_values() {
        assert_eq!(max_operating_depth(0.21, DEFAULT_PPO2_MAX), Ok(56));
        assert_eq!(max_operating_depth(0.32, DEFAULT_PPO2_MAX), Ok(33));
        assert_eq!(max_operating_depth(1.0, DEFAULT_PPO2_MAX), Ok(4));
    }

    #[test]
    fn test_mod_monotonic() {
        let mut previous = i32::MAX;
        for percent in 1..=100 {
            let fo2 = f64::from(percent) / 100.0;
            let depth = max_operating_depth(fo2, DEFAULT_PPO2_MAX).unwrap();
            assert!(
                depth <= previous,
                "MOD should not increase with fO2: {depth} > {previous} at {fo2}"
            );
            previous = depth;
        }
    }

    #[test]
    fn test_mod_rejects_out_of_range() {
        assert_eq!(
            max_operating_depth(0.0, DEFAULT_PPO2_MAX),
            Err(DecoError::InvalidO2Fraction { fraction: 0.0 })
        );
        assert!(max_operating_depth(1.01, DEFAULT_PPO2_MAX).is_err());
        assert!(max_operating_depth(-0.2, DEFAULT_PPO2_MAX).is_err());
    }

    #[test]
    fn test_empty_and_single_sample_are_undefined() {
        let model = air_model();
        assert_eq!(model.evaluate(&[]), None);
        assert_eq!(model.evaluate(&[point(0.0, 30.0)]), None);
    }

    #[test]
    fn test_gradient_factor_by_depth() {
        let gf = GradientFactors::new(0.3, 0.8).unwrap();
        assert!((gf.at_depth(0.0) - 0.8).abs() < 1e-12);
        assert!((gf.at_depth(50.0) - 0.55).abs() < 1e-12);
        assert!((gf.at_depth(100.0) - 0.3).abs() < 1e-12);
        assert!(gf.at_depth(400.0) >= 0.0);
        assert!(GradientFactors::new(0.0, 0.8).is_err());
        assert!(GradientFactors::new(0.9, 0.8).is_err());
    }

    #[test]
    fn test_constant_depth_saturates() {
        let model = air_model();
        let depth = 20.0;
        let target = inspired_pressure(ambient_pressure(depth), GasMix::AIR.n2);

        // Start at the surface so every compartment has to load.
        let short = model
            .integrate(&[point(0.0, 0.0), point(0.0, depth), point(600.0, depth)])
            .unwrap();
        let long = model
            .integrate(&[point(0.0, 0.0), point(0.0, depth), point(1_000_000.0, depth)])
            .unwrap();

        for i in 0..NUM_COMPARTMENTS {
            assert!(short.p_n2[i] <= target + 1e-9);
            assert!(
                (target - long.p_n2[i]).abs() <= (target - short.p_n2[i]).abs(),
                "compartment {i} should approach inspired pressure"
            );
            assert!(
                (long.p_n2[i] - target).abs() < 1e-3,
                "compartment {i} should be saturated, got {} vs {target}",
                long.p_n2[i]
            );
        }
    }

    #[test]
    fn test_equilibrium_at_first_sample_depth() {
        let model = air_model();
        let tissues = model
            .integrate(&[point(0.0, 30.0), point(0.0, 30.0)])
            .unwrap();
        let expected = inspired_pressure(ambient_pressure(30.0), GasMix::AIR.n2);
        for i in 0..NUM_COMPARTMENTS {
            assert!((tissues.p_n2[i] - expected).abs() < 1e-12);
            assert_eq!(tissues.p_he[i], 0.0);
        }
    }

    #[test]
    fn test_non_advancing_samples_are_skipped() {
        let model = air_model();
        let with_duplicate = model
            .integrate(&[
                point(0.0, 0.0),
                point(300.0, 15.0),
                point(300.0, 40.0),
                point(200.0, 40.0),
            ])
            .unwrap();
        let without = model
            .integrate(&[point(0.0, 0.0), point(300.0, 15.0)])
            .unwrap();
        assert_eq!(with_duplicate.p_n2, without.p_n2);
    }

    #[test]
    fn test_schreiner_matches_stepwise_descent() {
        // A linear descent in one step should match many small constant steps.
        let model = air_model();
        let one_step = model
            .integrate(&[point(0.0, 0.0), point(600.0, 30.0)])
            .unwrap();

        let fine: Vec<ProfilePoint> = (0..=6000)
            .map(|i| point(i as f64 * 0.1, 30.0 * i as f64 / 6000.0))
            .collect();
        let stepped = model.integrate(&fine).unwrap();

        for i in 0..NUM_COMPARTMENTS {
            assert!(
                (one_step.p_n2[i] - stepped.p_n2[i]).abs() < 1e-6,
                "compartment {i}: {} vs {}",
                one_step.p_n2[i],
                stepped.p_n2[i]
            );
        }
    }

    #[test]
    fn test_surface_profile_allows_direct_ascent() {
        let result = air_model()
            .evaluate(&[point(0.0, 0.0), point(3600.0, 0.0)])
            .unwrap();
        assert_eq!(result.ceiling_m, 0.0);
        assert_eq!(result.next_stop_m, None);
        assert_eq!(result.ndl, DecoTime::NotComputed);
        assert_eq!(result.stop_time, DecoTime::NotComputed);
    }

    #[test]
    fn test_thirty_metres_for_fifty_minutes_requires_stop() {
        let model = air_model();
        let profiles = [
            vec![point(0.0, 0.0), point(600.0, 30.0), point(3600.0, 30.0)],
            vec![point(600.0, 30.0), point(3600.0, 30.0)],
        ];
        for profile in profiles {
            let result = model.evaluate(&profile).unwrap();
            assert!(result.ceiling_m > 0.0, "expected a ceiling, got {result:?}");
            let stop = result.next_stop_m.unwrap();
            assert!(stop > 0.0);
            assert!(stop >= result.ceiling_m);
            let multiple = stop / 3.0;
            assert!((multiple - multiple.round()).abs() < 1e-9, "{stop} not a multiple of 3");
            assert!((result.leading_compartment as usize) < NUM_COMPARTMENTS);
        }
    }

    #[test]
    fn test_helium_loads_he_compartments() {
        let trimix = GasMix::new(0.21, 0.35).unwrap();
        let model = DecompressionModel::new(trimix, DecoParameters::default());
        let tissues = model
            .integrate(&[point(0.0, 0.0), point(120.0, 60.0), point(1320.0, 60.0)])
            .unwrap();
        let surface_he = inspired_pressure(ambient_pressure(0.0), 0.35);
        assert!(tissues.p_he.iter().all(|p| *p > surface_he));
        assert!(model
            .evaluate(&[point(0.0, 0.0), point(120.0, 60.0), point(1320.0, 60.0)])
            .is_some());
    }

    #[test]
    fn test_compute_deco_normalizes_gas() {
        let profile = vec![point(0.0, 0.0), point(600.0, 30.0), point(3600.0, 30.0)];
        let scaled = GasMix {
            o2: 21.0,
            n2: 79.0,
            he: 0.0,
        };
        let a = compute_deco(profile.clone(), scaled, DecoParameters::default()).unwrap();
        let b = compute_deco(profile, GasMix::AIR, DecoParameters::default()).unwrap();
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!((a.ceiling_m - b.ceiling_m).abs() < 1e-9);
        assert!(compute_deco(vec![], GasMix::AIR, DecoParameters::default())
            .unwrap()
            .is_none());
    }
}
