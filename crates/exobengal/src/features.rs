use exobengal_core::Tensor;
use exobengal_io::Table;
use serde::{Deserialize, Serialize};

use crate::error::{ExoError, ExoResult};

/// Model inputs, in the order every model was trained on.
pub const FEATURE_COLUMNS: [&str; 9] = [
    "koi_period",
    "koi_prad",
    "koi_teq",
    "koi_srad",
    "koi_slogg",
    "koi_steff",
    "koi_impact",
    "koi_duration",
    "koi_depth",
];

pub const N_FEATURES: usize = FEATURE_COLUMNS.len();

const PERIOD: usize = 0;
const PLANET_RADIUS: usize = 1;
const EQUILIBRIUM_TEMP: usize = 2;
const STELLAR_RADIUS: usize = 3;
const STELLAR_TEFF: usize = 5;

/// Solar effective temperature in kelvin.
pub const SOLAR_TEFF: f64 = 5778.0;

/// One candidate: the nine features in [`FEATURE_COLUMNS`] order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation(pub [f64; N_FEATURES]);

impl Observation {
    pub fn new(values: [f64; N_FEATURES]) -> Self {
        Observation(values)
    }

    pub fn from_slice(values: &[f64]) -> ExoResult<Self> {
        let values: [f64; N_FEATURES] = values.try_into().map_err(|_| {
            ExoError::InvalidInput(format!(
                "expected {} feature values, got {}",
                N_FEATURES,
                values.len()
            ))
        })?;
        Ok(Observation(values))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Planet radius in Earth radii.
    pub fn planet_radius(&self) -> f64 {
        self.0[PLANET_RADIUS]
    }

    /// Equilibrium temperature in kelvin.
    pub fn equilibrium_temp(&self) -> f64 {
        self.0[EQUILIBRIUM_TEMP]
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Reject infinite features. NaN passes through as a missing value.
    pub fn check_no_infinite(&self) -> ExoResult<()> {
        match self.0.iter().position(|v| v.is_infinite()) {
            Some(i) => Err(ExoError::InvalidInput(format!(
                "{} is infinite",
                FEATURE_COLUMNS[i]
            ))),
            None => Ok(()),
        }
    }

    /// Single-row matrix `[1, 9]`.
    pub fn to_tensor(&self) -> ExoResult<Tensor<f64>> {
        Ok(Tensor::new(self.0.to_vec(), vec![1, N_FEATURES])?)
    }
}

impl From<[f64; N_FEATURES]> for Observation {
    fn from(values: [f64; N_FEATURES]) -> Self {
        Observation(values)
    }
}

/// Stellar flux relative to Earth: `(steff / 5778)^4 * srad^2 / period^(4/3)`.
pub fn insolation(steff: f64, srad: f64, period: f64) -> f64 {
    (steff / SOLAR_TEFF).powi(4) * srad.powi(2) / period.powf(4.0 / 3.0)
}

/// Engineered feature matrix for a set of table rows.
///
/// `insolation` is derived for every row but is not one of the model inputs.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    /// `[n_rows, 9]`, NaN where the source cell was empty or not a number.
    pub features: Tensor<f64>,
    pub insolation: Vec<f64>,
}

impl FeatureFrame {
    /// Build the frame for `rows` of `table`, preserving their order.
    pub fn from_table(table: &Table, rows: &[usize]) -> ExoResult<Self> {
        let columns = table.require_columns(&FEATURE_COLUMNS)?;

        let mut values = Vec::with_capacity(rows.len() * N_FEATURES);
        let mut insolation_values = Vec::with_capacity(rows.len());
        for &row in rows {
            let start = values.len();
            values.extend(columns.iter().map(|&col| table.number(row, col)));
            let r = &values[start..];
            insolation_values.push(insolation(r[STELLAR_TEFF], r[STELLAR_RADIUS], r[PERIOD]));
        }

        Ok(FeatureFrame {
            features: Tensor::new(values, vec![rows.len(), N_FEATURES])?,
            insolation: insolation_values,
        })
    }

    pub fn len(&self) -> usize {
        self.insolation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insolation.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use exobengal_io::read_table_from;

    #[test]
    fn test_insolation_of_earth_analog() {
        // Sun-like star, solar radius, one-day period
        assert_abs_diff_eq!(insolation(5778.0, 1.0, 1.0), 1.0, epsilon = 1e-12);
        // hotter star doubles temperature, flux grows 16x
        assert_abs_diff_eq!(insolation(11556.0, 1.0, 1.0), 16.0, epsilon = 1e-9);
        assert_abs_diff_eq!(insolation(5778.0, 2.0, 8.0), 4.0 / 16.0, epsilon = 1e-12);
    }

    #[test]
    fn test_frame_keeps_order_and_marks_missing() {
        let text = "\
preamble
koi_depth,koi_period,koi_prad,koi_teq,koi_srad,koi_slogg,koi_steff,koi_impact,koi_duration,extra
100,10,1.1,300,1.0,4.4,5778,0.1,3.0,x
200,20,,500,2.0,4.0,6000,0.5,5.0,y
";
        let table = read_table_from(text.as_bytes()).unwrap();
        let frame = FeatureFrame::from_table(&table, &[1, 0]).unwrap();

        assert_eq!(frame.len(), 2);
        let first = frame.features.row_slice(0).unwrap();
        assert_eq!(first[0], 20.0);
        assert!(first[1].is_nan());
        assert_eq!(first[8], 200.0);
        let second = frame.features.row_slice(1).unwrap();
        assert_eq!(second, &[10.0, 1.1, 300.0, 1.0, 4.4, 5778.0, 0.1, 3.0, 100.0]);
        assert_abs_diff_eq!(frame.insolation[1], 10f64.powf(-4.0 / 3.0), epsilon = 1e-12);
    }

    #[test]
    fn test_missing_feature_column_is_data_format() {
        let table = read_table_from("preamble\nkoi_period,koi_prad\n1,2\n".as_bytes()).unwrap();
        assert!(matches!(
            FeatureFrame::from_table(&table, &[0]),
            Err(ExoError::DataFormat(_))
        ));
    }

    #[test]
    fn test_observation_arity() {
        assert!(Observation::from_slice(&[1.0; 8]).is_err());
        let obs = Observation::from_slice(&[1.0; 9]).unwrap();
        assert_eq!(obs.to_tensor().unwrap().shape_vec(), vec![1, 9]);
    }

    #[test]
    fn test_infinite_features_are_rejected() {
        let mut values = [1.0; 9];
        values[3] = f64::NAN;
        assert!(Observation(values).check_no_infinite().is_ok());

        values[2] = f64::NEG_INFINITY;
        match Observation(values).check_no_infinite() {
            Err(ExoError::InvalidInput(msg)) => assert!(msg.contains("koi_teq"), "{msg}"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }
}
