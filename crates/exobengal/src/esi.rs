use crate::error::{ExoError, ExoResult};

pub const EARTH_RADIUS: f64 = 1.0;
pub const EARTH_TEQ: f64 = 288.0;

/// Earth Similarity Index from planet radius (Earth radii) and equilibrium
/// temperature (K), rounded to three decimals.
///
/// ```
/// assert_eq!(exobengal::esi(1.0, 288.0).unwrap(), 1.0);
/// ```
pub fn esi(radius: f64, teq: f64) -> ExoResult<f64> {
    if !radius.is_finite() || !teq.is_finite() {
        return Err(ExoError::InvalidInput(format!(
            "ESI inputs must be finite, got radius={radius}, teq={teq}"
        )));
    }
    if radius == -EARTH_RADIUS || teq == -EARTH_TEQ {
        return Err(ExoError::InvalidInput(format!(
            "ESI undefined at radius={radius}, teq={teq}"
        )));
    }

    let radius_score = 1.0 - (radius - EARTH_RADIUS).abs() / (radius + EARTH_RADIUS);
    let temp_score = 1.0 - (teq - EARTH_TEQ).abs() / (teq + EARTH_TEQ);
    let product = radius_score * temp_score;
    if product < 0.0 {
        return Err(ExoError::InvalidInput(format!(
            "ESI score product is negative ({product}) for radius={radius}, teq={teq}"
        )));
    }

    Ok((product.sqrt() * 1000.0).round() / 1000.0)
}
