use crate::climate::{clear_sky_radiation, extraterrestrial_radiation};
use serde::{Deserialize, Serialize};

/// Thornton-Running (1999) calibration coefficients for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThorntonRunning {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
}

impl Default for ThorntonRunning {
    fn default() -> Self {
        ThorntonRunning {
            b0: 0.031,
            b1: 0.201,
            b2: 0.185,
        }
    }
}

impl ThorntonRunning {
    /// Estimates daily solar radiation from the diurnal temperature range.
    ///
    /// The transmittance is `1 - 0.9 exp(-B dT^1.5)` where
    /// `B = b0 + b1 exp(-b2 dT_month)` and `dT_month` is the climatological
    /// mean range for the month.
    ///
    /// # Parameters
    ///
    /// - `tmax`, `tmin`: the day's air temperature extremes [C].
    /// - `monthly_tmax`, `monthly_tmin`: the month's mean extremes [C].
    /// - `latitude`: decimal degrees.
    /// - `elevation`: meters.
    /// - `doy`: day of year.
    ///
    /// # Returns
    ///
    /// Solar radiation in MJ m-2 d-1, never above clear-sky radiation.
    #[allow(clippy::too_many_arguments)]
    pub fn estimate_rs(
        &self,
        tmax: f64,
        tmin: f64,
        monthly_tmax: f64,
        monthly_tmin: f64,
        latitude: f64,
        elevation: f64,
        doy: u32,
    ) -> f64 {
        let rso = clear_sky_radiation(extraterrestrial_radiation(latitude, doy), elevation);
        let dt = (tmax - tmin).max(0.1);
        let dt_month = (monthly_tmax - monthly_tmin).max(0.1);
        let b = self.b0 + self.b1 * (-self.b2 * dt_month).exp();
        let transmittance = 1.0 - 0.9 * (-b * dt.powf(1.5)).exp();
        (rso * transmittance).clamp(0.0, rso)
    }
}
