//! Exponential atmospheric density models

use super::AtmosphereModel;

/// Single-band exponential atmosphere
///
/// ρ(h) = ρ₀ × exp(-h / H)
#[derive(Debug, Clone)]
pub struct Exponential {
    /// Reference density at sea level (kg/m³)
    pub rho0: f64,

    /// Scale height (km)
    pub scale_height_km: f64,
}

impl Default for Exponential {
    fn default() -> Self {
        Self::standard()
    }
}

impl Exponential {
    /// Standard sea-level density with an 8.5 km scale height
    pub fn standard() -> Self {
        Self::new(1.225, 8.5)
    }

    pub fn new(rho0: f64, scale_height_km: f64) -> Self {
        Self {
            rho0,
            scale_height_km,
        }
    }
}

impl AtmosphereModel for Exponential {
    fn density(&self, altitude_km: f64) -> f64 {
        if altitude_km < 0.0 {
            return self.rho0;
        }
        self.rho0 * (-altitude_km / self.scale_height_km).exp()
    }

    fn name(&self) -> &'static str {
        "Exponential"
    }

    fn description(&self) -> &'static str {
        "Single scale-height exponential decay"
    }
}

/// Band base altitude (km), base density (kg/m³), scale height (km)
const BANDS: [(f64, f64, f64); 28] = [
    (0.0, 1.225, 7.249),
    (25.0, 3.899e-2, 6.349),
    (30.0, 1.774e-2, 6.682),
    (40.0, 3.972e-3, 7.554),
    (50.0, 1.057e-3, 8.382),
    (60.0, 3.206e-4, 7.714),
    (70.0, 8.770e-5, 6.549),
    (80.0, 1.905e-5, 5.799),
    (90.0, 3.396e-6, 5.382),
    (100.0, 5.297e-7, 5.877),
    (110.0, 9.661e-8, 7.263),
    (120.0, 2.438e-8, 9.473),
    (130.0, 8.484e-9, 12.636),
    (140.0, 3.845e-9, 16.149),
    (150.0, 2.070e-9, 22.523),
    (180.0, 5.464e-10, 29.740),
    (200.0, 2.789e-10, 37.105),
    (250.0, 7.248e-11, 45.546),
    (300.0, 2.418e-11, 53.628),
    (350.0, 9.518e-12, 53.298),
    (400.0, 3.725e-12, 58.515),
    (450.0, 1.585e-12, 60.828),
    (500.0, 6.967e-13, 63.822),
    (600.0, 1.454e-13, 71.835),
    (700.0, 3.614e-14, 88.667),
    (800.0, 1.170e-14, 124.64),
    (900.0, 5.245e-15, 181.05),
    (1000.0, 3.019e-15, 268.00),
];

/// Piecewise exponential atmosphere
///
/// Within each band the density decays from the band's base density with the
/// band's own scale height, i.e. log-density is linear in altitude. Altitudes
/// below sea level return the sea-level density; above the top band the last
/// band is extrapolated.
#[derive(Debug, Clone, Copy, Default)]
pub struct PiecewiseExponential;

impl PiecewiseExponential {
    pub fn new() -> Self {
        Self
    }
}

impl AtmosphereModel for PiecewiseExponential {
    fn density(&self, altitude_km: f64) -> f64 {
        if altitude_km.is_nan() || altitude_km < 0.0 {
            return BANDS[0].1;
        }
        let band = BANDS.partition_point(|&(base, _, _)| base <= altitude_km) - 1;
        let (base, rho0, scale_height) = BANDS[band];
        rho0 * (-(altitude_km - base) / scale_height).exp()
    }

    fn name(&self) -> &'static str {
        "Piecewise Exponential"
    }

    fn description(&self) -> &'static str {
        "Banded exponential density, sea level to 1000 km"
    }
}
