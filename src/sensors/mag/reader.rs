use nalgebra::Vector3;
use std::fmt;

use super::settings::{scale_for, Sensitivity};

const NANOTESLA_PER_GAUSS: f32 = 100_000.0;

/// Assemble un entier 16 bits signé (complément à deux) depuis ses deux octets
pub(crate) fn assemble(low: u8, high: u8) -> i16 {
    ((high as i16) << 8) | low as i16
}

/// Valeur d'un axe
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct AxisReading {
    pub raw: i16,
    pub gauss: f32,
    pub nanotesla: f32,
}

impl AxisReading {
    pub(crate) fn from_raw(raw: i16, sensitivity: Sensitivity) -> Self {
        let gauss = raw as f32 / scale_for(sensitivity) as f32;

        AxisReading {
            raw,
            gauss,
            nanotesla: gauss * NANOTESLA_PER_GAUSS,
        }
    }
}

/// Mesure magnétique 3 axes
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct MagSample {
    pub x: AxisReading,
    pub y: AxisReading,
    pub z: AxisReading,
}

impl MagSample {
    /// Décode les 6 octets OUT_X_L..OUT_Z_H
    pub(crate) fn decode(bytes: [u8; 6], sensitivity: Sensitivity) -> Self {
        MagSample {
            x: AxisReading::from_raw(assemble(bytes[0], bytes[1]), sensitivity),
            y: AxisReading::from_raw(assemble(bytes[2], bytes[3]), sensitivity),
            z: AxisReading::from_raw(assemble(bytes[4], bytes[5]), sensitivity),
        }
    }

    pub(crate) fn raw(&self) -> Vector3<i16> {
        Vector3::new(self.x.raw, self.y.raw, self.z.raw)
    }

    pub(crate) fn nanotesla(&self) -> Vector3<f32> {
        Vector3::new(self.x.nanotesla, self.y.nanotesla, self.z.nanotesla)
    }
}

impl fmt::Display for MagSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.3}, {:.3}, {:.3}] gauss / [{:.3}, {:.3}, {:.3}] nT",
            self.x.gauss, self.y.gauss, self.z.gauss, self.x.nanotesla, self.y.nanotesla, self.z.nanotesla
        )
    }
}
