use clap::ValueEnum;

use super::registry;
use super::MagError;

/// Mode de performance des axes X et Y (CTRL_REG1, bits 6-5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum XyPerformance {
    LowPower,
    Medium,
    High,
    UltraHigh,
}

impl XyPerformance {
    pub(crate) fn bits(self) -> u8 {
        (self as u8) << registry::XY_PERF_SHIFT
    }
}

/// Mode de performance de l'axe Z (CTRL_REG4, bits 3-2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ZPerformance {
    LowPower,
    Medium,
    High,
    UltraHigh,
}

impl ZPerformance {
    pub(crate) fn bits(self) -> u8 {
        (self as u8) << registry::Z_PERF_SHIFT
    }
}

/// Fréquence de sortie des données (CTRL_REG1, bits 4-2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum DataRate {
    #[value(name = "0.625")]
    Hz0_625,
    #[value(name = "1.25")]
    Hz1_25,
    #[value(name = "2.5")]
    Hz2_5,
    #[value(name = "5")]
    Hz5,
    #[value(name = "10")]
    Hz10,
    #[value(name = "20")]
    Hz20,
    #[value(name = "40")]
    Hz40,
    #[value(name = "80")]
    Hz80,
}

impl DataRate {
    pub(crate) fn bits(self) -> u8 {
        (self as u8) << registry::DATA_RATE_SHIFT
    }
}

/// Pleine échelle (CTRL_REG2, bits 6-5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sensitivity {
    Gauss4,
    Gauss8,
    Gauss12,
    Gauss16,
}

impl Sensitivity {
    pub(crate) fn bits(self) -> u8 {
        (self as u8) << registry::SENSITIVITY_SHIFT
    }

    /// Retrouve la pleine échelle depuis la valeur de CTRL_REG2
    pub(crate) fn from_register(value: u8) -> Self {
        match (value & registry::CTRL_REG2_SENSITIVITY_MASK) >> registry::SENSITIVITY_SHIFT {
            0 => Sensitivity::Gauss4,
            1 => Sensitivity::Gauss8,
            2 => Sensitivity::Gauss12,
            _ => Sensitivity::Gauss16,
        }
    }

    pub(crate) fn gauss(self) -> u8 {
        match self {
            Sensitivity::Gauss4 => 4,
            Sensitivity::Gauss8 => 8,
            Sensitivity::Gauss12 => 12,
            Sensitivity::Gauss16 => 16,
        }
    }
}

impl TryFrom<u8> for Sensitivity {
    type Error = MagError;

    fn try_from(gauss: u8) -> Result<Self, Self::Error> {
        match gauss {
            4 => Ok(Sensitivity::Gauss4),
            8 => Ok(Sensitivity::Gauss8),
            12 => Ok(Sensitivity::Gauss12),
            16 => Ok(Sensitivity::Gauss16),
            other => Err(MagError::InvalidConfiguration(format!(
                "no full-scale range of ±{} gauss (expected 4, 8, 12 or 16)",
                other
            ))),
        }
    }
}

/// LSB par gauss pour une pleine échelle donnée
pub(crate) fn scale_for(sensitivity: Sensitivity) -> u16 {
    match sensitivity {
        Sensitivity::Gauss4 => 6842,
        Sensitivity::Gauss8 => 3421,
        Sensitivity::Gauss12 => 2281,
        Sensitivity::Gauss16 => 1711,
    }
}

/// Mode de fonctionnement (CTRL_REG3, bits 1-0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OperatingMode {
    Continuous,
    Single,
    PowerDown,
}

impl OperatingMode {
    pub(crate) fn bits(self) -> u8 {
        self as u8
    }
}

/// Paramètres appliqués par `Lis3mdl::configure`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Settings {
    pub xy_performance: XyPerformance,
    pub z_performance: ZPerformance,
    pub data_rate: DataRate,
    pub sensitivity: Sensitivity,
}
