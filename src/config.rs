use std::time::Duration;

use crate::cli::Cli;
use crate::sensors::mag::recovery::DEFAULT_SETTLE;
use crate::sensors::mag::registry;
use crate::sensors::mag::settings::{DataRate, OperatingMode, Sensitivity, Settings, XyPerformance, ZPerformance};
use crate::sensors::mag::{MagError, RecoveryMode};

/// GPIO (BCM) qui alimente le capteur
const DEVICE_POWER_GPIO: u8 = 4;

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) address: u16,
    pub(crate) power_pin: u8,
    pub(crate) settle: Duration,
    pub(crate) settings: Settings,
    pub(crate) mode: OperatingMode,
    pub(crate) samples: u32,
    pub(crate) interval: Duration,
    pub(crate) temperature: bool,
    pub(crate) block_data_update: bool,
    pub(crate) recovery: RecoveryMode,
}

impl Config {
    /// Haute performance sur les 3 axes, 10 Hz, ±4 gauss, conversion continue
    pub fn new() -> Self {
        Config {
            address: registry::LIS3MDL_MAG_ADDR,
            power_pin: DEVICE_POWER_GPIO,
            settle: DEFAULT_SETTLE,
            settings: Settings {
                xy_performance: XyPerformance::High,
                z_performance: ZPerformance::High,
                data_rate: DataRate::Hz10,
                sensitivity: Sensitivity::Gauss4,
            },
            mode: OperatingMode::Continuous,
            samples: 10,
            interval: Duration::from_secs(1),
            temperature: false,
            block_data_update: false,
            recovery: RecoveryMode::Drop,
        }
    }

    /// Applique les options de la ligne de commande sur la configuration par défaut
    pub fn from_cli(cli: &Cli) -> Result<Self, MagError> {
        let mut config = Config::new();

        if let Some(address) = cli.address {
            config.address = address;
        }
        if let Some(pin) = cli.power_pin {
            config.power_pin = pin;
        }
        if let Some(ms) = cli.settle_ms {
            config.settle = Duration::from_millis(ms);
        }
        if let Some(xy) = cli.xy_performance {
            config.settings.xy_performance = xy;
        }
        if let Some(z) = cli.z_performance {
            config.settings.z_performance = z;
        }
        if let Some(rate) = cli.data_rate {
            config.settings.data_rate = rate;
        }
        if let Some(gauss) = cli.sensitivity {
            config.settings.sensitivity = Sensitivity::try_from(gauss)?;
        }
        if let Some(mode) = cli.mode {
            config.mode = mode;
        }
        if let Some(samples) = cli.samples {
            config.samples = samples;
        }
        if let Some(ms) = cli.interval_ms {
            config.interval = Duration::from_millis(ms);
        }

        config.temperature = cli.temperature;
        config.block_data_update = cli.block_data_update;
        if cli.hardened {
            config.recovery = RecoveryMode::Retry;
        }

        Ok(config)
    }
}
