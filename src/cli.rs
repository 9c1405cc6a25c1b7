use clap::Parser;

use crate::sensors::mag::settings::{DataRate, OperatingMode, XyPerformance, ZPerformance};

/// Test du magnétomètre LIS3MDL : détection, identification, configuration puis lectures
#[derive(Debug, Parser, Clone)]
#[command(version)]
pub(crate) struct Cli {
    /// Adresse I2C du capteur
    #[arg(long, value_parser = parse_address)]
    pub address: Option<u16>,

    /// GPIO (BCM) qui alimente le capteur
    #[arg(long)]
    pub power_pin: Option<u8>,

    /// Délai de redémarrage en millisecondes
    #[arg(long)]
    pub settle_ms: Option<u64>,

    #[arg(long, value_enum)]
    pub xy_performance: Option<XyPerformance>,

    #[arg(long, value_enum)]
    pub z_performance: Option<ZPerformance>,

    /// Fréquence de sortie en Hz
    #[arg(long, value_enum)]
    pub data_rate: Option<DataRate>,

    /// Pleine échelle en gauss (4, 8, 12 ou 16)
    #[arg(long)]
    pub sensitivity: Option<u8>,

    #[arg(long, value_enum)]
    pub mode: Option<OperatingMode>,

    /// Nombre de mesures
    #[arg(long)]
    pub samples: Option<u32>,

    /// Intervalle entre deux mesures en millisecondes
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Active le capteur de température
    #[arg(long)]
    pub temperature: bool,

    /// Active le "block data update"
    #[arg(long)]
    pub block_data_update: bool,

    /// Après un redémarrage, réapplique la configuration et rejoue l'opération
    #[arg(long)]
    pub hardened: bool,
}

fn parse_address(value: &str) -> Result<u16, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse(),
    };

    match parsed {
        Ok(address) if address <= 0x7F => Ok(address),
        Ok(address) => Err(format!("{:#x} is not a 7-bit address", address)),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal_addresses() {
        assert_eq!(parse_address("0x1C"), Ok(0x1C));
        assert_eq!(parse_address("28"), Ok(28));
        assert!(parse_address("0x80").is_err());
        assert!(parse_address("lis").is_err());
    }

    #[test]
    fn parses_settings() {
        let cli = Cli::parse_from([
            "lis3mdl-pi",
            "--data-rate",
            "80",
            "--xy-performance",
            "ultra-high",
            "--sensitivity",
            "16",
            "--hardened",
        ]);

        assert_eq!(cli.data_rate, Some(DataRate::Hz80));
        assert_eq!(cli.xy_performance, Some(XyPerformance::UltraHigh));
        assert_eq!(cli.sensitivity, Some(16));
        assert!(cli.hardened);
        assert_eq!(cli.samples, None);
    }
}
