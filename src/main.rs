mod actuators;
mod cli;
mod config;
mod i2c;
mod sensors;

#[cfg(not(any(feature = "real-sensors", feature = "fake-sensors")))]
compile_error!("enable either the `real-sensors` or the `fake-sensors` feature");

use std::thread::sleep;

use anyhow::Context;
use clap::Parser;

use actuators::power::PowerLine;
use cli::Cli;
use config::Config;
use i2c::Bus;
use sensors::mag::{Lis3mdl, MagError};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::from_cli(&cli)?;

    log::info!("[LIS3MDL] Début du test ...");
    log::info!(
        "[LIS3MDL] Adresse {:#04x}, alimentation GPIO {}",
        config.address,
        config.power_pin
    );

    let (bus, power) = open(&config)?;
    run(bus, power, &config)
}

/// Bus I2C et GPIO d'alimentation du Raspberry Pi
#[cfg(feature = "real-sensors")]
fn open(config: &Config) -> anyhow::Result<(rppal::i2c::I2c, actuators::power::PowerSwitch)> {
    let bus = rppal::i2c::I2c::new().context("[I2C] Ouverture du bus impossible")?;
    let power = actuators::power::PowerSwitch::new(config.power_pin)
        .context("[GPIO] Préparation de l'alimentation impossible")?;
    log::debug!("[GPIO] Alimentation active : {}", power.is_powered());

    Ok((bus, power))
}

/// Capteur simulé, mesures aléatoires
#[cfg(all(feature = "fake-sensors", not(feature = "real-sensors")))]
fn open(_config: &Config) -> anyhow::Result<(sensors::mag::fake::SimulatedBus, sensors::mag::fake::SimulatedPower)> {
    let bus = sensors::mag::fake::SimulatedBus::lis3mdl().with_noise();
    let power = bus.power_line();

    Ok((bus, power))
}

/// Les erreurs du bus sont déjà traitées par le capteur : on les signale et on continue
fn tolerate<T>(result: Result<T, MagError>, what: &str) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_bus_fault() => {
            log::warn!("[LIS3MDL] {} : {}", what, e);
            Ok(None)
        }
        Err(e) => Err(e).context(what.to_string()),
    }
}

/// Séquence de test : détection, identité, configuration, statut puis mesures
fn run<B: Bus, P: PowerLine>(bus: B, power: P, config: &Config) -> anyhow::Result<()> {
    let mut mag = Lis3mdl::new(bus, power, config.address, config.settle, config.recovery);

    mag.detect().context("Détection du capteur")?;
    mag.verify_identity().context("Vérification de l'identité")?;

    tolerate(mag.configure(config.settings), "Configuration")?;
    if config.temperature {
        tolerate(mag.set_temperature_sensor(true), "Capteur de température")?;
    }
    if config.block_data_update {
        tolerate(mag.set_block_data_update(true), "Block data update")?;
    }
    tolerate(mag.select_operating_mode(config.mode), "Mode de fonctionnement")?;

    if let Some(active) = tolerate(mag.read_active_sensitivity(), "Lecture de CTRL_REG2")? {
        if active != config.settings.sensitivity {
            log::warn!(
                "[LIS3MDL] Pleine échelle active ±{} G, les mesures sont converties à ±{} G",
                active.gauss(),
                config.settings.sensitivity.gauss()
            );
        }
    }

    if let Some(status) = tolerate(mag.read_status(), "Lecture du statut")? {
        log::info!("[LIS3MDL] Statut : {}", status);
    }

    for index in 0..config.samples {
        if let Some(sample) = tolerate(mag.read_sample(config.settings.sensitivity), "Lecture du champ magnétique")? {
            log::info!("[LIS3MDL] #{} Champ magnétique = {}", index, sample);
            log::debug!(
                "[LIS3MDL] #{} Brut = {:?}, intensité = {:.1} nT",
                index,
                sample.raw(),
                sample.nanotesla().norm()
            );
        }

        if config.temperature {
            if let Some(temp) = tolerate(mag.read_temperature(), "Lecture de la température")? {
                log::info!("[LIS3MDL] #{} Température = {:.1}°C", index, temp);
            }
        }

        if index + 1 < config.samples {
            sleep(config.interval);
        }
    }

    log::info!("[LIS3MDL] Fin du test ({} redémarrage(s)).", mag.power_cycles());
    Ok(())
}
