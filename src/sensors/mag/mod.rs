use std::time::Duration;
use thiserror::Error;

use crate::actuators::power::PowerLine;
use crate::i2c::{Bus, FaultCode, RegisterAccessor};

pub(crate) mod reader;
pub(crate) mod recovery;
pub(crate) mod registry;
pub(crate) mod settings;
pub(crate) mod status;

#[cfg(any(test, feature = "fake-sensors"))]
pub(crate) mod fake;

use reader::MagSample;
use recovery::FaultRecoveryPolicy;
use settings::{OperatingMode, Sensitivity, Settings};
use status::StatusFlags;

#[derive(Error, Debug, PartialEq)]
pub(crate) enum MagError {
    #[error("bus fault {0}")]
    Bus(#[from] FaultCode),
    #[error("device was not detected at {0:#04x}")]
    NotFound(u16),
    #[error("device identity ({found:#04x}) does not match expected ({expected:#04x})")]
    IdentityMismatch { found: u8, expected: u8 },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl MagError {
    /// Vrai pour les erreurs du bus, qui n'interrompent pas une session
    pub(crate) fn is_bus_fault(&self) -> bool {
        matches!(self, MagError::Bus(_))
    }
}

/// Comportement après un redémarrage du capteur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecoveryMode {
    /// L'opération en échec est abandonnée, la configuration est perdue.
    /// Une configuration en cours poursuit avec les registres suivants.
    Drop,
    /// Réapplique la dernière configuration puis rejoue une fois l'opération
    Retry,
}

/// Magnétomètre LIS3MDL sur un bus à adresse fixe
pub(crate) struct Lis3mdl<B, P> {
    accessor: RegisterAccessor<B>,
    recovery: FaultRecoveryPolicy<P>,
    mode: RecoveryMode,
    applied: Applied,
}

/// Ce qui a été programmé avec succès, réappliqué après un redémarrage en mode `Retry`
#[derive(Debug, Clone, Copy, Default)]
struct Applied {
    settings: Option<Settings>,
    operating_mode: Option<OperatingMode>,
    temperature: Option<bool>,
    block_data_update: Option<bool>,
}

impl<B: Bus, P: PowerLine> Lis3mdl<B, P> {
    /// Constructeur
    pub(crate) fn new(bus: B, power: P, address: u16, settle: Duration, mode: RecoveryMode) -> Self {
        Lis3mdl {
            accessor: RegisterAccessor::new(bus, address),
            recovery: FaultRecoveryPolicy::new(power, settle),
            mode,
            applied: Applied::default(),
        }
    }

    pub(crate) fn power_cycles(&self) -> u32 {
        self.recovery.power_cycles()
    }

    /// Exécute une transaction ; en cas d'erreur du bus, applique la politique de redémarrage
    fn guarded<T>(&mut self, op: impl Fn(&mut RegisterAccessor<B>) -> Result<T, FaultCode>) -> Result<T, MagError> {
        let fault = match op(&mut self.accessor) {
            Ok(value) => return Ok(value),
            Err(fault) => fault,
        };

        let rebooted = self.recovery.handle(fault);
        if !rebooted || self.mode == RecoveryMode::Drop {
            return Err(MagError::Bus(fault));
        }

        log::info!("[LIS3MDL] Restauration de la configuration et nouvel essai ...");
        let applied = self.applied;
        let retried = restore(&mut self.accessor, &applied).and_then(|_| op(&mut self.accessor));

        retried.map_err(|fault| {
            self.recovery.handle(fault);
            MagError::Bus(fault)
        })
    }

    /// Vérifie que le capteur répond sur le bus
    pub(crate) fn detect(&mut self) -> Result<(), MagError> {
        let address = self.accessor.address();

        let found = match self.guarded(|accessor| accessor.scan()) {
            Ok(found) => found,
            Err(e) => {
                log::warn!("[LIS3MDL] Scan du bus impossible : {}", e);
                Vec::new()
            }
        };

        if !found.contains(&address) {
            log::error!("[LIS3MDL] Capteur absent à {:#04x}", address);
            return Err(MagError::NotFound(address));
        }

        log::info!("[LIS3MDL] Capteur détecté à {:#04x}", address);
        Ok(())
    }

    /// Compare WHO_AM_I à la valeur attendue
    pub(crate) fn verify_identity(&mut self) -> Result<(), MagError> {
        let found = self.guarded(|accessor| accessor.read_register(registry::WHO_AM_I))?;

        if found != registry::WHO_AM_I_DEFAULT {
            log::error!(
                "[LIS3MDL] Identité ({:#04x}) différente de celle attendue ({:#04x})",
                found,
                registry::WHO_AM_I_DEFAULT
            );
            return Err(MagError::IdentityMismatch { found, expected: registry::WHO_AM_I_DEFAULT });
        }

        log::info!("[LIS3MDL] Identité ({:#04x}) conforme", found);
        Ok(())
    }

    /// Applique performance X/Y et Z, data rate et pleine échelle
    pub(crate) fn configure(&mut self, settings: Settings) -> Result<(), MagError> {
        log::info!("[LIS3MDL] Configuration : {:?}", settings);

        match self.mode {
            RecoveryMode::Retry => self.guarded(|accessor| apply_settings(accessor, &settings))?,
            RecoveryMode::Drop => {
                // Chaque registre est traité à part : un redémarrage n'interrompt pas les suivants
                let mut first = None;
                for (register, mask, bits) in settings_fields(&settings) {
                    if let Err(e) = self.guarded(|accessor| accessor.read_modify_write(register, mask, bits)) {
                        first.get_or_insert(e);
                    }
                }
                if let Some(e) = first {
                    return Err(e);
                }
            }
        }
        self.applied.settings = Some(settings);

        log::info!("[LIS3MDL] Capteur configuré.");
        Ok(())
    }

    /// Défini le mode de fonctionnement
    pub(crate) fn select_operating_mode(&mut self, mode: OperatingMode) -> Result<(), MagError> {
        log::info!("[LIS3MDL] Mode de fonctionnement : {:?}", mode);

        self.guarded(|accessor| apply_operating_mode(accessor, mode))?;
        self.applied.operating_mode = Some(mode);
        Ok(())
    }

    /// Active ou non le capteur de température
    pub(crate) fn set_temperature_sensor(&mut self, enable: bool) -> Result<(), MagError> {
        self.guarded(|accessor| apply_temperature_sensor(accessor, enable))?;
        self.applied.temperature = Some(enable);
        Ok(())
    }

    /// Active ou non le "block data update" (octets haut et bas d'une même mesure)
    pub(crate) fn set_block_data_update(&mut self, enable: bool) -> Result<(), MagError> {
        self.guarded(|accessor| apply_block_data_update(accessor, enable))?;
        self.applied.block_data_update = Some(enable);
        Ok(())
    }

    /// Pleine échelle actuellement programmée dans CTRL_REG2
    pub(crate) fn read_active_sensitivity(&mut self) -> Result<Sensitivity, MagError> {
        let value = self.guarded(|accessor| accessor.read_register(registry::CTRL_REG2))?;
        Ok(Sensitivity::from_register(value))
    }

    /// Lecture du champ magnétique.
    ///
    /// CTRL_REG2 n'est pas relu : `sensitivity` doit être celle passée à `configure`.
    pub(crate) fn read_sample(&mut self, sensitivity: Sensitivity) -> Result<MagSample, MagError> {
        let bytes = self.guarded(|accessor| {
            accessor.read_register_block::<6>(registry::OUT_X_L | registry::AUTO_INCREMENT)
        })?;

        let sample = MagSample::decode(bytes, sensitivity);
        log::debug!("[LIS3MDL] Champ magnétique = {}", sample);
        Ok(sample)
    }

    /// Lecture et décodage du registre de statut
    pub(crate) fn read_status(&mut self) -> Result<StatusFlags, MagError> {
        let value = self.guarded(|accessor| accessor.read_register(registry::STATUS_REG))?;
        Ok(StatusFlags::from(value))
    }

    /// Température interne en °C (capteur de température activé)
    pub(crate) fn read_temperature(&mut self) -> Result<f32, MagError> {
        let [low, high] = self.guarded(|accessor| {
            accessor.read_register_block::<2>(registry::TEMP_OUT_L | registry::AUTO_INCREMENT)
        })?;

        let raw = reader::assemble(low, high);
        Ok(raw as f32 / registry::TEMP_LSB_PER_DEGREE + registry::TEMP_OFFSET)
    }
}

/// Registre, masque et bits de chaque champ de `Settings`, dans l'ordre d'écriture
fn settings_fields(settings: &Settings) -> [(u8, u8, u8); 3] {
    [
        (
            registry::CTRL_REG1,
            registry::CTRL_REG1_CONFIG_MASK,
            settings.xy_performance.bits() | settings.data_rate.bits(),
        ),
        (registry::CTRL_REG2, registry::CTRL_REG2_SENSITIVITY_MASK, settings.sensitivity.bits()),
        (registry::CTRL_REG4, registry::CTRL_REG4_Z_PERF_MASK, settings.z_performance.bits()),
    ]
}

fn apply_settings<B: Bus>(accessor: &mut RegisterAccessor<B>, settings: &Settings) -> Result<(), FaultCode> {
    let [reg1, reg2, reg4] = settings_fields(settings);
    let ctrl_reg1 = accessor.read_modify_write(reg1.0, reg1.1, reg1.2)?;
    let ctrl_reg2 = accessor.read_modify_write(reg2.0, reg2.1, reg2.2)?;
    let ctrl_reg4 = accessor.read_modify_write(reg4.0, reg4.1, reg4.2)?;

    log::debug!(
        "[LIS3MDL] ctrl_reg1 = {:#04x} ctrl_reg2 = {:#04x} ctrl_reg4 = {:#04x}",
        ctrl_reg1,
        ctrl_reg2,
        ctrl_reg4
    );
    Ok(())
}

fn apply_operating_mode<B: Bus>(accessor: &mut RegisterAccessor<B>, mode: OperatingMode) -> Result<(), FaultCode> {
    let ctrl_reg3 = accessor.read_modify_write(registry::CTRL_REG3, registry::CTRL_REG3_MODE_MASK, mode.bits())?;
    log::debug!("[LIS3MDL] ctrl_reg3 = {:#04x}", ctrl_reg3);
    Ok(())
}

fn apply_temperature_sensor<B: Bus>(accessor: &mut RegisterAccessor<B>, enable: bool) -> Result<(), FaultCode> {
    let bits = if enable { registry::CTRL_REG1_TEMP_EN } else { 0 };
    accessor.read_modify_write(registry::CTRL_REG1, registry::CTRL_REG1_TEMP_EN, bits)?;
    Ok(())
}

fn apply_block_data_update<B: Bus>(accessor: &mut RegisterAccessor<B>, enable: bool) -> Result<(), FaultCode> {
    let bits = if enable { registry::CTRL_REG5_BDU } else { 0 };
    accessor.read_modify_write(registry::CTRL_REG5, registry::CTRL_REG5_BDU, bits)?;
    Ok(())
}

/// Réapplique la configuration connue après un redémarrage
fn restore<B: Bus>(accessor: &mut RegisterAccessor<B>, applied: &Applied) -> Result<(), FaultCode> {
    if let Some(settings) = applied.settings {
        apply_settings(accessor, &settings)?;
    }
    if let Some(enable) = applied.temperature {
        apply_temperature_sensor(accessor, enable)?;
    }
    if let Some(enable) = applied.block_data_update {
        apply_block_data_update(accessor, enable)?;
    }
    if let Some(mode) = applied.operating_mode {
        apply_operating_mode(accessor, mode)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::fake::{Operation, SimulatedBus, SimulatedPower};
    use super::settings::{DataRate, XyPerformance, ZPerformance};
    use super::*;

    fn settings() -> Settings {
        Settings {
            xy_performance: XyPerformance::High,
            z_performance: ZPerformance::High,
            data_rate: DataRate::Hz10,
            sensitivity: Sensitivity::Gauss4,
        }
    }

    fn driver(mode: RecoveryMode) -> (Lis3mdl<SimulatedBus, SimulatedPower>, SimulatedBus) {
        let bus = SimulatedBus::lis3mdl();
        let power = bus.power_line();
        let mag = Lis3mdl::new(bus.clone(), power, registry::LIS3MDL_MAG_ADDR, Duration::ZERO, mode);
        (mag, bus)
    }

    #[test]
    fn configure_sets_fields_and_preserves_other_bits() {
        let (mut mag, bus) = driver(RecoveryMode::Drop);
        bus.set_register(registry::CTRL_REG1, 0b1000_0011);
        bus.set_register(registry::CTRL_REG2, 0b1000_1100);
        bus.set_register(registry::CTRL_REG4, 0b0000_0010);

        mag.configure(settings()).unwrap();

        assert_eq!(bus.register(registry::CTRL_REG1), 0b1000_0011 | 0x40 | 0x10);
        assert_eq!(bus.register(registry::CTRL_REG2), 0b1000_1100);
        assert_eq!(bus.register(registry::CTRL_REG4), 0b0000_1010);
        assert_eq!(bus.register(registry::CTRL_REG3), registry::CTRL_REG3_DEFAULT);
    }

    #[test]
    fn configure_is_idempotent() {
        let (mut mag, bus) = driver(RecoveryMode::Drop);
        let ultra = Settings {
            xy_performance: XyPerformance::UltraHigh,
            z_performance: ZPerformance::Medium,
            data_rate: DataRate::Hz80,
            sensitivity: Sensitivity::Gauss12,
        };

        mag.configure(ultra).unwrap();
        let once = [registry::CTRL_REG1, registry::CTRL_REG2, registry::CTRL_REG4].map(|r| bus.register(r));

        mag.configure(ultra).unwrap();
        let twice = [registry::CTRL_REG1, registry::CTRL_REG2, registry::CTRL_REG4].map(|r| bus.register(r));

        assert_eq!(once, twice);
        assert_eq!(mag.read_active_sensitivity().unwrap(), Sensitivity::Gauss12);
    }

    #[test]
    fn configure_never_touches_ctrl_reg3() {
        let (mut mag, bus) = driver(RecoveryMode::Drop);

        mag.configure(settings()).unwrap();

        let touched_reg3 = bus.operations().iter().any(|op| match op {
            Operation::Read { register, .. } => *register == registry::CTRL_REG3,
            Operation::Write { register, .. } => *register == registry::CTRL_REG3,
            Operation::Scan => false,
        });
        assert!(!touched_reg3);
    }

    #[test]
    fn operating_mode_only_changes_mode_field() {
        let (mut mag, bus) = driver(RecoveryMode::Drop);
        bus.set_register(registry::CTRL_REG3, 0b0010_0111);

        mag.select_operating_mode(OperatingMode::Continuous).unwrap();
        assert_eq!(bus.register(registry::CTRL_REG3), 0b0010_0100);

        mag.select_operating_mode(OperatingMode::PowerDown).unwrap();
        assert_eq!(bus.register(registry::CTRL_REG3), 0b0010_0110);
    }

    #[test]
    fn detect_and_identity() {
        let (mut mag, bus) = driver(RecoveryMode::Drop);
        assert_eq!(mag.detect(), Ok(()));
        assert_eq!(mag.verify_identity(), Ok(()));

        bus.set_register(registry::WHO_AM_I, 0x33);
        assert_eq!(
            mag.verify_identity(),
            Err(MagError::IdentityMismatch { found: 0x33, expected: 0x3D })
        );

        bus.set_present(false);
        assert_eq!(mag.detect(), Err(MagError::NotFound(0x1C)));
    }

    #[test]
    fn sample_is_read_in_one_block() {
        let (mut mag, bus) = driver(RecoveryMode::Drop);
        bus.set_sample(6842, -6842, 0);

        let sample = mag.read_sample(Sensitivity::Gauss4).unwrap();

        assert!((sample.x.gauss - 1.0).abs() < 0.001);
        assert!((sample.y.nanotesla + 100_000.0).abs() < 100.0);
        assert_eq!(sample.z.raw, 0);
        assert_eq!(
            bus.operations(),
            vec![Operation::Read { register: registry::OUT_X_L | registry::AUTO_INCREMENT, len: 6 }]
        );
    }

    #[test]
    fn status_and_temperature() {
        let (mut mag, bus) = driver(RecoveryMode::Drop);
        bus.set_register(registry::STATUS_REG, 0x0F);
        bus.set_register(registry::TEMP_OUT_L, 0x50);
        bus.set_register(registry::TEMP_OUT_H, 0x00);

        let status = mag.read_status().unwrap();
        assert!(status.zyxda && status.xda && !status.zyxor);

        mag.set_temperature_sensor(true).unwrap();
        assert_eq!(bus.register(registry::CTRL_REG1), registry::CTRL_REG1_DEFAULT | 0x80);
        assert!((mag.read_temperature().unwrap() - 35.0).abs() < f32::EPSILON);
    }

    #[test]
    fn bus_fault_power_cycles_and_drops_configuration() {
        let (mut mag, bus) = driver(RecoveryMode::Drop);
        mag.configure(settings()).unwrap();

        bus.fail_next(FaultCode::ClockTimeout);
        let result = mag.read_sample(Sensitivity::Gauss4);

        assert_eq!(result, Err(MagError::Bus(FaultCode::ClockTimeout)));
        assert_eq!(bus.power_cycles(), 1);
        assert_eq!(mag.power_cycles(), 1);
        assert_eq!(bus.register(registry::CTRL_REG1), registry::CTRL_REG1_DEFAULT);
    }

    #[test]
    fn fault_on_ctrl_reg1_still_applies_remaining_fields() {
        let (mut mag, bus) = driver(RecoveryMode::Drop);
        let wide = Settings { sensitivity: Sensitivity::Gauss12, ..settings() };
        bus.fail_register(registry::CTRL_REG1, FaultCode::Nack);

        let result = mag.configure(wide);

        assert_eq!(result, Err(MagError::Bus(FaultCode::Nack)));
        assert_eq!(bus.power_cycles(), 1);
        assert_eq!(bus.register(registry::CTRL_REG1), registry::CTRL_REG1_DEFAULT);
        assert_eq!(bus.register(registry::CTRL_REG2), 0x40);
        assert_eq!(bus.register(registry::CTRL_REG4), 0x08);
        assert_eq!(mag.read_active_sensitivity(), Ok(Sensitivity::Gauss12));
    }

    #[test]
    fn configure_reports_first_of_several_faults() {
        let (mut mag, bus) = driver(RecoveryMode::Drop);
        bus.fail_register(registry::CTRL_REG2, FaultCode::BusLockup);
        bus.fail_register(registry::CTRL_REG4, FaultCode::Nack);

        let result = mag.configure(settings());

        assert_eq!(result, Err(MagError::Bus(FaultCode::BusLockup)));
        assert_eq!(bus.power_cycles(), 2);
        assert_eq!(bus.register(registry::CTRL_REG1), registry::CTRL_REG1_DEFAULT);
        assert_eq!(bus.register(registry::CTRL_REG4), 0x00);
    }

    #[test]
    fn unrecognized_fault_does_not_power_cycle() {
        let (mut mag, bus) = driver(RecoveryMode::Retry);

        bus.fail_next(FaultCode::Unrecognized(Some(2)));
        let result = mag.read_status();

        assert!(result.as_ref().is_err_and(MagError::is_bus_fault));
        assert_eq!(bus.power_cycles(), 0);
    }

    #[test]
    fn retry_mode_restores_configuration_and_retries_once() {
        let (mut mag, bus) = driver(RecoveryMode::Retry);
        mag.configure(settings()).unwrap();
        mag.select_operating_mode(OperatingMode::Continuous).unwrap();
        let configured = bus.register(registry::CTRL_REG1);
        bus.set_sample(100, 200, 300);

        bus.fail_next(FaultCode::DeviceHung);
        let result = mag.read_sample(Sensitivity::Gauss4);

        // Le redémarrage remet les sorties à zéro
        assert_eq!(result.map(|sample| sample.raw()), Ok(nalgebra::Vector3::new(0, 0, 0)));
        assert_eq!(bus.power_cycles(), 1);
        assert_eq!(bus.register(registry::CTRL_REG1), configured);
        assert_eq!(bus.register(registry::CTRL_REG3), 0x00);
    }

    #[test]
    fn retry_mode_restores_temperature_and_block_data_update() {
        let (mut mag, bus) = driver(RecoveryMode::Retry);
        mag.configure(settings()).unwrap();
        mag.set_temperature_sensor(true).unwrap();
        mag.set_block_data_update(true).unwrap();
        mag.select_operating_mode(OperatingMode::Continuous).unwrap();

        bus.fail_next(FaultCode::DeviceHung);
        let result = mag.read_temperature();

        assert!(result.is_ok());
        assert_eq!(bus.power_cycles(), 1);
        assert_eq!(bus.register(registry::CTRL_REG1), 0x50 | registry::CTRL_REG1_TEMP_EN);
        assert_eq!(bus.register(registry::CTRL_REG5) & registry::CTRL_REG5_BDU, registry::CTRL_REG5_BDU);
        assert_eq!(bus.register(registry::CTRL_REG3), 0x00);
    }

    #[test]
    fn retry_gives_up_after_second_fault() {
        let (mut mag, bus) = driver(RecoveryMode::Retry);

        bus.fail_next(FaultCode::Nack);
        bus.fail_next(FaultCode::BusLockup);
        let result = mag.read_status();

        assert_eq!(result, Err(MagError::Bus(FaultCode::BusLockup)));
        assert_eq!(bus.power_cycles(), 2);
    }
}
