use std::thread::sleep;
use std::time::Duration;

use crate::actuators::power::PowerLine;
use crate::i2c::FaultCode;

/// Délai entre la coupure et le retour de l'alimentation
pub(crate) const DEFAULT_SETTLE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecoveryState {
    Normal,
    Recovering,
}

/// Réaction aux erreurs du bus : redémarrage du capteur par coupure d'alimentation.
///
/// La politique ne rejoue jamais l'opération en échec et ne restaure pas la
/// configuration : après un redémarrage, les registres sont revenus à leurs
/// valeurs de mise sous tension.
pub(crate) struct FaultRecoveryPolicy<P> {
    power: P,
    settle: Duration,
    state: RecoveryState,
    power_cycles: u32,
}

impl<P: PowerLine> FaultRecoveryPolicy<P> {
    pub(crate) fn new(power: P, settle: Duration) -> Self {
        FaultRecoveryPolicy {
            power,
            settle,
            state: RecoveryState::Normal,
            power_cycles: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> RecoveryState {
        self.state
    }

    pub(crate) fn power_cycles(&self) -> u32 {
        self.power_cycles
    }

    /// Traite une erreur du bus, retourne vrai si le capteur a été redémarré
    pub(crate) fn handle(&mut self, fault: FaultCode) -> bool {
        match fault {
            FaultCode::Nack
            | FaultCode::BadTransfer
            | FaultCode::BadRegisterAddress
            | FaultCode::ClockTimeout
            | FaultCode::NackReset
            | FaultCode::BusLockup
            | FaultCode::BusUnknownError
            | FaultCode::FailedStartCondition
            | FaultCode::DeviceHung => {
                log::warn!("[LIS3MDL] Erreur I2C : {}", fault);
                self.state = RecoveryState::Recovering;
                self.power_cycle();
                self.state = RecoveryState::Normal;
                true
            }
            FaultCode::Unrecognized(_) => {
                log::debug!("[LIS3MDL] Erreur I2C ignorée : {}", fault);
                false
            }
        }
    }

    /// Coupe puis rétablit l'alimentation du capteur
    fn power_cycle(&mut self) {
        log::info!("[LIS3MDL] Redémarrage du capteur ({:?}) ...", self.state);

        self.power.deassert_power();
        sleep(self.settle);
        self.power.assert_power();
        self.power_cycles += 1;

        log::info!("[LIS3MDL] Redémarrage terminé.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingPower {
        deasserted: u32,
        asserted: u32,
    }

    impl PowerLine for CountingPower {
        fn assert_power(&mut self) {
            self.asserted += 1;
        }

        fn deassert_power(&mut self) {
            self.deasserted += 1;
        }
    }

    const NAMED: [FaultCode; 9] = [
        FaultCode::Nack,
        FaultCode::BadTransfer,
        FaultCode::BadRegisterAddress,
        FaultCode::ClockTimeout,
        FaultCode::NackReset,
        FaultCode::BusLockup,
        FaultCode::BusUnknownError,
        FaultCode::FailedStartCondition,
        FaultCode::DeviceHung,
    ];

    #[test]
    fn each_named_fault_power_cycles_once() {
        for fault in NAMED {
            let mut policy = FaultRecoveryPolicy::new(CountingPower::default(), Duration::ZERO);

            assert!(policy.handle(fault));
            assert_eq!(policy.power_cycles(), 1, "{}", fault);
            assert_eq!(policy.power.deasserted, 1);
            assert_eq!(policy.power.asserted, 1);
            assert_eq!(policy.state(), RecoveryState::Normal);
        }
    }

    #[test]
    fn unrecognized_fault_is_dropped() {
        let mut policy = FaultRecoveryPolicy::new(CountingPower::default(), Duration::ZERO);

        assert!(!policy.handle(FaultCode::Unrecognized(Some(2))));
        assert!(!policy.handle(FaultCode::Unrecognized(None)));
        assert_eq!(policy.power_cycles(), 0);
        assert_eq!(policy.power.deasserted, 0);
        assert_eq!(policy.state(), RecoveryState::Normal);
    }
}
