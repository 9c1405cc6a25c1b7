//! LIS3MDL simulé : banc de registres en mémoire, injection d'erreurs et
//! journal des opérations. Sert aux tests et à la feature `fake-sensors`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::registry;
use crate::actuators::power::PowerLine;
use crate::i2c::{Bus, FaultCode};

const REGISTER_SPACE: usize = 0x40;

#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Operation {
    Scan,
    Read { register: u8, len: usize },
    Write { register: u8, value: u8 },
}

struct State {
    address: u16,
    present: bool,
    powered: bool,
    registers: [u8; REGISTER_SPACE],
    faults: VecDeque<FaultCode>,
    targeted: Vec<(u8, FaultCode)>,
    #[cfg(test)]
    operations: Vec<Operation>,
    #[cfg(test)]
    power_cycles: u32,
    #[cfg(feature = "fake-sensors")]
    noise: bool,
}

impl State {
    fn reset(&mut self) {
        self.registers = [0; REGISTER_SPACE];
        for (register, value) in registry::POWER_ON_DEFAULTS {
            self.registers[register as usize] = value;
        }
    }

    fn take_fault(&mut self, register: Option<u8>) -> Result<(), FaultCode> {
        let targeted = register.and_then(|register| {
            let register = register & !registry::AUTO_INCREMENT;
            let index = self.targeted.iter().position(|(target, _)| *target == register)?;
            Some(self.targeted.remove(index).1)
        });
        if let Some(fault) = targeted {
            return Err(fault);
        }

        match self.faults.pop_front() {
            Some(fault) => Err(fault),
            None if !self.powered => Err(FaultCode::Nack),
            None => Ok(()),
        }
    }

    #[cfg(feature = "fake-sensors")]
    fn before_read(&mut self, start: usize) {
        if self.noise && start == registry::OUT_X_L as usize {
            self.refresh_outputs();
        }
    }

    #[cfg(not(feature = "fake-sensors"))]
    fn before_read(&mut self, _start: usize) {}

    #[cfg(feature = "fake-sensors")]
    fn refresh_outputs(&mut self) {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        for axis in 0..3 {
            let value: i16 = rng.gen_range(-3000..3000);
            let [low, high] = value.to_le_bytes();
            self.registers[registry::OUT_X_L as usize + axis * 2] = low;
            self.registers[registry::OUT_X_L as usize + axis * 2 + 1] = high;
        }
        self.registers[registry::STATUS_REG as usize] = 0x0F;
    }
}

/// Bus partagé : les clones observent le même capteur
#[derive(Clone)]
pub(crate) struct SimulatedBus {
    state: Rc<RefCell<State>>,
}

impl SimulatedBus {
    /// Capteur présent à son adresse par défaut, registres à leurs valeurs de mise sous tension
    pub(crate) fn lis3mdl() -> Self {
        let mut state = State {
            address: registry::LIS3MDL_MAG_ADDR,
            present: true,
            powered: true,
            registers: [0; REGISTER_SPACE],
            faults: VecDeque::new(),
            targeted: Vec::new(),
            #[cfg(test)]
            operations: Vec::new(),
            #[cfg(test)]
            power_cycles: 0,
            #[cfg(feature = "fake-sensors")]
            noise: false,
        };
        state.reset();

        SimulatedBus { state: Rc::new(RefCell::new(state)) }
    }

    /// Génère des mesures aléatoires à chaque lecture des sorties
    #[cfg(feature = "fake-sensors")]
    pub(crate) fn with_noise(self) -> Self {
        self.state.borrow_mut().noise = true;
        self
    }

    #[cfg(test)]
    pub(crate) fn set_present(&self, present: bool) {
        self.state.borrow_mut().present = present;
    }

    #[cfg(test)]
    pub(crate) fn set_register(&self, register: u8, value: u8) {
        self.state.borrow_mut().registers[register as usize] = value;
    }

    #[cfg(test)]
    pub(crate) fn register(&self, register: u8) -> u8 {
        self.state.borrow().registers[register as usize]
    }

    #[cfg(test)]
    pub(crate) fn set_sample(&self, x: i16, y: i16, z: i16) {
        for (offset, value) in [x, y, z].into_iter().enumerate() {
            let [low, high] = value.to_le_bytes();
            self.set_register(registry::OUT_X_L + offset as u8 * 2, low);
            self.set_register(registry::OUT_X_L + offset as u8 * 2 + 1, high);
        }
    }

    /// La prochaine transaction échoue avec cette erreur
    #[cfg(test)]
    pub(crate) fn fail_next(&self, fault: FaultCode) {
        self.state.borrow_mut().faults.push_back(fault);
    }

    /// Le prochain accès à ce registre échoue avec cette erreur
    #[cfg(test)]
    pub(crate) fn fail_register(&self, register: u8, fault: FaultCode) {
        self.state.borrow_mut().targeted.push((register, fault));
    }

    #[cfg(test)]
    pub(crate) fn operations(&self) -> Vec<Operation> {
        self.state.borrow().operations.clone()
    }

    #[cfg(test)]
    pub(crate) fn power_cycles(&self) -> u32 {
        self.state.borrow().power_cycles
    }

    /// Ligne d'alimentation reliée à ce capteur
    pub(crate) fn power_line(&self) -> SimulatedPower {
        SimulatedPower { state: self.state.clone() }
    }
}

impl Bus for SimulatedBus {
    fn read_from(&mut self, device: u16, register: u8, buffer: &mut [u8]) -> Result<(), FaultCode> {
        let mut state = self.state.borrow_mut();
        #[cfg(test)]
        state.operations.push(Operation::Read { register, len: buffer.len() });
        state.take_fault(Some(register))?;

        if !state.present || device != state.address {
            return Err(FaultCode::Nack);
        }

        let start = (register & !registry::AUTO_INCREMENT) as usize;

        state.before_read(start);

        for (offset, byte) in buffer.iter_mut().enumerate() {
            *byte = state.registers[(start + offset) % REGISTER_SPACE];
        }

        Ok(())
    }

    fn write_to(&mut self, device: u16, register: u8, data: &[u8]) -> Result<(), FaultCode> {
        let mut state = self.state.borrow_mut();
        #[cfg(test)]
        for (offset, value) in data.iter().enumerate() {
            state.operations.push(Operation::Write { register: register + offset as u8, value: *value });
        }
        state.take_fault(Some(register))?;

        if !state.present || device != state.address {
            return Err(FaultCode::Nack);
        }

        let start = (register & !registry::AUTO_INCREMENT) as usize;
        for (offset, value) in data.iter().enumerate() {
            state.registers[(start + offset) % REGISTER_SPACE] = *value;
        }

        Ok(())
    }

    fn scan(&mut self) -> Result<Vec<u16>, FaultCode> {
        let mut state = self.state.borrow_mut();
        #[cfg(test)]
        state.operations.push(Operation::Scan);
        state.take_fault(None)?;

        if state.present && state.powered {
            Ok(vec![state.address])
        } else {
            Ok(Vec::new())
        }
    }
}

/// Alimentation simulée : un redémarrage remet les registres à leurs valeurs par défaut
pub(crate) struct SimulatedPower {
    state: Rc<RefCell<State>>,
}

impl PowerLine for SimulatedPower {
    fn assert_power(&mut self) {
        let mut state = self.state.borrow_mut();
        if !state.powered {
            state.reset();
            #[cfg(test)]
            {
                state.power_cycles += 1;
            }
        }
        state.powered = true;
    }

    fn deassert_power(&mut self) {
        self.state.borrow_mut().powered = false;
    }
}
