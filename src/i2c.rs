#[cfg(feature = "real-sensors")]
use rppal::i2c::I2c;
use thiserror::Error;

/// Plage d'adresses sondée par le scan (adresses 7 bits non réservées)
#[cfg(feature = "real-sensors")]
pub(crate) const SCAN_FIRST: u16 = 0x08;
#[cfg(feature = "real-sensors")]
pub(crate) const SCAN_LAST: u16 = 0x77;

/// Erreurs du bus I2C pouvant être rattrapées par un redémarrage du capteur
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FaultCode {
    #[error("ENACK")]
    Nack,
    #[error("EBADXFR")]
    BadTransfer,
    #[error("EBADREGADDR")]
    BadRegisterAddress,
    #[error("ECLKTIMEOUT")]
    ClockTimeout,
    #[error("ENACKRST")]
    NackReset,
    #[error("EBUSLOCKUP")]
    BusLockup,
    #[error("EBUSUNKERR")]
    BusUnknownError,
    #[error("EFAILSTCOND")]
    FailedStartCondition,
    #[error("EDEVICEHUNG")]
    DeviceHung,
    #[error("unrecognized bus error ({0:?})")]
    Unrecognized(Option<i32>),
}

// Codes errno renvoyés par le driver i2c-dev de Linux
#[cfg(any(test, feature = "real-sensors"))]
mod errno {
    pub const EIO: i32 = 5;
    pub const ENXIO: i32 = 6;
    pub const EAGAIN: i32 = 11;
    pub const EBUSY: i32 = 16;
    pub const ENODEV: i32 = 19;
    pub const EINVAL: i32 = 22;
    pub const EPROTO: i32 = 71;
    pub const EMSGSIZE: i32 = 90;
    pub const EOPNOTSUPP: i32 = 95;
    pub const ETIMEDOUT: i32 = 110;
    pub const EREMOTEIO: i32 = 121;
}

#[cfg(any(test, feature = "real-sensors"))]
impl FaultCode {
    /// Traduit un errno Linux en erreur de bus
    pub(crate) fn from_os_error(code: Option<i32>) -> Self {
        match code {
            Some(errno::ENXIO) | Some(errno::EREMOTEIO) => FaultCode::Nack,
            Some(errno::EMSGSIZE) | Some(errno::EOPNOTSUPP) => FaultCode::BadTransfer,
            Some(errno::EINVAL) => FaultCode::BadRegisterAddress,
            Some(errno::ETIMEDOUT) => FaultCode::ClockTimeout,
            Some(errno::ENODEV) => FaultCode::NackReset,
            Some(errno::EAGAIN) => FaultCode::BusLockup,
            Some(errno::EIO) => FaultCode::BusUnknownError,
            Some(errno::EPROTO) => FaultCode::FailedStartCondition,
            Some(errno::EBUSY) => FaultCode::DeviceHung,
            other => FaultCode::Unrecognized(other),
        }
    }
}

#[cfg(feature = "real-sensors")]
impl From<rppal::i2c::Error> for FaultCode {
    fn from(error: rppal::i2c::Error) -> Self {
        match error {
            rppal::i2c::Error::Io(e) => FaultCode::from_os_error(e.raw_os_error()),
            _ => FaultCode::Unrecognized(None),
        }
    }
}

/// Transport octet par octet vers un périphérique du bus
pub(crate) trait Bus {
    fn read_from(&mut self, device: u16, register: u8, buffer: &mut [u8]) -> Result<(), FaultCode>;
    fn write_to(&mut self, device: u16, register: u8, data: &[u8]) -> Result<(), FaultCode>;
    fn scan(&mut self) -> Result<Vec<u16>, FaultCode>;
}

#[cfg(feature = "real-sensors")]
impl Bus for I2c {
    fn read_from(&mut self, device: u16, register: u8, buffer: &mut [u8]) -> Result<(), FaultCode> {
        self.set_slave_address(device)?;
        self.block_read(register, buffer)?;
        Ok(())
    }

    fn write_to(&mut self, device: u16, register: u8, data: &[u8]) -> Result<(), FaultCode> {
        self.set_slave_address(device)?;
        self.block_write(register, data)?;
        Ok(())
    }

    /// Sonde chaque adresse avec une lecture d'un octet, un ACK signifie présence
    fn scan(&mut self) -> Result<Vec<u16>, FaultCode> {
        let mut found = Vec::new();

        for address in SCAN_FIRST..=SCAN_LAST {
            self.set_slave_address(address)?;

            let mut probe = [0u8; 1];
            if self.read(&mut probe).is_ok() {
                found.push(address);
            }
        }

        Ok(found)
    }
}

/// Calcule la valeur d'un registre après écriture masquée
pub(crate) fn masked(current: u8, mask: u8, bits: u8) -> u8 {
    (current & !mask) | (bits & mask)
}

/// Accès aux registres d'un périphérique unique à adresse fixe
pub(crate) struct RegisterAccessor<B> {
    bus: B,
    address: u16,
}

impl<B: Bus> RegisterAccessor<B> {
    pub(crate) fn new(bus: B, address: u16) -> Self {
        Self { bus, address }
    }

    pub(crate) fn address(&self) -> u16 {
        self.address
    }

    /// Lecture d'un octet
    pub(crate) fn read_register(&mut self, register: u8) -> Result<u8, FaultCode> {
        let [value] = self.read_register_block::<1>(register)?;
        Ok(value)
    }

    /// Lecture de N octets consécutifs à partir d'un registre
    pub(crate) fn read_register_block<const N: usize>(&mut self, register: u8) -> Result<[u8; N], FaultCode> {
        const { assert!(N > 0, "block read needs at least one byte") };

        let mut buffer = [0u8; N];
        self.bus.read_from(self.address, register, &mut buffer)?;
        Ok(buffer)
    }

    /// Ecrit un octet complet, sans masque
    pub(crate) fn write_register(&mut self, register: u8, value: u8) -> Result<(), FaultCode> {
        self.bus.write_to(self.address, register, &[value])
    }

    /// Ecrit les bits du masque en conservant tous les autres, retourne la valeur écrite
    pub(crate) fn read_modify_write(&mut self, register: u8, mask: u8, bits: u8) -> Result<u8, FaultCode> {
        let current = self.read_register(register)?;
        let value = masked(current, mask, bits);

        log::debug!("[I2C] {:#04x}: {:08b} -> {:08b} (mask {:08b})", register, current, value, mask);

        self.write_register(register, value)?;
        Ok(value)
    }

    pub(crate) fn scan(&mut self) -> Result<Vec<u16>, FaultCode> {
        self.bus.scan()
    }
}
