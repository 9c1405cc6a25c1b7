#[cfg(feature = "real-sensors")]
use rppal::gpio::{Gpio, OutputPin};

/// Ligne d'alimentation du capteur
pub(crate) trait PowerLine {
    fn assert_power(&mut self);
    fn deassert_power(&mut self);
}

/// Alimentation pilotée par une sortie GPIO
#[cfg(feature = "real-sensors")]
pub(crate) struct PowerSwitch {
    pin: OutputPin,
}

#[cfg(feature = "real-sensors")]
impl PowerSwitch {
    pub fn new(pin: u8) -> anyhow::Result<PowerSwitch> {
        let gpio = Gpio::new()?;
        let mut pin = gpio.get(pin)?.into_output();

        // Le capteur reste alimenté à l'arrêt du programme
        pin.set_reset_on_drop(false);
        pin.set_high();

        Ok(PowerSwitch { pin })
    }

    pub fn is_powered(&self) -> bool {
        self.pin.is_set_high()
    }
}

#[cfg(feature = "real-sensors")]
impl PowerLine for PowerSwitch {
    fn assert_power(&mut self) {
        self.pin.set_high();
    }

    fn deassert_power(&mut self) {
        self.pin.set_low();
    }
}
