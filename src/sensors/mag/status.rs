use std::fmt;

use super::registry;

/// Champs du registre STATUS_REG
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct StatusFlags {
    /// X, Y, Z : données écrasées ?
    pub zyxor: bool,
    pub zor: bool,
    pub yor: bool,
    pub xor: bool,
    /// X, Y, Z : nouvelles données disponibles ?
    pub zyxda: bool,
    pub zda: bool,
    pub yda: bool,
    pub xda: bool,
}

fn bit(value: u8, bit: u8) -> bool {
    value & (1 << bit) != 0
}

impl From<u8> for StatusFlags {
    fn from(value: u8) -> Self {
        StatusFlags {
            zyxor: bit(value, registry::STATUS_ZYXOR_BIT),
            zor: bit(value, registry::STATUS_ZOR_BIT),
            yor: bit(value, registry::STATUS_YOR_BIT),
            xor: bit(value, registry::STATUS_XOR_BIT),
            zyxda: bit(value, registry::STATUS_ZYXDA_BIT),
            zda: bit(value, registry::STATUS_ZDA_BIT),
            yda: bit(value, registry::STATUS_YDA_BIT),
            xda: bit(value, registry::STATUS_XDA_BIT),
        }
    }
}

impl fmt::Display for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "zyxor={} zor={} yor={} xor={} zyxda={} zda={} yda={} xda={}",
            self.zyxor as u8,
            self.zor as u8,
            self.yor as u8,
            self.xor as u8,
            self.zyxda as u8,
            self.zda as u8,
            self.yda as u8,
            self.xda as u8
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrun_and_x_ready() {
        let flags = StatusFlags::from(0b1000_0001);

        assert_eq!(
            flags,
            StatusFlags { zyxor: true, xda: true, ..StatusFlags::default() }
        );
    }

    #[test]
    fn empty_status() {
        assert_eq!(StatusFlags::from(0x00), StatusFlags::default());
    }

    #[test]
    fn every_bit_maps_to_one_flag() {
        for shift in 0..8 {
            let flags = StatusFlags::from(1u8 << shift);
            let set = [
                flags.xda, flags.yda, flags.zda, flags.zyxda, flags.xor, flags.yor, flags.zor, flags.zyxor,
            ];

            for (index, value) in set.iter().enumerate() {
                assert_eq!(*value, index == shift, "bit {} flag {}", shift, index);
            }
        }
    }
}
