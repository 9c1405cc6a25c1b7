#![allow(unused)]

// LIS3MDL (datasheet DocID024204, page 17 et 23-30)
pub const LIS3MDL_MAG_ADDR: u16 = 0x1C;

// Adresses des registres
pub const WHO_AM_I: u8 = 0x0F;
pub const CTRL_REG1: u8 = 0x20; // Temp, performance X/Y, data rate, self-test
pub const CTRL_REG2: u8 = 0x21; // Sensibilité, reboot, soft reset
pub const CTRL_REG3: u8 = 0x22; // Low power, SPI, mode de fonctionnement
pub const CTRL_REG4: u8 = 0x23; // Performance Z, endianness
pub const CTRL_REG5: u8 = 0x24; // Fast read, block data update
pub const STATUS_REG: u8 = 0x27;
pub const OUT_X_L: u8 = 0x28;
pub const OUT_X_H: u8 = 0x29;
pub const OUT_Y_L: u8 = 0x2A;
pub const OUT_Y_H: u8 = 0x2B;
pub const OUT_Z_L: u8 = 0x2C;
pub const OUT_Z_H: u8 = 0x2D;
pub const TEMP_OUT_L: u8 = 0x2E;
pub const TEMP_OUT_H: u8 = 0x2F;
pub const INT_CFG: u8 = 0x30;
pub const INT_SRC: u8 = 0x31;
pub const INT_THS_L: u8 = 0x32;
pub const INT_THS_H: u8 = 0x33;

/// Bit 7 de la sous-adresse : incrément automatique pour les lectures multiples
pub const AUTO_INCREMENT: u8 = 0x80;

// Valeurs par défaut à la mise sous tension
pub const WHO_AM_I_DEFAULT: u8 = 0x3D;
pub const CTRL_REG1_DEFAULT: u8 = 0x10;
pub const CTRL_REG2_DEFAULT: u8 = 0x00;
pub const CTRL_REG3_DEFAULT: u8 = 0x03;
pub const CTRL_REG4_DEFAULT: u8 = 0x00;
pub const CTRL_REG5_DEFAULT: u8 = 0x00;
pub const INT_CFG_DEFAULT: u8 = 0xE8;
pub const INT_SRC_DEFAULT: u8 = 0x00;
pub const INT_THS_L_DEFAULT: u8 = 0x00;
pub const INT_THS_H_DEFAULT: u8 = 0x00;

// Masques des champs
pub const CTRL_REG1_TEMP_EN: u8 = 0x80;
pub const CTRL_REG1_XY_PERF_MASK: u8 = 0x60;
pub const CTRL_REG1_DATA_RATE_MASK: u8 = 0x1C;
pub const CTRL_REG1_CONFIG_MASK: u8 = CTRL_REG1_XY_PERF_MASK | CTRL_REG1_DATA_RATE_MASK;
pub const CTRL_REG2_SENSITIVITY_MASK: u8 = 0x60;
pub const CTRL_REG3_MODE_MASK: u8 = 0x03;
pub const CTRL_REG4_Z_PERF_MASK: u8 = 0x0C;
pub const CTRL_REG5_BDU: u8 = 0x40;

pub const XY_PERF_SHIFT: u8 = 5;
pub const Z_PERF_SHIFT: u8 = 2;
pub const DATA_RATE_SHIFT: u8 = 2;
pub const SENSITIVITY_SHIFT: u8 = 5;

// Bits du registre de statut
pub const STATUS_ZYXOR_BIT: u8 = 7;
pub const STATUS_ZOR_BIT: u8 = 6;
pub const STATUS_YOR_BIT: u8 = 5;
pub const STATUS_XOR_BIT: u8 = 4;
pub const STATUS_ZYXDA_BIT: u8 = 3;
pub const STATUS_ZDA_BIT: u8 = 2;
pub const STATUS_YDA_BIT: u8 = 1;
pub const STATUS_XDA_BIT: u8 = 0;

// Température : 8 LSB/°C, 0 LSB = 25°C
pub const TEMP_LSB_PER_DEGREE: f32 = 8.0;
pub const TEMP_OFFSET: f32 = 25.0;

/// Valeurs des registres après un power-on-reset
pub const POWER_ON_DEFAULTS: [(u8, u8); 10] = [
    (WHO_AM_I, WHO_AM_I_DEFAULT),
    (CTRL_REG1, CTRL_REG1_DEFAULT),
    (CTRL_REG2, CTRL_REG2_DEFAULT),
    (CTRL_REG3, CTRL_REG3_DEFAULT),
    (CTRL_REG4, CTRL_REG4_DEFAULT),
    (CTRL_REG5, CTRL_REG5_DEFAULT),
    (INT_CFG, INT_CFG_DEFAULT),
    (INT_SRC, INT_SRC_DEFAULT),
    (INT_THS_L, INT_THS_L_DEFAULT),
    (INT_THS_H, INT_THS_H_DEFAULT),
];
