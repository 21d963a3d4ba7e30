//! Write-single-coil frames understood by the manifold relay boards.
//!
//! `[address, function, index_hi, index_lo, value_hi, value_lo, crc_lo, crc_hi]`

const SLAVE_ADDRESS: u8 = 0x01;
const WRITE_SINGLE_COIL: u8 = 0x05;
const COIL_ON: [u8; 2] = [0xFF, 0x00];
const COIL_OFF: [u8; 2] = [0x00, 0x00];

const CRC_POLYNOMIAL: u16 = 0xA001;
const CRC_INIT: u16 = 0xFFFF;

pub const FRAME_LEN: usize = 8;

static CRC_TABLE: [u16; 256] = crc_table();

const fn crc_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut index = 0;
    while index < 256 {
        let mut value = index as u16;
        let mut bit = 0;
        while bit < 8 {
            value = if value & 0x0001 != 0 {
                (value >> 1) ^ CRC_POLYNOMIAL
            } else {
                value >> 1
            };
            bit += 1;
        }
        table[index] = value;
        index += 1;
    }
    table
}

/// Reflected CRC-16 (poly 0xA001, init 0xFFFF)
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(CRC_INIT, |crc, byte| {
        (crc >> 8) ^ CRC_TABLE[usize::from((crc ^ u16::from(*byte)) as u8)]
    })
}

/// Builds the full request for switching coil `index`; the CRC is appended little-endian.
pub fn coil_command(index: u16, on: bool) -> [u8; FRAME_LEN] {
    let [index_hi, index_lo] = index.to_be_bytes();
    let [value_hi, value_lo] = if on { COIL_ON } else { COIL_OFF };

    let mut frame = [
        SLAVE_ADDRESS,
        WRITE_SINGLE_COIL,
        index_hi,
        index_lo,
        value_hi,
        value_lo,
        0,
        0,
    ];
    let [crc_lo, crc_hi] = crc16(&frame[..6]).to_le_bytes();
    frame[6] = crc_lo;
    frame[7] = crc_hi;
    frame
}
