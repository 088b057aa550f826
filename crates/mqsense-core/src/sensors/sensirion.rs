//! Word-level helpers over `sensirion-i2c` for the SPS30 and SHT31 drivers
//!
//! Commands are 16-bit big-endian. Every 16-bit data word, in either
//! direction, is followed by a CRC-8 that `sensirion-i2c` computes and checks.

use embedded_hal_async::i2c::I2c;
use sensirion_i2c::i2c::Error as FrameError;
use sensirion_i2c::{crc8, i2c_async};

use super::ReadError;

/// Largest response any driver reads in one transaction, in words.
const MAX_WORDS: usize = 10;

pub(crate) async fn write_command<I: I2c>(
    i2c: &mut I,
    address: u8,
    command: u16,
) -> Result<(), I::Error> {
    i2c_async::write_command_u16(i2c, address, command).await
}

/// Command followed by one CRC-protected argument word.
pub(crate) async fn write_command_with_arg<I: I2c>(
    i2c: &mut I,
    address: u8,
    command: u16,
    argument: u16,
) -> Result<(), I::Error> {
    let [c0, c1] = command.to_be_bytes();
    let [a0, a1] = argument.to_be_bytes();
    i2c.write(address, &[c0, c1, a0, a1, crc8::calculate(&[a0, a1])])
        .await
}

/// Read `words.len()` CRC-protected words from the device.
pub(crate) async fn read_words<I: I2c>(
    i2c: &mut I,
    address: u8,
    words: &mut [u16],
) -> Result<(), ReadError> {
    debug_assert!(words.len() <= MAX_WORDS);
    let count = words.len().min(MAX_WORDS);

    let mut buf = [0u8; MAX_WORDS * 3];
    let buf = &mut buf[..count * 3];
    i2c_async::read_words_with_crc(i2c, address, buf)
        .await
        .map_err(|e| match e {
            FrameError::I2cWrite(bus) | FrameError::I2cRead(bus) => ReadError::from_bus(bus),
            FrameError::Crc => ReadError::Crc,
        })?;

    for (chunk, word) in buf.chunks_exact(3).zip(words.iter_mut()) {
        *word = u16::from_be_bytes([chunk[0], chunk[1]]);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn encode_words(words: &[u16]) -> Vec<u8> {
    words
        .iter()
        .flat_map(|w| {
            let [hi, lo] = w.to_be_bytes();
            [hi, lo, crc8::calculate(&[hi, lo])]
        })
        .collect()
}
