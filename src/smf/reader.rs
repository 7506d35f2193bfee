use crate::error::{PlayerError, Result};

const MAX_RELATIVE_TIME_BYTES: usize = 4;
const MAX_VARIABLE_LENGTH_BYTES: usize = 8;

/// Forward-only cursor over the raw bytes of a MIDI file.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = self.peek_u8().ok_or(PlayerError::UnexpectedEof(self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(PlayerError::UnexpectedEof(self.data.len()));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Consumes a 4-byte chunk tag, failing with `BadMagic(name)` on mismatch.
    pub fn expect_magic(&mut self, magic: &[u8; 4], name: &'static str) -> Result<()> {
        match self.read_bytes(4) {
            Ok(bytes) if bytes == magic => Ok(()),
            _ => Err(PlayerError::BadMagic(name)),
        }
    }

    /// Raw bytes of a variable-length quantity, continuation bits included.
    pub fn read_variable_length_array(&mut self) -> Result<&'a [u8]> {
        let start = self.pos;
        while self.read_u8()? & 0x80 != 0 {}
        Ok(&self.data[start..self.pos])
    }

    pub fn read_variable_length(&mut self) -> Result<u64> {
        let offset = self.pos;
        let array = self.read_variable_length_array()?;
        variable_length_value(array).ok_or(PlayerError::VariableLengthTooLong {
            offset,
            len: array.len(),
        })
    }

    /// Event delta time: a variable-length quantity of at most 4 bytes.
    pub fn read_relative_time(&mut self) -> Result<u32> {
        let offset = self.pos;
        let array = self.read_variable_length_array()?;
        if array.len() > MAX_RELATIVE_TIME_BYTES {
            return Err(PlayerError::RelativeTimeTooLong {
                offset,
                len: array.len(),
            });
        }
        // 4 bytes carry 28 bits at most
        Ok(variable_length_value(array).unwrap_or_default() as u32)
    }
}

/// Decodes a base-128 big-endian quantity. `None` when it spans more than 8 bytes.
pub fn variable_length_value(array: &[u8]) -> Option<u64> {
    if array.len() > MAX_VARIABLE_LENGTH_BYTES {
        return None;
    }
    Some(
        array
            .iter()
            .fold(0u64, |acc, byte| (acc << 7) | u64::from(byte & 0x7F)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_length_values() {
        assert_eq!(variable_length_value(&[0x00]), Some(0));
        assert_eq!(variable_length_value(&[0x7F]), Some(127));
        assert_eq!(variable_length_value(&[0x81, 0x00]), Some(128));
        assert_eq!(variable_length_value(&[0xFF, 0xFF, 0xFF, 0x7F]), Some(0x0FFF_FFFF));
        assert_eq!(variable_length_value(&[0x80; 9]), None);
    }

    #[test]
    fn test_relative_time_limited_to_four_bytes() {
        let mut reader = ByteReader::new(&[0x81, 0x00]);
        assert_eq!(reader.read_relative_time().unwrap(), 128);
        assert_eq!(reader.remaining(), 0);

        let bytes = [0x81, 0x81, 0x81, 0x81, 0x01];
        let mut reader = ByteReader::new(&bytes);
        assert!(matches!(
            reader.read_relative_time(),
            Err(PlayerError::RelativeTimeTooLong { offset: 0, len: 5 })
        ));

        // the same five bytes are fine as a generic length
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_variable_length().unwrap(), 0x1020_4081);
    }

    #[test]
    fn test_generic_length_limited_to_eight_bytes() {
        let mut bytes = vec![0x81; 8];
        bytes.push(0x00);
        let mut reader = ByteReader::new(&bytes);
        assert!(matches!(
            reader.read_variable_length(),
            Err(PlayerError::VariableLengthTooLong { len: 9, .. })
        ));
    }

    #[test]
    fn test_truncated_quantity() {
        let mut reader = ByteReader::new(&[0x81, 0x82]);
        assert!(matches!(
            reader.read_variable_length(),
            Err(PlayerError::UnexpectedEof(2))
        ));
    }

    #[test]
    fn test_big_endian_and_magic() {
        let mut reader = ByteReader::new(b"MThd\x00\x00\x00\x06\x01\x02");
        reader.expect_magic(b"MThd", "file").unwrap();
        assert_eq!(reader.read_u32_be().unwrap(), 6);
        assert_eq!(reader.read_u16_be().unwrap(), 0x0102);
        assert!(reader.read_u8().is_err());

        let mut reader = ByteReader::new(b"MTrx");
        assert!(matches!(
            reader.expect_magic(b"MTrk", "track"),
            Err(PlayerError::BadMagic("track"))
        ));
    }
}
