use std::ops::Deref;

use crate::errors::TrieError;

/// A path through the trie, one element per nibble (0..=15).
///
/// Unlike the on-wire hex-prefix form, leaf-ness is not stored in the path itself. It is carried by the node that
/// owns the path and supplied again when encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Nibbles {
    hex_data: Vec<u8>,
}

impl Nibbles {
    pub fn from_hex(hex: &[u8]) -> Self {
        debug_assert!(hex.iter().all(|n| *n < 16));
        Nibbles {
            hex_data: hex.to_vec(),
        }
    }

    /// Splits every byte of `raw` into its high and low nibble.
    pub fn from_raw(raw: &[u8]) -> Self {
        let hex_data = raw.iter().flat_map(|b| [b >> 4, b & 0x0f]).collect();
        Nibbles { hex_data }
    }

    /// Decodes a hex-prefix encoded path, returning the path and whether it belongs to a leaf.
    pub fn from_compact(compact: &[u8]) -> Result<(Self, bool), TrieError> {
        let Some((first, rest)) = compact.split_first() else {
            return Err(TrieError::InvalidData);
        };
        let flag = first >> 4;
        if flag > 3 {
            return Err(TrieError::InvalidData);
        }
        let is_leaf = flag & 0b10 != 0;
        let is_odd = flag & 0b01 != 0;

        let mut hex_data = Vec::with_capacity(rest.len() * 2 + 1);
        if is_odd {
            hex_data.push(first & 0x0f);
        } else if first & 0x0f != 0 {
            return Err(TrieError::InvalidData);
        }
        for b in rest {
            hex_data.push(b >> 4);
            hex_data.push(b & 0x0f);
        }

        Ok((Nibbles { hex_data }, is_leaf))
    }

    /// Hex-prefix encoding as used in leaf and extension nodes.
    pub fn encode_compact(&self, is_leaf: bool) -> Vec<u8> {
        let flag = if is_leaf { 0x20 } else { 0x00 };
        let mut compact = Vec::with_capacity(self.hex_data.len() / 2 + 1);

        let rest = if self.hex_data.len() % 2 == 1 {
            compact.push(flag | 0x10 | self.hex_data[0]);
            &self.hex_data[1..]
        } else {
            compact.push(flag);
            &self.hex_data[..]
        };
        compact.extend(rest.chunks(2).map(|pair| (pair[0] << 4) | pair[1]));

        compact
    }

    /// Packs the nibbles back into bytes. Only meaningful for paths of even length.
    pub fn encode_raw(&self) -> Vec<u8> {
        self.hex_data
            .chunks(2)
            .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
            .collect()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.hex_data
    }

    pub fn common_prefix(&self, other: &[u8]) -> usize {
        self.hex_data
            .iter()
            .zip(other)
            .take_while(|(a, b)| a == b)
            .count()
    }

    pub fn offset(&self, index: usize) -> Nibbles {
        Nibbles::from_hex(&self.hex_data[index..])
    }

    pub fn slice(&self, start: usize, end: usize) -> Nibbles {
        Nibbles::from_hex(&self.hex_data[start..end])
    }

    pub fn join(&self, other: &[u8]) -> Nibbles {
        let mut hex_data = Vec::with_capacity(self.hex_data.len() + other.len());
        hex_data.extend_from_slice(&self.hex_data);
        hex_data.extend_from_slice(other);
        Nibbles { hex_data }
    }
}

impl Deref for Nibbles {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.hex_data
    }
}

impl From<&[u8]> for Nibbles {
    fn from(hex: &[u8]) -> Self {
        Nibbles::from_hex(hex)
    }
}
