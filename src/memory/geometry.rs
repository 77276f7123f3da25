//! Cache geometry and address decoding

use crate::error::GeometryError;

pub fn get_log_2(value: usize) -> u32 {
    assert!(value > 0);
    usize::BITS - 1 - value.leading_zeros()
}

pub fn is_pow_2(value: usize) -> bool {
    value != 0 && value & (value - 1) == 0
}

pub fn get_mask(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1 << bits) - 1
    }
}

/// Shape of one cache, fixed at construction
///
/// An address is split like this:
/// | tag | index | offset |
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheGeometry {
    total_size: usize,
    block_size: usize,
    associativity: usize,
    num_sets: usize,

    offset_bits: u32,
    index_bits: u32,
    index_mask: u64,
}

impl CacheGeometry {
    /// Validate and build a geometry. Every size is in bytes.
    pub fn new(
        total_size: usize,
        block_size: usize,
        associativity: usize,
    ) -> Result<Self, GeometryError> {
        if !is_pow_2(block_size) {
            return Err(GeometryError::NotPowerOfTwo {
                field: "block_size",
                value: block_size,
            });
        }
        if !is_pow_2(associativity) {
            return Err(GeometryError::NotPowerOfTwo {
                field: "associativity",
                value: associativity,
            });
        }

        let no_sets = GeometryError::NoSets {
            total_size,
            block_size,
            associativity,
        };
        let set_size = block_size.checked_mul(associativity).ok_or(no_sets.clone())?;
        if set_size > total_size {
            return Err(no_sets);
        }
        if total_size % set_size != 0 {
            return Err(GeometryError::IndivisibleSize {
                total_size,
                block_size,
                associativity,
            });
        }

        let num_sets = total_size / set_size;
        if !is_pow_2(num_sets) {
            return Err(GeometryError::NotPowerOfTwo {
                field: "num_sets",
                value: num_sets,
            });
        }

        let offset_bits = get_log_2(block_size);
        let index_bits = get_log_2(num_sets);

        Ok(Self {
            total_size,
            block_size,
            associativity,
            num_sets,
            offset_bits,
            index_bits,
            index_mask: get_mask(index_bits),
        })
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn associativity(&self) -> usize {
        self.associativity
    }

    pub fn num_sets(&self) -> usize {
        self.num_sets
    }

    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    pub fn index_bits(&self) -> u32 {
        self.index_bits
    }

    pub fn get_index(&self, address: u64) -> usize {
        ((address >> self.offset_bits) & self.index_mask) as usize
    }

    pub fn get_tag(&self, address: u64) -> u64 {
        address
            .checked_shr(self.offset_bits + self.index_bits)
            .unwrap_or(0)
    }

    /// Split an address into `(set index, tag)`
    pub fn decode(&self, address: u64) -> (usize, u64) {
        (self.get_index(address), self.get_tag(address))
    }

    /// Base address of the block identified by `(index, tag)`
    pub fn get_address(&self, index: usize, tag: u64) -> u64 {
        let tag_part = tag
            .checked_shl(self.offset_bits + self.index_bits)
            .unwrap_or(0);
        tag_part | ((index as u64) << self.offset_bits)
    }
}
