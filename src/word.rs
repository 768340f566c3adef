//! 16-bit word primitives.
//!
//! Every register and memory cell of the machine holds a `u16`. Signed
//! quantities are two's-complement and all arithmetic wraps modulo 2^16,
//! so the helpers here work on raw `u16` values and never widen.

/// Bit 15, the sign bit of a word.
pub const SIGN_BIT: u16 = 0x8000;

/// Sign-extend the low `bits` bits of `value` to a full 16-bit word.
///
/// Bits above the field are ignored. If bit `bits - 1` is set, every bit
/// from `bits` upward is filled with ones.
///
/// ```
/// use lc3::word::sign_extend;
/// assert_eq!(sign_extend(0x1F, 5), 0xFFFF);
/// assert_eq!(sign_extend(0x0F, 5), 0x000F);
/// ```
#[inline]
pub const fn sign_extend(value: u16, bits: u32) -> u16 {
    debug_assert!(bits > 0 && bits < 16);
    let field = value & ((1 << bits) - 1);
    if (field >> (bits - 1)) & 1 != 0 {
        field | (0xFFFF << bits)
    } else {
        field
    }
}

/// Extract `width` bits of `word` starting at bit `lsb`.
#[inline]
pub const fn field(word: u16, lsb: u32, width: u32) -> u16 {
    (word >> lsb) & ((1 << width) - 1)
}

/// True if bit 15 is set.
#[inline]
pub const fn is_negative(word: u16) -> bool {
    word & SIGN_BIT != 0
}

/// Low byte of a word.
#[inline]
pub const fn low_byte(word: u16) -> u8 {
    (word & 0xFF) as u8
}

/// High byte of a word.
#[inline]
pub const fn high_byte(word: u16) -> u8 {
    (word >> 8) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sign_extend_examples() {
        assert_eq!(sign_extend(0x1F, 5), 0xFFFF);
        assert_eq!(sign_extend(0x0F, 5), 0x000F);
        assert_eq!(sign_extend(0x10, 5), 0xFFF0);
        assert_eq!(sign_extend(0x20, 6), 0xFFE0);
        assert_eq!(sign_extend(0x1FF, 9), 0xFFFF);
        assert_eq!(sign_extend(0x100, 9), 0xFF00);
        assert_eq!(sign_extend(0x0FF, 9), 0x00FF);
        assert_eq!(sign_extend(0x400, 11), 0xFC00);
        assert_eq!(sign_extend(0x3FF, 11), 0x03FF);
    }

    #[test]
    fn test_sign_extend_ignores_high_bits() {
        // ADD R0, R0, #-1 carries opcode and register bits above imm5
        assert_eq!(sign_extend(0x103F, 5), 0xFFFF);
        assert_eq!(sign_extend(0xF025, 8), 0x0025);
    }

    #[test]
    fn test_field() {
        let word = 0b0001_010_011_1_00101;
        assert_eq!(field(word, 12, 4), 0b0001);
        assert_eq!(field(word, 9, 3), 0b010);
        assert_eq!(field(word, 6, 3), 0b011);
        assert_eq!(field(word, 5, 1), 1);
        assert_eq!(field(word, 0, 5), 0b00101);
    }

    #[test]
    fn test_bytes() {
        assert_eq!(low_byte(0x6948), 0x48);
        assert_eq!(high_byte(0x6948), 0x69);
        assert!(is_negative(0x8000));
        assert!(!is_negative(0x7FFF));
    }

    proptest! {
        #[test]
        fn prop_sign_extend_matches_twos_complement(
            bits in prop::sample::select(vec![5u32, 6, 9, 11]),
            raw in any::<u16>(),
        ) {
            let pattern = raw & ((1u16 << bits) - 1);
            let expected = if pattern >= (1 << (bits - 1)) {
                pattern as i32 - (1 << bits)
            } else {
                pattern as i32
            };
            prop_assert_eq!(sign_extend(pattern, bits) as i16 as i32, expected);
        }

        #[test]
        fn prop_sign_extend_preserves_field(bits in 1u32..16, raw in any::<u16>()) {
            let mask = (1u16 << bits) - 1;
            prop_assert_eq!(sign_extend(raw, bits) & mask, raw & mask);
        }
    }
}
