//! Option declarations and their packing into option bits.
//!
//! Options are packed in declaration order into one `u32`, each taking just
//! enough bits for its value count. Value sets resolve names to values, either
//! from a caller-supplied map, from packed bits, or with the lookup rules used
//! inside conditions ([`FilteredOptionValueSet`]).

mod value_set;
mod variants;

pub use value_set::{
    BitsOptionValueSet, FilteredOptionValueSet, OptionValueSet, RawOptionValueSet,
    collect_option_bits,
};
pub use variants::{VariantCollection, VariantFilter};

use shaderset_shared::{OptionInfo, bit_count_for};

use crate::ast::Span;

/// Total option bits must stay below this
pub const MAX_VARIANT_BITS: u32 = 16;

/// Boolean option switching per-instance data between vertex attributes and uniforms
pub const IS_INSTANCED_OPTION: &str = "IsInstanced";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderOption {
    pub name: String,
    /// Position in declaration order
    pub index: u32,
    pub bit_offset: u32,
    /// Empty for boolean options
    pub named_values: Vec<String>,
    /// Set after analysis: the option only affects pipeline state
    pub program_invariant: bool,
    pub span: Span,
}

impl ShaderOption {
    pub fn is_boolean(&self) -> bool {
        self.named_values.is_empty()
    }

    pub fn value_count(&self) -> u32 {
        if self.is_boolean() {
            2
        } else {
            self.named_values.len() as u32
        }
    }

    pub fn bit_count(&self) -> u32 {
        bit_count_for(self.value_count())
    }

    /// Bits of this option inside the option bits
    pub fn mask(&self) -> u32 {
        field_mask(self.bit_count()) << self.bit_offset
    }

    /// Extracts this option's raw field, not clamped to the value count
    pub fn field(&self, option_bits: u32) -> u32 {
        (option_bits >> self.bit_offset) & field_mask(self.bit_count())
    }

    /// Clamps a value into the declared range
    pub fn clamp(&self, value: u32) -> u32 {
        value.min(self.value_count().saturating_sub(1))
    }

    pub fn info(&self) -> OptionInfo {
        OptionInfo {
            name: self.name.clone(),
            named_values: self.named_values.clone(),
        }
    }
}

pub(crate) fn field_mask(bit_count: u32) -> u32 {
    1u32.checked_shl(bit_count).map_or(u32::MAX, |v| v - 1)
}

/// Hands out indices and bit offsets while options are declared
#[derive(Debug, Clone, Default)]
pub struct OptionAccumulator {
    next_index: u32,
    next_bit_offset: u32,
}

impl OptionAccumulator {
    pub fn declare(&mut self, name: String, named_values: Vec<String>, span: Span) -> ShaderOption {
        let option = ShaderOption {
            name,
            index: self.next_index,
            bit_offset: self.next_bit_offset,
            named_values,
            program_invariant: false,
            span,
        };
        self.next_index += 1;
        self.next_bit_offset += option.bit_count();
        option
    }

    /// Bits used by everything declared so far
    pub fn bit_count(&self) -> u32 {
        self.next_bit_offset
    }
}

/// Mask of all option bits belonging to program-invariant options
pub fn program_invariance_mask(options: &[ShaderOption]) -> u32 {
    options
        .iter()
        .filter(|o| o.program_invariant)
        .fold(0, |mask, o| mask | o.mask())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packing() {
        let mut acc = OptionAccumulator::default();
        let mode = acc.declare("Mode".into(), vec!["A".into(), "B".into(), "C".into()], Span::default());
        let flag = acc.declare("Flag".into(), Vec::new(), Span::default());
        assert_eq!((mode.bit_offset, mode.bit_count()), (0, 2));
        assert_eq!((flag.bit_offset, flag.bit_count()), (2, 1));
        assert_eq!(mode.mask(), 0b011);
        assert_eq!(flag.mask(), 0b100);
        assert_eq!(acc.bit_count(), 3);
        assert_eq!(mode.field(0b111), 3);
        assert_eq!(mode.clamp(3), 2);
    }

    #[test]
    fn test_single_value_option_takes_no_bits() {
        let mut acc = OptionAccumulator::default();
        let lone = acc.declare("Lone".into(), vec!["Only".into()], Span::default());
        assert_eq!(lone.bit_count(), 0);
        assert_eq!(lone.mask(), 0);
        assert_eq!(lone.clamp(5), 0);
    }

    #[test]
    fn test_invariance_mask() {
        let mut acc = OptionAccumulator::default();
        let mut mode = acc.declare("Mode".into(), vec!["A".into(), "B".into(), "C".into()], Span::default());
        let mut blend = acc.declare("Blend".into(), Vec::new(), Span::default());
        mode.program_invariant = false;
        blend.program_invariant = true;
        assert_eq!(program_invariance_mask(&[mode, blend]), 0b100);
    }
}
