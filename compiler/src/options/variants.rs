//! Enumeration of option combinations.

use smallvec::SmallVec;

use super::{BitsOptionValueSet, ShaderOption, field_mask};

/// Which options a [`VariantCollection`] iterates over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantFilter {
    All,
    /// Options that change the compiled programs
    Program,
    /// Options that only change pipeline state
    ProgramInvariant,
}

impl VariantFilter {
    fn accepts(self, option: &ShaderOption) -> bool {
        match self {
            VariantFilter::All => true,
            VariantFilter::Program => !option.program_invariant,
            VariantFilter::ProgramInvariant => option.program_invariant,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Field {
    bit_offset: u32,
    bit_count: u32,
    value_count: u32,
}

/// Every combination of values of the selected options, as option bits.
///
/// Iteration is a mixed-radix counter over the selected options in bit order,
/// so option bits come out ascending and each combination exactly once. Bits
/// of the other options are taken from the base bits.
#[derive(Debug, Clone)]
pub struct VariantCollection<'a> {
    options: &'a [ShaderOption],
    fields: SmallVec<[Field; 8]>,
    base_bits: u32,
}

impl<'a> VariantCollection<'a> {
    pub fn new(options: &'a [ShaderOption], filter: VariantFilter) -> Self {
        Self::with_base(options, filter, 0)
    }

    /// Iterates the selected options with every other option fixed to its value in `base_bits`
    pub fn with_base(options: &'a [ShaderOption], filter: VariantFilter, base_bits: u32) -> Self {
        let mut fields: SmallVec<[Field; 8]> = options
            .iter()
            .filter(|o| filter.accepts(o))
            .map(|o| Field {
                bit_offset: o.bit_offset,
                bit_count: o.bit_count(),
                value_count: o.value_count(),
            })
            .collect();
        fields.sort_unstable_by_key(|f| f.bit_offset);
        let selected_mask = fields
            .iter()
            .fold(0, |mask, f| mask | (field_mask(f.bit_count) << f.bit_offset));
        Self {
            options,
            fields,
            base_bits: base_bits & !selected_mask,
        }
    }

    /// Number of combinations, the product of the selected value counts
    pub fn len(&self) -> usize {
        self.fields.iter().map(|f| f.value_count as usize).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> VariantIter<'_> {
        VariantIter {
            fields: &self.fields,
            base_bits: self.base_bits,
            next: Some(0),
        }
    }

    /// Decoded value sets, in the same order as [`iter`](Self::iter)
    pub fn value_sets(&self) -> impl Iterator<Item = BitsOptionValueSet<'a>> + '_ {
        let options = self.options;
        self.iter().map(move |bits| BitsOptionValueSet::new(options, bits))
    }
}

impl<'c> IntoIterator for &'c VariantCollection<'_> {
    type Item = u32;
    type IntoIter = VariantIter<'c>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct VariantIter<'c> {
    fields: &'c [Field],
    base_bits: u32,
    next: Option<u32>,
}

impl Iterator for VariantIter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let current = self.next?;
        self.next = self.fields.iter().find_map(|f| {
            let value = ((current >> f.bit_offset) & field_mask(f.bit_count)) + 1;
            (value < f.value_count).then(|| {
                // Lower fields wrap around to zero, like a carry
                let cleared = current & !field_mask(f.bit_offset + f.bit_count);
                cleared | (value << f.bit_offset)
            })
        });
        Some(current | self.base_bits)
    }
}
