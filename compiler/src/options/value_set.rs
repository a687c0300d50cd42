use std::cell::Cell;

use hashbrown::HashMap;

use super::ShaderOption;

/// Resolves option names (and, for some sets, named values) to numbers
pub trait OptionValueSet {
    fn try_get_value(&self, name: &str) -> Option<u32>;
}

/// Caller-supplied option values by name. Unknown names do not resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOptionValueSet {
    values: HashMap<String, u32>,
}

impl RawOptionValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: u32) -> &mut Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn values(&self) -> &HashMap<String, u32> {
        &self.values
    }
}

impl From<HashMap<String, u32>> for RawOptionValueSet {
    fn from(values: HashMap<String, u32>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>> FromIterator<(K, u32)> for RawOptionValueSet {
    fn from_iter<I: IntoIterator<Item = (K, u32)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl OptionValueSet for RawOptionValueSet {
    fn try_get_value(&self, name: &str) -> Option<u32> {
        self.values.get(name).copied()
    }
}

/// The lookup rules of conditions.
///
/// Named values resolve to their index. Declared options resolve to the
/// parent's value, or 0 when the parent has none. Anything else, like a
/// shader variable, does not resolve. Remembers whether an option was queried
/// so constant conditions can be reported.
pub struct FilteredOptionValueSet<'a> {
    options: &'a [ShaderOption],
    named_values: HashMap<&'a str, u32>,
    parent: Option<&'a dyn OptionValueSet>,
    accessed_option: Cell<bool>,
}

impl<'a> FilteredOptionValueSet<'a> {
    pub fn new(options: &'a [ShaderOption], parent: Option<&'a dyn OptionValueSet>) -> Self {
        let named_values = options
            .iter()
            .flat_map(|o| o.named_values.iter().enumerate())
            .map(|(index, name)| (name.as_str(), index as u32))
            .collect();
        Self {
            options,
            named_values,
            parent,
            accessed_option: Cell::new(false),
        }
    }

    pub fn accessed_option(&self) -> bool {
        self.accessed_option.get()
    }

    pub fn reset_accessed(&self) {
        self.accessed_option.set(false);
    }
}

impl OptionValueSet for FilteredOptionValueSet<'_> {
    fn try_get_value(&self, name: &str) -> Option<u32> {
        if let Some(&index) = self.named_values.get(name) {
            return Some(index);
        }
        if self.options.iter().any(|o| o.name == name) {
            self.accessed_option.set(true);
            let value = self.parent.and_then(|p| p.try_get_value(name));
            return Some(value.unwrap_or(0));
        }
        None
    }
}

/// Option values decoded from packed option bits
#[derive(Debug, Clone, Copy)]
pub struct BitsOptionValueSet<'a> {
    options: &'a [ShaderOption],
    option_bits: u32,
}

impl<'a> BitsOptionValueSet<'a> {
    pub fn new(options: &'a [ShaderOption], option_bits: u32) -> Self {
        Self {
            options,
            option_bits,
        }
    }

    pub fn option_bits(&self) -> u32 {
        self.option_bits
    }
}

impl OptionValueSet for BitsOptionValueSet<'_> {
    fn try_get_value(&self, name: &str) -> Option<u32> {
        let option = self.options.iter().find(|o| o.name == name)?;
        Some(option.clamp(option.field(self.option_bits)))
    }
}

/// Packs the values of all options. Missing values pack as 0, values past the
/// declared range are clamped to the last value.
pub fn collect_option_bits(values: &dyn OptionValueSet, options: &[ShaderOption]) -> u32 {
    options.iter().fold(0, |bits, option| {
        let value = values.try_get_value(&option.name).unwrap_or(0);
        bits | (option.clamp(value) << option.bit_offset)
    })
}
