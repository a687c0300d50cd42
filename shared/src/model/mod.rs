//! Data model of compiled shader variants.

/// Declares a fieldless enum stored as a single `u8` discriminant.
macro_rules! u8_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        $vis enum $name {
            $($(#[$vmeta])* $variant = $value,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn from_u8(value: u8) -> Result<Self, $crate::error::FormatError> {
                match value {
                    $($value => Ok($name::$variant),)+
                    _ => Err($crate::error::FormatError::InvalidEnum {
                        kind: stringify!($name),
                        value,
                    }),
                }
            }

            pub fn as_u8(self) -> u8 {
                self as u8
            }
        }
    };
}

mod binding;
mod image;
mod numeric;
mod pipeline;
mod shader_info;
mod variant;

pub use binding::*;
pub use image::*;
pub use numeric::*;
pub use pipeline::*;
pub use shader_info::*;
pub use variant::*;
