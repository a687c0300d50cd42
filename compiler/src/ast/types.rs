use shaderset_shared::{BufferType, ImageType, NumericType, SamplerType};

use super::Expr;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Numeric(NumericType),
    Image(ImageType),
    Sampler(SamplerType),
    /// A storage buffer, valid only around an array of numeric elements
    Buffer(Box<Type>),
    Array {
        element: Box<Type>,
        size: Option<Box<Expr>>,
    },
    /// A struct or otherwise unresolved type name, passed through to GLSL
    Custom(String),
}

impl Type {
    pub fn numeric(ty: NumericType) -> Self {
        Type::Numeric(ty)
    }

    pub fn buffer_of(element: NumericType) -> Self {
        Type::Buffer(Box::new(Type::Array {
            element: Box::new(Type::Numeric(element)),
            size: None,
        }))
    }

    pub fn array(element: Type, size: Option<Expr>) -> Self {
        Type::Array {
            element: Box::new(element),
            size: size.map(Box::new),
        }
    }

    /// Whether values of this type occupy their own descriptor binding
    pub fn is_binding_type(&self) -> bool {
        matches!(self, Type::Image(_) | Type::Sampler(_) | Type::Buffer(_))
    }

    pub fn as_numeric(&self) -> Option<NumericType> {
        match self {
            Type::Numeric(ty) => Some(*ty),
            _ => None,
        }
    }

    /// The reflected element type of a well-formed buffer
    pub fn buffer_type(&self) -> Option<BufferType> {
        let Type::Buffer(inner) = self else {
            return None;
        };
        let Type::Array { element, .. } = inner.as_ref() else {
            return None;
        };
        element.as_numeric().map(|element| BufferType { element })
    }
}
