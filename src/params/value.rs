use crate::spec::{ParamType, ScalarType};
use serde_json::Value;
use std::fmt;

/// A coerced parameter value. The variant is fixed by the declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    List(Vec<TypedValue>),
    /// A decoded request body.
    Json(Value),
}

impl TypedValue {
    /// Zero value bound for an absent optional parameter.
    #[must_use]
    pub fn zero(param_type: ParamType) -> Self {
        match param_type {
            ParamType::Scalar(ty) => Self::zero_scalar(ty),
            ParamType::Array(_) => TypedValue::List(Vec::new()),
            ParamType::Body => TypedValue::Json(Value::Null),
        }
    }

    #[must_use]
    pub fn zero_scalar(ty: ScalarType) -> Self {
        match ty {
            ScalarType::Bool => TypedValue::Bool(false),
            ScalarType::Int8 => TypedValue::I8(0),
            ScalarType::Int16 => TypedValue::I16(0),
            ScalarType::Int32 => TypedValue::I32(0),
            ScalarType::Int64 => TypedValue::I64(0),
            ScalarType::Uint8 => TypedValue::U8(0),
            ScalarType::Uint16 => TypedValue::U16(0),
            ScalarType::Uint32 => TypedValue::U32(0),
            ScalarType::Uint64 => TypedValue::U64(0),
            ScalarType::Float32 => TypedValue::F32(0.0),
            ScalarType::Float64 => TypedValue::F64(0.0),
            ScalarType::String => TypedValue::String(String::new()),
        }
    }

    /// Numeric view used by bound checks.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::I8(v) => Some(f64::from(*v)),
            TypedValue::I16(v) => Some(f64::from(*v)),
            TypedValue::I32(v) => Some(f64::from(*v)),
            TypedValue::I64(v) => Some(*v as f64),
            TypedValue::U8(v) => Some(f64::from(*v)),
            TypedValue::U16(v) => Some(f64::from(*v)),
            TypedValue::U32(v) => Some(f64::from(*v)),
            TypedValue::U64(v) => Some(*v as f64),
            TypedValue::F32(v) => Some(f64::from(*v)),
            TypedValue::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Exact view of integral values, used where `f64` would round.
    pub(crate) fn as_i128(&self) -> Option<i128> {
        match self {
            TypedValue::I8(v) => Some(i128::from(*v)),
            TypedValue::I16(v) => Some(i128::from(*v)),
            TypedValue::I32(v) => Some(i128::from(*v)),
            TypedValue::I64(v) => Some(i128::from(*v)),
            TypedValue::U8(v) => Some(i128::from(*v)),
            TypedValue::U16(v) => Some(i128::from(*v)),
            TypedValue::U32(v) => Some(i128::from(*v)),
            TypedValue::U64(v) => Some(i128::from(*v)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            TypedValue::Bool(v) => Value::Bool(*v),
            TypedValue::I8(v) => Value::from(*v),
            TypedValue::I16(v) => Value::from(*v),
            TypedValue::I32(v) => Value::from(*v),
            TypedValue::I64(v) => Value::from(*v),
            TypedValue::U8(v) => Value::from(*v),
            TypedValue::U16(v) => Value::from(*v),
            TypedValue::U32(v) => Value::from(*v),
            TypedValue::U64(v) => Value::from(*v),
            TypedValue::F32(v) => Value::from(f64::from(*v)),
            TypedValue::F64(v) => Value::from(*v),
            TypedValue::String(s) => Value::String(s.clone()),
            TypedValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            TypedValue::Json(v) => v.clone(),
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Bool(v) => write!(f, "{v}"),
            TypedValue::I8(v) => write!(f, "{v}"),
            TypedValue::I16(v) => write!(f, "{v}"),
            TypedValue::I32(v) => write!(f, "{v}"),
            TypedValue::I64(v) => write!(f, "{v}"),
            TypedValue::U8(v) => write!(f, "{v}"),
            TypedValue::U16(v) => write!(f, "{v}"),
            TypedValue::U32(v) => write!(f, "{v}"),
            TypedValue::U64(v) => write!(f, "{v}"),
            TypedValue::F32(v) => write!(f, "{v}"),
            TypedValue::F64(v) => write!(f, "{v}"),
            TypedValue::String(s) => f.write_str(s),
            TypedValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            TypedValue::Json(v) => write!(f, "{v}"),
        }
    }
}

/// Conversion out of a bound [`TypedValue`] into a concrete Rust type.
pub trait FromTypedValue: Sized {
    fn from_typed(value: &TypedValue) -> Option<Self>;
}

impl FromTypedValue for bool {
    fn from_typed(value: &TypedValue) -> Option<Self> {
        match value {
            TypedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

macro_rules! int_from_typed {
    ($($t:ty),*) => {
        $(
            impl FromTypedValue for $t {
                fn from_typed(value: &TypedValue) -> Option<Self> {
                    value.as_i128().and_then(|i| <$t>::try_from(i).ok())
                }
            }
        )*
    };
}

int_from_typed!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromTypedValue for f32 {
    fn from_typed(value: &TypedValue) -> Option<Self> {
        match value {
            TypedValue::F32(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromTypedValue for f64 {
    fn from_typed(value: &TypedValue) -> Option<Self> {
        value.as_f64()
    }
}

impl FromTypedValue for String {
    fn from_typed(value: &TypedValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl<T: FromTypedValue> FromTypedValue for Vec<T> {
    fn from_typed(value: &TypedValue) -> Option<Self> {
        match value {
            TypedValue::List(items) => items.iter().map(T::from_typed).collect(),
            _ => None,
        }
    }
}

impl FromTypedValue for Value {
    fn from_typed(value: &TypedValue) -> Option<Self> {
        Some(value.to_json())
    }
}

impl FromTypedValue for TypedValue {
    fn from_typed(value: &TypedValue) -> Option<Self> {
        Some(value.clone())
    }
}
