//! Tensors and datatype tags of the KServe v2 inference protocol.

use super::InferenceError;
use ndarray::{ArrayD, ArrayView, Dimension, IxDyn};
use serde::{Deserialize, Serialize};

/// Numeric datatype tags this client can send and receive.
///
/// `BOOL`, `BYTES`, `FP16` and `BF16` exist in the protocol but have no
/// matching Rust element type here, so they are rejected explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    /// `UINT8`
    Uint8,
    /// `UINT16`
    Uint16,
    /// `UINT32`
    Uint32,
    /// `UINT64`
    Uint64,
    /// `INT8`
    Int8,
    /// `INT16`
    Int16,
    /// `INT32`
    Int32,
    /// `INT64`
    Int64,
    /// `FP32`
    Fp32,
    /// `FP64`
    Fp64,
}

impl DataType {
    /// Wire tag for this datatype.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uint8 => "UINT8",
            Self::Uint16 => "UINT16",
            Self::Uint32 => "UINT32",
            Self::Uint64 => "UINT64",
            Self::Int8 => "INT8",
            Self::Int16 => "INT16",
            Self::Int32 => "INT32",
            Self::Int64 => "INT64",
            Self::Fp32 => "FP32",
            Self::Fp64 => "FP64",
        }
    }

    /// Size of one element in bytes.
    pub const fn byte_size(self) -> usize {
        match self {
            Self::Uint8 | Self::Int8 => 1,
            Self::Uint16 | Self::Int16 => 2,
            Self::Uint32 | Self::Int32 | Self::Fp32 => 4,
            Self::Uint64 | Self::Int64 | Self::Fp64 => 8,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DataType {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UINT8" => Ok(Self::Uint8),
            "UINT16" => Ok(Self::Uint16),
            "UINT32" => Ok(Self::Uint32),
            "UINT64" => Ok(Self::Uint64),
            "INT8" => Ok(Self::Int8),
            "INT16" => Ok(Self::Int16),
            "INT32" => Ok(Self::Int32),
            "INT64" => Ok(Self::Int64),
            "FP32" => Ok(Self::Fp32),
            "FP64" => Ok(Self::Fp64),
            other => Err(InferenceError::UnsupportedDatatype {
                datatype: other.to_string(),
            }),
        }
    }
}

/// Flat, row-major tensor contents tagged by element type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TensorData {
    /// `UINT8` values.
    U8(Vec<u8>),
    /// `UINT16` values.
    U16(Vec<u16>),
    /// `UINT32` values.
    U32(Vec<u32>),
    /// `UINT64` values.
    U64(Vec<u64>),
    /// `INT8` values.
    I8(Vec<i8>),
    /// `INT16` values.
    I16(Vec<i16>),
    /// `INT32` values.
    I32(Vec<i32>),
    /// `INT64` values.
    I64(Vec<i64>),
    /// `FP32` values.
    F32(Vec<f32>),
    /// `FP64` values.
    F64(Vec<f64>),
}

impl TensorData {
    /// Datatype tag matching the stored element type.
    pub const fn datatype(&self) -> DataType {
        match self {
            Self::U8(_) => DataType::Uint8,
            Self::U16(_) => DataType::Uint16,
            Self::U32(_) => DataType::Uint32,
            Self::U64(_) => DataType::Uint64,
            Self::I8(_) => DataType::Int8,
            Self::I16(_) => DataType::Int16,
            Self::I32(_) => DataType::Int32,
            Self::I64(_) => DataType::Int64,
            Self::F32(_) => DataType::Fp32,
            Self::F64(_) => DataType::Fp64,
        }
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::U64(v) => v.len(),
            Self::I8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
        }
    }

    /// Whether no elements are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the raw little-endian encoding in bytes.
    pub fn byte_len(&self) -> usize {
        self.len() * self.datatype().byte_size()
    }

    /// Append the elements to `out` as little-endian bytes.
    pub fn write_le_bytes(&self, out: &mut Vec<u8>) {
        macro_rules! extend {
            ($values:expr) => {
                for v in $values {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            };
        }

        out.reserve(self.byte_len());
        match self {
            Self::U8(v) => out.extend_from_slice(v),
            Self::U16(v) => extend!(v),
            Self::U32(v) => extend!(v),
            Self::U64(v) => extend!(v),
            Self::I8(v) => extend!(v),
            Self::I16(v) => extend!(v),
            Self::I32(v) => extend!(v),
            Self::I64(v) => extend!(v),
            Self::F32(v) => extend!(v),
            Self::F64(v) => extend!(v),
        }
    }

    /// Decode a JSON `data` array according to its declared datatype.
    pub fn from_json(datatype: DataType, value: serde_json::Value) -> serde_json::Result<Self> {
        use serde_json::from_value;

        Ok(match datatype {
            DataType::Uint8 => Self::U8(from_value(value)?),
            DataType::Uint16 => Self::U16(from_value(value)?),
            DataType::Uint32 => Self::U32(from_value(value)?),
            DataType::Uint64 => Self::U64(from_value(value)?),
            DataType::Int8 => Self::I8(from_value(value)?),
            DataType::Int16 => Self::I16(from_value(value)?),
            DataType::Int32 => Self::I32(from_value(value)?),
            DataType::Int64 => Self::I64(from_value(value)?),
            DataType::Fp32 => Self::F32(from_value(value)?),
            DataType::Fp64 => Self::F64(from_value(value)?),
        })
    }
}

/// Rust element types with a protocol datatype tag.
pub trait Element: Copy + Sized {
    /// Tag sent on the wire for this type.
    const DATATYPE: DataType;

    /// Wrap a flat buffer.
    fn wrap(values: Vec<Self>) -> TensorData;

    /// Unwrap a flat buffer, or `None` if it holds another element type.
    fn unwrap(data: TensorData) -> Option<Vec<Self>>;
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident, $datatype:ident) => {
        impl Element for $ty {
            const DATATYPE: DataType = DataType::$datatype;

            fn wrap(values: Vec<Self>) -> TensorData {
                TensorData::$variant(values)
            }

            fn unwrap(data: TensorData) -> Option<Vec<Self>> {
                match data {
                    TensorData::$variant(values) => Some(values),
                    _ => None,
                }
            }
        }
    };
}

impl_element!(u8, U8, Uint8);
impl_element!(u16, U16, Uint16);
impl_element!(u32, U32, Uint32);
impl_element!(u64, U64, Uint64);
impl_element!(i8, I8, Int8);
impl_element!(i16, I16, Int16);
impl_element!(i32, I32, Int32);
impl_element!(i64, I64, Int64);
impl_element!(f32, F32, Fp32);
impl_element!(f64, F64, Fp64);

/// A named tensor as carried in requests and responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferTensor {
    /// Tensor name as declared by the model.
    pub name: String,
    /// Dimensions, outermost first.
    pub shape: Vec<usize>,
    /// Element datatype tag.
    pub datatype: DataType,
    /// Row-major contents.
    pub data: TensorData,
}

impl InferTensor {
    /// Build a tensor from an ndarray view, flattening in logical row-major order.
    pub fn from_array<T: Element, D: Dimension>(name: &str, array: ArrayView<'_, T, D>) -> Self {
        Self {
            name: name.to_string(),
            shape: array.shape().to_vec(),
            datatype: T::DATATYPE,
            data: T::wrap(array.iter().copied().collect()),
        }
    }

    /// Convert back into an n-dimensional array of element type `T`.
    ///
    /// # Errors
    ///
    /// [`InferenceError::DatatypeMismatch`] if the tensor holds another
    /// element type, [`InferenceError::ShapeMismatch`] if the element count
    /// does not match the declared shape.
    pub fn into_array<T: Element>(self) -> Result<ArrayD<T>, InferenceError> {
        let Self {
            name,
            shape,
            datatype,
            data,
        } = self;

        if datatype != T::DATATYPE || data.datatype() != T::DATATYPE {
            return Err(InferenceError::DatatypeMismatch {
                name,
                expected: T::DATATYPE,
                actual: data.datatype(),
            });
        }

        let count = data.len();
        let values = T::unwrap(data).ok_or_else(|| InferenceError::DatatypeMismatch {
            name: name.clone(),
            expected: T::DATATYPE,
            actual: datatype,
        })?;

        ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|_| InferenceError::ShapeMismatch {
            name,
            reason: format!("{count} elements do not fill shape {shape:?}"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    #[test]
    fn test_datatype_tags_round_trip() {
        for dt in [
            DataType::Uint8,
            DataType::Int16,
            DataType::Int64,
            DataType::Fp32,
            DataType::Fp64,
        ] {
            assert_eq!(dt.as_str().parse::<DataType>().unwrap(), dt);
            assert_eq!(
                serde_json::to_value(dt).unwrap(),
                serde_json::Value::String(dt.as_str().to_string())
            );
        }
    }

    #[test]
    fn test_unsupported_datatypes_are_rejected() {
        for tag in ["BOOL", "BYTES", "FP16", "BF16", "float32"] {
            assert!(matches!(
                tag.parse::<DataType>(),
                Err(InferenceError::UnsupportedDatatype { .. })
            ));
        }
    }

    #[test]
    fn test_element_tags() {
        assert_eq!(<f32 as Element>::DATATYPE, DataType::Fp32);
        assert_eq!(<f64 as Element>::DATATYPE, DataType::Fp64);
        assert_eq!(<i32 as Element>::DATATYPE, DataType::Int32);
        assert_eq!(<u8 as Element>::DATATYPE, DataType::Uint8);
    }

    #[test]
    fn test_from_array_flattens_row_major() {
        let array = Array3::from_shape_fn((2, 2, 3), |(a, b, c)| (a * 6 + b * 3 + c) as f32);
        let tensor = InferTensor::from_array("input", array.view());
        assert_eq!(tensor.shape, vec![2, 2, 3]);
        assert_eq!(tensor.datatype, DataType::Fp32);
        assert_eq!(
            tensor.data,
            TensorData::F32((0..12).map(|v| v as f32).collect())
        );
    }

    #[test]
    fn test_from_transposed_view_uses_logical_order() {
        let array = Array2::from_shape_vec((2, 3), vec![1, 2, 3, 4, 5, 6]).unwrap();
        let tensor = InferTensor::from_array("t", array.t());
        assert_eq!(tensor.shape, vec![3, 2]);
        assert_eq!(tensor.data, TensorData::I32(vec![1, 4, 2, 5, 3, 6]));
    }

    #[test]
    fn test_into_array_checks_datatype() {
        let tensor = InferTensor {
            name: "output".to_string(),
            shape: vec![2],
            datatype: DataType::Fp64,
            data: TensorData::F64(vec![1.0, 2.0]),
        };
        let err = tensor.into_array::<f32>().unwrap_err();
        assert!(matches!(err, InferenceError::DatatypeMismatch { .. }));
    }

    #[test]
    fn test_into_array_checks_element_count() {
        let tensor = InferTensor {
            name: "output".to_string(),
            shape: vec![2, 3],
            datatype: DataType::Fp32,
            data: TensorData::F32(vec![0.0; 5]),
        };
        assert!(matches!(
            tensor.into_array::<f32>(),
            Err(InferenceError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_into_array_restores_shape() {
        let tensor = InferTensor {
            name: "output".to_string(),
            shape: vec![2, 2],
            datatype: DataType::Fp32,
            data: TensorData::F32(vec![1.0, 2.0, 3.0, 4.0]),
        };
        let array = tensor.into_array::<f32>().unwrap();
        assert_eq!(array.shape(), &[2, 2]);
        assert_eq!(array[[1, 0]], 3.0);
    }

    #[test]
    fn test_le_bytes_follow_element_width() {
        let floats = TensorData::F32(vec![1.0, -2.5]);
        let mut out = Vec::new();
        floats.write_le_bytes(&mut out);
        assert_eq!(floats.byte_len(), 8);
        assert_eq!(out[..4], 1.0_f32.to_le_bytes());
        assert_eq!(out[4..], (-2.5_f32).to_le_bytes());

        let shorts = TensorData::I16(vec![0x0102, -1]);
        let mut out = Vec::new();
        shorts.write_le_bytes(&mut out);
        assert_eq!(out, vec![0x02, 0x01, 0xff, 0xff]);
    }

    #[test]
    fn test_from_json_follows_declared_type() {
        let data = TensorData::from_json(DataType::Int64, serde_json::json!([1, -2, 3])).unwrap();
        assert_eq!(data, TensorData::I64(vec![1, -2, 3]));
        assert!(TensorData::from_json(DataType::Uint8, serde_json::json!([-1])).is_err());
    }
}
