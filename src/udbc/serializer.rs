use crate::error::DbError;
use crate::udbc::value::Value;
use serde::Serialize;
use serde::ser::*;

/// Serializes one scalar into a [`Value`]. Nested collections are rejected:
/// a positional parameter is always a single column value.
pub struct ValueSerializer;

fn not_scalar(what: &str) -> DbError {
    DbError::Binding(format!("{what} cannot be bound to a single placeholder"))
}

impl Serializer for ValueSerializer {
    type Ok = Value;
    type Error = DbError;
    type SerializeSeq = Impossible<Value, DbError>;
    type SerializeTuple = Impossible<Value, DbError>;
    type SerializeTupleStruct = Impossible<Value, DbError>;
    type SerializeTupleVariant = Impossible<Value, DbError>;
    type SerializeMap = Impossible<Value, DbError>;
    type SerializeStruct = Impossible<Value, DbError>;
    type SerializeStructVariant = Impossible<Value, DbError>;

    fn serialize_bool(self, v: bool) -> Result<Value, DbError> {
        Ok(Value::Bool(v))
    }
    fn serialize_i8(self, v: i8) -> Result<Value, DbError> {
        Ok(Value::I16(v as i16))
    }
    fn serialize_i16(self, v: i16) -> Result<Value, DbError> {
        Ok(Value::I16(v))
    }
    fn serialize_i32(self, v: i32) -> Result<Value, DbError> {
        Ok(Value::I32(v))
    }
    fn serialize_i64(self, v: i64) -> Result<Value, DbError> {
        Ok(Value::I64(v))
    }
    fn serialize_u8(self, v: u8) -> Result<Value, DbError> {
        Ok(Value::U8(v))
    }
    fn serialize_u16(self, v: u16) -> Result<Value, DbError> {
        Ok(Value::I32(v as i32))
    }
    fn serialize_u32(self, v: u32) -> Result<Value, DbError> {
        Ok(Value::I64(v as i64))
    }
    fn serialize_u64(self, v: u64) -> Result<Value, DbError> {
        i64::try_from(v)
            .map(Value::I64)
            .map_err(|_| DbError::Value(format!("{v} does not fit a signed 64-bit column")))
    }
    fn serialize_f32(self, v: f32) -> Result<Value, DbError> {
        Ok(Value::F64(v as f64))
    }
    fn serialize_f64(self, v: f64) -> Result<Value, DbError> {
        Ok(Value::F64(v))
    }
    fn serialize_char(self, v: char) -> Result<Value, DbError> {
        Ok(Value::Str(v.to_string()))
    }
    fn serialize_str(self, v: &str) -> Result<Value, DbError> {
        Ok(Value::Str(v.to_string()))
    }
    fn serialize_bytes(self, v: &[u8]) -> Result<Value, DbError> {
        Ok(Value::Bytes(v.to_vec()))
    }
    fn serialize_none(self) -> Result<Value, DbError> {
        Ok(Value::Null)
    }
    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Value, DbError> {
        value.serialize(self)
    }
    fn serialize_unit(self) -> Result<Value, DbError> {
        Ok(Value::Null)
    }
    fn serialize_unit_struct(self, _: &'static str) -> Result<Value, DbError> {
        Ok(Value::Null)
    }
    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
    ) -> Result<Value, DbError> {
        Ok(Value::Str(variant.to_string()))
    }
    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<Value, DbError> {
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Result<Value, DbError> {
        value.serialize(self)
    }
    fn serialize_seq(self, _: Option<usize>) -> Result<Self::SerializeSeq, DbError> {
        Err(not_scalar("a sequence"))
    }
    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple, DbError> {
        Err(not_scalar("a tuple"))
    }
    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleStruct, DbError> {
        Err(not_scalar(name))
    }
    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant, DbError> {
        Err(not_scalar(variant))
    }
    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap, DbError> {
        Err(not_scalar("a map"))
    }
    fn serialize_struct(self, name: &'static str, _: usize) -> Result<Self::SerializeStruct, DbError> {
        Err(not_scalar(name))
    }
    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant, DbError> {
        Err(not_scalar(variant))
    }
}

/// Serializes a parameter set: a tuple, array, `Vec` or slice yields one
/// value per element, `()` yields none, and a bare scalar yields one.
struct ParamsSerializer;

pub struct ParamList {
    vec: Vec<Value>,
}

macro_rules! forward_scalar {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, v: $ty) -> Result<Vec<Value>, DbError> {
                Ok(vec![ValueSerializer.$method(v)?])
            }
        )*
    };
}

impl Serializer for ParamsSerializer {
    type Ok = Vec<Value>;
    type Error = DbError;
    type SerializeSeq = ParamList;
    type SerializeTuple = ParamList;
    type SerializeTupleStruct = ParamList;
    type SerializeTupleVariant = Impossible<Vec<Value>, DbError>;
    type SerializeMap = Impossible<Vec<Value>, DbError>;
    type SerializeStruct = Impossible<Vec<Value>, DbError>;
    type SerializeStructVariant = Impossible<Vec<Value>, DbError>;

    forward_scalar! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
    }

    fn serialize_none(self) -> Result<Vec<Value>, DbError> {
        Ok(vec![Value::Null])
    }
    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Vec<Value>, DbError> {
        Ok(vec![value.serialize(ValueSerializer)?])
    }
    fn serialize_unit(self) -> Result<Vec<Value>, DbError> {
        Ok(Vec::new())
    }
    fn serialize_unit_struct(self, _: &'static str) -> Result<Vec<Value>, DbError> {
        Ok(Vec::new())
    }
    fn serialize_unit_variant(
        self,
        name: &'static str,
        index: u32,
        variant: &'static str,
    ) -> Result<Vec<Value>, DbError> {
        Ok(vec![ValueSerializer.serialize_unit_variant(name, index, variant)?])
    }
    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<Vec<Value>, DbError> {
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Result<Vec<Value>, DbError> {
        Ok(vec![value.serialize(ValueSerializer)?])
    }
    fn serialize_seq(self, len: Option<usize>) -> Result<ParamList, DbError> {
        Ok(ParamList {
            vec: Vec::with_capacity(len.unwrap_or(0)),
        })
    }
    fn serialize_tuple(self, len: usize) -> Result<ParamList, DbError> {
        self.serialize_seq(Some(len))
    }
    fn serialize_tuple_struct(self, _: &'static str, len: usize) -> Result<ParamList, DbError> {
        self.serialize_seq(Some(len))
    }
    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant, DbError> {
        Err(not_positional(variant))
    }
    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap, DbError> {
        Err(not_positional("a map"))
    }
    fn serialize_struct(self, name: &'static str, _: usize) -> Result<Self::SerializeStruct, DbError> {
        Err(not_positional(name))
    }
    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant, DbError> {
        Err(not_positional(variant))
    }
}

fn not_positional(what: &str) -> DbError {
    DbError::Binding(format!(
        "{what} has no positional order; pass a tuple, array or Vec of parameters"
    ))
}

macro_rules! impl_serialize_seq {
    ($trait:ident, $method:ident) => {
        impl $trait for ParamList {
            type Ok = Vec<Value>;
            type Error = DbError;

            fn $method<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), DbError> {
                self.vec.push(value.serialize(ValueSerializer)?);
                Ok(())
            }

            fn end(self) -> Result<Vec<Value>, DbError> {
                Ok(self.vec)
            }
        }
    };
}

impl_serialize_seq!(SerializeSeq, serialize_element);
impl_serialize_seq!(SerializeTuple, serialize_element);
impl_serialize_seq!(SerializeTupleStruct, serialize_field);

/// Converts one scalar into a [`Value`].
pub fn to_value<T: ?Sized + Serialize>(t: &T) -> Result<Value, DbError> {
    t.serialize(ValueSerializer)
}

/// Converts a parameter set into positional values, in order.
pub fn to_params<T: ?Sized + Serialize>(t: &T) -> Result<Vec<Value>, DbError> {
    t.serialize(ParamsSerializer)
}
