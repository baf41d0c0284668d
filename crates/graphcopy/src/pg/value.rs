use std::error::Error;

use bytes::{BufMut, Bytes, BytesMut};
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type, to_sql_checked};

/// A column value in Postgres binary wire format.
///
/// Decoding accepts every type and keeps the raw bytes; encoding writes them
/// back unchanged. This moves values between identically typed columns
/// without interpreting them. `None` is SQL `NULL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    bytes: Option<Bytes>,
}

impl RawValue {
    pub fn null() -> Self {
        Self { bytes: None }
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: Some(bytes.into()),
        }
    }

    pub fn is_null(&self) -> bool {
        self.bytes.is_none()
    }
}

impl<'a> FromSql<'a> for RawValue {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Self::from_bytes(Bytes::copy_from_slice(raw)))
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Self::null())
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

impl ToSql for RawValue {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match &self.bytes {
            Some(bytes) => {
                out.put_slice(bytes);
                Ok(IsNull::No)
            }
            None => Ok(IsNull::Yes),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_pass_through() {
        let value = RawValue::from_sql(&Type::INT4, &[0, 0, 1, 0]).unwrap();
        let mut out = BytesMut::new();
        let is_null = value.to_sql(&Type::INT4, &mut out).unwrap();

        assert!(matches!(is_null, IsNull::No));
        assert_eq!(&out[..], &[0, 0, 1, 0]);
    }

    #[test]
    fn test_null_pass_through() {
        let value = RawValue::from_sql_null(&Type::TEXT).unwrap();
        assert!(value.is_null());

        let mut out = BytesMut::new();
        let is_null = value.to_sql(&Type::TEXT, &mut out).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(out.is_empty());
    }

    #[test]
    fn test_accepts_any_type() {
        assert!(<RawValue as FromSql>::accepts(&Type::JSONB));
        assert!(<RawValue as ToSql>::accepts(&Type::UUID));
    }
}
