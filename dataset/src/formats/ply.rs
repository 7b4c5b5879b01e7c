use std::collections::HashMap;
use std::fmt;
use std::io::{BufReader, Read};

use glam::Vec3;
use serde::de::{self, Deserialize, Deserializer, IgnoredAny, SeqAccess, Visitor};

use crate::error::FormatError;

/// One property value. List properties (face indices and the like) are
/// consumed but not kept.
#[derive(Debug, Clone, Copy, PartialEq)]
enum PlyValue {
    Scalar(f64),
    List,
}

impl<'de> Deserialize<'de> for PlyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = PlyValue;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a PLY scalar or list property")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<PlyValue, E> {
                Ok(PlyValue::Scalar(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<PlyValue, E> {
                Ok(PlyValue::Scalar(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<PlyValue, E> {
                Ok(PlyValue::Scalar(v as f64))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<PlyValue, A::Error> {
                while seq.next_element::<IgnoredAny>()?.is_some() {}
                Ok(PlyValue::List)
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

// Rows are read as maps so that vertex elements with arbitrary extra
// properties (opacity, f_dc_*, scale_*, rot_*) still parse. Every element
// is read the same way because rows cannot be skipped, then only `vertex`
// is kept.
type PlyRow = HashMap<String, PlyValue>;
type PlyFile = HashMap<String, Vec<PlyRow>>;

pub(crate) fn read_positions(reader: impl Read) -> Result<Vec<Vec3>, FormatError> {
    let mut ply: PlyFile = serde_ply::from_reader(BufReader::new(reader)).map_err(|e| {
        log::warn!("Failed to parse PLY file: {e}");
        FormatError::Ply(e.to_string())
    })?;

    let vertices = ply.remove("vertex").unwrap_or_default();
    vertices
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let get = |property: &'static str| {
                match row.get(property) {
                    Some(PlyValue::Scalar(v)) => Some(*v as f32),
                    _ => None,
                }
                .ok_or(FormatError::MissingProperty { property, index })
            };
            Ok(Vec3::new(get("x")?, get("y")?, get("z")?))
        })
        .collect()
}
