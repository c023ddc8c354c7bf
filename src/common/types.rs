use std::fmt;

use crate::common::constants::{BTREE_ACCESS_METHOD_OID, HASH_ACCESS_METHOD_OID, VECTOR_ACCESS_METHOD_OID};

pub type RowId = u32;
pub type ParamId = u32;
pub type ParamValue = i64;
pub type DistanceType = f32;

/// Tag identifying which index implementation backs an index object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccessMethodId(pub u32);

impl AccessMethodId {
    pub const BTREE: AccessMethodId = AccessMethodId(BTREE_ACCESS_METHOD_OID);
    pub const HASH: AccessMethodId = AccessMethodId(HASH_ACCESS_METHOD_OID);
    pub const VECTOR: AccessMethodId = AccessMethodId(VECTOR_ACCESS_METHOD_OID);

    /// Whether this access method answers nearest-neighbor queries.
    pub fn is_vector(self) -> bool {
        self == Self::VECTOR
    }
}

impl fmt::Display for AccessMethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::BTREE => write!(f, "btree"),
            Self::HASH => write!(f, "hash"),
            Self::VECTOR => write!(f, "vector"),
            AccessMethodId(oid) => write!(f, "am({})", oid),
        }
    }
}
