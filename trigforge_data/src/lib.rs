//! Shared data model for trigforge: typed ids, trigger objects, the field
//! table, and the level-string / payload codecs.

pub mod fields;
pub mod ids;
pub mod level;
pub mod object;
pub mod payload;
pub mod validate;

pub use fields::{FieldDef, FieldKind, FieldTable, field, obj_id};
pub use ids::{Domain, IdAllocator, TypedRef};
pub use level::{CodecError, decode_level_string, encode_object, encode_objects};
pub use object::{Object, Value};
pub use payload::{PayloadError, decode_level, encode_level};
pub use validate::ValidationError;
