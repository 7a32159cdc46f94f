pub mod framing;
pub mod lookup;
pub mod record;

pub use framing::{decode_frame, encode_frame, Frame, MAGIC_BYTE};
pub use lookup::{DecodedRecord, RecordLookup};
pub use record::{full_name, nullable_schema, AvroRecord, SchemaMetadata};
