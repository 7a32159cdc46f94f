pub mod avro_serde;
pub mod deserializer;
pub mod producer;
pub mod serializer;
pub mod subject_strategy;


pub use avro_serde::AvroSerde;
pub use deserializer::AvroDeserializer;
pub use producer::AvroProducer;
pub use serializer::AvroSerializer;
pub use subject_strategy::SubjectNameStrategy;
