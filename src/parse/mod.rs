pub mod collection_parser;
pub mod collection_serializer;
pub mod item_parser;
pub mod item_serializer;

pub use collection_parser::parse_collection;
pub use collection_serializer::serialize_collection;
pub use item_parser::parse_item_line;
pub use item_serializer::serialize_item;
