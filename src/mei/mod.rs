pub mod document;
pub mod ids;
pub mod kind;
pub mod primitive_parser;
pub mod reader;
pub mod writer;
