mod borrowed;
mod nom_parser;
pub mod tags;

pub use self::borrowed::RawLine;
