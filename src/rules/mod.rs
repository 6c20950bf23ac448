pub mod crossref;
pub mod duplicates;
pub mod filename;
pub mod table;
