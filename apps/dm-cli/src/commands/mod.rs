pub mod analyse;
pub mod merge;
