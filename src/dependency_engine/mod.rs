pub mod catalog;
pub mod commands;
pub mod extractor;
pub mod graph;
pub mod parser;
pub mod sanitizer;

#[cfg(test)]
pub(crate) mod fakes;
