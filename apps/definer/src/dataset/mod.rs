// Input side of the batch: load the key-phrase CSV and partition it into
// (term, legislation) groups. Nothing here talks to the LLM.

pub mod grouping;
pub mod loader;
pub mod models;
