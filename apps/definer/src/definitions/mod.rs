// Definition generation: prompt template, prompt building, the batch runner
// and its CSV output. All LLM calls go through llm_client.

pub mod output;
pub mod prompt_builder;
pub mod runner;
pub mod template;
