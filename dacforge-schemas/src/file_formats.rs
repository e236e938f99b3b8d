use crate::embodied::{EmbodiedInfrastructureItem, SorbentBatch};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct EmbodiedFile {
    pub schema_version: String,
    #[serde(default)]
    pub infrastructure: Vec<EmbodiedInfrastructureItem>,
    #[serde(default)]
    pub sorbent_batches: Vec<SorbentBatch>,
}
