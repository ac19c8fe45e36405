pub(crate) mod error;
pub(crate) mod evaluator;
pub(crate) mod media;
pub(crate) mod orchestrator;
pub(crate) mod revisions;
pub(crate) mod storage;
