pub(crate) mod evaluation;
pub(crate) mod media;
pub(crate) mod submission;
