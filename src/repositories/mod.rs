pub(crate) mod revisions;
pub(crate) mod store;
pub(crate) mod submission_logs;
pub(crate) mod submissions;
