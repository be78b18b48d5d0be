pub(crate) mod answer_store;
pub(crate) mod attempt_error;
pub(crate) mod attempt_lifecycle;
pub(crate) mod expiry;
pub(crate) mod scoring;
