pub(crate) mod grading;
pub(crate) mod lifecycle;
pub(crate) mod record_finalize;
