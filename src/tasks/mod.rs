pub(crate) mod runner;
pub(crate) mod scheduler;
