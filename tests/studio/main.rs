//! Project model integration tests against in-memory collaborators.


mod inspect;
mod learning;
mod persistence;
mod uploads;
