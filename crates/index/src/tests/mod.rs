//! Scenario tests across indexing, retrieval and processing.

mod doubles;
