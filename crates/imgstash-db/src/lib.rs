//! Imgstash Database Library
//!
//! The image record store: the [`ImageRepository`] trait with a PostgreSQL
//! implementation and an in-memory one for tests and database-less runs.

pub mod db;

pub use db::{ImageRepository, InMemoryImageRepository, PgImageRepository};
