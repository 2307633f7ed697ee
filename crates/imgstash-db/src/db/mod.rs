//! Image record repositories
//
// Repository trait and legacy back-fill rules
pub mod images;
//
// Implementations
pub mod memory;
pub mod postgres;

pub use images::ImageRepository;
pub use memory::InMemoryImageRepository;
pub use postgres::PgImageRepository;
