#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, QuizRepository, QuizResultRepository, ResultRow, Storage, StorageError,
};
