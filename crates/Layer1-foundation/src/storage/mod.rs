//! Storage module for repomap
//!
//! - `json`: JSON - 범용 파일 저장/로드 (원자적 쓰기)

mod json;

pub use json::JsonStore;
