pub mod download;
pub mod transforms;
