pub mod measurement;
pub mod subscription;
