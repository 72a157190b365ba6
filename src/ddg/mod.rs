pub mod aggregate;
pub mod plots;
pub mod replicas;
