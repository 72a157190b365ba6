pub mod parsing;
pub mod search;
pub mod spans;
