pub mod convert;
pub mod interactive;
pub mod lists;
