pub mod filtering;
pub mod shared;
