pub mod markdown;
pub mod surface;
