pub mod filter;
pub mod linalg;
pub mod reshape;
pub mod summary;
pub mod vectorized;
