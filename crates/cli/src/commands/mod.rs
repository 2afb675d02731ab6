pub mod compare;
pub mod projection;
pub mod seed;
pub mod strategies;
