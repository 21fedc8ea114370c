pub mod decode;
pub mod encode;
pub mod signal;
pub mod tabular;
