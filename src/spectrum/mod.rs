pub mod bands;
pub mod gain;
pub mod reconstruct;
pub mod transform;
