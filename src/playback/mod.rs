pub mod clock;
pub mod view;
