pub mod autoplay;
pub mod bus;
