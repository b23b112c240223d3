pub mod app_state;
pub mod clock;
pub mod codec;
pub mod error;
pub mod validation;
