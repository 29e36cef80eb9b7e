pub mod bar;
pub mod cancel;
pub mod error;
pub mod period;
pub mod range;
pub mod zone;
