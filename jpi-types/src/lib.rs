pub mod device;
pub mod error;
pub mod flight;
pub mod sensor;

pub use device::*;
pub use error::*;
pub use flight::*;
pub use sensor::*;
