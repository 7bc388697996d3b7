pub mod dataset;
pub mod error;
pub mod filter;
pub mod geo;
pub mod geolocation;
pub mod interaction;
pub mod layout;
pub mod loader;
pub mod logging;
pub mod session;
pub mod util;
pub mod zoom;

pub use error::LandscapeError;
