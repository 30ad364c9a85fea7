pub mod jwt;
pub mod logging;
