//! This crate fetches sports hall availability images from the AMIS calendar of Utrecht and
//! composes them into weekly overview charts.
//!
//! The images are read from <https://asp5.lvp.nl/amisweb/utrecht/amis1/amis.php>.

pub mod amis_client;
pub mod chart;
pub mod compositor;
pub mod config;
pub mod error;
pub mod grouper;
pub mod overview;
pub mod store;
pub mod weekday;

#[cfg(test)]
mod testing;
