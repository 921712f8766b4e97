#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// #![warn(clippy::cargo)]

pub mod blend;
pub mod config;
pub mod error;
pub mod flow;
pub mod geometry;
pub mod input;
pub mod margin;
pub mod observation;
pub mod pipeline;
pub mod prior;
pub mod raster;
pub mod report;

pub use error::Error;

pub type Result<T> = ::std::result::Result<T, Error>;
