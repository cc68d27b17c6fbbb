#[macro_use]
extern crate custom_derive;
#[macro_use]
extern crate enum_derive;

pub mod config;
pub mod error;
pub mod event;
pub mod histogram;
pub mod io;
pub mod kinematics;
pub mod reconstruct;
pub mod run;
pub mod selection;

pub use error::{Error, Result};
