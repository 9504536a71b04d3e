#[macro_use]
extern crate failure;

pub mod alert;
pub mod channel;
pub mod clock;
pub mod config;
pub mod consensus;
pub mod db;
pub mod detector;
pub mod matcher;
pub mod pipeline;
pub mod plate;
pub mod scheduler;
pub mod settings;
pub mod source;
#[cfg(feature = "tesseract")]
pub mod tesseract;
pub mod tracker;
pub mod types;
