pub mod convert;
pub mod printers;
pub mod preferences;
