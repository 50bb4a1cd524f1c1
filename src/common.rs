//! Calendar types shared by the save and the script files
mod date;

pub use self::date::*;
