//! Recognize Imperator save files and turn them into plaintext.
//!
//! A save starts with a one line header beginning with `SAV`. What follows is
//! either plaintext script (debug mode saves) or a zip based binary encoding.
//! Binary saves are handed to an external [`Melter`] which writes plaintext
//! to a file that is then read back in.
//!
//! ```text
//! open_save
//! ├── detect → SaveFormat
//! ├── Plaintext: read the save itself
//! └── CompressedBinary: Melter::melt(save, output), read output
//! ```

mod detect;
mod melt;
mod source;

pub use detect::*;
pub use melt::*;
pub use source::*;
