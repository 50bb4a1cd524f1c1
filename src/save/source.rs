use super::{detect, Melter, SaveFormat};
use crate::errors::{Error, LoadStage};
use crate::LoadOptions;
use std::fs::{self, File};
use std::path::PathBuf;
use tracing::info;

/// File name of the melted save inside the per-load temporary directory
pub const MELTED_SAVE_NAME: &str = "melted_save.rome";

/// Plaintext save data ready for tokenizing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSource {
    format: SaveFormat,
    data: Vec<u8>,
}

impl SaveSource {
    /// How the save was encoded on disk
    pub fn format(&self) -> SaveFormat {
        self.format
    }

    /// The plaintext script
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take the plaintext script
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Detect the save's encoding and produce its plaintext.
///
/// Compressed saves are melted exactly once. The melt output goes to the
/// configured path, or to a temporary directory that is removed once the
/// output has been read.
pub fn open_save(options: &LoadOptions, melter: &dyn Melter) -> Result<SaveSource, Error> {
    let path = options.save_path();
    let file = File::open(path).map_err(|e| Error::io(LoadStage::Detect, e))?;
    let format = detect(file)?;
    info!("Save format of {}: {}", path.display(), format);

    let data = match format {
        SaveFormat::Plaintext => {
            info!("Importing debug mode save");
            fs::read(path).map_err(|e| Error::io(LoadStage::Detect, e))?
        }
        SaveFormat::CompressedBinary => {
            info!("Importing compressed save");
            let (_dir, output) = match options.melt_output() {
                Some(output) => (None, output.to_path_buf()),
                None => {
                    let dir = tempfile::Builder::new()
                        .prefix("rome-melt")
                        .tempdir()
                        .map_err(|e| Error::io(LoadStage::Transcode, e))?;
                    let output: PathBuf = dir.path().join(MELTED_SAVE_NAME);
                    (Some(dir), output)
                }
            };

            melter.melt(path, &output)?;
            fs::read(&output).map_err(|e| Error::io(LoadStage::Transcode, e))?
        }
    };

    Ok(SaveSource { format, data })
}
