//! Binary loading.
//!
//! Images are raw binaries placed at explicit physical addresses
//! (`path:addr` pairs on the reference CLI). ROM and RAM both accept
//! loads; everything else rejects them.

use std::fs;
use std::io;
use std::path::Path;

use crate::config::Config;

use super::emulator::SimError;
use super::system::System;

/// Reads a raw binary image from disk.
pub fn load_binary(path: &Path) -> io::Result<Vec<u8>> {
    fs::read(path)
}

/// Places every configured image into the system's memory.
pub fn apply_loads(system: &mut System, config: &Config) -> Result<(), SimError> {
    for image in &config.load {
        let data = load_binary(&image.path)?;
        system.load_image(image.address, &data)?;
    }
    Ok(())
}
