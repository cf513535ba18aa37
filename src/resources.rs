use std::{fs, path::Path};

use crate::{definitions::cpu, LoadError, MemoryError};

#[derive(Clone, Debug, PartialEq, Eq)]
/// Represents a single rom with it's information
pub struct Rom {
    /// The rom name
    name: String,
    /// The raw program image, placed verbatim at the program start
    data: Box<[u8]>,
}

impl Rom {
    /// Will generate a new rom based of the given data
    pub fn new(name: &str, data: &[u8]) -> Self {
        Rom {
            name: name.to_string(),
            data: data.into(),
        }
    }

    /// Will read the rom at the given path, the file name becomes
    /// the rom name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        log::info!("read rom '{}' with {} bytes", name, data.len());

        Ok(Rom {
            name,
            data: data.into_boxed_slice(),
        })
    }

    /// Will check that the rom fits into the program area of the memory.
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.data.len() > cpu::PROGRAM_SIZE {
            Err(MemoryError::OutOfBounds {
                address: cpu::PROGRAM_COUNTER,
                len: self.data.len(),
            })
        } else {
            Ok(())
        }
    }

    /// Will return a slice internal values of the given data
    pub fn get_data(&self) -> &[u8] {
        &self.data
    }

    /// Will return the name of the rom.
    pub fn get_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use std::{env, fs, process};

    use super::*;

    #[test]
    fn test_rom_from_path() {
        let path = env::temp_dir().join(format!("chip8-rom-{}.ch8", process::id()));
        fs::write(&path, [0x60, 0x05, 0x12, 0x00]).unwrap();

        let rom = Rom::from_path(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(rom.get_data(), &[0x60, 0x05, 0x12, 0x00]);
        assert_eq!(rom.get_name(), format!("chip8-rom-{}", process::id()));
        assert!(rom.validate().is_ok());
    }

    #[test]
    fn test_rom_missing_file() {
        let path = env::temp_dir().join("chip8-this-rom-does-not-exist.ch8");
        match Rom::from_path(&path) {
            Err(LoadError::Io { path: err_path, .. }) => assert_eq!(err_path, path),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_rom_too_large() {
        let fits = Rom::new("FITS", &[0xAA; cpu::PROGRAM_SIZE]);
        assert_eq!(Ok(()), fits.validate());

        let large = Rom::new("LARGE", &[0xAA; cpu::PROGRAM_SIZE + 1]);
        assert_eq!(
            Err(MemoryError::OutOfBounds {
                address: cpu::PROGRAM_COUNTER,
                len: cpu::PROGRAM_SIZE + 1
            }),
            large.validate()
        );
    }
}
