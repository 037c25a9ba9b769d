//! JSON configuration files
//!
//! The bot keeps its own settings in `config.json` and each module may keep
//! one `config.<module>.json` next to it, all inside one directory.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{ser::PrettyFormatter, Map, Value};
use tracing::{debug, error, info};

use crate::error::{Error, Result};

/// Directory of JSON configuration files
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Create a store rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        info!("Config directory has been set to `{}`", dir.display());
        Self { dir }
    }

    /// Directory holding the files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for the bot config (`None`) or a module config
    #[must_use]
    pub fn filename(module: Option<&str>) -> String {
        match module {
            Some(module) => format!("config.{module}.json"),
            None => "config.json".to_string(),
        }
    }

    /// Full path of a config file
    #[must_use]
    pub fn path(&self, module: Option<&str>) -> PathBuf {
        self.dir.join(Self::filename(module))
    }

    /// Read a config file as a JSON object
    ///
    /// A missing, unreadable or non-object file yields an empty object; the
    /// failure is logged.
    pub fn open(&self, module: Option<&str>) -> Map<String, Value> {
        let path = self.path(module);
        match read_json(&path) {
            Ok(Some(Value::Object(map))) => map,
            Ok(Some(_)) => {
                error!("Config file '{}' does not hold a JSON object", path.display());
                Map::new()
            }
            Ok(None) => {
                debug!("Config file '{}' does not exist yet", path.display());
                Map::new()
            }
            Err(e) => {
                error!("Failed to load json file '{}': {}", path.display(), e);
                Map::new()
            }
        }
    }

    /// Write a JSON object to a config file
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, module: Option<&str>, data: &Map<String, Value>) -> Result<()> {
        self.write(module, data)
    }

    /// Read a config file into a typed value, falling back to `T::default()`
    pub fn load<T>(&self, module: Option<&str>) -> T
    where
        T: DeserializeOwned + Default,
    {
        let map = self.open(module);
        if map.is_empty() {
            return T::default();
        }
        match serde_json::from_value(Value::Object(map)) {
            Ok(value) => value,
            Err(e) => {
                error!(
                    "Invalid content in '{}': {}",
                    self.path(module).display(),
                    e
                );
                T::default()
            }
        }
    }

    /// Write a typed value to a config file
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized or written.
    pub fn store<T: Serialize>(&self, module: Option<&str>, value: &T) -> Result<()> {
        self.write(module, value)
    }

    fn write<T: Serialize + ?Sized>(&self, module: Option<&str>, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(module);
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
        value
            .serialize(&mut serializer)
            .map_err(|e| Error::Serialization(format!("{}: {e}", path.display())))?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        debug!("Saved '{}'", path.display());
        Ok(())
    }
}

fn read_json(path: &Path) -> Result<Option<Value>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let value = serde_json::from_reader(BufReader::new(file))?;
    Ok(Some(value))
}
