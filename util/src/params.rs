//! Parameter file loading
//!
//! Parameter files are TOML documents deserialised straight into the owning module's parameter
//! struct.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::Path;
use thiserror::Error;
use toml;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (ROUTE_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot load the parameter file {0:?}: {1}")]
    FileLoadError(std::path::PathBuf, std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the `$ROUTE_SW_ROOT/params` directory.
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    let mut path = crate::host::get_sw_root().map_err(|_| LoadError::SwRootNotSet)?;
    path.push("params");
    path.push(param_file_path);

    load_path(path)
}

/// Load a parameter file from an explicit path.
pub fn load_path<P, F>(path: F) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    F: AsRef<Path>,
{
    let params_str = read_to_string(path.as_ref())
        .map_err(|e| LoadError::FileLoadError(path.as_ref().to_path_buf(), e))?;

    from_str(&params_str)
}

/// Parse parameters from a TOML string.
pub fn from_str<P>(params_str: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    toml::from_str(params_str).map_err(LoadError::DeserialiseError)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Section {
        length_cm: f64,
        #[serde(default)]
        label: Option<String>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Doc {
        section: Section,
    }

    #[test]
    fn test_from_str() {
        let doc: Doc = from_str("[section]\nlength_cm = 200.0\n").unwrap();
        assert_eq!(
            doc,
            Doc {
                section: Section {
                    length_cm: 200.0,
                    label: None
                }
            }
        );

        assert!(matches!(
            from_str::<Doc>("[section]\nlength_cm = \"long\"\n"),
            Err(LoadError::DeserialiseError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_path::<Doc, _>("/definitely/not/a/params/file.toml"),
            Err(LoadError::FileLoadError(_, _))
        ));
    }
}
