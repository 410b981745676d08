//! How files move from the store into a project.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// File materialization strategy for the linker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// Hardlink each file, copying when the link fails
    #[default]
    Hardlink,
    /// Symlink each file, copying when the link fails
    Symlink,
    /// Always copy bytes
    Copy,
}

impl FromStr for LinkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hardlink" => Ok(LinkMode::Hardlink),
            "symlink" => Ok(LinkMode::Symlink),
            "copy" => Ok(LinkMode::Copy),
            other => Err(format!(
                "unknown link mode '{}', expected hardlink, symlink or copy",
                other
            )),
        }
    }
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkMode::Hardlink => "hardlink",
            LinkMode::Symlink => "symlink",
            LinkMode::Copy => "copy",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_mode_parsing() {
        assert_eq!("hardlink".parse::<LinkMode>(), Ok(LinkMode::Hardlink));
        assert_eq!("Symlink".parse::<LinkMode>(), Ok(LinkMode::Symlink));
        assert_eq!("copy".parse::<LinkMode>(), Ok(LinkMode::Copy));
        assert!("reflink".parse::<LinkMode>().is_err());
        assert_eq!(LinkMode::default().to_string(), "hardlink");
    }
}
