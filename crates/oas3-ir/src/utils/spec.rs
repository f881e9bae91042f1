use std::{ffi::OsStr, path::Path};

use fmmap::tokio::{AsyncMmapFile, AsyncMmapFileExt};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpecFormat {
  #[default]
  Json,
  Yaml,
}

impl SpecFormat {
  #[must_use]
  pub fn from_extension(ext: &str) -> Self {
    match ext {
      "yaml" | "yml" => Self::Yaml,
      _ => Self::Json,
    }
  }
}

/// Loads a bundled OpenAPI document into the raw working model.
///
/// Both formats deserialize straight into a [`Value`], so extension keywords
/// (`x-omit`, `x-pick`) and OpenAPI 3.0 keywords such as `nullable` survive
/// untouched.
pub struct SpecLoader {
  file: AsyncMmapFile,
  format: SpecFormat,
}

impl SpecLoader {
  pub async fn open(path: &Path) -> anyhow::Result<Self> {
    let format = path
      .extension()
      .and_then(OsStr::to_str)
      .map_or(SpecFormat::default(), SpecFormat::from_extension);

    let file = AsyncMmapFile::open(path).await?;

    Ok(Self { file, format })
  }

  pub fn format(&self) -> SpecFormat {
    self.format
  }

  pub fn parse(&self) -> anyhow::Result<Value> {
    let document = match self.format {
      SpecFormat::Json => serde_json::from_slice::<Value>(self.file.as_slice())?,
      SpecFormat::Yaml => serde_yaml::from_slice::<Value>(self.file.as_slice())?,
    };

    if !document.is_object() {
      anyhow::bail!("OpenAPI document root must be an object");
    }
    Ok(document)
  }
}
