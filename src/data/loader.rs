//! CSV Data Loader Module
//! Reads the wide-form sales table, handling the UTF-8 / CP949 encoding split.

use crate::data::processor::{DataProcessor, ObservationTable};
use encoding_rs::EUC_KR;
use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const UTF8_BOM: &str = "\u{feff}";

#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is neither valid UTF-8 nor CP949 text")]
    Undecodable { path: PathBuf },
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] PolarsError),
    #[error("Period column '{0}' not found in header")]
    MissingPeriodColumn(String),
}

/// Text encodings the source file may arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    Cp949,
}

/// Loads the sales CSV into the canonical long-form table.
pub struct DataLoader;

impl DataLoader {
    /// Load and reshape a file in one go.
    pub fn load_observations(
        path: &Path,
        period_column: &str,
    ) -> Result<ObservationTable, DataLoadError> {
        let (text, encoding) = Self::read_source(path)?;
        info!(path = %path.display(), ?encoding, "read source file");

        let wide = Self::parse_wide(&text)?;
        debug!(
            rows = wide.height(),
            columns = wide.width(),
            "parsed wide table"
        );

        DataProcessor::melt_regions(&wide, period_column)
    }

    /// Read the file and decode it, trying UTF-8 first and CP949 second.
    pub fn read_source(path: &Path) -> Result<(String, SourceEncoding), DataLoadError> {
        let bytes = std::fs::read(path).map_err(|source| DataLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::decode(bytes).ok_or_else(|| DataLoadError::Undecodable {
            path: path.to_path_buf(),
        })
    }

    fn decode(bytes: Vec<u8>) -> Option<(String, SourceEncoding)> {
        match String::from_utf8(bytes) {
            Ok(text) => {
                let text = match text.strip_prefix(UTF8_BOM) {
                    Some(stripped) => stripped.to_string(),
                    None => text,
                };
                Some((text, SourceEncoding::Utf8))
            }
            Err(err) => {
                let bytes = err.into_bytes();
                debug!("source is not UTF-8, falling back to CP949");
                // WHATWG euc-kr is the CP949 superset
                EUC_KR
                    .decode_without_bom_handling_and_without_replacement(&bytes)
                    .map(|text| (text.into_owned(), SourceEncoding::Cp949))
            }
        }
    }

    /// Parse decoded CSV text. Every column is read as a string; numeric
    /// coercion happens during the reshape.
    pub fn parse_wide(text: &str) -> Result<DataFrame, DataLoadError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(text.as_bytes().to_vec()))
            .finish()?;
        Ok(df)
    }
}
