//! Report generation
//!
//! For every region with new listings the writer produces a spreadsheet and
//! an HTML map in the configured output directory.

pub mod geocode;
pub mod map;
pub mod spreadsheet;

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::ReportConfig;
use crate::models::{CanonicalListing, RawAd};
use crate::utils::error::ReportError;

pub use geocode::Geocoder;
pub use map::{map_file_name, place_listings, MapRenderer};
pub use spreadsheet::{spreadsheet_file_name, write_spreadsheet};

/// Files produced for one region
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSet {
    pub spreadsheet: Option<PathBuf>,
    pub map: Option<PathBuf>,
}

impl ReportSet {
    /// Both artifacts exist
    pub fn is_complete(&self) -> bool {
        self.spreadsheet.is_some() && self.map.is_some()
    }
}

/// Writes spreadsheets and maps
pub struct ReportWriter {
    config: ReportConfig,
    geocoder: Option<Geocoder>,
    renderer: MapRenderer<'static>,
}

impl ReportWriter {
    /// Create a writer; the geocoder is built when enabled in config
    pub fn new(config: ReportConfig) -> Result<Self, ReportError> {
        let geocoder = if config.geocode {
            match Geocoder::new(&config) {
                Ok(geocoder) => Some(geocoder),
                Err(e) => {
                    warn!(error = %e, "Geocoder unavailable, maps use ad coordinates only");
                    None
                }
            }
        } else {
            None
        };

        Self::with_geocoder(config, geocoder)
    }

    /// Create a writer with an explicit geocoder
    pub fn with_geocoder(
        config: ReportConfig,
        geocoder: Option<Geocoder>,
    ) -> Result<Self, ReportError> {
        Ok(Self {
            config,
            geocoder,
            renderer: MapRenderer::new()?,
        })
    }

    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Remove previous reports if configured to do so
    pub fn prepare(&self) -> Result<(), ReportError> {
        if self.config.clean_on_start {
            clean_output_dir(&self.config.output_dir)?;
        }
        Ok(())
    }

    /// Write both reports for a region
    ///
    /// A failure of one artifact is logged and leaves its slot empty.
    pub async fn write_region(
        &self,
        region: &str,
        listings: &[CanonicalListing],
        raw_ads: &[RawAd],
        timestamp: NaiveDateTime,
    ) -> ReportSet {
        if listings.is_empty() {
            return ReportSet::default();
        }

        let spreadsheet = match self.write_spreadsheet(region, listings, timestamp) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(region = %region, error = %e, "Failed to write spreadsheet");
                None
            }
        };

        let map = match self.write_map(region, listings, raw_ads, timestamp).await {
            Ok(path) => path,
            Err(e) => {
                warn!(region = %region, error = %e, "Failed to write map");
                None
            }
        };

        ReportSet { spreadsheet, map }
    }

    /// Write the spreadsheet and return its path
    pub fn write_spreadsheet(
        &self,
        region: &str,
        listings: &[CanonicalListing],
        timestamp: NaiveDateTime,
    ) -> Result<PathBuf, ReportError> {
        std::fs::create_dir_all(&self.config.output_dir)?;
        let path = self
            .config
            .output_dir
            .join(spreadsheet_file_name(region, timestamp));

        write_spreadsheet(listings, &path)?;
        info!(path = %path.display(), rows = listings.len(), "Spreadsheet written");
        Ok(path)
    }

    /// Write the map and return its path; `None` when nothing could be placed
    pub async fn write_map(
        &self,
        region: &str,
        listings: &[CanonicalListing],
        raw_ads: &[RawAd],
        timestamp: NaiveDateTime,
    ) -> Result<Option<PathBuf>, ReportError> {
        let placed = place_listings(listings, raw_ads, self.geocoder.as_ref()).await;

        let Some(html) = self
            .renderer
            .render(region, &placed)?
        else {
            warn!(region = %region, "No listing could be placed, map not created");
            return Ok(None);
        };

        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let path = self.config.output_dir.join(map_file_name(region, timestamp));
        tokio::fs::write(&path, html).await?;

        info!(path = %path.display(), markers = placed.len(), "Map written");
        Ok(Some(path))
    }
}

/// Delete every file and subdirectory in `dir`; a missing directory is fine
pub fn clean_output_dir(dir: &Path) -> Result<(), ReportError> {
    if !dir.exists() {
        return Ok(());
    }

    let mut removed = 0usize;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
        removed += 1;
    }

    info!(dir = %dir.display(), removed, "Report directory cleaned");
    Ok(())
}
