//! Price reads and the termination pixel check.

use anyhow::{Context, Result};
use tracing::debug;

use crate::services::Services;
use crate::session::{Color, Coordinate, Region};

/// Captures `region` and decodes a price. `Ok(None)` is a decode miss.
pub fn read_price(services: &Services, region: Region) -> Result<Option<f64>> {
    let image = services
        .sampler
        .capture(region)
        .with_context(|| format!("Failed to capture {}", region))?;
    let price = services.reader.read(&image)?;
    debug!("Read {:?} from {}", price, region);
    Ok(price)
}

/// Exact RGB comparison of the pixel at `at` against `expected`.
pub fn pixel_matches(services: &Services, at: Coordinate, expected: Color) -> Result<bool> {
    let actual = services
        .sampler
        .pixel_color(at)
        .with_context(|| format!("Failed to read pixel at {}", at))?;
    debug!("Probe at {}: {} (expecting {})", at, actual, expected);
    Ok(actual == expected)
}
