//! Screen-space primitives shared by the session model and the controllers.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ConfigError;

/// Default width of a price region built around an anchor.
pub const DEFAULT_REGION_WIDTH: u32 = 160;
/// Default height of a price region built around an anchor.
pub const DEFAULT_REGION_HEIGHT: u32 = 70;

/// An integer point in screen space.
///
/// Persisted as a two-element array `[x, y]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<[i32; 2]> for Coordinate {
    fn from([x, y]: [i32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Coordinate> for [i32; 2] {
    fn from(c: Coordinate) -> Self {
        [c.x, c.y]
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A rectangular screen area sampled for pixels or OCR.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RegionRepr", into = "RegionRepr")]
pub struct Region {
    left: i32,
    top: i32,
    width: u32,
    height: u32,
}

#[derive(Serialize, Deserialize)]
struct RegionRepr {
    left: i32,
    top: i32,
    width: u32,
    height: u32,
}

impl TryFrom<RegionRepr> for Region {
    type Error = ConfigError;

    fn try_from(r: RegionRepr) -> Result<Self, Self::Error> {
        Region::new(Coordinate::new(r.left, r.top), r.width, r.height)
    }
}

impl From<Region> for RegionRepr {
    fn from(r: Region) -> Self {
        Self {
            left: r.left,
            top: r.top,
            width: r.width,
            height: r.height,
        }
    }
}

impl Region {
    /// Creates a region; width and height must both be positive.
    pub fn new(origin: Coordinate, width: u32, height: u32) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyRegion { width, height });
        }
        Ok(Self {
            left: origin.x,
            top: origin.y,
            width,
            height,
        })
    }

    /// Region of the default price size centered on `center`.
    pub fn around(center: Coordinate) -> Self {
        Self::around_with_size(center, DEFAULT_REGION_WIDTH, DEFAULT_REGION_HEIGHT)
    }

    /// Region of the given size centered on `center`, origin clamped to the screen edge.
    pub fn around_with_size(center: Coordinate, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            left: (center.x - (width / 2) as i32).max(0),
            top: (center.y - (height / 2) as i32).max(0),
            width,
            height,
        }
    }

    /// Builds a region spanning two captured corners.
    ///
    /// The bottom-right corner must lie strictly below and right of the top-left one.
    pub fn from_corners(top_left: Coordinate, bottom_right: Coordinate) -> Result<Self, ConfigError> {
        let width = bottom_right.x - top_left.x;
        let height = bottom_right.y - top_left.y;
        if width <= 0 || height <= 0 {
            return Err(ConfigError::InvertedCorners {
                top_left,
                bottom_right,
            });
        }
        Self::new(top_left, width as u32, height as u32)
    }

    pub fn origin(&self) -> Coordinate {
        Coordinate::new(self.left, self.top)
    }

    pub fn left(&self) -> i32 {
        self.left
    }

    pub fn top(&self) -> i32 {
        self.top
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            self.left + (self.width / 2) as i32,
            self.top + (self.height / 2) as i32,
        )
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        point.x >= self.left
            && point.y >= self.top
            && point.x < self.left + self.width as i32
            && point.y < self.top + self.height as i32
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.width, self.height, self.left, self.top
        )
    }
}

/// An RGB color, persisted as `[r, g, b]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `"r,g,b"` as typed into a settings field.
    pub fn parse(text: &str) -> Option<Self> {
        let parts: Vec<u8> = text
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::parse)
            .collect::<Result<_, _>>()
            .ok()?;
        match parts.as_slice() {
            [r, g, b] => Some(Self::new(*r, *g, *b)),
            _ => None,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl From<Color> for [u8; 3] {
    fn from(c: Color) -> Self {
        [c.r, c.g, c.b]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_around_centers_on_point() {
        let region = Region::around(Coordinate::new(500, 300));
        assert_eq!(region.origin(), Coordinate::new(420, 265));
        assert_eq!(region.width(), DEFAULT_REGION_WIDTH);
        assert_eq!(region.height(), DEFAULT_REGION_HEIGHT);
        assert!(region.contains(Coordinate::new(500, 300)));
    }

    #[test]
    fn test_region_around_clamps_to_screen_edge() {
        let region = Region::around(Coordinate::new(10, 5));
        assert_eq!(region.origin(), Coordinate::new(0, 0));
        assert_eq!(region.width(), DEFAULT_REGION_WIDTH);
    }

    #[test]
    fn test_region_rejects_zero_size() {
        assert!(Region::new(Coordinate::new(0, 0), 0, 10).is_err());
        assert!(Region::new(Coordinate::new(0, 0), 10, 0).is_err());
    }

    #[test]
    fn test_region_from_corners() {
        let region =
            Region::from_corners(Coordinate::new(100, 200), Coordinate::new(180, 230)).unwrap();
        assert_eq!(region.origin(), Coordinate::new(100, 200));
        assert_eq!((region.width(), region.height()), (80, 30));

        // Bottom-right above/left of top-left is rejected
        assert!(Region::from_corners(Coordinate::new(100, 200), Coordinate::new(90, 230)).is_err());
        assert!(Region::from_corners(Coordinate::new(100, 200), Coordinate::new(100, 230)).is_err());
    }

    #[test]
    fn test_region_json_rejects_empty() {
        let err = serde_json::from_str::<Region>(r#"{"left":0,"top":0,"width":0,"height":4}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_coordinate_and_color_serialize_as_arrays() {
        assert_eq!(
            serde_json::to_string(&Coordinate::new(3, -4)).unwrap(),
            "[3,-4]"
        );
        assert_eq!(
            serde_json::to_string(&Color::new(1, 2, 3)).unwrap(),
            "[1,2,3]"
        );
    }

    #[test]
    fn test_color_parse() {
        assert_eq!(Color::parse("255, 128,0"), Some(Color::new(255, 128, 0)));
        assert_eq!(Color::parse("255,128"), None);
        assert_eq!(Color::parse("300,0,0"), None);
        assert_eq!(Color::parse(""), None);
    }
}
