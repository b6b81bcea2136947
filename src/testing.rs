//! Scripted stand-ins for the screen, OCR and input seams.

use anyhow::{anyhow, Result};
use image::{Rgba, RgbaImage};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use crate::capture::ScreenSampler;
use crate::input::{InputDriver, KeyName, MouseButton};
use crate::ocr::NumberReader;
use crate::session::{Color, Coordinate, Region};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

/// Returns blank captures and a scripted sequence of pixel colors.
///
/// Once the color queue is exhausted the last color repeats.
#[derive(Default)]
pub struct FakeSampler {
    colors: Mutex<VecDeque<Color>>,
    last_color: Mutex<Option<Color>>,
    captures: Mutex<Vec<Region>>,
    probes: Mutex<Vec<Coordinate>>,
    fail_captures: bool,
}

impl FakeSampler {
    pub fn with_colors(colors: impl IntoIterator<Item = Color>) -> Self {
        Self {
            colors: Mutex::new(colors.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_captures: true,
            ..Default::default()
        }
    }

    pub fn captured_regions(&self) -> Vec<Region> {
        lock(&self.captures).clone()
    }

    pub fn probed_points(&self) -> Vec<Coordinate> {
        lock(&self.probes).clone()
    }
}

impl ScreenSampler for FakeSampler {
    fn capture(&self, region: Region) -> Result<RgbaImage> {
        if self.fail_captures {
            return Err(anyhow!("capture unavailable"));
        }
        lock(&self.captures).push(region);
        Ok(RgbaImage::from_pixel(
            region.width(),
            region.height(),
            Rgba([0, 0, 0, 255]),
        ))
    }

    fn pixel_color(&self, at: Coordinate) -> Result<Color> {
        lock(&self.probes).push(at);
        let mut last = lock(&self.last_color);
        if let Some(color) = lock(&self.colors).pop_front() {
            *last = Some(color);
        }
        Ok(last.unwrap_or(Color::new(0, 0, 0)))
    }
}

/// Yields a scripted sequence of readings, then `None` forever.
#[derive(Default)]
pub struct FakeReader {
    readings: Mutex<VecDeque<Option<f64>>>,
    calls: Mutex<usize>,
}

impl FakeReader {
    pub fn new(readings: impl IntoIterator<Item = Option<f64>>) -> Self {
        Self {
            readings: Mutex::new(readings.into_iter().collect()),
            calls: Mutex::new(0),
        }
    }

    /// Always reads `price`.
    pub fn constant(price: f64) -> ConstantReader {
        ConstantReader(price)
    }

    pub fn calls(&self) -> usize {
        *lock(&self.calls)
    }
}

impl NumberReader for FakeReader {
    fn read(&self, _image: &RgbaImage) -> Result<Option<f64>> {
        *lock(&self.calls) += 1;
        Ok(lock(&self.readings).pop_front().flatten())
    }
}

pub struct ConstantReader(f64);

impl NumberReader for ConstantReader {
    fn read(&self, _image: &RgbaImage) -> Result<Option<f64>> {
        Ok(Some(self.0))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputCall {
    Move(Coordinate),
    Click(Coordinate, MouseButton),
    Press(KeyName),
}

/// Records every injected action with the time it happened.
#[derive(Default)]
pub struct FakeInput {
    calls: Mutex<Vec<(Instant, InputCall)>>,
}

impl FakeInput {
    pub fn calls(&self) -> Vec<InputCall> {
        lock(&self.calls).iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        lock(&self.calls).iter().map(|(t, _)| *t).collect()
    }

    pub fn clicks(&self) -> Vec<Coordinate> {
        lock(&self.calls)
            .iter()
            .filter_map(|(_, c)| match c {
                InputCall::Click(at, _) => Some(*at),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: InputCall) {
        lock(&self.calls).push((Instant::now(), call));
    }
}

impl InputDriver for FakeInput {
    fn move_to(&self, at: Coordinate) -> Result<()> {
        self.push(InputCall::Move(at));
        Ok(())
    }

    fn click(&self, at: Coordinate, button: MouseButton) -> Result<()> {
        self.push(InputCall::Click(at, button));
        Ok(())
    }

    fn press(&self, key: &KeyName) -> Result<()> {
        self.push(InputCall::Press(key.clone()));
        Ok(())
    }
}
