use image::{GrayImage, Luma, RgbaImage};

/// Converts a captured region to luma using Rec. 601 weights.
pub fn to_grayscale(img: &RgbaImage) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output = GrayImage::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let [r, g, b, _] = pixel.0;
        let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
        output.put_pixel(x, y, Luma([luma as u8]));
    }

    output
}

/// Computes Otsu's threshold: the level that maximizes between-class variance.
pub fn otsu_threshold(img: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in img.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total = img.pixels().len() as f64;
    if total == 0.0 {
        return 127;
    }

    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut sum_background = 0.0;
    let mut weight_background = 0.0;
    let mut best_variance = -1.0;
    let mut best_level = 0u8;

    for (level, &count) in histogram.iter().enumerate() {
        weight_background += count as f64;
        if weight_background == 0.0 {
            continue;
        }
        let weight_foreground = total - weight_background;
        if weight_foreground == 0.0 {
            break;
        }

        sum_background += level as f64 * count as f64;
        let mean_background = sum_background / weight_background;
        let mean_foreground = (sum_all - sum_background) / weight_foreground;
        let diff = mean_background - mean_foreground;
        let variance = weight_background * weight_foreground * diff * diff;

        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }

    best_level
}

/// Binarizes a captured price region into dark text on a white background.
///
/// The Otsu level splits text from background. The minority class is taken
/// to be the text, so light-on-dark and dark-on-light panels both come out
/// as black glyphs, which is what Tesseract expects.
pub fn binarize_for_ocr(img: &RgbaImage) -> GrayImage {
    let gray = to_grayscale(img);
    let threshold = otsu_threshold(&gray);

    let bright = gray.pixels().filter(|p| p[0] > threshold).count();
    let text_is_bright = bright * 2 < gray.pixels().len();

    let mut output = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        let is_bright = pixel[0] > threshold;
        let value = if is_bright == text_is_bright {
            0u8 // Black (text)
        } else {
            255u8 // White (background)
        };
        output.put_pixel(x, y, Luma([value]));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// 10x4 panel with a 3x2 block of `text` on `background`.
    fn panel(background: [u8; 3], text: [u8; 3]) -> RgbaImage {
        RgbaImage::from_fn(10, 4, |x, y| {
            let [r, g, b] = if (2..5).contains(&x) && (1..3).contains(&y) {
                text
            } else {
                background
            };
            Rgba([r, g, b, 255])
        })
    }

    #[test]
    fn test_to_grayscale() {
        let img = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        let gray = to_grayscale(&img);
        assert_eq!(gray.get_pixel(0, 0)[0], 255);
        assert_eq!(gray.get_pixel(1, 0)[0], 0);
    }

    #[test]
    fn test_otsu_splits_two_levels() {
        let gray = to_grayscale(&panel([40, 40, 40], [220, 220, 220]));
        let threshold = otsu_threshold(&gray);
        assert!((40..220).contains(&threshold), "threshold {}", threshold);
    }

    #[test]
    fn test_binarize_light_text_on_dark_panel() {
        let result = binarize_for_ocr(&panel([30, 30, 30], [240, 240, 240]));
        assert_eq!(result.get_pixel(3, 1)[0], 0, "Text pixel should become black");
        assert_eq!(result.get_pixel(0, 0)[0], 255, "Background should become white");
    }

    #[test]
    fn test_binarize_dark_text_on_light_panel() {
        let result = binarize_for_ocr(&panel([240, 240, 240], [30, 30, 30]));
        assert_eq!(result.get_pixel(3, 1)[0], 0, "Text pixel should become black");
        assert_eq!(result.get_pixel(9, 3)[0], 255, "Background should become white");
    }

    #[test]
    fn test_uniform_image_is_all_background() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([90, 90, 90, 255]));
        let result = binarize_for_ocr(&img);
        assert!(result.pixels().all(|p| p[0] == 255));
    }
}
