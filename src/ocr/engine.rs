use anyhow::{anyhow, Context, Result};
use image::GrayImage;
use std::path::Path;
use std::process::Command;
use tempfile::NamedTempFile;

/// Represents a line of OCR text with confidence score
#[derive(Debug, Clone)]
pub struct OcrLine {
    pub text: String,
    pub words: Vec<OcrWord>,
    pub confidence: f32,
}

/// Represents a single word from OCR with confidence score
#[derive(Debug, Clone)]
pub struct OcrWord {
    pub text: String,
    pub confidence: f32,
}

/// Characters Tesseract may emit for a price field.
const PRICE_WHITELIST: &str = "0123456789.,$¥€£";

/// Runs Tesseract in single-line mode on a binarized price region.
pub fn recognize_line(
    img: &GrayImage,
    tesseract_exe: &Path,
    tessdata_dir: &Path,
) -> Result<Vec<OcrLine>> {
    // Save image to temporary file
    let temp_input = NamedTempFile::with_suffix(".png")?;
    img.save(temp_input.path())?;

    // Tesseract appends .tsv to the output base
    let temp_output = NamedTempFile::new()?;
    let output_base = temp_output.path().to_string_lossy().to_string();

    let output = Command::new(tesseract_exe)
        .arg(temp_input.path())
        .arg(&output_base)
        .arg("--tessdata-dir")
        .arg(tessdata_dir)
        .arg("-l")
        .arg("eng")
        .arg("--psm")
        .arg("7") // Treat the image as a single text line
        .arg("-c")
        .arg(format!("tessedit_char_whitelist={}", PRICE_WHITELIST))
        .arg("tsv")
        .output()
        .with_context(|| format!("Failed to run {}", tesseract_exe.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("Tesseract failed: {}", stderr));
    }

    let tsv_path = format!("{}.tsv", output_base);
    let tsv_content = std::fs::read_to_string(&tsv_path)
        .map_err(|e| anyhow!("Failed to read Tesseract output: {}", e))?;
    let _ = std::fs::remove_file(&tsv_path);

    Ok(parse_tsv_output(&tsv_content))
}

/// Parses Tesseract TSV output into lines of words.
///
/// Only word-level rows (level 5) with non-empty text and a non-negative
/// confidence are kept. A line's confidence is the mean of its words.
pub fn parse_tsv_output(tsv: &str) -> Vec<OcrLine> {
    let mut lines: Vec<OcrLine> = Vec::new();
    let mut current_key: Option<(i32, i32, i32)> = None;
    let mut current_words: Vec<OcrWord> = Vec::new();

    // Skip header
    for row in tsv.lines().skip(1) {
        // level, page_num, block_num, par_num, line_num, word_num,
        // left, top, width, height, conf, text
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }

        let text = fields[11].trim();
        let conf: f32 = fields[10].trim().parse().unwrap_or(-1.0);
        if text.is_empty() || conf < 0.0 {
            continue;
        }

        let key = (
            fields[2].parse().unwrap_or(-1),
            fields[3].parse().unwrap_or(-1),
            fields[4].parse().unwrap_or(-1),
        );
        if current_key.is_some_and(|k| k != key) {
            flush_line(&mut lines, std::mem::take(&mut current_words));
        }
        current_key = Some(key);

        current_words.push(OcrWord {
            text: text.to_string(),
            confidence: conf,
        });
    }

    flush_line(&mut lines, current_words);
    lines
}

fn flush_line(lines: &mut Vec<OcrLine>, words: Vec<OcrWord>) {
    if words.is_empty() {
        return;
    }
    let confidence = words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32;
    let text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(OcrLine {
        text,
        words,
        confidence,
    });
}
