use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";
const TRAINEDDATA: &str = "eng.traineddata";

/// Standard install locations of the UB-Mannheim Windows build.
const COMMON_INSTALL_DIRS: [&str; 2] = [
    r"C:\Program Files\Tesseract-OCR",
    r"C:\Program Files (x86)\Tesseract-OCR",
];

#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Returns the directory for storing Tesseract files
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shopwatch")
        .join("tesseract")
}

/// Locates Tesseract and makes sure English trained data is available.
///
/// The executable must already be installed (app data dir, `PATH`, or a
/// standard install dir). Missing trained data is copied from a system
/// install or downloaded.
pub fn ensure_tesseract() -> Result<TesseractPaths> {
    let executable = find_tesseract_executable()?;
    info!("Tesseract executable: {}", executable.display());

    let tessdata = match find_tessdata_dir() {
        Ok(dir) => dir,
        Err(_) => {
            let local = get_tesseract_dir().join("tessdata");
            warn!("{} not found, downloading to {}", TRAINEDDATA, local.display());
            download_tessdata(&local)?;
            local
        }
    };
    info!("Tesseract data: {}", tessdata.display());

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Downloads English trained data into `tessdata_dir`.
fn download_tessdata(tessdata_dir: &Path) -> Result<()> {
    fs::create_dir_all(tessdata_dir)?;
    let target = tessdata_dir.join(TRAINEDDATA);
    let url = format!("{}/{}", TESSDATA_REPO, TRAINEDDATA);

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "shopwatch")
        .send()
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            TRAINEDDATA,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    fs::write(&target, &bytes)?;
    info!("Downloaded {} ({} bytes)", TRAINEDDATA, bytes.len());

    Ok(())
}

/// Finds the Tesseract executable, checking our local dir first, then system
pub fn find_tesseract_executable() -> Result<PathBuf> {
    let exe_name = if cfg!(windows) {
        "tesseract.exe"
    } else {
        "tesseract"
    };

    let local_exe = get_tesseract_dir().join(exe_name);
    if local_exe.exists() {
        return Ok(local_exe);
    }

    // Check PATH
    if let Ok(output) = Command::new("tesseract").arg("--version").output() {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    for dir in COMMON_INSTALL_DIRS {
        let candidate = Path::new(dir).join(exe_name);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Install Tesseract-OCR (https://github.com/UB-Mannheim/tesseract/releases) \
         or place it in {}",
        get_tesseract_dir().display()
    ))
}

/// Finds a tessdata directory containing English trained data.
pub fn find_tessdata_dir() -> Result<PathBuf> {
    let mut candidates = vec![get_tesseract_dir().join("tessdata")];
    candidates.extend(COMMON_INSTALL_DIRS.iter().map(|d| Path::new(d).join("tessdata")));

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }

    first_with_traineddata(&candidates).ok_or_else(|| {
        anyhow!("tessdata directory not found. Please ensure {} is available.", TRAINEDDATA)
    })
}

fn first_with_traineddata(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .find(|dir| dir.join(TRAINEDDATA).exists())
        .cloned()
}
