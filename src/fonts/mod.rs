//! Font lookup for the report renderer.
//!
//! genpdf embeds TrueType fonts, so a family of four files (regular, bold,
//! italic, bold italic) has to be found on disk. The `Roboto` family is
//! searched in this order:
//!
//! 1. the directory configured as `report.fonts_dir`,
//! 2. `MEDREPORT_FONTS_DIR`,
//! 3. `assets/fonts` next to the running executable,
//! 4. `assets/fonts` inside this crate.
//!
//! When none of them holds the family, well-known system families are tried:
//! Liberation Sans and DejaVu Sans on Linux, Arial on Windows (its directory
//! can be pinned with `MEDREPORT_WINDOWS_FONTS_DIR`).

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::{Error, ErrorKind};
use genpdf::fonts::{self, FontData, FontFamily};
use log::{debug, warn};

/// Name of the preferred font family.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "Roboto";

/// Environment variable pointing at a directory with the preferred family.
pub const FONTS_DIR_ENV: &str = "MEDREPORT_FONTS_DIR";

/// Environment variable pointing at the Windows fonts directory.
pub const WINDOWS_FONTS_DIR_ENV: &str = "MEDREPORT_WINDOWS_FONTS_DIR";

const FONT_FILES: &[&str] = &[
    "Roboto-Regular.ttf",
    "Roboto-Bold.ttf",
    "Roboto-Italic.ttf",
    "Roboto-BoldItalic.ttf",
];

/// A family installed by the operating system.
struct SystemFamily {
    name: &'static str,
    directories: &'static [&'static str],
    regular: &'static str,
    bold: &'static str,
    italic: &'static str,
    bold_italic: &'static str,
}

const LIBERATION_SANS: SystemFamily = SystemFamily {
    name: "Liberation Sans",
    directories: &[
        "/usr/share/fonts/truetype/liberation",
        "/usr/share/fonts/truetype/liberation2",
        "/usr/share/fonts/liberation-sans",
        "/usr/share/fonts/liberation",
    ],
    regular: "LiberationSans-Regular.ttf",
    bold: "LiberationSans-Bold.ttf",
    italic: "LiberationSans-Italic.ttf",
    bold_italic: "LiberationSans-BoldItalic.ttf",
};

const DEJAVU_SANS: SystemFamily = SystemFamily {
    name: "DejaVu Sans",
    directories: &["/usr/share/fonts/truetype/dejavu", "/usr/share/fonts/dejavu"],
    regular: "DejaVuSans.ttf",
    bold: "DejaVuSans-Bold.ttf",
    italic: "DejaVuSans-Oblique.ttf",
    bold_italic: "DejaVuSans-BoldOblique.ttf",
};

const WINDOWS_ARIAL: SystemFamily = SystemFamily {
    name: "Arial",
    directories: &[],
    regular: "arial.ttf",
    bold: "arialbd.ttf",
    italic: "ariali.ttf",
    bold_italic: "arialbi.ttf",
};

impl SystemFamily {
    fn files(&self) -> [&'static str; 4] {
        [self.regular, self.bold, self.italic, self.bold_italic]
    }

    fn locate(&self, extra: &[PathBuf]) -> Option<PathBuf> {
        extra
            .iter()
            .cloned()
            .chain(self.directories.iter().map(PathBuf::from))
            .find(|dir| self.files().iter().all(|file| dir.join(file).is_file()))
    }

    fn load(&self, directory: &Path) -> Result<FontFamily<FontData>, Error> {
        let load = |file: &str| {
            let path = directory.join(file);
            FontData::load(&path, None).map_err(|err| {
                Error::new(
                    format!("Failed to load {} font at {}: {}", self.name, path.display(), err),
                    io::Error::new(io::ErrorKind::Other, err.to_string()),
                )
            })
        };

        Ok(FontFamily {
            regular: load(self.regular)?,
            bold: load(self.bold)?,
            italic: load(self.italic)?,
            bold_italic: load(self.bold_italic)?,
        })
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var).and_then(|value| {
        let path = PathBuf::from(value);
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    })
}

fn font_directory_candidates(configured: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    let mut push = |candidate: PathBuf| {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    };

    if let Some(dir) = configured {
        push(dir.to_path_buf());
    }

    if let Some(dir) = env_path(FONTS_DIR_ENV) {
        push(dir);
    }

    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            push(bin_dir.join("assets/fonts"));
        }
    }

    push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts"));

    candidates
}

fn missing_font_files(path: &Path) -> Vec<&'static str> {
    FONT_FILES
        .iter()
        .copied()
        .filter(|name| !path.join(name).is_file())
        .collect()
}

fn resolve_font_directory(configured: Option<&Path>) -> Result<PathBuf, Error> {
    let mut attempts = Vec::new();

    for candidate in font_directory_candidates(configured) {
        if !candidate.is_dir() {
            attempts.push(format!("{} (directory missing)", candidate.display()));
            continue;
        }

        let missing = missing_font_files(&candidate);
        if missing.is_empty() {
            return Ok(candidate);
        }
        attempts.push(format!(
            "{} (missing files [{}])",
            candidate.display(),
            missing.join(", ")
        ));
    }

    Err(Error::new(
        format!(
            "Unable to locate the {} font family. Checked: {}. Set {} or report.fonts_dir.",
            DEFAULT_FONT_FAMILY_NAME,
            attempts.join(", "),
            FONTS_DIR_ENV
        ),
        io::Error::new(io::ErrorKind::NotFound, "font directory not found"),
    ))
}

fn load_preferred_family(configured: Option<&Path>) -> Result<FontFamily<FontData>, Error> {
    let directory = resolve_font_directory(configured)?;
    debug!("loading {} fonts from {}", DEFAULT_FONT_FAMILY_NAME, directory.display());

    fonts::from_files(&directory, DEFAULT_FONT_FAMILY_NAME, None).map_err(|err| {
        Error::new(
            format!(
                "Failed to load font family '{}' from {}: {}",
                DEFAULT_FONT_FAMILY_NAME,
                directory.display(),
                err
            ),
            io::Error::new(io::ErrorKind::Other, err.to_string()),
        )
    })
}

fn windows_font_directories() -> Vec<PathBuf> {
    let mut directories = Vec::new();
    if let Some(path) = env_path(WINDOWS_FONTS_DIR_ENV) {
        directories.push(path);
    }

    #[cfg(windows)]
    for var in ["WINDIR", "SystemRoot"] {
        if let Some(root) = env_path(var) {
            directories.push(root.join("Fonts"));
        }
    }

    directories
}

fn locate_system_family() -> Option<(&'static SystemFamily, PathBuf)> {
    [&LIBERATION_SANS, &DEJAVU_SANS]
        .into_iter()
        .find_map(|family| family.locate(&[]).map(|dir| (family, dir)))
        .or_else(|| {
            WINDOWS_ARIAL
                .locate(&windows_font_directories())
                .map(|dir| (&WINDOWS_ARIAL, dir))
        })
}

fn system_fallback_family() -> Result<FontFamily<FontData>, Error> {
    let (family, directory) = locate_system_family().ok_or_else(|| {
        Error::new(
            "No system font family found for fallback",
            io::Error::new(io::ErrorKind::NotFound, "system fonts not found"),
        )
    })?;

    let loaded = family.load(&directory)?;
    warn!(
        "{} fonts unavailable; falling back to system '{}' family in {}",
        DEFAULT_FONT_FAMILY_NAME,
        family.name,
        directory.display()
    );
    Ok(loaded)
}

fn fonts_missing(err: &Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::IoError(io_err)
            if io_err.kind() == io::ErrorKind::NotFound
                || io_err.kind() == io::ErrorKind::PermissionDenied
    )
}

/// Loads the preferred family, falling back to a system family when its files
/// cannot be found.
pub fn font_family(configured: Option<&Path>) -> Result<FontFamily<FontData>, Error> {
    match load_preferred_family(configured) {
        Ok(family) => Ok(family),
        Err(err) if fonts_missing(&err) => system_fallback_family().map_err(|fallback_err| {
            warn!("{}; system fallback failed: {}", err, fallback_err);
            Error::new(
                format!("{err}; system fallback failed: {fallback_err}"),
                io::Error::new(io::ErrorKind::NotFound, "no usable fonts"),
            )
        }),
        Err(err) => Err(err),
    }
}

/// Indicates whether [`font_family`] can find a family without loading it.
pub fn fonts_available(configured: Option<&Path>) -> bool {
    resolve_font_directory(configured).is_ok() || locate_system_family().is_some()
}
