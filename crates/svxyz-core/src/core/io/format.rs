use crate::core::io::cif::{CifError, CifFile};
use crate::core::io::extxyz::{ExtXyzError, ExtXyzFile};
use crate::core::io::outcar::{OutcarError, OutcarFile};
use crate::core::io::poscar::{PoscarError, PoscarFile};
use crate::core::io::traits::{TrajectoryReader, TrajectoryWriter};
use crate::core::io::vasprun::{VasprunError, VasprunFile};
use crate::core::models::frame::Frame;
use phf::{Map, phf_map};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// A structure or trajectory file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    /// Extended XYZ, which also reads plain XYZ.
    ExtXyz,
    /// VASP POSCAR/CONTCAR.
    Vasp,
    /// VASP OUTCAR (read only).
    VaspOut,
    /// VASP vasprun.xml (read only).
    VaspXml,
    /// Crystallographic Information File in P 1 (write only).
    Cif,
}

static FORMAT_NAMES: Map<&'static str, FileFormat> = phf_map! {
    "extxyz" => FileFormat::ExtXyz,
    "xyz" => FileFormat::ExtXyz,
    "vasp" => FileFormat::Vasp,
    "poscar" => FileFormat::Vasp,
    "contcar" => FileFormat::Vasp,
    "vasp-out" => FileFormat::VaspOut,
    "outcar" => FileFormat::VaspOut,
    "vasp-xml" => FileFormat::VaspXml,
    "vasprun" => FileFormat::VaspXml,
    "xml" => FileFormat::VaspXml,
    "cif" => FileFormat::Cif,
};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("Unknown file format '{0}' (known: extxyz, xyz, vasp, vasp-out, vasp-xml, cif)")]
    UnknownFormat(String),
    #[error("Cannot detect the format of '{0}'; set it explicitly")]
    Undetectable(PathBuf),
    #[error("Format '{0}' can only be read")]
    ReadOnly(FileFormat),
    #[error("Format '{0}' can only be written")]
    WriteOnly(FileFormat),
    #[error("Format '{format}' holds one frame per file but {count} frames were given")]
    TooManyFrames { format: FileFormat, count: usize },
    #[error("Failed to process extended XYZ file '{path}': {source}")]
    ExtXyz {
        path: PathBuf,
        #[source]
        source: ExtXyzError,
    },
    #[error("Failed to process POSCAR file '{path}': {source}")]
    Poscar {
        path: PathBuf,
        #[source]
        source: PoscarError,
    },
    #[error("Failed to read OUTCAR file '{path}': {source}")]
    Outcar {
        path: PathBuf,
        #[source]
        source: OutcarError,
    },
    #[error("Failed to read vasprun.xml file '{path}': {source}")]
    Vasprun {
        path: PathBuf,
        #[source]
        source: VasprunError,
    },
    #[error("Failed to write CIF file '{path}': {source}")]
    Cif {
        path: PathBuf,
        #[source]
        source: CifError,
    },
}

impl FileFormat {
    pub fn name(self) -> &'static str {
        match self {
            FileFormat::ExtXyz => "extxyz",
            FileFormat::Vasp => "vasp",
            FileFormat::VaspOut => "vasp-out",
            FileFormat::VaspXml => "vasp-xml",
            FileFormat::Cif => "cif",
        }
    }

    pub fn is_writable(self) -> bool {
        matches!(self, FileFormat::ExtXyz | FileFormat::Vasp | FileFormat::Cif)
    }

    pub fn is_multi_frame(self) -> bool {
        match self {
            FileFormat::ExtXyz => ExtXyzFile::MULTI_FRAME,
            FileFormat::Vasp => PoscarFile::MULTI_FRAME,
            FileFormat::Cif => CifFile::MULTI_FRAME,
            FileFormat::VaspOut | FileFormat::VaspXml => true,
        }
    }

    /// Guesses the format from a file name, the way VASP and ASE users name files.
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());

        if name.starts_with("poscar") || name.starts_with("contcar") {
            return Some(FileFormat::Vasp);
        }
        if name.starts_with("outcar") {
            return Some(FileFormat::VaspOut);
        }
        if name.starts_with("vasprun") {
            return Some(FileFormat::VaspXml);
        }
        match extension.as_deref() {
            Some("xyz") | Some("extxyz") => Some(FileFormat::ExtXyz),
            Some("vasp") | Some("poscar") => Some(FileFormat::Vasp),
            Some("xml") => Some(FileFormat::VaspXml),
            Some("cif") => Some(FileFormat::Cif),
            _ => None,
        }
    }

    /// Uses `explicit` when given, otherwise detects from the file name.
    pub fn resolve(explicit: Option<FileFormat>, path: &Path) -> Result<Self, IoError> {
        explicit
            .or_else(|| Self::detect(path))
            .ok_or_else(|| IoError::Undetectable(path.to_path_buf()))
    }
}

impl FromStr for FileFormat {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FORMAT_NAMES
            .get(s.trim().to_lowercase().as_str())
            .copied()
            .ok_or_else(|| IoError::UnknownFormat(s.to_string()))
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reads every frame of `path`.
pub fn read_frames(path: &Path, format: Option<FileFormat>) -> Result<Vec<Frame>, IoError> {
    let format = FileFormat::resolve(format, path)?;
    let path_buf = path.to_path_buf();
    match format {
        FileFormat::ExtXyz => ExtXyzFile::read_frames_from_path(path)
            .map_err(|source| IoError::ExtXyz { path: path_buf, source }),
        FileFormat::Vasp => PoscarFile::read_frames_from_path(path)
            .map_err(|source| IoError::Poscar { path: path_buf, source }),
        FileFormat::VaspOut => OutcarFile::read_frames_from_path(path)
            .map_err(|source| IoError::Outcar { path: path_buf, source }),
        FileFormat::VaspXml => VasprunFile::read_frames_from_path(path)
            .map_err(|source| IoError::Vasprun { path: path_buf, source }),
        FileFormat::Cif => Err(IoError::WriteOnly(format)),
    }
}

/// Writes `frames` to `path`, refusing read-only formats and overfull single-frame files.
pub fn write_frames(path: &Path, frames: &[Frame], format: Option<FileFormat>) -> Result<(), IoError> {
    let format = FileFormat::resolve(format, path)?;
    if !format.is_writable() {
        return Err(IoError::ReadOnly(format));
    }
    if !format.is_multi_frame() && frames.len() != 1 {
        return Err(IoError::TooManyFrames {
            format,
            count: frames.len(),
        });
    }
    let path_buf = path.to_path_buf();
    match format {
        FileFormat::ExtXyz => ExtXyzFile::write_frames_to_path(frames, path)
            .map_err(|source| IoError::ExtXyz { path: path_buf, source }),
        FileFormat::Vasp => PoscarFile::write_frames_to_path(frames, path)
            .map_err(|source| IoError::Poscar { path: path_buf, source }),
        FileFormat::Cif => CifFile::write_frames_to_path(frames, path)
            .map_err(|source| IoError::Cif { path: path_buf, source }),
        FileFormat::VaspOut | FileFormat::VaspXml => Err(IoError::ReadOnly(format)),
    }
}
