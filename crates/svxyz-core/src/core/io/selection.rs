use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("Invalid frame selection '{0}' (use an index like -1 or a slice like 0:10:2)")]
    Invalid(String),
    #[error("Slice step cannot be zero")]
    ZeroStep,
    #[error("Frame index {index} is out of range for {len} frames")]
    OutOfRange { index: isize, len: usize },
}

/// Which frames of a trajectory to use, written the way Python indexes sequences.
///
/// `3` and `-1` pick one frame; `:`, `10:`, `:-5`, `0:100:10` and `::-1` are slices with
/// the usual clamping rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSelection {
    Index(isize),
    Slice {
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    },
}

impl Default for FrameSelection {
    fn default() -> Self {
        FrameSelection::Index(-1)
    }
}

impl FrameSelection {
    pub fn all() -> Self {
        FrameSelection::Slice {
            start: None,
            stop: None,
            step: 1,
        }
    }

    pub fn is_single(&self) -> bool {
        matches!(self, FrameSelection::Index(_))
    }

    /// Resolves the selection against a trajectory of `len` frames.
    pub fn resolve(&self, len: usize) -> Result<Vec<usize>, SelectionError> {
        let n = len as isize;
        match *self {
            FrameSelection::Index(i) => {
                let idx = if i < 0 { n + i } else { i };
                if idx < 0 || idx >= n {
                    return Err(SelectionError::OutOfRange { index: i, len });
                }
                Ok(vec![idx as usize])
            }
            FrameSelection::Slice { start, stop, step } => {
                if step == 0 {
                    return Err(SelectionError::ZeroStep);
                }
                let normalize = |v: isize, lo: isize, hi: isize| {
                    let v = if v < 0 { v + n } else { v };
                    v.clamp(lo, hi)
                };
                let mut out = Vec::new();
                if step > 0 {
                    let s = start.map_or(0, |v| normalize(v, 0, n));
                    let e = stop.map_or(n, |v| normalize(v, 0, n));
                    let mut i = s;
                    while i < e {
                        out.push(i as usize);
                        i += step;
                    }
                } else {
                    let s = start.map_or(n - 1, |v| normalize(v, -1, n - 1));
                    let e = stop.map_or(-1, |v| normalize(v, -1, n - 1));
                    let mut i = s;
                    while i > e {
                        out.push(i as usize);
                        i += step;
                    }
                }
                Ok(out)
            }
        }
    }
}

impl FromStr for FrameSelection {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || SelectionError::Invalid(s.to_string());
        if !s.contains(':') {
            return s.parse().map(FrameSelection::Index).map_err(|_| invalid());
        }
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() > 3 {
            return Err(invalid());
        }
        let part = |i: usize| -> Result<Option<isize>, SelectionError> {
            match parts.get(i).map(|p| p.trim()) {
                None | Some("") => Ok(None),
                Some(p) => p.parse().map(Some).map_err(|_| invalid()),
            }
        };
        let step = part(2)?.unwrap_or(1);
        if step == 0 {
            return Err(SelectionError::ZeroStep);
        }
        Ok(FrameSelection::Slice {
            start: part(0)?,
            stop: part(1)?,
            step,
        })
    }
}

impl fmt::Display for FrameSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |v: Option<isize>| v.map(|v| v.to_string()).unwrap_or_default();
        match *self {
            FrameSelection::Index(i) => write!(f, "{}", i),
            FrameSelection::Slice { start, stop, step } if step == 1 => {
                write!(f, "{}:{}", opt(start), opt(stop))
            }
            FrameSelection::Slice { start, stop, step } => {
                write!(f, "{}:{}:{}", opt(start), opt(stop), step)
            }
        }
    }
}
