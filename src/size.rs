// size.rs
use crate::error::EstimationError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PERCENTAGE: f64 = 50.0;
pub const MAX_PERCENTAGE: f64 = 99.0;
const MIN_ABSOLUTE_VALUE: f64 = 0.1;
const UNIT_FACTOR: f64 = 1024.0;
const BYTE_SUFFIXES: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];
const OUTPUT_SUFFIX: &str = "-compressed";
const OUTPUT_EXTENSION: &str = "jpg";

/// Size denominations, in the order the unit selector lists them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeUnit {
    Percent,
    B,
    KB,
    MB,
    GB,
    TB,
    PB,
    EB,
}

impl SizeUnit {
    pub const ALL: [SizeUnit; 8] = [
        SizeUnit::Percent,
        SizeUnit::B,
        SizeUnit::KB,
        SizeUnit::MB,
        SizeUnit::GB,
        SizeUnit::TB,
        SizeUnit::PB,
        SizeUnit::EB,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn is_percent(self) -> bool {
        self == SizeUnit::Percent
    }

    pub fn label(self) -> &'static str {
        match self {
            SizeUnit::Percent => "%",
            SizeUnit::B => "B",
            SizeUnit::KB => "KB",
            SizeUnit::MB => "MB",
            SizeUnit::GB => "GB",
            SizeUnit::TB => "TB",
            SizeUnit::PB => "PB",
            SizeUnit::EB => "EB",
        }
    }

    /// Bytes in one of this unit. Percent has no byte value and reports 1.
    pub fn bytes_per_unit(self) -> f64 {
        match self {
            SizeUnit::Percent => 1.0,
            unit => UNIT_FACTOR.powi(unit.index() as i32 - 1),
        }
    }

    /// The next smaller absolute unit, never stepping into percent.
    fn smaller(self) -> Option<Self> {
        self.index()
            .checked_sub(1)
            .and_then(Self::from_index)
            .filter(|unit| !unit.is_percent())
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Target size chosen by the user: either a share of the original file or an
/// absolute amount in some unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SizeSpec {
    Percentage(f64),
    Absolute { value: f64, unit: SizeUnit },
}

impl SizeSpec {
    pub fn new(value: f64, unit: SizeUnit) -> Self {
        if unit.is_percent() {
            SizeSpec::Percentage(value)
        } else {
            SizeSpec::Absolute { value, unit }
        }
    }

    pub fn unit(&self) -> SizeUnit {
        match *self {
            SizeSpec::Percentage(_) => SizeUnit::Percent,
            SizeSpec::Absolute { unit, .. } => unit,
        }
    }

    pub fn value(&self) -> f64 {
        match *self {
            SizeSpec::Percentage(value) | SizeSpec::Absolute { value, .. } => value,
        }
    }

    pub fn target_bytes(&self, original_size: Option<u64>) -> Result<u64, EstimationError> {
        match *self {
            SizeSpec::Percentage(percentage) => estimate_target_bytes(percentage, original_size),
            SizeSpec::Absolute { value, unit } => {
                Ok((value * unit.bytes_per_unit()).floor() as u64)
            }
        }
    }

    /// Extent hint for the encoder: `"<bytes>b"` for a percentage, `"<value><unit>"` otherwise.
    pub fn extent(&self, original_size: Option<u64>) -> Result<String, EstimationError> {
        match *self {
            SizeSpec::Percentage(percentage) => {
                Ok(format!("{}b", estimate_target_bytes(percentage, original_size)?))
            }
            SizeSpec::Absolute { value, unit } => Ok(format!("{}{}", value, unit)),
        }
    }
}

/// Outcome of switching the unit selector.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitConversion {
    /// May differ from the requested unit when a tiny value stepped down.
    pub unit: SizeUnit,
    pub value: Option<f64>,
    /// Estimated bytes for percent mode; `None` hides the estimate.
    pub calculated: Option<u64>,
}

pub fn read_original_size(path: &Path) -> Result<u64, EstimationError> {
    Ok(fs::metadata(path)?.len())
}

pub fn estimate_target_bytes(
    percentage: f64,
    original_size: Option<u64>,
) -> Result<u64, EstimationError> {
    let size = original_size.ok_or(EstimationError::NoFile)?;
    Ok((size as f64 * percentage / 100.0).floor() as u64)
}

pub fn convert_on_unit_change(
    previous: SizeUnit,
    new: SizeUnit,
    current_value: Option<f64>,
    original_size: Option<u64>,
) -> UnitConversion {
    if new.is_percent() {
        let converted = match (previous.is_percent(), current_value, original_size) {
            (false, Some(value), Some(size)) => {
                Some(value * previous.bytes_per_unit() / size as f64 * 100.0)
            }
            _ => current_value,
        };
        let percentage = clamp_percentage(converted);
        return UnitConversion {
            unit: new,
            value: Some(percentage),
            calculated: estimate_target_bytes(percentage, original_size).ok(),
        };
    }

    let value = if previous.is_percent() {
        let raw = current_value
            .and_then(|percentage| estimate_target_bytes(percentage, original_size).ok())
            .unwrap_or(0);
        if raw != 0 {
            Some(raw as f64 / new.bytes_per_unit())
        } else {
            current_value
        }
    } else {
        current_value.map(|value| value * previous.bytes_per_unit() / new.bytes_per_unit())
    };

    let (unit, value) = step_toward_smaller(new, value);
    UnitConversion {
        unit,
        value,
        calculated: None,
    }
}

// Missing or out-of-range percentages fall back to the default; anything
// over the maximum is rounded first and only reset if it still does not fit.
fn clamp_percentage(value: Option<f64>) -> f64 {
    match value {
        Some(value) if value.is_finite() && value > 0.0 => {
            if value <= MAX_PERCENTAGE {
                value
            } else {
                let rounded = value.round();
                if rounded > MAX_PERCENTAGE {
                    DEFAULT_PERCENTAGE
                } else {
                    rounded
                }
            }
        }
        _ => DEFAULT_PERCENTAGE,
    }
}

fn step_toward_smaller(mut unit: SizeUnit, mut value: Option<f64>) -> (SizeUnit, Option<f64>) {
    while let Some(current) = value {
        if current >= MIN_ABSOLUTE_VALUE {
            break;
        }
        match unit.smaller() {
            Some(smaller) => {
                value = Some(current * unit.bytes_per_unit() / smaller.bytes_per_unit());
                unit = smaller;
            }
            None => break,
        }
    }
    (unit, value)
}

/// Human readable size, e.g. `1536 -> "1.5KB"`.
pub fn format_bytes(byte_count: i64) -> String {
    if byte_count == 0 {
        return format!("0{}", BYTE_SUFFIXES[0]);
    }
    let bytes = byte_count.unsigned_abs();
    let mut place = 0;
    let mut scaled = bytes;
    while scaled >= 1024 && place < BYTE_SUFFIXES.len() - 1 {
        scaled /= 1024;
        place += 1;
    }
    let num = (bytes as f64 / UNIT_FACTOR.powi(place as i32) * 100.0).round() / 100.0;
    let num = if byte_count < 0 { -num } else { num };
    format!("{}{}", num, BYTE_SUFFIXES[place])
}

/// `<dir>/<stem>-compressed.jpg` next to the input.
pub fn output_path_for(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}.{}", stem, OUTPUT_SUFFIX, OUTPUT_EXTENSION))
}

pub fn next_available_path(base: &Path) -> PathBuf {
    next_available_path_with(base, |candidate| candidate.exists())
}

pub fn next_available_path_with<F>(base: &Path, exists: F) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    if !exists(base) {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = base
        .extension()
        .map(|extension| extension.to_string_lossy().into_owned());

    let mut index: u64 = 1;
    loop {
        let name = match &extension {
            Some(extension) => format!("{} ({}).{}", stem, index, extension),
            None => format!("{} ({})", stem, index),
        };
        let candidate = base.with_file_name(name);
        if !exists(&candidate) {
            return candidate;
        }
        index += 1;
    }
}
