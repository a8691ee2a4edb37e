// image_processing.rs
use crate::app::{CompressionReport, CompressionUpdate};
use crate::error::CompressError;
use crate::size::{format_bytes, SizeSpec};
use crate::utils::{get_memory_usage, measure_time, Logger};
use image::codecs::jpeg::JpegEncoder;
use image::io::Reader as ImageReader;
use image::{ColorType, DynamicImage, ImageResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::Instant;

pub const JPEG_QUALITY: u8 = 100;
const MIN_QUALITY: u8 = 1;

/// Everything the worker needs, captured when the job is launched.
#[derive(Clone, Debug)]
pub struct CompressionJob {
    pub input_path: PathBuf,
    pub size_spec: SizeSpec,
    pub output_path: PathBuf,
    pub target_bytes: u64,
}

pub struct EncodedJpeg {
    pub data: Vec<u8>,
    pub quality: u8,
}

pub fn compress_image(job: CompressionJob, logger: Logger, sender: Sender<CompressionUpdate>) {
    logger.log(format!(
        "Compressing {} to {} (target {}{} = {})",
        job.input_path.display(),
        job.output_path.display(),
        job.size_spec.value(),
        job.size_spec.unit(),
        format_bytes(job.target_bytes as i64)
    ));
    logger.log(get_memory_usage());

    let result = run_job(&job, &logger, &sender).map_err(|e| e.to_string());
    match &result {
        Ok(report) => logger.log(format!(
            "Wrote {} ({}, quality {}) in {:?}",
            report.output_path.display(),
            format_bytes(report.compressed_size as i64),
            report.quality,
            report.elapsed
        )),
        Err(e) => logger.log(format!("Compression failed: {}", e)),
    }

    // The window may have been closed while we were encoding.
    let _ = sender.send(CompressionUpdate::Finished(result));
}

fn run_job(
    job: &CompressionJob,
    logger: &Logger,
    sender: &Sender<CompressionUpdate>,
) -> Result<CompressionReport, CompressError> {
    let start = Instant::now();
    let original_size = fs::metadata(&job.input_path)?.len();

    let _ = sender.send(CompressionUpdate::Status("Loading image...".to_string()));
    let (img, load_duration) = measure_time(|| load_image(&job.input_path));
    let img = img?;
    logger.log(format!(
        "Loaded {}x{} image in {:?}",
        img.width(),
        img.height(),
        load_duration
    ));

    let _ = sender.send(CompressionUpdate::Status("Encoding JPEG...".to_string()));
    let (encoded, encode_duration) = measure_time(|| encode_to_extent(&img, job.target_bytes));
    let encoded = encoded?;
    logger.log(format!(
        "Encoding at quality {} took {:?}",
        encoded.quality, encode_duration
    ));
    if encoded.data.len() as u64 > job.target_bytes {
        logger.log(format!(
            "Warning: smallest output is {}, above the {} target",
            format_bytes(encoded.data.len() as i64),
            format_bytes(job.target_bytes as i64)
        ));
    }

    let _ = sender.send(CompressionUpdate::Status("Saving...".to_string()));
    fs::write(&job.output_path, &encoded.data)?;

    Ok(CompressionReport {
        output_path: job.output_path.clone(),
        original_size,
        compressed_size: encoded.data.len() as u64,
        quality: encoded.quality,
        elapsed: start.elapsed(),
    })
}

fn load_image(path: &Path) -> ImageResult<DynamicImage> {
    ImageReader::open(path)?.with_guessed_format()?.decode()
}

fn encode_jpeg(img: &image::RgbImage, quality: u8) -> ImageResult<Vec<u8>> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality).encode(
        img.as_raw(),
        img.width(),
        img.height(),
        ColorType::Rgb8,
    )?;
    Ok(buffer)
}

/// Encodes at full quality, then searches for the highest quality whose
/// output fits in `extent` bytes. Falls back to the lowest quality when
/// nothing fits.
pub fn encode_to_extent(img: &DynamicImage, extent: u64) -> ImageResult<EncodedJpeg> {
    let rgb = img.to_rgb8();

    let data = encode_jpeg(&rgb, JPEG_QUALITY)?;
    if data.len() as u64 <= extent {
        return Ok(EncodedJpeg {
            data,
            quality: JPEG_QUALITY,
        });
    }

    let (mut low, mut high) = (MIN_QUALITY, JPEG_QUALITY - 1);
    let mut best: Option<EncodedJpeg> = None;
    while low <= high {
        let mid = low + (high - low) / 2;
        let data = encode_jpeg(&rgb, mid)?;
        if data.len() as u64 <= extent {
            best = Some(EncodedJpeg { data, quality: mid });
            low = mid + 1;
        } else if mid == MIN_QUALITY {
            break;
        } else {
            high = mid - 1;
        }
    }

    match best {
        Some(encoded) => Ok(encoded),
        None => Ok(EncodedJpeg {
            data: encode_jpeg(&rgb, MIN_QUALITY)?,
            quality: MIN_QUALITY,
        }),
    }
}
