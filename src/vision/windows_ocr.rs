//! Windows OCR API backend
//!
//! Uses the built-in Windows OCR (Media.Ocr). Results are reported per line,
//! which keeps whole phrases together for translation.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use windows::{
    core::HSTRING,
    Foundation::IAsyncOperation,
    Globalization::Language,
    Graphics::Imaging::{BitmapPixelFormat, SoftwareBitmap},
    Media::Ocr::{OcrEngine as WinOcrEngine, OcrLine, OcrResult as WinOcrResult},
    Storage::Streams::{DataReader, DataWriter, InMemoryRandomAccessStream},
};

use super::ocr::OcrEngine;
use super::region::TextRegion;
use crate::capture::frame::CapturedFrame;

/// Windows OCR engine wrapper
pub struct WindowsOcr {
    engine: WinOcrEngine,
    language: String,
}

impl WindowsOcr {
    /// Create a new Windows OCR engine for a BCP-47 language tag
    pub fn new(language_tag: &str) -> Result<Self> {
        info!("Initializing Windows OCR engine with language: {}", language_tag);

        let language = Language::CreateLanguage(&HSTRING::from(language_tag))
            .context("Failed to create language")?;

        if !WinOcrEngine::IsLanguageSupported(&language)
            .context("Failed to check language support")?
        {
            warn!("Language '{}' not supported, falling back to user profile languages", language_tag);
            let engine = WinOcrEngine::TryCreateFromUserProfileLanguages()
                .context("Failed to create OCR engine from user profile")?;

            let language = engine
                .RecognizerLanguage()
                .and_then(|lang| lang.LanguageTag())
                .context("Failed to get recognizer language")?
                .to_string();

            return Ok(Self { engine, language });
        }

        let engine = WinOcrEngine::TryCreateFromLanguage(&language)
            .context("Failed to create OCR engine for language")?;

        Ok(Self {
            engine,
            language: language_tag.to_string(),
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

impl OcrEngine for WindowsOcr {
    fn name(&self) -> &str {
        "windows-ocr"
    }

    fn recognize(&mut self, frame: &CapturedFrame) -> Result<Vec<TextRegion>> {
        debug!("Windows OCR: Processing {}x{} image", frame.width, frame.height);

        let bgra_data = rgba_to_bgra(&frame.data);
        let bitmap = create_software_bitmap(&bgra_data, frame.width, frame.height)?;
        let ocr_result = run_ocr_sync(&self.engine, &bitmap)?;
        let regions = extract_lines(&ocr_result)?;

        debug!("Windows OCR: Found {} lines", regions.len());
        Ok(regions)
    }
}

/// Convert RGBA to BGRA (Windows expects BGRA)
fn rgba_to_bgra(rgba: &[u8]) -> Vec<u8> {
    let mut bgra = rgba.to_vec();
    for chunk in bgra.chunks_exact_mut(4) {
        chunk.swap(0, 2);
    }
    bgra
}

/// Create a SoftwareBitmap from BGRA data using CopyFromBuffer
fn create_software_bitmap(bgra_data: &[u8], width: u32, height: u32) -> Result<SoftwareBitmap> {
    let stream = InMemoryRandomAccessStream::new().context("Failed to create in-memory stream")?;

    let writer = DataWriter::CreateDataWriter(&stream).context("Failed to create data writer")?;
    writer.WriteBytes(bgra_data).context("Failed to write pixel data")?;
    writer
        .StoreAsync()
        .context("Failed to start store operation")?
        .get()
        .context("Failed to store data")?;
    writer
        .FlushAsync()
        .context("Failed to start flush operation")?
        .get()
        .context("Failed to flush data")?;

    let bitmap = SoftwareBitmap::Create(BitmapPixelFormat::Bgra8, width as i32, height as i32)
        .context("Failed to create SoftwareBitmap")?;

    let input_stream = stream.GetInputStreamAt(0).context("Failed to get input stream")?;
    let reader = DataReader::CreateDataReader(&input_stream).context("Failed to create data reader")?;
    reader
        .LoadAsync(bgra_data.len() as u32)
        .context("Failed to start load operation")?
        .get()
        .context("Failed to load data")?;

    let buffer = reader
        .ReadBuffer(bgra_data.len() as u32)
        .context("Failed to read buffer")?;
    bitmap.CopyFromBuffer(&buffer).context("Failed to copy buffer to bitmap")?;

    Ok(bitmap)
}

/// Run OCR synchronously (blocks until complete)
fn run_ocr_sync(engine: &WinOcrEngine, bitmap: &SoftwareBitmap) -> Result<WinOcrResult> {
    let async_op: IAsyncOperation<WinOcrResult> = engine
        .RecognizeAsync(bitmap)
        .context("Failed to start OCR recognition")?;

    async_op.get().context("OCR recognition failed")
}

/// One region per OCR line, bounded by the union of its word rectangles
fn extract_lines(ocr_result: &WinOcrResult) -> Result<Vec<TextRegion>> {
    let lines = ocr_result.Lines().context("Failed to get OCR lines")?;

    let mut regions = Vec::new();
    for i in 0..lines.Size().context("Failed to get lines size")? {
        let line = lines.GetAt(i).context("Failed to get line")?;
        if let Some(region) = line_region(&line)? {
            regions.push(region);
        }
    }

    Ok(regions)
}

fn line_region(line: &OcrLine) -> Result<Option<TextRegion>> {
    let text = line.Text().context("Failed to get line text")?.to_string();
    let words = line.Words().context("Failed to get words")?;

    let mut bounds: Option<(f32, f32, f32, f32)> = None;
    for j in 0..words.Size().context("Failed to get words size")? {
        let rect = words
            .GetAt(j)
            .and_then(|word| word.BoundingRect())
            .context("Failed to get bounding rect")?;

        let (left, top, right, bottom) = (rect.X, rect.Y, rect.X + rect.Width, rect.Y + rect.Height);
        bounds = Some(match bounds {
            None => (left, top, right, bottom),
            Some((l, t, r, b)) => (l.min(left), t.min(top), r.max(right), b.max(bottom)),
        });
    }

    // Windows OCR doesn't provide confidence
    Ok(bounds.map(|(left, top, right, bottom)| {
        TextRegion::from_rect(
            text,
            left as i32,
            top as i32,
            (right - left) as i32,
            (bottom - top) as i32,
            1.0,
        )
    }))
}
