//! Raster re-encoding compression strategy.
//!
//! Binary-free fallback for scanned documents: each page's raster content is
//! decoded, downscaled into a bounded pixel footprint, re-encoded as a
//! progressive JPEG at the caller's quality factor, and the JPEGs are
//! reassembled into a fresh one-image-per-page document. Lossy and slower
//! than the external compressor, but always available.
//!
//! Page bitmaps are staged in a scratch directory that is removed before
//! returning, success or failure, partial sets included.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

use formrelay_core::models::CompressionMethod;

use super::{CompressionOptions, CompressionStrategy};

// Decode budget: pages are shrunk into this box before re-encoding.
const MAX_PAGE_WIDTH: u32 = 1000;
const MAX_PAGE_HEIGHT: u32 = 1400;

// A4 page geometry in points, with the image drawn inside a margin.
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const PAGE_MARGIN: f32 = 15.0;
const IMAGE_BOX_WIDTH: f32 = 565.0;
const IMAGE_BOX_HEIGHT: f32 = 770.0;

pub(super) struct RasterStrategy;

#[async_trait]
impl CompressionStrategy for RasterStrategy {
    async fn run(&self, input: &Path, output: &Path, opts: &CompressionOptions) -> Result<()> {
        let input = input.to_path_buf();
        let output = output.to_path_buf();
        let jpeg_quality = (opts.image_quality * 100.0).round().clamp(10.0, 95.0) as u8;

        tokio::task::spawn_blocking(move || rasterize(&input, &output, jpeg_quality))
            .await
            .context("Raster compression task panicked")?
    }

    fn method(&self) -> CompressionMethod {
        CompressionMethod::Raster
    }
}

fn rasterize(input: &Path, output: &Path, jpeg_quality: u8) -> Result<()> {
    let bytes = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let doc = Document::load_mem(&bytes)
        .map_err(|e| anyhow!("Failed to parse {}: {}", input.display(), e))?;

    let pages: Vec<_> = doc.get_pages().into_values().collect();
    if pages.is_empty() {
        bail!("Document has no pages");
    }

    // Scratch dir for page bitmaps; dropped (and removed) on every exit path.
    let scratch = tempfile::Builder::new()
        .prefix("raster-")
        .tempdir_in(output.parent().unwrap_or_else(|| Path::new(".")))
        .context("Failed to create scratch directory")?;

    let mut staged: Vec<(PathBuf, u32, u32)> = Vec::with_capacity(pages.len());
    for (index, page_id) in pages.iter().enumerate() {
        let bitmap = page_bitmap(&doc, *page_id)
            .with_context(|| format!("Page {} has no decodable raster content", index + 1))?;

        // Shrink into the pixel budget; never enlarge small pages.
        let bitmap = if bitmap.width() > MAX_PAGE_WIDTH || bitmap.height() > MAX_PAGE_HEIGHT {
            bitmap.resize(MAX_PAGE_WIDTH, MAX_PAGE_HEIGHT, FilterType::Triangle)
        } else {
            bitmap
        };
        let jpeg = encode_jpeg(&bitmap.to_rgb8(), jpeg_quality)?;

        let staged_path = scratch.path().join(format!("page_{}.jpg", index + 1));
        fs::write(&staged_path, &jpeg)
            .with_context(|| format!("Failed to stage {}", staged_path.display()))?;
        staged.push((staged_path, bitmap.width(), bitmap.height()));
    }

    let rebuilt = assemble_document(&staged)?;
    fs::write(output, rebuilt)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(())
}

/// Progressive JPEG encoding at the given quality.
fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let (width, height) = img.dimensions();

    let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
    comp.set_size(width as usize, height as usize);
    comp.set_quality(quality as f32);
    comp.set_progressive_mode();
    comp.set_optimize_coding(true);

    let mut comp = comp.start_compress(Vec::new())?;
    comp.write_scanlines(img)?;
    let jpeg = comp.finish()?;
    Ok(jpeg)
}

/// Recover the page's raster content: the largest image XObject among the
/// page resources. Scanned forms are one image per page, so "largest image"
/// is the page bitmap.
fn page_bitmap(doc: &Document, page_id: lopdf::ObjectId) -> Result<DynamicImage> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| anyhow!("Invalid page object: {}", e))?;

    let resources = resolve_dict(doc, page.get(b"Resources").ok())
        .ok_or_else(|| anyhow!("Page has no resources"))?;
    let xobjects = resolve_dict(doc, resources.get(b"XObject").ok())
        .ok_or_else(|| anyhow!("Page has no XObjects"))?;

    let mut best: Option<(i64, DynamicImage)> = None;
    for (_, value) in xobjects.iter() {
        let stream = match resolve(doc, Some(value)) {
            Some(Object::Stream(s)) => s,
            _ => continue,
        };
        let dict = &stream.dict;
        let is_image = dict
            .get(b"Subtype")
            .and_then(|o| o.as_name())
            .map(|n| n == b"Image")
            .unwrap_or(false);
        if !is_image {
            continue;
        }

        let width = dict.get(b"Width").and_then(|o| o.as_i64()).unwrap_or(0);
        let height = dict.get(b"Height").and_then(|o| o.as_i64()).unwrap_or(0);
        let area = width * height;
        if area == 0 || best.as_ref().is_some_and(|(a, _)| *a >= area) {
            continue;
        }

        if let Some(decoded) = decode_image_stream(stream, width as u32, height as u32) {
            best = Some((area, decoded));
        }
    }

    best.map(|(_, img)| img)
        .ok_or_else(|| anyhow!("No decodable image on page"))
}

/// Decode an image XObject: DCT streams are JPEG bytes, Flate streams are
/// raw 8-bit DeviceRGB/DeviceGray samples.
fn decode_image_stream(stream: &Stream, width: u32, height: u32) -> Option<DynamicImage> {
    let filter = stream
        .dict
        .get(b"Filter")
        .ok()
        .and_then(|f| primary_filter(f));

    match filter.as_deref() {
        Some(b"DCTDecode") => image::load_from_memory(&stream.content).ok(),
        _ => {
            let raw = stream.decompressed_content().ok()?;
            let colorspace = stream
                .dict
                .get(b"ColorSpace")
                .ok()
                .and_then(|o| o.as_name().ok())
                .unwrap_or(b"DeviceRGB");
            match colorspace {
                b"DeviceGray" => image::GrayImage::from_raw(width, height, raw)
                    .map(DynamicImage::ImageLuma8),
                _ => RgbImage::from_raw(width, height, raw).map(DynamicImage::ImageRgb8),
            }
        }
    }
}

fn primary_filter(filter: &Object) -> Option<Vec<u8>> {
    match filter {
        Object::Name(name) => Some(name.clone()),
        Object::Array(names) => names.first().and_then(|n| match n {
            Object::Name(name) => Some(name.clone()),
            _ => None,
        }),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, obj: Option<&'a Object>) -> Option<&'a Object> {
    match obj? {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(doc: &'a Document, obj: Option<&'a Object>) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Reassemble a one-image-per-page document from the staged JPEGs.
fn assemble_document(staged: &[(PathBuf, u32, u32)]) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(staged.len());
    for (path, width, height) in staged {
        let jpeg = fs::read(path)
            .with_context(|| format!("Failed to read staged page {}", path.display()))?;

        let image_stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => *width as i64,
                "Height" => *height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
                "Filter" => "DCTDecode",
            },
            jpeg,
        )
        .with_compression(false);
        let image_id = doc.add_object(image_stream);

        // Scale into the margin box, preserving aspect ratio.
        let scale = (IMAGE_BOX_WIDTH / *width as f32).min(IMAGE_BOX_HEIGHT / *height as f32);
        let drawn_w = *width as f32 * scale;
        let drawn_h = *height as f32 * scale;
        let x = PAGE_MARGIN;
        let y = PAGE_HEIGHT - PAGE_MARGIN - drawn_h;

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        drawn_w.into(),
                        0.into(),
                        0.into(),
                        drawn_h.into(),
                        x.into(),
                        y.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
            "MediaBox" => vec![
                0.into(),
                0.into(),
                PAGE_WIDTH.into(),
                PAGE_HEIGHT.into(),
            ],
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => staged.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::page_count;
    use crate::test_support::{build_scanned_pdf, build_text_pdf};

    #[tokio::test]
    async fn test_raster_preserves_page_count() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scan.pdf");
        tokio::fs::write(&input, build_scanned_pdf(3, 1200, 1600))
            .await
            .unwrap();
        let output = dir.path().join("out.pdf");

        RasterStrategy
            .run(&input, &output, &CompressionOptions::default())
            .await
            .unwrap();

        let rebuilt = tokio::fs::read(&output).await.unwrap();
        assert_eq!(page_count(&rebuilt).unwrap(), 3);
    }

    #[tokio::test]
    async fn test_raster_shrinks_oversized_scans() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scan.pdf");
        tokio::fs::write(&input, build_scanned_pdf(2, 1600, 2200))
            .await
            .unwrap();
        let output = dir.path().join("out.pdf");

        RasterStrategy
            .run(&input, &output, &CompressionOptions::default())
            .await
            .unwrap();

        let rebuilt = tokio::fs::read(&output).await.unwrap();
        let doc = Document::load_mem(&rebuilt).unwrap();
        // Every embedded image must fit the decode budget after resizing.
        for (_, obj) in doc.objects.iter() {
            if let Object::Stream(s) = obj {
                if s.dict.get(b"Subtype").and_then(|o| o.as_name()).ok() == Some(b"Image".as_slice()) {
                    let w = s.dict.get(b"Width").and_then(|o| o.as_i64()).unwrap();
                    let h = s.dict.get(b"Height").and_then(|o| o.as_i64()).unwrap();
                    assert!(w <= MAX_PAGE_WIDTH as i64);
                    assert!(h <= MAX_PAGE_HEIGHT as i64);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_raster_fails_on_text_only_pages() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("text.pdf");
        tokio::fs::write(&input, build_text_pdf(1)).await.unwrap();
        let output = dir.path().join("out.pdf");

        let result = RasterStrategy
            .run(&input, &output, &CompressionOptions::default())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_scratch_files_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scan.pdf");
        tokio::fs::write(&input, build_scanned_pdf(1, 800, 1100))
            .await
            .unwrap();
        let output = dir.path().join("out.pdf");

        RasterStrategy
            .run(&input, &output, &CompressionOptions::default())
            .await
            .unwrap();

        // Only the input and output may remain next to each other.
        let mut entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        entries.sort();
        assert_eq!(entries, vec!["out.pdf", "scan.pdf"]);
    }
}
