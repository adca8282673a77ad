use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, Rgba};

use crate::graph::PdfGraph;
use crate::CodecError;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

const PAGE_BORDER: Rgba<u8> = Rgba([220, 220, 220, 255]);

/// Turns one page into pixels at `scale` device pixels per point.
pub trait PageRasterizer {
    fn render(&self, graph: &PdfGraph, page_index: usize, scale: f32) -> Result<RgbaImage, CodecError>;
}

/// Paints the page extent as a white sheet with a light border. Stands in
/// wherever no real rasterizer is linked.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderRasterizer;

impl PageRasterizer for PlaceholderRasterizer {
    fn render(&self, graph: &PdfGraph, page_index: usize, scale: f32) -> Result<RgbaImage, CodecError> {
        let size = graph.page_size(page_index)?;
        let scale = if scale <= 0.0 { 1.0 } else { scale };
        let (mut width_pt, mut height_pt) = (size.width_pt, size.height_pt);
        if graph.rotation(page_index)? % 180 != 0 {
            std::mem::swap(&mut width_pt, &mut height_pt);
        }

        let width = (width_pt * scale).round().max(1.0) as u32;
        let height = (height_pt * scale).round().max(1.0) as u32;
        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        if width >= 4 && height >= 4 {
            for x in 0..width {
                image.put_pixel(x, 0, PAGE_BORDER);
                image.put_pixel(x, height - 1, PAGE_BORDER);
            }
            for y in 0..height {
                image.put_pixel(0, y, PAGE_BORDER);
                image.put_pixel(width - 1, y, PAGE_BORDER);
            }
        }

        Ok(image)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
}

pub fn encode_raster(image: &RgbaImage, format: RasterFormat) -> Result<Vec<u8>, CodecError> {
    let mut out = Cursor::new(Vec::new());
    match format {
        RasterFormat::Png => image.write_to(&mut out, image::ImageFormat::Png)?,
        // JPEG has no alpha channel.
        RasterFormat::Jpeg => DynamicImage::ImageRgba8(image.clone())
            .to_rgb8()
            .write_to(&mut out, image::ImageFormat::Jpeg)?,
    }
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PageSize;

    #[test]
    fn placeholder_matches_page_extent() {
        let graph = PdfGraph::blank(1, PageSize::default()).expect("blank");
        let image = PlaceholderRasterizer.render(&graph, 0, 0.5).expect("render");
        assert_eq!(image.dimensions(), (306, 396));
        assert_eq!(image.get_pixel(0, 0), &PAGE_BORDER);
        assert_eq!(image.get_pixel(100, 100), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn rotated_pages_render_landscape() {
        let mut graph = PdfGraph::blank(1, PageSize::default()).expect("blank");
        graph.set_rotation(0, 90).expect("rotate");
        let image = PlaceholderRasterizer.render(&graph, 0, 1.0).expect("render");
        assert_eq!(image.dimensions(), (792, 612));
    }

    #[test]
    fn encodes_both_formats() {
        let image = RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255]));
        let png = encode_raster(&image, RasterFormat::Png).expect("png");
        let jpeg = encode_raster(&image, RasterFormat::Jpeg).expect("jpeg");
        assert!(png.starts_with(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(jpeg.starts_with(&[0xFF, 0xD8]));
    }

    #[test]
    fn out_of_range_page_is_an_error() {
        let graph = PdfGraph::blank(1, PageSize::default()).expect("blank");
        let err = PlaceholderRasterizer.render(&graph, 3, 1.0).expect_err("no such page");
        assert!(matches!(err, CodecError::PageOutOfRange { page: 3, page_count: 1 }));
    }
}
