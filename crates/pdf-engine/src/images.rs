use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use image::{ColorType, DynamicImage};
use lopdf::{dictionary, Document, ObjectId, Stream};

use crate::CodecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    fn other(self) -> Self {
        match self {
            Self::Png => Self::Jpeg,
            Self::Jpeg => Self::Png,
        }
    }

    fn codec(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// An image XObject added to a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub id: ObjectId,
    pub width_px: u32,
    pub height_px: u32,
    pub format: ImageFormat,
}

const PNG_MAGIC: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];
const JPEG_MAGIC: [u8; 2] = [0xFF, 0xD8];

pub fn sniff_image_format(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(&PNG_MAGIC) {
        Some(ImageFormat::Png)
    } else if bytes.starts_with(&JPEG_MAGIC) {
        Some(ImageFormat::Jpeg)
    } else {
        None
    }
}

/// Accepts `data:image/...;base64,<payload>` or a bare base64 payload.
pub fn decode_data_url(value: &str) -> Result<Vec<u8>, CodecError> {
    let payload = match value.split_once(',') {
        Some((header, payload)) if header.starts_with("data:") => payload,
        _ => value,
    };
    B64.decode(payload.trim().as_bytes())
        .map_err(|err| CodecError::ImageEmbed(format!("invalid base64 payload: {err}")))
}

/// Embeds PNG or JPEG bytes as an image XObject. The sniffed format is tried
/// first and the other decoder second.
pub fn embed_image(doc: &mut Document, bytes: &[u8]) -> Result<EmbeddedImage, CodecError> {
    let first = sniff_image_format(bytes).unwrap_or(ImageFormat::Png);

    match embed_as(doc, bytes, first) {
        Ok(image) => Ok(image),
        Err(first_err) => {
            log::debug!("{first:?} decode failed ({first_err}), retrying as {:?}", first.other());
            embed_as(doc, bytes, first.other()).map_err(|second_err| {
                CodecError::ImageEmbed(format!(
                    "{first:?}: {first_err}; {:?}: {second_err}",
                    first.other()
                ))
            })
        }
    }
}

fn embed_as(doc: &mut Document, bytes: &[u8], format: ImageFormat) -> Result<EmbeddedImage, image::ImageError> {
    let decoded = image::load_from_memory_with_format(bytes, format.codec())?;
    let (width_px, height_px) = (decoded.width(), decoded.height());

    let id = match format {
        ImageFormat::Jpeg => doc.add_object(jpeg_stream(&decoded, bytes)),
        ImageFormat::Png => {
            let (mut stream, smask) = png_streams(&decoded);
            if let Some(smask) = smask {
                let smask_id = doc.add_object(smask);
                stream.dict.set("SMask", smask_id);
            }
            doc.add_object(stream)
        }
    };

    Ok(EmbeddedImage { id, width_px, height_px, format })
}

fn jpeg_stream(decoded: &DynamicImage, bytes: &[u8]) -> Stream {
    let color_space = match decoded.color() {
        ColorType::L8 | ColorType::L16 => "DeviceGray",
        _ => "DeviceRGB",
    };
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => decoded.width() as i64,
            "Height" => decoded.height() as i64,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        bytes.to_vec(),
    )
    .with_compression(false)
}

fn png_streams(decoded: &DynamicImage) -> (Stream, Option<Stream>) {
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let smask = decoded.color().has_alpha().then(|| {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        )
    });

    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb,
    );
    (stream, smask)
}
