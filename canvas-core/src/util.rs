use anyhow::Result;
use base64::{prelude::BASE64_STANDARD, Engine};
use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::{Device, Tensor};
use image::DynamicImage;
use std::io::Cursor;

use crate::DeviceMap;

pub fn select_best_device(device_map: DeviceMap) -> Result<Device> {
    match device_map {
        DeviceMap::ForceCpu => Ok(Device::Cpu),
        DeviceMap::Ordinal(ordinal) if cuda_is_available() => Ok(Device::new_cuda(ordinal)?),
        DeviceMap::Ordinal(ordinal) if metal_is_available() => Ok(Device::new_metal(ordinal)?),
        DeviceMap::Ordinal(_) => {
            #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
            {
                tracing::warn!(
                    "Running on CPU, to run on GPU(metal), build with `--features metal`"
                );
            }
            #[cfg(not(all(target_os = "macos", target_arch = "aarch64")))]
            {
                tracing::warn!("Running on CPU, to run on GPU, build with `--features cuda`");
            }
            Ok(Device::Cpu)
        }
    }
}

/// Converts a u8 tensor with shape (3, height, width) into an RGB image.
pub fn tensor_to_image(img: &Tensor) -> Result<DynamicImage> {
    let (channels, height, width) = img.dims3()?;
    if channels != 3 {
        anyhow::bail!("tensor_to_image expects an image with 3 channels, got {channels}");
    }
    let img = img.permute((1, 2, 0))?.flatten_all()?;
    let pixels = img.to_vec1::<u8>()?;
    let buffer = image::ImageBuffer::from_raw(width as u32, height as u32, pixels)
        .ok_or_else(|| candle_core::Error::msg("error converting tensor to image buffer"))?;
    Ok(DynamicImage::ImageRgb8(buffer))
}

pub fn image_to_png_bytes(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}

/// Encodes an image as PNG and wraps it in standard base64.
pub fn image_to_base64_png(img: &DynamicImage) -> Result<String> {
    Ok(BASE64_STANDARD.encode(image_to_png_bytes(img)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;

    #[test]
    fn tensor_round_trips_through_png() {
        let data: Vec<u8> = (0..3 * 4 * 2).map(|v| v as u8 * 10).collect();
        let tensor = Tensor::from_vec(data, (3, 4, 2), &Device::Cpu).unwrap();
        let image = tensor_to_image(&tensor).unwrap();
        assert_eq!((image.width(), image.height()), (2, 4));

        let png = image_to_png_bytes(&image).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        // channel 0 of pixel (0, 0) is the first element, channel 1 starts after one plane
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 80, 160]);
    }

    #[test]
    fn rejects_wrong_channel_count() {
        let tensor = Tensor::zeros((4, 2, 2), DType::U8, &Device::Cpu).unwrap();
        assert!(tensor_to_image(&tensor).is_err());
    }

    #[test]
    fn base64_is_decodable_png() {
        let image = DynamicImage::new_rgb8(3, 3);
        let encoded = image_to_base64_png(&image).unwrap();
        let bytes = BASE64_STANDARD.decode(encoded).unwrap();
        assert!(image::load_from_memory(&bytes).is_ok());
    }

    #[test]
    fn cpu_is_honoured() {
        assert!(select_best_device(DeviceMap::ForceCpu).unwrap().is_cpu());
    }
}
