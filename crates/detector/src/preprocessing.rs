use crate::config::DEFAULT_INPUT_SIZE;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use image::RgbImage;
use ndarray::{Array, IxDyn};
use std::default::Default;

const LETTERBOX_COLOR: u8 = 114;

pub struct PreProcessor {
    pub input_size: (u32, u32),
    rgb_buffer: Vec<u8>,
    letterboxed_buffer: Vec<u8>,
}

impl PreProcessor {
    pub fn new(input_size: (u32, u32)) -> Self {
        Self {
            input_size,
            rgb_buffer: Vec::with_capacity(1920 * 1080 * 3),
            letterboxed_buffer: vec![LETTERBOX_COLOR; (input_size.0 * input_size.1 * 3) as usize],
        }
    }

    /// Letterbox and normalize an RGB image into a `[1, 3, H, W]` tensor.
    ///
    /// Returns the tensor along with the scale and padding offsets needed to
    /// map detections back to original image coordinates.
    pub fn preprocess(
        &mut self,
        image: &RgbImage,
    ) -> anyhow::Result<(Array<f32, IxDyn>, f32, f32, f32)> {
        let (width, height) = image.dimensions();

        tracing::trace!(width, height, "Preprocessing image");

        self.rgb_buffer.clear();
        self.rgb_buffer.extend_from_slice(image.as_raw());

        let (scale, offset_x, offset_y, letterboxed) = self.resize_and_letterbox(width, height)?;

        let input = Self::normalize(&letterboxed)?;

        Ok((input, scale, offset_x, offset_y))
    }

    fn resize_and_letterbox(
        &mut self,
        width: u32,
        height: u32,
    ) -> anyhow::Result<(f32, f32, f32, Image<'_>)> {
        let scale =
            (self.input_size.0 as f32 / width as f32).min(self.input_size.1 as f32 / height as f32);
        let new_width = (width as f32 * scale) as u32;
        let new_height = (height as f32 * scale) as u32;

        let offset_x = (self.input_size.0 - new_width) / 2;
        let offset_y = (self.input_size.1 - new_height) / 2;

        let src = Image::from_slice_u8(width, height, &mut self.rgb_buffer, PixelType::U8x3)?;

        let mut resized = Image::new(new_width, new_height, PixelType::U8x3);

        Resizer::new().resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;

        self.letterboxed_buffer.fill(LETTERBOX_COLOR);

        let resized_data = resized.buffer();
        let stride = self.input_size.0 * 3;

        for y in 0..new_height {
            let src_row = (y * new_width * 3) as usize;
            let dst_row = ((y + offset_y) * stride + offset_x * 3) as usize;

            self.letterboxed_buffer[dst_row..dst_row + (new_width * 3) as usize]
                .copy_from_slice(&resized_data[src_row..src_row + (new_width * 3) as usize]);
        }

        let final_img = Image::from_slice_u8(
            self.input_size.0,
            self.input_size.1,
            &mut self.letterboxed_buffer,
            PixelType::U8x3,
        )?;

        Ok((scale, offset_x as f32, offset_y as f32, final_img))
    }

    // YOLO-family models expect plain 0-1 scaling, no ImageNet mean/std.
    fn normalize(image: &Image) -> anyhow::Result<Array<f32, IxDyn>> {
        let width = image.width() as usize;
        let height = image.height() as usize;
        let spatial = width * height;

        let mut output = vec![0.0f32; 3 * spatial];
        let buf = image.buffer();

        for (i, px) in buf.chunks_exact(3).enumerate() {
            output[i] = px[0] as f32 / 255.0;
            output[i + spatial] = px[1] as f32 / 255.0;
            output[i + 2 * spatial] = px[2] as f32 / 255.0;
        }

        Ok(Array::from_shape_vec(
            IxDyn(&[1, 3, height, width]),
            output,
        )?)
    }
}

impl Default for PreProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_image(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, image::Rgb([value, value, value]))
    }

    #[test]
    fn test_output_shape() {
        let img = solid_image(2, 2, 200);

        let mut preprocessor = PreProcessor::default();
        let (output, _, _, _) = preprocessor.preprocess(&img).unwrap();

        assert_eq!(output.shape(), &[1, 3, 640, 640]);
    }

    #[test]
    fn test_letterboxing_preserves_aspect_ratio() {
        // 800x600 image (4:3 aspect ratio)
        let img = solid_image(800, 600, 128);

        let mut preprocessor = PreProcessor::default();
        let (output, scale, offset_x, offset_y) = preprocessor.preprocess(&img).unwrap();

        // Scale should be min(640/800, 640/600) = 640/800 = 0.8
        assert_eq!(scale, 0.8, "Scale should preserve aspect ratio");

        // Resized dimensions: 800*0.8 = 640, 600*0.8 = 480
        // Offset X: (640 - 640) / 2 = 0
        // Offset Y: (640 - 480) / 2 = 80
        assert_eq!(offset_x, 0.0, "X offset should be 0 for wide image");
        assert_eq!(offset_y, 80.0, "Y offset should center vertically");

        assert_eq!(output.shape(), &[1, 3, 640, 640]);
    }

    #[test]
    fn test_zero_one_normalization() {
        let img = solid_image(640, 640, 128);

        let mut preprocessor = PreProcessor::new((640, 640));
        let (output, _, _, _) = preprocessor.preprocess(&img).unwrap();

        // Gray 128 -> 128/255 ≈ 0.502 on every channel, no per-channel shift
        let r = output[[0, 0, 320, 320]];
        let g = output[[0, 1, 320, 320]];
        let b = output[[0, 2, 320, 320]];

        assert!((r - 128.0 / 255.0).abs() < 1e-6, "R should be ~0.502 (got {})", r);
        assert_eq!(r, g, "Channels should be identical for gray input");
        assert_eq!(g, b, "Channels should be identical for gray input");
    }

    #[test]
    fn test_padding_uses_letterbox_color() {
        // Tall image: letterbox bars end up left and right
        let img = solid_image(100, 640, 255);

        let mut preprocessor = PreProcessor::new((640, 640));
        let (output, _, offset_x, _) = preprocessor.preprocess(&img).unwrap();

        assert!(offset_x > 0.0, "Tall image should be padded horizontally");

        // Pixel inside the left padding band
        let pad = output[[0, 0, 320, 10]];
        assert!(
            (pad - 114.0 / 255.0).abs() < 1e-6,
            "Padding should be gray 114 (got {})",
            pad
        );
    }
}
