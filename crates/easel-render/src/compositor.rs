//! Image compositor: seeds the buffer with an existing picture.
//!
//! The source is scaled to fit entirely inside the surface while keeping its
//! aspect ratio, then centered along the axis with spare room (letterboxing).
//! The buffer is cleared first, so the image replaces whatever was drawn.

use crate::error::ImageLoadError;
use crate::source::{FetchMode, ImageSource};
use crate::surface::RasterSurface;
use tiny_skia::{ColorU8, FilterQuality, Pixmap, PixmapPaint, Transform};

/// Where a fitted image lands on the surface, in buffer pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Compute the letterboxed placement of a `src_w` × `src_h` image.
pub fn fit_rect(src_w: u32, src_h: u32, surface_w: u32, surface_h: u32) -> FitRect {
    let (sw, sh) = (src_w as f32, src_h as f32);
    let (cw, ch) = (surface_w as f32, surface_h as f32);
    let source_aspect = sw / sh;
    let surface_aspect = cw / ch;

    if source_aspect < surface_aspect {
        // Narrower than the surface: full height, centered horizontally.
        let width = sw * (ch / sh);
        FitRect {
            x: (cw - width) / 2.0,
            y: 0.0,
            width,
            height: ch,
        }
    } else if source_aspect > surface_aspect {
        // Wider: full width, centered vertically.
        let height = sh * (cw / sw);
        FitRect {
            x: 0.0,
            y: (ch - height) / 2.0,
            width: cw,
            height,
        }
    } else {
        FitRect {
            x: 0.0,
            y: 0.0,
            width: cw,
            height: ch,
        }
    }
}

/// A decoded source image ready to be composited.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixmap: Pixmap,
    origin_clean: bool,
}

impl DecodedImage {
    /// Decode PNG or JPEG bytes.
    pub fn decode(bytes: &[u8], origin_clean: bool) -> Result<Self, ImageLoadError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut pixmap = Pixmap::new(width, height).ok_or(ImageLoadError::Empty { width, height })?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
        }
        Ok(Self { pixmap, origin_clean })
    }

    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        Self {
            pixmap,
            origin_clean: true,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn is_origin_clean(&self) -> bool {
        self.origin_clean
    }
}

/// Clear the surface and draw `image` letterboxed into it.
///
/// Returns the placement, or `None` when the surface is not mounted.
pub fn composite(
    surface: &mut RasterSurface,
    image: &DecodedImage,
    source_url: &str,
) -> Option<FitRect> {
    let pixmap = surface.pixmap_mut()?;
    let fit = fit_rect(image.width(), image.height(), pixmap.width(), pixmap.height());
    let sx = fit.width / image.width() as f32;
    let sy = fit.height / image.height() as f32;

    pixmap.fill(tiny_skia::Color::TRANSPARENT);
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(
        0,
        0,
        image.pixmap.as_ref(),
        &paint,
        Transform::from_row(sx, 0.0, 0.0, sy, fit.x, fit.y),
        None,
    );

    surface.set_loaded_image(source_url, image.origin_clean);
    log::debug!(
        "composited {}x{} image at ({}, {}) size {}x{}",
        image.width(),
        image.height(),
        fit.x,
        fit.y,
        fit.width,
        fit.height
    );
    Some(fit)
}

/// Fetch `url` in anonymous mode, decode it, and composite it.
///
/// On any failure the surface is left exactly as it was.
pub async fn load_into<S: ImageSource>(
    surface: &mut RasterSurface,
    source: &S,
    url: &str,
) -> Result<Option<FitRect>, ImageLoadError> {
    let fetched = source.fetch(url, FetchMode::Anonymous).await?;
    let image = DecodedImage::decode(&fetched.bytes, fetched.origin_clean)?;
    if !surface.is_initialized() {
        log::debug!("surface gone before '{url}' finished loading");
        return Ok(None);
    }
    Ok(composite(surface, &image, url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EncodeError;
    use crate::source::FetchedImage;
    use easel_core::Color;
    use pretty_assertions::assert_eq;

    const BLUE: Color = Color::rgb(0, 0, 255);

    fn solid_png(width: u32, height: u32) -> Vec<u8> {
        let mut pixmap = Pixmap::new(width, height).unwrap();
        pixmap.fill(tiny_skia::Color::from_rgba8(0, 0, 255, 255));
        pixmap.encode_png().unwrap()
    }

    fn surface(w: u32, h: u32) -> RasterSurface {
        let mut s = RasterSurface::new();
        s.initialize(w, h);
        s
    }

    struct FixtureSource {
        result: Result<Vec<u8>, String>,
        origin_clean: bool,
    }

    impl ImageSource for FixtureSource {
        async fn fetch(&self, url: &str, mode: FetchMode) -> Result<FetchedImage, ImageLoadError> {
            assert_eq!(mode, FetchMode::Anonymous);
            match &self.result {
                Ok(bytes) => Ok(FetchedImage {
                    bytes: bytes.clone(),
                    origin_clean: self.origin_clean,
                }),
                Err(reason) => Err(ImageLoadError::Fetch {
                    url: url.to_string(),
                    reason: reason.clone(),
                }),
            }
        }
    }

    fn opaque_enough(c: Option<Color>) -> bool {
        c.is_some_and(|c| c.a >= 250 && c.b >= 250)
    }

    #[test]
    fn narrow_source_is_centered_horizontally() {
        let fit = fit_rect(100, 200, 400, 400);
        assert_eq!(fit, FitRect { x: 100.0, y: 0.0, width: 200.0, height: 400.0 });
        assert!(fit.width < 400.0);
        assert_eq!(fit.x, (400.0 - fit.width) / 2.0);
    }

    #[test]
    fn wide_source_is_centered_vertically() {
        let fit = fit_rect(800, 400, 400, 400);
        assert_eq!(fit, FitRect { x: 0.0, y: 100.0, width: 400.0, height: 200.0 });
    }

    #[test]
    fn matching_aspect_fills_surface() {
        let full = |width, height| FitRect { x: 0.0, y: 0.0, width, height };
        assert_eq!(fit_rect(50, 50, 400, 400), full(400.0, 400.0));
        assert_eq!(fit_rect(300, 150, 600, 300), full(600.0, 300.0));
    }

    #[test]
    fn two_to_one_image_letterboxes_into_square() {
        let mut s = surface(400, 400);
        let image = DecodedImage::decode(&solid_png(40, 20), true).unwrap();
        let fit = composite(&mut s, &image, "fixture://wide.png").unwrap();
        assert_eq!(fit, FitRect { x: 0.0, y: 100.0, width: 400.0, height: 200.0 });

        assert_eq!(s.pixel(200, 99), Some(Color::TRANSPARENT));
        assert!(opaque_enough(s.pixel(200, 100)));
        assert!(opaque_enough(s.pixel(0, 200)));
        assert!(opaque_enough(s.pixel(399, 299)));
        assert_eq!(s.pixel(200, 300), Some(Color::TRANSPARENT));
        assert_eq!(s.loaded_image(), Some("fixture://wide.png"));
    }

    #[test]
    fn composite_replaces_existing_drawing() {
        let mut s = surface(100, 100);
        s.apply_style(Color::rgb(255, 0, 0), 10.0);
        s.stroke(&easel_core::segment_path(
            easel_core::Point::new(0.0, 5.0),
            easel_core::Point::new(100.0, 5.0),
        ));
        let image = DecodedImage::decode(&solid_png(10, 20), true).unwrap();
        composite(&mut s, &image, "fixture://tall.png");
        // Left margin is letterbox, so the red stroke there is gone.
        assert_eq!(s.pixel(5, 5), Some(Color::TRANSPARENT));
        assert_eq!(s.pixel(50, 50).map(|c| c.b), Some(BLUE.b));
    }

    #[tokio::test]
    async fn load_into_draws_fetched_image() {
        let mut s = surface(100, 100);
        let source = FixtureSource { result: Ok(solid_png(4, 4)), origin_clean: true };
        let fit = load_into(&mut s, &source, "fixture://square.png").await.unwrap();
        assert_eq!(fit, Some(FitRect { x: 0.0, y: 0.0, width: 100.0, height: 100.0 }));
        assert!(opaque_enough(s.pixel(50, 50)));
        assert!(s.export_encoded().is_ok());
    }

    #[tokio::test]
    async fn failed_fetch_leaves_buffer_unchanged() {
        let mut s = surface(50, 50);
        s.stroke(&easel_core::segment_path(
            easel_core::Point::new(0.0, 25.0),
            easel_core::Point::new(50.0, 25.0),
        ));
        let before = s.pixmap().unwrap().data().to_vec();

        let source = FixtureSource { result: Err("404".into()), origin_clean: true };
        let err = load_into(&mut s, &source, "fixture://missing.png").await.unwrap_err();
        assert!(matches!(err, ImageLoadError::Fetch { .. }));
        assert_eq!(s.pixmap().unwrap().data(), &before[..]);
        assert!(s.loaded_image().is_none());
    }

    #[tokio::test]
    async fn undecodable_bytes_are_a_load_error() {
        let mut s = surface(50, 50);
        let source = FixtureSource { result: Ok(b"not an image".to_vec()), origin_clean: true };
        let err = load_into(&mut s, &source, "fixture://garbage").await.unwrap_err();
        assert!(matches!(err, ImageLoadError::Decode(_)));
        assert!(s.is_blank());
    }

    #[tokio::test]
    async fn opaque_response_taints_export() {
        let mut s = surface(20, 20);
        let source = FixtureSource { result: Ok(solid_png(2, 2)), origin_clean: false };
        load_into(&mut s, &source, "https://elsewhere.example/a.png").await.unwrap();
        assert!(s.is_tainted());
        assert!(matches!(s.export_encoded(), Err(EncodeError::Tainted)));
    }

    #[tokio::test]
    async fn clean_load_over_tainted_buffer_is_exportable() {
        let mut s = surface(20, 20);
        let opaque = FixtureSource { result: Ok(solid_png(2, 2)), origin_clean: false };
        load_into(&mut s, &opaque, "https://elsewhere.example/a.png").await.unwrap();
        assert!(s.is_tainted());

        let clean = FixtureSource { result: Ok(solid_png(2, 2)), origin_clean: true };
        load_into(&mut s, &clean, "https://same.example/b.png").await.unwrap();
        assert!(!s.is_tainted());
        assert!(s.export_encoded().is_ok());
    }

    #[tokio::test]
    async fn unmounted_surface_skips_composite() {
        let mut s = RasterSurface::new();
        let source = FixtureSource { result: Ok(solid_png(2, 2)), origin_clean: true };
        assert_eq!(load_into(&mut s, &source, "fixture://x.png").await.unwrap(), None);
    }
}
