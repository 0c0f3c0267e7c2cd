use std::ops::{Deref, DerefMut};

use image::{ImageBuffer, Rgba};

use crate::error::{MatteError, MatteResult};

/// Stamps are never spaced wider than this many pixels, whatever the brush
const MIN_STAMP_SPACING: f32 = 0.5;

/// Circular brush that cuts alpha to zero
///
/// Coordinates are in pixels with pixel `(x, y)` centred at `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EraserBrush {
    diameter: f32,
}

impl EraserBrush {
    /// Creates a brush of the given diameter
    ///
    /// # Errors
    ///
    /// Returns `MatteError::InvalidParameter` unless `diameter` is a positive
    /// finite number.
    pub fn new(diameter: f32) -> MatteResult<Self> {
        if !(diameter.is_finite() && diameter > 0.0) {
            return Err(MatteError::InvalidParameter(format!(
                "brush diameter must be positive, got {diameter}"
            )));
        }
        Ok(Self { diameter })
    }

    #[must_use]
    pub const fn diameter(&self) -> f32 {
        self.diameter
    }

    #[must_use]
    pub fn radius(&self) -> f32 {
        self.diameter / 2.0
    }

    /// Distance between consecutive stamps along a stroke
    #[must_use]
    pub fn spacing(&self) -> f32 {
        (self.radius() / 2.0).max(MIN_STAMP_SPACING)
    }

    /// Clears alpha inside one filled circle
    ///
    /// The pixel nearest the centre is always cleared, so even brushes
    /// smaller than a pixel leave a mark.
    pub fn stamp<C>(&self, canvas: &mut ImageBuffer<Rgba<u8>, C>, cx: f32, cy: f32)
    where
        C: Deref<Target = [u8]> + DerefMut,
    {
        let (width, height) = canvas.dimensions();
        if width == 0 || height == 0 || !cx.is_finite() || !cy.is_finite() {
            return;
        }

        let radius = self.radius();
        let radius_sq = radius * radius;
        let max_x = (width - 1) as f32;
        let max_y = (height - 1) as f32;

        let x0 = (cx - radius).floor().clamp(0.0, max_x) as u32;
        let x1 = (cx + radius).ceil().clamp(0.0, max_x) as u32;
        let y0 = (cy - radius).floor().clamp(0.0, max_y) as u32;
        let y1 = (cy + radius).ceil().clamp(0.0, max_y) as u32;

        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                if dx.mul_add(dx, dy * dy) <= radius_sq {
                    canvas.get_pixel_mut(x, y)[3] = 0;
                }
            }
        }

        let (nx, ny) = (cx.round(), cy.round());
        if (0.0..=max_x).contains(&nx) && (0.0..=max_y).contains(&ny) {
            canvas.get_pixel_mut(nx as u32, ny as u32)[3] = 0;
        }
    }

    /// Clears alpha along a polyline without gaps
    ///
    /// Each segment is clipped to the canvas grown by the brush radius and
    /// covered by overlapping stamps at most [`spacing`](Self::spacing)
    /// apart, so the stamp count is bounded by the canvas size. A single
    /// point erases one dab.
    pub fn stroke<C>(&self, canvas: &mut ImageBuffer<Rgba<u8>, C>, points: &[(f32, f32)])
    where
        C: Deref<Target = [u8]> + DerefMut,
    {
        match points {
            [] => {}
            [(x, y)] => self.stamp(canvas, *x, *y),
            _ => {
                let spacing = self.spacing();
                let reach = f64::from(self.radius()) + 1.0;
                let (width, height) = canvas.dimensions();
                let bounds = (
                    -reach,
                    -reach,
                    f64::from(width) - 1.0 + reach,
                    f64::from(height) - 1.0 + reach,
                );

                for pair in points.windows(2) {
                    let Some(((x0, y0), (x1, y1))) = clip_segment(pair[0], pair[1], bounds) else {
                        continue;
                    };
                    let length = (x1 - x0).hypot(y1 - y0);
                    let steps = (length / spacing).ceil().max(1.0) as u32;
                    for step in 0..=steps {
                        let t = step as f32 / steps as f32;
                        self.stamp(canvas, t.mul_add(x1 - x0, x0), t.mul_add(y1 - y0, y0));
                    }
                }
            }
        }
    }
}

type Segment = ((f32, f32), (f32, f32));

/// Liang-Barsky clip of a segment to `(min_x, min_y, max_x, max_y)`
///
/// Returns `None` when the segment misses the rectangle or has a
/// non-finite endpoint.
fn clip_segment(
    start: (f32, f32),
    end: (f32, f32),
    (min_x, min_y, max_x, max_y): (f64, f64, f64, f64),
) -> Option<Segment> {
    let (x0, y0) = (f64::from(start.0), f64::from(start.1));
    let (x1, y1) = (f64::from(end.0), f64::from(end.1));
    if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
        return None;
    }

    let (dx, dy) = (x1 - x0, y1 - y0);
    let mut t_enter = 0.0f64;
    let mut t_exit = 1.0f64;
    for (p, q) in [(-dx, x0 - min_x), (dx, max_x - x0), (-dy, y0 - min_y), (dy, max_y - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t_enter = t_enter.max(r);
        } else {
            t_exit = t_exit.min(r);
        }
        if t_enter > t_exit {
            return None;
        }
    }

    let point = |t: f64| (t.mul_add(dx, x0) as f32, t.mul_add(dy, y0) as f32);
    Some((point(t_enter), point(t_exit)))
}
