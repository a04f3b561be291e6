//! Timed transitions.
//!
//! Transitions run on `tokio::time`, one frame every [`DEFAULT_FRAME`], and
//! hand an eased progress in `[0, 1]` to a step callback. The final step is
//! always called with exactly `1.0`.

use std::time::Duration;

use tokio::time::{sleep, Instant};

use super::{ViewportSize, ViewportTransform};

/// Default frame interval (about 60 frames per second).
pub const DEFAULT_FRAME: Duration = Duration::from_millis(16);

/// Cubic ease-in-out.
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

/// Timing of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub delay: Duration,
    pub duration: Duration,
    pub frame: Duration,
}

impl Timing {
    pub fn new(delay: Duration, duration: Duration) -> Self {
        Self {
            delay,
            duration,
            frame: DEFAULT_FRAME,
        }
    }

    pub fn with_frame(mut self, frame: Duration) -> Self {
        self.frame = frame;
        self
    }
}

/// Runs a transition, calling `step` with eased progress on every frame.
///
/// Returns the number of frames rendered.
pub async fn animate<F>(timing: Timing, mut step: F) -> usize
where
    F: FnMut(f64),
{
    if !timing.delay.is_zero() {
        sleep(timing.delay).await;
    }

    if timing.duration.is_zero() {
        step(1.0);
        return 1;
    }

    let frame = if timing.frame.is_zero() {
        DEFAULT_FRAME
    } else {
        timing.frame
    };
    let start = Instant::now();
    let mut frames = 0;
    loop {
        sleep(frame).await;
        let elapsed = start.elapsed().as_secs_f64() / timing.duration.as_secs_f64();
        frames += 1;
        if elapsed >= 1.0 {
            step(1.0);
            return frames;
        }
        step(ease_cubic_in_out(elapsed));
    }
}

const RHO: f64 = std::f64::consts::SQRT_2;
const RHO2: f64 = 2.0;
const RHO4: f64 = 4.0;
const EPSILON2: f64 = 1e-12;

/// Smooth zoom-and-pan path between two viewport transforms.
///
/// The view is described by the point under the viewport center and the
/// visible width; the path follows the trajectory that keeps perceived
/// velocity constant while zooming out then in.
#[derive(Debug, Clone, Copy)]
pub struct ZoomPath {
    center: [f64; 2],
    width: f64,
    from: [f64; 3],
    to_transform: ViewportTransform,
    dx: f64,
    dy: f64,
    kind: PathKind,
}

#[derive(Debug, Clone, Copy)]
enum PathKind {
    /// Pure zoom around a fixed point.
    Scale { s: f64 },
    /// Zoom out, pan, zoom in.
    Arc { d1: f64, r0: f64, s: f64 },
}

impl ZoomPath {
    pub fn new(from: ViewportTransform, to: ViewportTransform, size: ViewportSize) -> Self {
        let center = [size.width / 2.0, size.height / 2.0];
        let width = size.width.max(size.height);

        let a = from.invert(center);
        let b = to.invert(center);
        let (w0, w1) = (width / from.k, width / to.k);
        let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
        let d2 = dx * dx + dy * dy;

        let kind = if d2 < EPSILON2 {
            PathKind::Scale {
                s: (w1 / w0).ln() / RHO,
            }
        } else {
            let d1 = d2.sqrt();
            let b0 = (w1 * w1 - w0 * w0 + RHO4 * d2) / (2.0 * w0 * RHO2 * d1);
            let b1 = (w1 * w1 - w0 * w0 - RHO4 * d2) / (2.0 * w1 * RHO2 * d1);
            let r0 = ((b0 * b0 + 1.0).sqrt() - b0).ln();
            let r1 = ((b1 * b1 + 1.0).sqrt() - b1).ln();
            PathKind::Arc {
                d1,
                r0,
                s: (r1 - r0) / RHO,
            }
        };

        Self {
            center,
            width,
            from: [a[0], a[1], w0],
            to_transform: to,
            dx,
            dy,
            kind,
        }
    }

    /// Transform at progress `t`; `t == 1` is exactly the target.
    pub fn at(&self, t: f64) -> ViewportTransform {
        if t >= 1.0 {
            return self.to_transform;
        }
        let [ux0, uy0, w0] = self.from;
        let (ux, uy, w) = match self.kind {
            PathKind::Scale { s } => (
                ux0 + t * self.dx,
                uy0 + t * self.dy,
                w0 * (RHO * t * s).exp(),
            ),
            PathKind::Arc { d1, r0, s } => {
                let s = t * s;
                let cosh_r0 = r0.cosh();
                let u = w0 / (RHO2 * d1) * (cosh_r0 * (RHO * s + r0).tanh() - r0.sinh());
                (
                    ux0 + u * self.dx,
                    uy0 + u * self.dy,
                    w0 * cosh_r0 / (RHO * s + r0).cosh(),
                )
            }
        };
        let k = self.width / w;
        ViewportTransform::new(self.center[0] - ux * k, self.center[1] - uy * k, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easing_endpoints_and_symmetry() {
        assert_eq!(ease_cubic_in_out(0.0), 0.0);
        assert_eq!(ease_cubic_in_out(1.0), 1.0);
        assert_eq!(ease_cubic_in_out(0.5), 0.5);
        let a = ease_cubic_in_out(0.2);
        let b = ease_cubic_in_out(0.8);
        assert!((a + b - 1.0).abs() < 1e-12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_animate_ends_on_one() {
        let mut steps = Vec::new();
        let frames = animate(
            Timing::new(Duration::from_millis(100), Duration::from_millis(160)),
            |t| steps.push(t),
        )
        .await;

        assert_eq!(frames, steps.len());
        assert!(frames >= 10);
        assert_eq!(steps.last(), Some(&1.0));
        assert!(steps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_is_single_step() {
        let mut steps = Vec::new();
        let frames = animate(Timing::new(Duration::ZERO, Duration::ZERO), |t| steps.push(t)).await;
        assert_eq!(frames, 1);
        assert_eq!(steps, vec![1.0]);
    }

    #[test]
    fn test_zoom_path_endpoints() {
        let size = ViewportSize::new(100.0, 100.0);
        let from = ViewportTransform::IDENTITY;
        let to = ViewportTransform::new(25.0, 0.0, 5.0);
        let path = ZoomPath::new(from, to, size);

        let start = path.at(0.0);
        assert!((start.k - 1.0).abs() < 1e-9);
        assert!(start.x.abs() < 1e-9 && start.y.abs() < 1e-9);
        assert_eq!(path.at(1.0), to);

        let middle = path.at(0.5);
        assert!(middle.k > 1.0 && middle.k < 5.0, "k = {}", middle.k);
    }

    #[test]
    fn test_pure_zoom_path() {
        let size = ViewportSize::new(100.0, 100.0);
        let from = ViewportTransform::IDENTITY;
        // Zoom by 4 around the viewport center.
        let to = ViewportTransform::new(-150.0, -150.0, 4.0);
        let path = ZoomPath::new(from, to, size);
        let middle = path.at(0.5);
        assert!((middle.k - 2.0).abs() < 1e-9);
        let [cx, cy] = middle.invert([50.0, 50.0]);
        assert!((cx - 50.0).abs() < 1e-9 && (cy - 50.0).abs() < 1e-9);
    }
}
