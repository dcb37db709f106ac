//! Built-in line-list shapes. Positions are `(x, y)` pairs inside the
//! `±10` view box, colours are `(r, g, b)` per vertex.

use std::f32::consts::TAU;

use glam::Vec2;

const CURVE_SEGMENTS: usize = 32;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeKind {
    Axes,
    Square,
    #[default]
    Star,
    Bezier,
    Hermite,
}

#[derive(Debug, Default)]
struct LineList {
    positions: Vec<f32>,
    colors: Vec<f32>,
}

impl LineList {
    fn segment(&mut self, from: Vec2, to: Vec2, from_color: [f32; 3], to_color: [f32; 3]) {
        self.positions.extend_from_slice(&[from.x, from.y, to.x, to.y]);
        self.colors.extend_from_slice(&from_color);
        self.colors.extend_from_slice(&to_color);
    }

    /// Connects consecutive points, fading from `start` to `end` along the
    /// polyline.
    fn polyline(&mut self, points: &[Vec2], start: [f32; 3], end: [f32; 3]) {
        let last = points.len().saturating_sub(1).max(1) as f32;
        for (index, pair) in points.windows(2).enumerate() {
            let a = mix(start, end, index as f32 / last);
            let b = mix(start, end, (index + 1) as f32 / last);
            self.segment(pair[0], pair[1], a, b);
        }
    }

    fn into_parts(self) -> (Vec<f32>, Vec<f32>) {
        (self.positions, self.colors)
    }
}

fn mix(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

const RED: [f32; 3] = [1.0, 0.0, 0.0];
const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
const BLUE: [f32; 3] = [0.0, 0.0, 1.0];
const YELLOW: [f32; 3] = [1.0, 1.0, 0.0];
const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

/// Returns `(positions, colors)` for `kind`.
pub fn build(kind: ShapeKind) -> (Vec<f32>, Vec<f32>) {
    let mut lines = LineList::default();
    match kind {
        ShapeKind::Axes => {
            lines.segment(Vec2::new(-8.0, 0.0), Vec2::new(8.0, 0.0), RED, RED);
            lines.segment(Vec2::new(0.0, -8.0), Vec2::new(0.0, 8.0), GREEN, GREEN);
        }
        ShapeKind::Square => {
            let corners = [
                Vec2::new(-5.0, -5.0),
                Vec2::new(5.0, -5.0),
                Vec2::new(5.0, 5.0),
                Vec2::new(-5.0, 5.0),
                Vec2::new(-5.0, -5.0),
            ];
            let colors = [RED, GREEN, BLUE, YELLOW, RED];
            for i in 0..4 {
                lines.segment(corners[i], corners[i + 1], colors[i], colors[i + 1]);
            }
        }
        ShapeKind::Star => {
            // Five-pointed star drawn as a pentagram.
            let points: Vec<Vec2> = (0..=5)
                .map(|i| {
                    let angle = TAU / 4.0 + (i * 2 % 5) as f32 * TAU / 5.0;
                    Vec2::new(angle.cos(), angle.sin()) * 8.0
                })
                .collect();
            lines.polyline(&points, YELLOW, RED);
        }
        ShapeKind::Bezier => {
            let control = [
                Vec2::new(-8.0, -5.0),
                Vec2::new(-4.0, 8.0),
                Vec2::new(4.0, -8.0),
                Vec2::new(8.0, 5.0),
            ];
            let points: Vec<Vec2> = (0..=CURVE_SEGMENTS)
                .map(|i| cubic_bezier(&control, i as f32 / CURVE_SEGMENTS as f32))
                .collect();
            lines.polyline(&points, BLUE, GREEN);
            lines.polyline(&control, WHITE, WHITE);
        }
        ShapeKind::Hermite => {
            let p0 = Vec2::new(-8.0, 0.0);
            let p1 = Vec2::new(8.0, 0.0);
            let m0 = Vec2::new(10.0, 25.0);
            let m1 = Vec2::new(10.0, 25.0);
            let points: Vec<Vec2> = (0..=CURVE_SEGMENTS)
                .map(|i| cubic_hermite(p0, m0, p1, m1, i as f32 / CURVE_SEGMENTS as f32))
                .collect();
            lines.polyline(&points, RED, BLUE);
            lines.segment(p0, p0 + m0 * 0.2, WHITE, WHITE);
            lines.segment(p1, p1 + m1 * 0.2, WHITE, WHITE);
        }
    }
    lines.into_parts()
}

fn cubic_bezier(control: &[Vec2; 4], t: f32) -> Vec2 {
    let u = 1.0 - t;
    control[0] * (u * u * u)
        + control[1] * (3.0 * u * u * t)
        + control[2] * (3.0 * u * t * t)
        + control[3] * (t * t * t)
}

fn cubic_hermite(p0: Vec2, m0: Vec2, p1: Vec2, m1: Vec2, t: f32) -> Vec2 {
    let t2 = t * t;
    let t3 = t2 * t;
    p0 * (2.0 * t3 - 3.0 * t2 + 1.0)
        + m0 * (t3 - 2.0 * t2 + t)
        + p1 * (-2.0 * t3 + 3.0 * t2)
        + m1 * (t3 - t2)
}
