use crate::sketch::{PathCurve, Point, Segment};

/// Convert raw pointer samples into a smooth curve.
///
/// Interior samples become quadratic control points whose end points are the
/// midpoints between neighbouring samples, so the curve is tangent-continuous
/// at every joint. The first and last samples are kept verbatim.
pub fn smooth_stroke(points: &[Point]) -> PathCurve {
    let Some(first) = points.first() else {
        return PathCurve::default();
    };

    let mut segments = Vec::with_capacity(points.len());
    segments.push(Segment::MoveTo { to: first.rounded() });

    if points.len() < 3 {
        segments.extend(
            points[1..]
                .iter()
                .map(|point| Segment::LineTo { to: point.rounded() }),
        );
        return PathCurve::new(segments);
    }

    for pair in points[1..].windows(2) {
        let (ctrl, next) = (pair[0], pair[1]);
        segments.push(Segment::QuadTo {
            ctrl: ctrl.rounded(),
            to: ctrl.midpoint(next).rounded(),
        });
    }

    let last = points[points.len() - 1];
    segments.push(Segment::LineTo { to: last.rounded() });
    PathCurve::new(segments)
}

#[cfg(test)]
mod tests {
    use super::smooth_stroke;
    use crate::sketch::{Point, Segment};

    #[test]
    fn empty_input_yields_empty_curve() {
        assert!(smooth_stroke(&[]).is_empty());
    }

    #[test]
    fn single_point_is_kept_verbatim() {
        let curve = smooth_stroke(&[Point::new(3.0, 4.0)]);
        assert_eq!(
            curve.segments(),
            &[Segment::MoveTo {
                to: Point::new(3.0, 4.0)
            }]
        );
    }

    #[test]
    fn two_points_form_a_straight_segment() {
        let curve = smooth_stroke(&[Point::new(0.0, 0.0), Point::new(10.0, 5.0)]);
        assert_eq!(
            curve.segments(),
            &[
                Segment::MoveTo {
                    to: Point::new(0.0, 0.0)
                },
                Segment::LineTo {
                    to: Point::new(10.0, 5.0)
                },
            ]
        );
    }

    #[test]
    fn interior_points_become_midpoint_quadratics() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let curve = smooth_stroke(&points);
        assert_eq!(
            curve.segments(),
            &[
                Segment::MoveTo {
                    to: Point::new(0.0, 0.0)
                },
                Segment::QuadTo {
                    ctrl: Point::new(10.0, 0.0),
                    to: Point::new(10.0, 5.0)
                },
                Segment::QuadTo {
                    ctrl: Point::new(10.0, 10.0),
                    to: Point::new(5.0, 10.0)
                },
                Segment::LineTo {
                    to: Point::new(0.0, 10.0)
                },
            ]
        );
    }

    #[test]
    fn smoothed_curve_starts_and_ends_on_raw_samples() {
        let points: Vec<Point> = (0..25)
            .map(|i| Point::new(i as f32 * 3.0, (i as f32 * 0.7).sin() * 20.0 + 50.0))
            .collect();
        let curve = smooth_stroke(&points);
        assert_eq!(curve.start(), Some(points[0].rounded()));
        assert_eq!(curve.end(), Some(points[24].rounded()));
        assert_eq!(curve.segments().len(), points.len());
    }

    #[test]
    fn coordinates_are_rounded_for_stable_output() {
        let curve = smooth_stroke(&[
            Point::new(0.123, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
        ]);
        assert_eq!(curve.to_svg_path(), "M 0.12 0 Q 1 1 1.5 1.5 L 2 2");
    }
}
