//! step-plot series for handing a curve to a plotting tool
//!
//! A plotter that joins points with straight lines needs two points per drop:
//! one at the old level and one at the new level, both at the event time.

use serde::Serialize;
use crate::estimator::SurvivalCurve;

/// one breakpoint of a step plot
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepPoint {
    pub time: f64,
    pub value: f64,
}

/// ordered breakpoints, ready to draw as a polyline
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StepSeries {
    pub points: Vec<StepPoint>,
}

impl StepSeries {
    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.time).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn push(&mut self, time: f64, value: f64) {
        let point = StepPoint { time, value };
        if self.points.last() != Some(&point) {
            self.points.push(point);
        }
    }

    /// build from (time, level) steps starting at level `start`
    fn from_steps(start: f64, steps: impl Iterator<Item = (f64, f64)>, horizon: f64) -> Self {
        let mut series = Self::default();
        series.push(0.0, start);

        let mut level = start;
        for (time, value) in steps {
            if time > horizon {
                break;
            }
            series.push(time, level); // top of the vertical drop
            series.push(time, value);
            level = value;
        }

        let last_time = series.points.last().map_or(0.0, |p| p.time);
        if horizon > last_time {
            series.push(horizon, level);
        }
        series
    }
}

/// survival curve as a step series out to the longest follow-up
pub fn render(curve: &SurvivalCurve) -> StepSeries {
    render_until(curve, curve.max_duration())
}

/// survival curve as a step series, cut or extended to `horizon`
pub fn render_until(curve: &SurvivalCurve, horizon: f64) -> StepSeries {
    StepSeries::from_steps(
        1.0,
        curve.points().iter().map(|p| (p.time, p.survival)),
        horizon,
    )
}

/// lower/upper confidence bounds as step series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceBand {
    pub lower: StepSeries,
    pub upper: StepSeries,
}

/// pointwise confidence band, stepped like the curve itself
pub fn render_band(curve: &SurvivalCurve) -> ConfidenceBand {
    let horizon = curve.max_duration();
    let points = curve.points();
    ConfidenceBand {
        lower: StepSeries::from_steps(1.0, points.iter().map(|p| (p.time, p.ci_lower)), horizon),
        upper: StepSeries::from_steps(1.0, points.iter().map(|p| (p.time, p.ci_upper)), horizon),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::ObservationSet, estimator::fit};
    use approx::assert_relative_eq;

    fn create_test_curve() -> SurvivalCurve {
        let data = ObservationSet::new(
            vec![1.0, 2.0, 3.0, 4.0, 6.0],
            vec![true, false, true, false, false],
        )
        .unwrap();
        fit(&data).unwrap()
    }

    #[test]
    fn test_render_repeats_point_before_each_drop() {
        let series = render(&create_test_curve());

        assert_eq!(series.times(), vec![0.0, 1.0, 1.0, 3.0, 3.0, 6.0]);
        let values = series.values();
        assert_eq!(values[0], 1.0);
        assert_eq!(values[1], 1.0);
        assert_relative_eq!(values[2], 0.8, epsilon = 1e-12);
        assert_relative_eq!(values[3], 0.8, epsilon = 1e-12);
        assert_relative_eq!(values[4], 0.8 * 2.0 / 3.0, epsilon = 1e-12);
        assert_eq!(values[5], values[4]); // held to the last follow-up
    }

    #[test]
    fn test_render_until_truncates() {
        let series = render_until(&create_test_curve(), 2.0);

        assert_eq!(series.times(), vec![0.0, 1.0, 1.0, 2.0]);
        assert_relative_eq!(series.values()[3], 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_curve_renders_as_line() {
        let data = ObservationSet::new(vec![2.0, 5.0], vec![false, false]).unwrap();
        let series = render(&fit(&data).unwrap());

        assert_eq!(
            series.points,
            vec![StepPoint { time: 0.0, value: 1.0 }, StepPoint { time: 5.0, value: 1.0 }]
        );
    }

    #[test]
    fn test_event_at_time_zero() {
        let data = ObservationSet::new(vec![0.0, 1.0], vec![true, false]).unwrap();
        let curve = fit(&data).unwrap();
        let series = render(&curve);

        assert_eq!(series.times(), vec![0.0, 0.0, 1.0]);
        assert_eq!(series.values(), vec![1.0, 0.5, 0.5]);
        // series and curve agree on the origin
        assert_eq!(series.values()[0], curve.survival_at(0.0));
    }

    #[test]
    fn test_render_until_extends_past_follow_up() {
        let curve = create_test_curve();
        let series = render_until(&curve, 10.0);

        assert_eq!(series.times(), vec![0.0, 1.0, 1.0, 3.0, 3.0, 10.0]);
        assert_eq!(series.values()[5], curve.final_survival());
        assert_eq!(series.values()[5], curve.survival_at(10.0));
    }

    #[test]
    fn test_band_brackets_curve() {
        let curve = create_test_curve();
        let band = render_band(&curve);
        let series = render(&curve);

        assert_eq!(band.lower.len(), series.len());
        for ((lo, hi), mid) in band.lower.points.iter().zip(&band.upper.points).zip(&series.points) {
            assert_eq!(lo.time, mid.time);
            assert!(lo.value <= mid.value + 1e-12 && mid.value <= hi.value + 1e-12);
        }
    }

    #[test]
    fn test_series_serializes_for_plotting() {
        let series = render(&create_test_curve());
        let json = serde_json::to_value(&series).unwrap();

        assert_eq!(json["points"].as_array().unwrap().len(), 6);
        assert_eq!(json["points"][0]["time"], 0.0);
        assert_eq!(json["points"][0]["value"], 1.0);
    }
}
