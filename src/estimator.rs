use log::{debug, trace};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use crate::{
    data::ObservationSet,
    error::{Result, SurvivalError},
};

/// how pointwise confidence bounds are built from the greenwood variance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfidenceMethod {
    /// bounds on log(-log S), always inside [0, 1]
    #[default]
    LogLog,
    /// S +/- z * se, clipped to [0, 1]
    Plain,
}

/// kaplan-meier estimator settings
///
/// Holds configuration only. Every call to [`KaplanMeier::fit`] builds a fresh
/// [`SurvivalCurve`], so one estimator can be reused across any number of groups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KaplanMeier {
    confidence_level: f64,    // e.g. 0.95
    method: ConfidenceMethod, // how to turn variance into bounds
}

impl Default for KaplanMeier {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
            method: ConfidenceMethod::LogLog,
        }
    }
}

impl KaplanMeier {
    /// new estimator w/ defaults (95% log-log intervals)
    pub fn new() -> Self {
        Self::default()
    }

    /// coverage of the pointwise intervals, must be in (0, 1)
    pub fn with_confidence_level(mut self, level: f64) -> Self {
        self.confidence_level = level;
        self
    }

    pub fn with_confidence_method(mut self, method: ConfidenceMethod) -> Self {
        self.method = method;
        self
    }

    pub fn confidence_level(&self) -> f64 {
        self.confidence_level
    }

    pub fn confidence_method(&self) -> ConfidenceMethod {
        self.method
    }

    /// compute the product-limit curve - this does the actual work
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(&self, data: &ObservationSet) -> Result<SurvivalCurve> {
        let z = self.z_score()?;

        let n = data.n_observations();
        let durations = data.durations();
        let events = data.events();

        // sort once, then sweep tied groups
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| durations[a].total_cmp(&durations[b]));

        let mut points = Vec::new();
        let mut event_table = Vec::new();
        let mut survival = 1.0_f64;
        let mut greenwood_sum = 0.0_f64;

        let mut i = 0;
        while i < n {
            let time = durations[order[i]];
            let at_risk = n - i;

            let mut observed = 0;
            let mut j = i;
            while j < n && durations[order[j]] == time {
                if events[order[j]] {
                    observed += 1;
                }
                j += 1;
            }
            let removed = j - i;
            let censored = removed - observed;

            event_table.push(EventTableRow {
                time,
                at_risk,
                observed,
                censored,
                removed,
            });

            if observed > 0 {
                // risk set comes from the same data as the event times, so this can't be empty
                assert!(at_risk > 0, "empty risk set at event time {time}");

                let n_i = at_risk as f64;
                let d_i = observed as f64;
                survival *= 1.0 - d_i / n_i;

                if at_risk > observed {
                    greenwood_sum += d_i / (n_i * (n_i - d_i));
                }

                let (std_error, ci_lower, ci_upper) = self.interval(survival, greenwood_sum, z);
                trace!(
                    "event=km_step time={time} at_risk={at_risk} events={observed} survival={survival:.6}"
                );

                points.push(CurvePoint {
                    time,
                    survival,
                    at_risk,
                    events: observed,
                    censored,
                    std_error,
                    ci_lower,
                    ci_upper,
                });
            }

            i = j;
        }

        debug!(
            "event=km_fit n={} events={} censored={} event_times={} final_survival={:.6}",
            n,
            data.n_events(),
            data.n_censored(),
            points.len(),
            survival
        );

        Ok(SurvivalCurve {
            points,
            event_table,
            n_observations: n,
            n_events: data.n_events(),
            max_duration: data.max_duration(),
            confidence_level: self.confidence_level,
            method: self.method,
        })
    }

    /// fit several named groups independently, keeping input order
    pub fn fit_groups(&self, groups: &[(&str, &ObservationSet)]) -> Result<Vec<(String, SurvivalCurve)>> {
        let fit_one = |&(name, data): &(&str, &ObservationSet)| {
            self.fit(data).map(|curve| (name.to_string(), curve))
        };

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            groups.par_iter().map(fit_one).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            groups.iter().map(fit_one).collect()
        }
    }

    fn z_score(&self) -> Result<f64> {
        let level = self.confidence_level;
        if !(level > 0.0 && level < 1.0) {
            return Err(SurvivalError::invalid_parameter("confidence_level", level.to_string()));
        }

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| SurvivalError::numerical_error(e.to_string()))?;
        Ok(normal.inverse_cdf(1.0 - (1.0 - level) / 2.0))
    }

    /// (std error, lower, upper) for one step
    fn interval(&self, survival: f64, greenwood_sum: f64, z: f64) -> (f64, f64, f64) {
        // everyone left died - variance degenerates, curve is pinned at zero
        if survival <= 0.0 {
            return (0.0, 0.0, 0.0);
        }

        let std_error = survival * greenwood_sum.sqrt();

        match self.method {
            ConfidenceMethod::Plain => (
                std_error,
                (survival - z * std_error).max(0.0),
                (survival + z * std_error).min(1.0),
            ),
            ConfidenceMethod::LogLog => {
                let log_s = survival.ln();
                if log_s == 0.0 {
                    return (std_error, 1.0, 1.0);
                }
                let theta_se = greenwood_sum.sqrt() / log_s.abs();
                let lower = survival.powf((z * theta_se).exp());
                let upper = survival.powf((-z * theta_se).exp());
                (std_error, lower, upper)
            }
        }
    }
}

/// fit with default settings
pub fn fit(data: &ObservationSet) -> Result<SurvivalCurve> {
    KaplanMeier::default().fit(data)
}

/// one step of the curve - everything known at an event time
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    pub time: f64,       // distinct event time
    pub survival: f64,   // S(t) right after the drop
    pub at_risk: usize,  // n_i
    pub events: usize,   // d_i
    pub censored: usize, // censored at exactly this time
    pub std_error: f64,  // greenwood
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// one row per distinct duration, events and censorings alike
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EventTableRow {
    pub time: f64,
    pub at_risk: usize,  // subjects with duration >= time
    pub observed: usize, // events at time
    pub censored: usize, // censorings at time
    pub removed: usize,  // observed + censored
}

/// fitted product-limit curve - immutable once built
///
/// Only event times appear as points. `S(t) = 1` before the first of them
/// and the curve holds its last level after the final one. The origin is
/// pinned at `S(0) = 1`, so deaths at duration 0 show up just after it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurvivalCurve {
    points: Vec<CurvePoint>,
    event_table: Vec<EventTableRow>,
    n_observations: usize,
    n_events: usize,
    max_duration: f64,
    confidence_level: f64,
    method: ConfidenceMethod,
}

impl SurvivalCurve {
    /// the steps, ordered by time
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// per-duration counts including censoring-only times
    pub fn event_table(&self) -> &[EventTableRow] {
        &self.event_table
    }

    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.time).collect()
    }

    pub fn survival_probabilities(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.survival).collect()
    }

    /// number of steps (distinct event times)
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn n_observations(&self) -> usize {
        self.n_observations
    }

    pub fn n_events(&self) -> usize {
        self.n_events
    }

    pub fn n_censored(&self) -> usize {
        self.n_observations - self.n_events
    }

    /// longest follow-up seen while fitting
    pub fn max_duration(&self) -> f64 {
        self.max_duration
    }

    pub fn confidence_level(&self) -> f64 {
        self.confidence_level
    }

    pub fn confidence_method(&self) -> ConfidenceMethod {
        self.method
    }

    /// last step at or before `time`, if any
    fn step_at(&self, time: f64) -> Option<&CurvePoint> {
        if time <= 0.0 {
            return None;
        }
        let idx = self.points.partition_point(|p| p.time <= time);
        idx.checked_sub(1).map(|i| &self.points[i])
    }

    /// S(t) - right-continuous step function
    pub fn survival_at(&self, time: f64) -> f64 {
        self.step_at(time).map_or(1.0, |p| p.survival)
    }

    /// S(t) at each requested time
    pub fn survival_function_at_times(&self, times: &[f64]) -> Vec<f64> {
        times.iter().map(|&t| self.survival_at(t)).collect()
    }

    /// 1 - S(t)
    pub fn cumulative_density_at(&self, time: f64) -> f64 {
        1.0 - self.survival_at(time)
    }

    /// (lower, upper) pointwise bounds at `time`
    pub fn confidence_interval_at(&self, time: f64) -> (f64, f64) {
        self.step_at(time).map_or((1.0, 1.0), |p| (p.ci_lower, p.ci_upper))
    }

    /// greenwood standard error at `time`
    pub fn std_error_at(&self, time: f64) -> f64 {
        self.step_at(time).map_or(0.0, |p| p.std_error)
    }

    /// smallest event time where survival drops to or below `p`
    pub fn percentile(&self, p: f64) -> Result<Option<f64>> {
        if !(0.0..=1.0).contains(&p) {
            return Err(SurvivalError::invalid_parameter("percentile", p.to_string()));
        }
        Ok(self.points.iter().find(|pt| pt.survival <= p).map(|pt| pt.time))
    }

    /// median survival time - None if the curve never reaches 50%
    pub fn median_survival(&self) -> Option<f64> {
        self.points.iter().find(|pt| pt.survival <= 0.5).map(|pt| pt.time)
    }

    /// survival after the last step
    pub fn final_survival(&self) -> f64 {
        self.points.last().map_or(1.0, |p| p.survival)
    }

    pub fn summary(&self) -> CurveSummary {
        CurveSummary {
            n_observations: self.n_observations,
            n_events: self.n_events,
            n_censored: self.n_censored(),
            median_survival: self.median_survival(),
            final_survival: self.final_survival(),
        }
    }
}

/// quick overview of a fitted curve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveSummary {
    pub n_observations: usize,
    pub n_events: usize,
    pub n_censored: usize,
    pub median_survival: Option<f64>,
    pub final_survival: f64,
}

impl CurveSummary {
    /// print out the headline numbers
    pub fn print(&self) {
        println!("kaplan-meier estimate summary");
        println!("=============================");
        println!("{:<20} {:>12}", "subjects", self.n_observations);
        println!("{:<20} {:>12}", "events", self.n_events);
        println!("{:<20} {:>12}", "censored", self.n_censored);
        match self.median_survival {
            Some(median) => println!("{:<20} {:>12.4}", "median survival", median),
            None => println!("{:<20} {:>12}", "median survival", "not reached"),
        }
        println!("{:<20} {:>12.6}", "final survival", self.final_survival);
    }
}
