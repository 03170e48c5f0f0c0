//! # kaplan-meier
//!
//! product-limit survival curves for censored time-to-event data
//!
//! ## what you get
//!
//! - kaplan-meier fitting that handles ties & censoring properly
//! - greenwood standard errors w/ log-log or plain confidence intervals
//! - log-rank tests for 2 or more groups
//! - step-plot series you can hand straight to a plotting library
//! - loaders for clinical tables + gene expression matrices
//!
//! ## quick start
//!
//! ```rust
//! use kaplan_meier::{KaplanMeier, ObservationSet, log_rank_test, render};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // days followed, true = died, false = censored
//! let durations = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
//! let events = vec![true, false, false, true, true, false, true, true, false, false];
//! let data = ObservationSet::new(durations, events)?;
//!
//! let curve = KaplanMeier::new().fit(&data)?;
//! assert!((curve.survival_at(4.0) - 0.9 * 6.0 / 7.0).abs() < 1e-12);
//! assert_eq!(curve.median_survival(), Some(7.0));
//!
//! // what if we ignored censoring?
//! let naive = KaplanMeier::new().fit(&data.with_all_events_observed())?;
//! assert!(naive.survival_at(5.0) < curve.survival_at(5.0));
//!
//! // compare the two and get something to plot
//! let test = log_rank_test(&data, &data.with_all_events_observed())?;
//! let series = render(&curve);
//! assert!(test.p_value <= 1.0 && !series.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod cohort;
pub mod comparison;
pub mod data;
pub mod error;
pub mod estimator;
pub mod render;

pub use cohort::{ClinicalTable, Cohort, CohortConfig, ExpressionMatrix};
pub use comparison::{log_rank_test, multivariate_log_rank_test, LogRankTest};
pub use data::{Observation, ObservationSet};
pub use error::{Result, SurvivalError};
pub use estimator::{fit, ConfidenceMethod, KaplanMeier, SurvivalCurve};
pub use render::{render, render_band, StepSeries};
