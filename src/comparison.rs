use log::debug;
use ndarray::{Array1, Array2};
use serde::Serialize;
use crate::{
    data::ObservationSet,
    error::{Result, SurvivalError},
};

/// outcome of a log-rank (mantel-cox) test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRankTest {
    pub statistic: f64,     // chi-squared under H0
    pub df: usize,          // groups - 1
    pub p_value: f64,       // upper tail of chi-squared
    pub observed: Vec<f64>, // events per group
    pub expected: Vec<f64>, // expected events per group under H0
}

impl LogRankTest {
    /// reject "same survival" at level `alpha`?
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }

    pub fn print(&self) {
        println!("log-rank test");
        println!("=============");
        println!("{:<10} {:>12} {:>12}", "group", "observed", "expected");
        println!("{:-<36}", "");
        for (g, (o, e)) in self.observed.iter().zip(self.expected.iter()).enumerate() {
            println!("{:<10} {:>12.4} {:>12.4}", g, o, e);
        }
        println!();
        println!("test statistic: {:.6} (df = {})", self.statistic, self.df);
        println!("p-value:        {:.6}", self.p_value);
    }
}

/// two-sample log-rank test - do `a` and `b` share the same survival curve?
pub fn log_rank_test(a: &ObservationSet, b: &ObservationSet) -> Result<LogRankTest> {
    multivariate_log_rank_test(&[a, b])
}

/// k-sample log-rank test over any number of groups
#[allow(clippy::cast_precision_loss)]
pub fn multivariate_log_rank_test(groups: &[&ObservationSet]) -> Result<LogRankTest> {
    let n_groups = groups.len();
    if n_groups < 2 {
        return Err(SurvivalError::InsufficientGroups {
            required: 2,
            actual: n_groups,
        });
    }

    // pool everything as (duration, event, group)
    let mut pooled: Vec<(f64, bool, usize)> = groups
        .iter()
        .enumerate()
        .flat_map(|(g, data)| data.iter().map(move |obs| (obs.duration, obs.event_observed, g)))
        .collect();
    pooled.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut at_risk: Vec<usize> = groups.iter().map(|data| data.n_observations()).collect();
    let mut observed = vec![0.0_f64; n_groups];
    let mut expected = vec![0.0_f64; n_groups];
    let mut variance = Array2::<f64>::zeros((n_groups, n_groups));

    let n = pooled.len();
    let mut i = 0;
    while i < n {
        let time = pooled[i].0;

        let mut deaths = vec![0usize; n_groups];
        let mut removed = vec![0usize; n_groups];
        let mut j = i;
        while j < n && pooled[j].0 == time {
            let (_, event, g) = pooled[j];
            if event {
                deaths[g] += 1;
            }
            removed[g] += 1;
            j += 1;
        }

        let total_at_risk: usize = at_risk.iter().sum();
        let total_deaths: usize = deaths.iter().sum();

        if total_deaths > 0 {
            let n_t = total_at_risk as f64;
            let d_t = total_deaths as f64;
            // hypergeometric spread, zero when everyone at risk dies
            let spread = d_t * (n_t - d_t) / (n_t * n_t * (n_t - 1.0).max(1.0));

            for g in 0..n_groups {
                let n_g = at_risk[g] as f64;
                observed[g] += deaths[g] as f64;
                expected[g] += n_g * d_t / n_t;

                for h in 0..n_groups {
                    let n_h = at_risk[h] as f64;
                    variance[[g, h]] += if g == h {
                        n_g * (n_t - n_g) * spread
                    } else {
                        -n_g * n_h * spread
                    };
                }
            }
        }

        for g in 0..n_groups {
            at_risk[g] -= removed[g];
        }
        i = j;
    }

    // groups never at risk at an event time carry no information; their rows
    // and columns of V are zero, so leave them out before inverting
    let informative: Vec<usize> = (0..n_groups).filter(|&g| variance[[g, g]] > 1e-12).collect();

    // of the rest, drop the last - the full covariance matrix is singular
    let df = informative.len().saturating_sub(1);
    let kept = &informative[..df];
    let diff = Array1::from_iter(kept.iter().map(|&g| observed[g] - expected[g]));
    let v_sub = Array2::from_shape_fn((df, df), |(r, c)| variance[[kept[r], kept[c]]]);

    let statistic = if df == 0 {
        0.0 // no information - nothing to test
    } else {
        let solved = solve_linear_system(&v_sub, &diff)?;
        diff.dot(&solved).max(0.0)
    };

    let p_value = chi_squared_sf(statistic, df);

    debug!(
        "event=log_rank groups={} pooled={} statistic={:.6} df={} p_value={:.6}",
        n_groups, n, statistic, df, p_value
    );

    Ok(LogRankTest {
        statistic,
        df,
        p_value,
        observed,
        expected,
    })
}

/// upper tail of chi-squared w/ `df` degrees of freedom
#[allow(clippy::cast_precision_loss)]
pub fn chi_squared_sf(x: f64, df: usize) -> f64 {
    if x <= 0.0 || df == 0 {
        return 1.0;
    }
    statrs::function::gamma::gamma_ur(df as f64 / 2.0, x / 2.0)
}

/// solve Ax = b w/ partial pivoting
fn solve_linear_system(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return Err(SurvivalError::invalid_dimensions("matrix dimensions mismatch"));
    }

    let mut a = a.clone();
    let mut b = b.clone();

    // forward elimination
    for i in 0..n {
        let max_row = (i..n)
            .max_by(|&x, &y| a[[x, i]].abs().total_cmp(&a[[y, i]].abs()))
            .unwrap_or(i);

        if a[[max_row, i]].abs() < 1e-12 {
            return Err(SurvivalError::numerical_error(
                "log-rank variance matrix is singular",
            ));
        }

        if max_row != i {
            for j in 0..n {
                a.swap([i, j], [max_row, j]);
            }
            b.swap(i, max_row);
        }

        for k in i + 1..n {
            let factor = a[[k, i]] / a[[i, i]];
            for j in i..n {
                a[[k, j]] -= factor * a[[i, j]];
            }
            b[k] -= factor * b[i];
        }
    }

    // back substitution
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        x[i] = b[i];
        for j in i + 1..n {
            x[i] -= a[[i, j]] * x[j];
        }
        x[i] /= a[[i, i]];
    }

    Ok(x)
}
