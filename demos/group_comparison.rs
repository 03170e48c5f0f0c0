use kaplan_meier::{
    comparison::{log_rank_test, multivariate_log_rank_test},
    KaplanMeier, ObservationSet,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// exponential survival w/ uniform administrative censoring
fn simulate_arm(n_subjects: usize, hazard: f64, rng: &mut StdRng) -> Result<ObservationSet, Box<dyn std::error::Error>> {
    let mut durations = Vec::with_capacity(n_subjects);
    let mut events = Vec::with_capacity(n_subjects);

    for _ in 0..n_subjects {
        let time = -rng.r#gen::<f64>().ln() / hazard;
        let censoring_time = rng.gen_range(12.0..60.0);
        durations.push(time.min(censoring_time));
        events.push(time < censoring_time);
    }

    Ok(ObservationSet::new(durations, events)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _logger = flexi_logger::Logger::try_with_env_or_str("info")?.start()?;

    println!("Kaplan-Meier - Group Comparison Example");
    println!("=======================================\n");

    let mut rng = StdRng::seed_from_u64(2024);
    let control = simulate_arm(120, 1.0 / 24.0, &mut rng)?;
    let treated = simulate_arm(120, 1.0 / 40.0, &mut rng)?;
    let placebo = simulate_arm(120, 1.0 / 22.0, &mut rng)?;

    // one estimator, many fits - nothing carries over between groups
    let estimator = KaplanMeier::new();
    let curves = estimator.fit_groups(&[
        ("control", &control),
        ("treated", &treated),
        ("placebo", &placebo),
    ])?;

    println!("{:<10} {:>8} {:>8} {:>14} {:>12}", "group", "n", "deaths", "median (mo)", "S(36)");
    println!("{:-<56}", "");
    for (name, curve) in &curves {
        let median = curve
            .median_survival()
            .map_or_else(|| "not reached".to_string(), |m| format!("{m:.2}"));
        println!(
            "{:<10} {:>8} {:>8} {:>14} {:>12.4}",
            name,
            curve.n_observations(),
            curve.n_events(),
            median,
            curve.survival_at(36.0)
        );
    }
    println!("\n");

    println!("Control vs Treated");
    println!("------------------");
    let pairwise = log_rank_test(&control, &treated)?;
    pairwise.print();
    println!(
        "\nsignificant at 5%: {}\n",
        if pairwise.is_significant(0.05) { "yes" } else { "no" }
    );

    println!("All Three Arms");
    println!("--------------");
    let overall = multivariate_log_rank_test(&[&control, &treated, &placebo])?;
    overall.print();

    Ok(())
}
