use kaplan_meier::{ConfidenceMethod, KaplanMeier, ObservationSet, render};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _logger = flexi_logger::Logger::try_with_env_or_str("info")?.start()?;

    println!("Kaplan-Meier Estimator - Basic Usage Example");
    println!("============================================\n");

    // ten patients followed for up to ten days
    let durations = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
    let events = vec![true, false, false, true, true, false, true, true, false, false];
    let data = ObservationSet::new(durations, events)?;

    println!("Dataset Information:");
    println!("  - Number of subjects: {}", data.n_observations());
    println!("  - Number of deaths:   {}", data.n_events());
    println!("  - Number censored:    {}", data.n_censored());
    println!();

    // Example 1: censoring-aware estimate
    println!("Example 1: Kaplan-Meier Estimate");
    println!("--------------------------------");

    let estimator = KaplanMeier::new();
    let curve = estimator.fit(&data)?;

    println!(
        "{:>6} {:>8} {:>8} {:>10} {:>10} {:>10}",
        "time", "at risk", "deaths", "survival", "lower", "upper"
    );
    for point in curve.points() {
        println!(
            "{:>6.1} {:>8} {:>8} {:>10.4} {:>10.4} {:>10.4}",
            point.time, point.at_risk, point.events, point.survival, point.ci_lower, point.ci_upper
        );
    }
    println!();
    curve.summary().print();
    println!("\n");

    // Example 2: naive estimate that pretends nobody was censored
    println!("Example 2: Naive Estimate (censoring ignored)");
    println!("---------------------------------------------");

    let naive = estimator.fit(&data.with_all_events_observed())?;
    for t in [2.0, 4.0, 6.0, 8.0, 10.0] {
        println!(
            "  S({:>4.1}) = {:.4} (kaplan-meier) vs {:.4} (naive)",
            t,
            curve.survival_at(t),
            naive.survival_at(t)
        );
    }
    println!("\n");

    // Example 3: plain intervals at 90%
    println!("Example 3: Plain 90% Confidence Intervals");
    println!("-----------------------------------------");

    let plain = KaplanMeier::new()
        .with_confidence_level(0.90)
        .with_confidence_method(ConfidenceMethod::Plain)
        .fit(&data)?;
    for point in plain.points() {
        println!(
            "  t = {:>4.1}: {:.4} [{:.4}, {:.4}] se = {:.4}",
            point.time, point.survival, point.ci_lower, point.ci_upper, point.std_error
        );
    }
    println!("\n");

    // Example 4: step series for a plotting tool
    println!("Example 4: Plottable Step Series (JSON)");
    println!("---------------------------------------");

    let series = render(&curve);
    println!("{}", serde_json::to_string_pretty(&series)?);

    Ok(())
}
