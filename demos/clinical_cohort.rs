//! run with: cargo run --example clinical_cohort -- [clinical.tsv] [expression.tsv] [GENE]

use kaplan_meier::{
    cohort::{ClinicalTable, Cohort, CohortConfig, ExpressionMatrix},
    comparison::log_rank_test,
    render::render,
    KaplanMeier,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _logger = flexi_logger::Logger::try_with_env_or_str("info")?.start()?;

    let mut args = std::env::args().skip(1);
    let clinical_path = args
        .next()
        .unwrap_or_else(|| "demos/data/clinical_sample.tsv".to_string());
    let expression_path = args
        .next()
        .unwrap_or_else(|| "demos/data/expression_sample.tsv".to_string());
    let gene = args.next().unwrap_or_else(|| "ERBB2".to_string());

    println!("Kaplan-Meier - Clinical Cohort Example");
    println!("======================================\n");

    let config = CohortConfig::default();
    let clinical = ClinicalTable::from_path(&clinical_path, &config)?;
    let expression = ExpressionMatrix::from_path(&expression_path, &config)?;

    println!("clinical rows:     {} ({} skipped)", clinical.len(), clinical.skipped_rows());
    println!(
        "expression matrix: {} subjects x {} genes",
        expression.n_subjects(),
        expression.n_genes()
    );

    let cohort = Cohort::join(&clinical, &expression)?;
    println!("joined cohort:     {} subjects\n", cohort.len());

    let estimator = KaplanMeier::new();

    // whole cohort
    println!("Overall Survival");
    println!("----------------");
    let overall = estimator.fit(&cohort.observations()?)?;
    overall.summary().print();
    println!("\n");

    // by a clinical field
    println!("Survival by ER Status");
    println!("---------------------");
    let by_er = clinical.split_by_field("ER_STATUS")?;
    for (status, data) in &by_er {
        let curve = estimator.fit(data)?;
        println!(
            "  {:<10} n = {:>3}  median = {:?}",
            status,
            curve.n_observations(),
            curve.median_survival()
        );
    }
    if let (Some(pos), Some(neg)) = (by_er.get("Positive"), by_er.get("Negative")) {
        let test = log_rank_test(pos, neg)?;
        println!("  log-rank p = {:.4}", test.p_value);
    }
    println!("\n");

    // by expression of one gene
    println!("Survival by {gene} Expression (median split)");
    println!("--------------------------------------------");
    let split = cohort.split_by_median(&gene)?;
    let high = estimator.fit(&split.high)?;
    let low = estimator.fit(&split.low)?;
    println!("  threshold = {:.3}", split.threshold);
    println!("  high: n = {:>3}  median = {:?}", high.n_observations(), high.median_survival());
    println!("  low:  n = {:>3}  median = {:?}", low.n_observations(), low.median_survival());

    let test = log_rank_test(&split.high, &split.low)?;
    test.print();

    println!("\nhigh-expression curve for plotting:");
    println!("{}", serde_json::to_string(&render(&high))?);

    Ok(())
}
