//! Loading clinical cohorts from delimited text.
//!
//! The estimator only needs `(duration, event)` pairs. This module covers the
//! glue in front of it: reading a clinical table, reading a subjects x genes
//! expression matrix, joining the two on subject id, and carving the joined
//! cohort into groups by a clinical field or an expression threshold.
//!
//! Rows with a missing duration or event flag are skipped and counted, never
//! imputed. Anything else that doesn't parse is an error.

use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    io::Read,
    path::Path,
};

use log::{debug, warn};
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use crate::{
    data::ObservationSet,
    error::{Result, SurvivalError},
};

/// which columns hold what, and how to read them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortConfig {
    pub id_column: String,
    pub duration_column: String,
    pub event_column: String,
    pub event_values: Vec<String>,    // raw strings meaning "event happened"
    pub censored_values: Vec<String>, // raw strings meaning "censored"
    pub missing_values: Vec<String>,  // raw strings meaning "no data"
    pub delimiter: char,
}

impl Default for CohortConfig {
    fn default() -> Self {
        let strings = |values: &[&str]| values.iter().map(|v| (*v).to_string()).collect();
        Self {
            id_column: "PATIENT_ID".to_string(),
            duration_column: "OS_MONTHS".to_string(),
            event_column: "OS_STATUS".to_string(),
            event_values: strings(&["1", "1:DECEASED", "DECEASED", "Dead", "dead", "true"]),
            censored_values: strings(&["0", "0:LIVING", "LIVING", "Alive", "alive", "false"]),
            missing_values: strings(&["", "NA", "NaN", "nan", "null"]),
            delimiter: '\t',
        }
    }
}

impl CohortConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns(
        mut self,
        id_column: impl Into<String>,
        duration_column: impl Into<String>,
        event_column: impl Into<String>,
    ) -> Self {
        self.id_column = id_column.into();
        self.duration_column = duration_column.into();
        self.event_column = event_column.into();
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_event_values(mut self, event: Vec<String>, censored: Vec<String>) -> Self {
        self.event_values = event;
        self.censored_values = censored;
        self
    }

    /// load settings from a json document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SurvivalError::invalid_parameter("cohort config", e.to_string()))
    }

    fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| SurvivalError::invalid_parameter("delimiter", self.delimiter.to_string()))
    }

    fn is_missing(&self, raw: &str) -> bool {
        self.missing_values.iter().any(|m| m == raw)
    }

    fn parse_event(&self, raw: &str, row: usize) -> Result<Option<bool>> {
        let raw = raw.trim();
        if self.is_missing(raw) {
            Ok(None)
        } else if self.event_values.iter().any(|v| v == raw) {
            Ok(Some(true))
        } else if self.censored_values.iter().any(|v| v == raw) {
            Ok(Some(false))
        } else {
            Err(SurvivalError::parse("event flag", raw, row))
        }
    }

    fn parse_duration(&self, raw: &str, row: usize) -> Result<Option<f64>> {
        let raw = raw.trim();
        if self.is_missing(raw) {
            return Ok(None);
        }
        let duration: f64 = raw
            .parse()
            .map_err(|_| SurvivalError::parse("duration", raw, row))?;
        if duration < 0.0 || !duration.is_finite() {
            return Err(SurvivalError::invalid_survival_data(format!(
                "duration {duration} on row {row} must be non-negative & finite"
            )));
        }
        Ok(Some(duration))
    }
}

fn column_index(headers: &[String], column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| SurvivalError::missing_column(column))
}

/// one usable row of the clinical table
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicalRecord {
    pub subject_id: String,
    pub duration: f64,
    pub event_observed: bool,
    pub fields: Vec<String>, // every raw cell, header order
}

/// clinical table w/ parsed survival columns
#[derive(Debug, Clone)]
pub struct ClinicalTable {
    headers: Vec<String>,
    records: Vec<ClinicalRecord>,
    skipped_rows: usize,
    missing_values: Vec<String>,
}

impl ClinicalTable {
    pub fn from_path(path: impl AsRef<Path>, config: &CohortConfig) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        debug!("event=clinical_open path={}", path.as_ref().display());
        Self::from_reader(file, config)
    }

    pub fn from_reader<R: Read>(reader: R, config: &CohortConfig) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(config.delimiter_byte()?)
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let id_idx = column_index(&headers, &config.id_column)?;
        let duration_idx = column_index(&headers, &config.duration_column)?;
        let event_idx = column_index(&headers, &config.event_column)?;

        let mut records = Vec::new();
        let mut skipped_rows = 0;

        for (i, result) in reader.records().enumerate() {
            let record = result?;
            let row = i + 2; // header is line 1

            let subject_id = record.get(id_idx).unwrap_or_default().trim();
            let duration = config.parse_duration(record.get(duration_idx).unwrap_or_default(), row)?;
            let event = config.parse_event(record.get(event_idx).unwrap_or_default(), row)?;

            match (duration, event) {
                (Some(duration), Some(event_observed)) if !config.is_missing(subject_id) => {
                    records.push(ClinicalRecord {
                        subject_id: subject_id.to_string(),
                        duration,
                        event_observed,
                        fields: record.iter().map(str::to_string).collect(),
                    });
                }
                _ => skipped_rows += 1,
            }
        }

        if skipped_rows > 0 {
            warn!("event=clinical_skip rows={skipped_rows} reason=missing_survival_fields");
        }
        debug!("event=clinical_load rows={} skipped={}", records.len(), skipped_rows);

        Ok(Self {
            headers,
            records,
            skipped_rows,
            missing_values: config.missing_values.clone(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[ClinicalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// rows dropped for missing duration/event/id
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    pub fn subject_ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.subject_id.as_str()).collect()
    }

    /// every subject as one observation set (labels = subject ids)
    pub fn observations(&self) -> Result<ObservationSet> {
        observations_from(self.records.iter())
    }

    /// group subjects by a categorical column - subjects w/ a missing value are left out
    pub fn split_by_field(&self, column: &str) -> Result<BTreeMap<String, ObservationSet>> {
        let idx = column_index(&self.headers, column)?;

        let mut groups: BTreeMap<String, Vec<&ClinicalRecord>> = BTreeMap::new();
        for record in &self.records {
            let value = record.fields.get(idx).map_or("", |v| v.trim());
            if self.missing_values.iter().any(|m| m == value) {
                continue;
            }
            groups.entry(value.to_string()).or_default().push(record);
        }

        groups
            .into_iter()
            .map(|(key, members)| -> Result<(String, ObservationSet)> {
                Ok((key, observations_from(members.into_iter())?))
            })
            .collect()
    }
}

fn observations_from<'a>(records: impl Iterator<Item = &'a ClinicalRecord>) -> Result<ObservationSet> {
    let mut durations = Vec::new();
    let mut events = Vec::new();
    let mut labels = Vec::new();
    for record in records {
        durations.push(record.duration);
        events.push(record.event_observed);
        labels.push(record.subject_id.clone());
    }
    ObservationSet::new(durations, events)?.with_labels(labels)
}

/// subjects x genes expression values
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionMatrix {
    subject_ids: Vec<String>,
    genes: Vec<String>,
    values: Array2<f64>, // missing cells are NaN
}

impl ExpressionMatrix {
    pub fn new(subject_ids: Vec<String>, genes: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if values.dim() != (subject_ids.len(), genes.len()) {
            return Err(SurvivalError::invalid_dimensions(format!(
                "expression values {:?} != ({} subjects, {} genes)",
                values.dim(),
                subject_ids.len(),
                genes.len()
            )));
        }
        Ok(Self { subject_ids, genes, values })
    }

    pub fn from_path(path: impl AsRef<Path>, config: &CohortConfig) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        debug!("event=expression_open path={}", path.as_ref().display());
        Self::from_reader(file, config)
    }

    /// first column = subject id, every other column = one gene
    pub fn from_reader<R: Read>(reader: R, config: &CohortConfig) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(config.delimiter_byte()?)
            .has_headers(true)
            .from_reader(reader);

        let genes: Vec<String> = reader
            .headers()?
            .iter()
            .skip(1)
            .map(|g| g.trim().to_string())
            .collect();

        let mut subject_ids = Vec::new();
        let mut flat = Vec::new();

        for (i, result) in reader.records().enumerate() {
            let record = result?;
            let row = i + 2;

            subject_ids.push(record.get(0).unwrap_or_default().trim().to_string());
            for cell in record.iter().skip(1) {
                let cell = cell.trim();
                let value = if config.is_missing(cell) {
                    f64::NAN
                } else {
                    cell.parse()
                        .map_err(|_| SurvivalError::parse("expression value", cell, row))?
                };
                flat.push(value);
            }
        }

        let values = Array2::from_shape_vec((subject_ids.len(), genes.len()), flat)
            .map_err(|e| SurvivalError::invalid_dimensions(e.to_string()))?;

        debug!(
            "event=expression_load subjects={} genes={}",
            subject_ids.len(),
            genes.len()
        );
        Self::new(subject_ids, genes, values)
    }

    pub fn subject_ids(&self) -> &[String] {
        &self.subject_ids
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn n_subjects(&self) -> usize {
        self.subject_ids.len()
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    fn gene_index(&self, gene: &str) -> Result<usize> {
        self.genes
            .iter()
            .position(|g| g == gene)
            .ok_or_else(|| SurvivalError::unknown_gene(gene))
    }

    /// all subjects' values for one gene
    pub fn gene(&self, gene: &str) -> Result<ArrayView1<'_, f64>> {
        Ok(self.values.column(self.gene_index(gene)?))
    }
}

/// clinical rows that also have expression data, aligned row by row
#[derive(Debug, Clone)]
pub struct Cohort {
    subject_ids: Vec<String>,
    durations: Vec<f64>,
    events: Vec<bool>,
    genes: Vec<String>,
    expression: Array2<f64>,
}

/// subjects split around an expression cut-off
#[derive(Debug, Clone)]
pub struct ExpressionSplit {
    pub gene: String,
    pub threshold: f64,
    pub high: ObservationSet, // expression > threshold
    pub low: ObservationSet,  // expression <= threshold
}

impl Cohort {
    /// inner join on subject id, clinical order wins
    pub fn join(clinical: &ClinicalTable, expression: &ExpressionMatrix) -> Result<Self> {
        let rows: HashMap<&str, usize> = expression
            .subject_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut subject_ids = Vec::new();
        let mut durations = Vec::new();
        let mut events = Vec::new();
        let mut matched_rows = Vec::new();

        for record in clinical.records() {
            if let Some(&row) = rows.get(record.subject_id.as_str()) {
                subject_ids.push(record.subject_id.clone());
                durations.push(record.duration);
                events.push(record.event_observed);
                matched_rows.push(row);
            }
        }

        debug!(
            "event=cohort_join clinical={} expression={} matched={}",
            clinical.len(),
            expression.n_subjects(),
            matched_rows.len()
        );

        if matched_rows.is_empty() {
            return Err(SurvivalError::EmptyObservations);
        }

        Ok(Self {
            subject_ids,
            durations,
            events,
            genes: expression.genes.clone(),
            expression: expression.values.select(Axis(0), &matched_rows),
        })
    }

    pub fn len(&self) -> usize {
        self.subject_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subject_ids.is_empty()
    }

    pub fn subject_ids(&self) -> &[String] {
        &self.subject_ids
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    /// whole cohort as one observation set
    pub fn observations(&self) -> Result<ObservationSet> {
        ObservationSet::new(self.durations.clone(), self.events.clone())?
            .with_labels(self.subject_ids.clone())
    }

    /// expression of `gene` for every cohort member
    pub fn expression(&self, gene: &str) -> Result<ArrayView1<'_, f64>> {
        let idx = self
            .genes
            .iter()
            .position(|g| g == gene)
            .ok_or_else(|| SurvivalError::unknown_gene(gene))?;
        Ok(self.expression.column(idx))
    }

    fn observations_for(&self, indices: &[usize]) -> Result<ObservationSet> {
        let durations = indices.iter().map(|&i| self.durations[i]).collect();
        let events = indices.iter().map(|&i| self.events[i]).collect();
        let labels = indices.iter().map(|&i| self.subject_ids[i].clone()).collect();
        ObservationSet::new(durations, events)?.with_labels(labels)
    }

    /// high (> threshold) vs low (<= threshold) expressers; NaN values sit out
    ///
    /// A threshold that leaves either side empty is an `InvalidParameter` error
    /// naming that side.
    pub fn split_by_expression(&self, gene: &str, threshold: f64) -> Result<ExpressionSplit> {
        let values = self.expression(gene)?;

        let mut high = Vec::new();
        let mut low = Vec::new();
        for (i, &v) in values.iter().enumerate() {
            if v.is_nan() {
                continue;
            }
            if v > threshold {
                high.push(i);
            } else {
                low.push(i);
            }
        }

        debug!(
            "event=expression_split gene={gene} threshold={threshold} high={} low={}",
            high.len(),
            low.len()
        );

        for (side, members) in [("high", &high), ("low", &low)] {
            if members.is_empty() {
                return Err(SurvivalError::invalid_parameter(
                    "threshold",
                    format!("{threshold} leaves the {side} group of {gene} empty"),
                ));
            }
        }

        Ok(ExpressionSplit {
            gene: gene.to_string(),
            threshold,
            high: self.observations_for(&high)?,
            low: self.observations_for(&low)?,
        })
    }

    /// split at the gene's median expression
    pub fn split_by_median(&self, gene: &str) -> Result<ExpressionSplit> {
        let mut values: Vec<f64> = self
            .expression(gene)?
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .collect();

        if values.is_empty() {
            return Err(SurvivalError::invalid_survival_data(format!(
                "no expression values for gene {gene}"
            )));
        }

        values.sort_by(f64::total_cmp);
        let mid = values.len() / 2;
        let median = if values.len() % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        };

        self.split_by_expression(gene, median)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLINICAL: &str = "\
PATIENT_ID\tOS_MONTHS\tOS_STATUS\tER_STATUS
P1\t10.5\t1:DECEASED\tPositive
P2\t20.0\t0:LIVING\tNegative
P3\tNA\t1:DECEASED\tPositive
P4\t5.0\t1:DECEASED\tNegative
P5\t30.0\t0:LIVING\t
P6\t12.0\t0:LIVING\tPositive
";

    const EXPRESSION: &str = "\
PATIENT_ID\tBRCA1\tESR1
P1\t1.5\t-0.2
P2\t-0.3\t0.8
P4\t2.0\tNA
P6\t0.1\t1.1
P9\t0.0\t0.0
";

    fn load() -> (ClinicalTable, ExpressionMatrix) {
        let config = CohortConfig::default();
        (
            ClinicalTable::from_reader(CLINICAL.as_bytes(), &config).unwrap(),
            ExpressionMatrix::from_reader(EXPRESSION.as_bytes(), &config).unwrap(),
        )
    }

    #[test]
    fn test_clinical_load_skips_missing_rows() {
        let (clinical, _) = load();

        assert_eq!(clinical.len(), 5);
        assert_eq!(clinical.skipped_rows(), 1);
        assert_eq!(clinical.subject_ids(), vec!["P1", "P2", "P4", "P5", "P6"]);

        let data = clinical.observations().unwrap();
        assert_eq!(data.n_events(), 2);
        assert_eq!(data.labels().unwrap()[2], "P4");
    }

    #[test]
    fn test_unknown_event_flag_fails() {
        let text = "PATIENT_ID\tOS_MONTHS\tOS_STATUS\nP1\t3.0\tmaybe\n";
        let err = ClinicalTable::from_reader(text.as_bytes(), &CohortConfig::default()).unwrap_err();
        assert!(matches!(err, SurvivalError::Parse { row: 2, .. }));
    }

    #[test]
    fn test_negative_duration_fails() {
        let text = "PATIENT_ID\tOS_MONTHS\tOS_STATUS\nP1\t-3.0\t1\n";
        assert!(ClinicalTable::from_reader(text.as_bytes(), &CohortConfig::default()).is_err());
    }

    #[test]
    fn test_missing_column() {
        let config = CohortConfig::default().with_columns("id", "time", "status");
        let err = ClinicalTable::from_reader(CLINICAL.as_bytes(), &config).unwrap_err();
        assert!(matches!(err, SurvivalError::MissingColumn { column } if column == "id"));
    }

    #[test]
    fn test_custom_csv_layout() {
        let text = "id,time,status\na,1.0,Dead\nb,2.0,Alive\n";
        let config = CohortConfig::new()
            .with_columns("id", "time", "status")
            .with_delimiter(',');
        let clinical = ClinicalTable::from_reader(text.as_bytes(), &config).unwrap();

        assert_eq!(clinical.len(), 2);
        assert!(clinical.records()[0].event_observed);
        assert!(!clinical.records()[1].event_observed);
    }

    #[test]
    fn test_config_from_json() {
        let config = CohortConfig::from_json(r#"{"duration_column": "DFS_MONTHS", "delimiter": ","}"#)
            .unwrap();
        assert_eq!(config.duration_column, "DFS_MONTHS");
        assert_eq!(config.delimiter, ',');
        assert_eq!(config.id_column, "PATIENT_ID"); // default kept

        assert!(CohortConfig::from_json("{not json").is_err());
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let config = CohortConfig::new().with_delimiter('→');
        assert!(matches!(
            ClinicalTable::from_reader(CLINICAL.as_bytes(), &config),
            Err(SurvivalError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_split_by_field() {
        let (clinical, _) = load();
        let groups = clinical.split_by_field("ER_STATUS").unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups["Positive"].n_observations(), 2);
        assert_eq!(groups["Negative"].n_observations(), 2);
        assert!(clinical.split_by_field("HER2").is_err());
    }

    #[test]
    fn test_expression_load() {
        let (_, expression) = load();

        assert_eq!(expression.n_subjects(), 5);
        assert_eq!(expression.genes(), ["BRCA1".to_string(), "ESR1".to_string()]);
        assert!(expression.gene("ESR1").unwrap()[2].is_nan());
        assert!(matches!(expression.gene("TP53"), Err(SurvivalError::UnknownGene { .. })));
    }

    #[test]
    fn test_expression_shape_checked() {
        let values = Array2::zeros((2, 2));
        assert!(ExpressionMatrix::new(vec!["a".into()], vec!["g".into()], values).is_err());
    }

    #[test]
    fn test_join_is_inner() {
        let (clinical, expression) = load();
        let cohort = Cohort::join(&clinical, &expression).unwrap();

        assert_eq!(cohort.subject_ids(), ["P1", "P2", "P4", "P6"]);
        assert_eq!(cohort.expression("BRCA1").unwrap().to_vec(), vec![1.5, -0.3, 2.0, 0.1]);
        assert_eq!(cohort.observations().unwrap().n_observations(), 4);
    }

    #[test]
    fn test_join_without_overlap() {
        let (clinical, _) = load();
        let config = CohortConfig::default();
        let other = ExpressionMatrix::from_reader("PATIENT_ID\tG\nX\t1.0\n".as_bytes(), &config).unwrap();
        assert!(matches!(
            Cohort::join(&clinical, &other),
            Err(SurvivalError::EmptyObservations)
        ));
    }

    #[test]
    fn test_split_by_expression() {
        let (clinical, expression) = load();
        let cohort = Cohort::join(&clinical, &expression).unwrap();
        let split = cohort.split_by_expression("BRCA1", 1.0).unwrap();

        assert_eq!(split.high.labels().unwrap(), ["P1".to_string(), "P4".to_string()]);
        assert_eq!(split.low.labels().unwrap(), ["P2".to_string(), "P6".to_string()]);
        assert_eq!(split.high.n_events(), 2);

        let err = cohort.split_by_expression("BRCA1", 5.0).unwrap_err();
        assert!(matches!(err, SurvivalError::InvalidParameter { value, .. } if value.contains("high")));
    }

    #[test]
    fn test_split_by_median_with_ties_names_empty_side() {
        let (clinical, _) = load();
        let config = CohortConfig::default();
        let flat = "PATIENT_ID\tG\nP1\t1.0\nP2\t1.0\nP4\t1.0\n";
        let expression = ExpressionMatrix::from_reader(flat.as_bytes(), &config).unwrap();
        let cohort = Cohort::join(&clinical, &expression).unwrap();

        // every value equals the median, so nobody is strictly above it
        match cohort.split_by_median("G") {
            Err(SurvivalError::InvalidParameter { parameter, value }) => {
                assert_eq!(parameter, "threshold");
                assert!(value.contains("high group of G"));
            }
            other => panic!("expected a threshold error, got {other:?}"),
        }
    }

    #[test]
    fn test_split_by_median_skips_nan() {
        let (clinical, expression) = load();
        let cohort = Cohort::join(&clinical, &expression).unwrap();
        let split = cohort.split_by_median("ESR1").unwrap();

        // P4 has no ESR1 value; median of -0.2, 0.8, 1.1 is 0.8
        assert_eq!(split.threshold, 0.8);
        assert_eq!(split.high.labels().unwrap(), ["P6".to_string()]);
        assert_eq!(split.low.n_observations(), 2);
    }
}
