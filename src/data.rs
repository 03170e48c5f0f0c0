use ndarray::{Array1, ArrayView1};
use serde::Serialize;
use crate::error::{Result, SurvivalError};

/// one subject - how long they were followed and whether the event happened
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    pub duration: f64,        // follow-up time
    pub event_observed: bool, // true = event (death), false = censored
}

impl Observation {
    /// subject whose event was seen at `duration`
    pub fn event(duration: f64) -> Self {
        Self { duration, event_observed: true }
    }

    /// subject still event-free when follow-up stopped at `duration`
    pub fn censored(duration: f64) -> Self {
        Self { duration, event_observed: false }
    }
}

/// observations for one cohort/group - durations + event flags (+ optional subject ids)
///
/// Built once and never mutated; every transformation hands back a new set.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSet {
    durations: Array1<f64>,      // time to event/censoring
    events: Vec<bool>,           // true = event, false = censored
    labels: Option<Vec<String>>, // subject ids, kept around for joins
}

impl ObservationSet {
    /// make a new set from raw vecs
    pub fn new(durations: Vec<f64>, events: Vec<bool>) -> Result<Self> {
        if durations.len() != events.len() {
            return Err(SurvivalError::invalid_dimensions(format!(
                "durations len ({}) != events len ({})",
                durations.len(),
                events.len()
            )));
        }

        if durations.is_empty() {
            return Err(SurvivalError::EmptyObservations);
        }

        if let Some(bad) = durations.iter().find(|&&t| t < 0.0 || !t.is_finite()) {
            return Err(SurvivalError::invalid_survival_data(format!(
                "durations must be non-negative & finite, got {bad}"
            )));
        }

        Ok(Self {
            durations: Array1::from(durations),
            events,
            labels: None,
        })
    }

    /// build from individual observations
    pub fn from_observations(observations: impl IntoIterator<Item = Observation>) -> Result<Self> {
        let (durations, events) = observations
            .into_iter()
            .map(|obs| (obs.duration, obs.event_observed))
            .unzip();
        Self::new(durations, events)
    }

    /// attach subject ids (one per observation)
    pub fn with_labels(mut self, labels: Vec<String>) -> Result<Self> {
        if labels.len() != self.n_observations() {
            return Err(SurvivalError::invalid_dimensions(format!(
                "labels len ({}) != n_observations ({})",
                labels.len(),
                self.n_observations()
            )));
        }
        self.labels = Some(labels);
        Ok(self)
    }

    /// how many subjects
    pub fn n_observations(&self) -> usize {
        self.durations.len()
    }

    /// how many subjects had the event
    pub fn n_events(&self) -> usize {
        self.events.iter().filter(|&&e| e).count()
    }

    /// how many subjects were censored
    pub fn n_censored(&self) -> usize {
        self.n_observations() - self.n_events()
    }

    /// follow-up durations
    pub fn durations(&self) -> ArrayView1<'_, f64> {
        self.durations.view()
    }

    /// event indicators (true = event, false = censored)
    pub fn events(&self) -> &[bool] {
        &self.events
    }

    /// subject ids if we have them
    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    /// single observation by position
    pub fn get(&self, index: usize) -> Option<Observation> {
        let duration = *self.durations.get(index)?;
        Some(Observation {
            duration,
            event_observed: self.events[index],
        })
    }

    /// walk the observations in storage order
    pub fn iter(&self) -> impl Iterator<Item = Observation> + '_ {
        self.durations
            .iter()
            .zip(self.events.iter())
            .map(|(&duration, &event_observed)| Observation { duration, event_observed })
    }

    /// unique event times in order
    pub fn event_times(&self) -> Vec<f64> {
        let mut times: Vec<f64> = self
            .iter()
            .filter_map(|obs| obs.event_observed.then_some(obs.duration))
            .collect();

        times.sort_by(f64::total_cmp);
        times.dedup();
        times
    }

    /// unique durations (events and censorings) in order
    pub fn distinct_durations(&self) -> Vec<f64> {
        let mut times = self.durations.to_vec();
        times.sort_by(f64::total_cmp);
        times.dedup();
        times
    }

    /// longest follow-up in the set
    pub fn max_duration(&self) -> f64 {
        self.durations.iter().copied().fold(0.0, f64::max)
    }

    /// risk set size at `time` - everyone with duration >= time
    pub fn at_risk(&self, time: f64) -> usize {
        self.durations.iter().filter(|&&t| t >= time).count()
    }

    /// events recorded exactly at `time`
    pub fn events_at(&self, time: f64) -> usize {
        self.iter()
            .filter(|obs| obs.event_observed && obs.duration == time)
            .count()
    }

    /// grab a subset of subjects by indices
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        if indices.iter().any(|&i| i >= self.n_observations()) {
            return Err(SurvivalError::invalid_dimensions("subset index out of bounds"));
        }

        let durations = indices.iter().map(|&i| self.durations[i]).collect();
        let events = indices.iter().map(|&i| self.events[i]).collect();
        let subset = Self::new(durations, events)?;

        match &self.labels {
            Some(labels) => subset.with_labels(indices.iter().map(|&i| labels[i].clone()).collect()),
            None => Ok(subset),
        }
    }

    /// keep subjects where `mask` is true
    pub fn filter(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.n_observations() {
            return Err(SurvivalError::invalid_dimensions(format!(
                "mask len ({}) != n_observations ({})",
                mask.len(),
                self.n_observations()
            )));
        }

        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| keep.then_some(i))
            .collect();
        self.subset(&indices)
    }

    /// split into (mask true, mask false) - both sides must end up non-empty
    pub fn partition(&self, mask: &[bool]) -> Result<(Self, Self)> {
        let inverted: Vec<bool> = mask.iter().map(|&m| !m).collect();
        Ok((self.filter(mask)?, self.filter(&inverted)?))
    }

    /// same durations, every subject treated as an observed event
    ///
    /// This is the naive estimate that ignores censoring. It is only useful as
    /// a baseline to contrast against the censoring-aware curve.
    pub fn with_all_events_observed(&self) -> Self {
        Self {
            durations: self.durations.clone(),
            events: vec![true; self.n_observations()],
            labels: self.labels.clone(),
        }
    }
}

impl TryFrom<Vec<Observation>> for ObservationSet {
    type Error = SurvivalError;

    fn try_from(observations: Vec<Observation>) -> Result<Self> {
        Self::from_observations(observations)
    }
}
