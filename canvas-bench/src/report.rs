use std::{fmt::Write, time::Duration};

/// Per-request latencies of one perf run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LatencyReport {
    samples: Vec<(usize, Duration)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub min: Duration,
    pub mean: Duration,
    pub max: Duration,
}

impl LatencyReport {
    pub fn record(&mut self, request: usize, latency: Duration) {
        self.samples.push((request, latency));
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn summary(&self) -> Option<Summary> {
        let latencies = self.samples.iter().map(|(_, latency)| *latency);
        let min = latencies.clone().min()?;
        let max = latencies.clone().max()?;
        let mean = latencies.sum::<Duration>() / self.samples.len() as u32;
        Some(Summary { min, mean, max })
    }

    /// `request,seconds` rows sorted by request number.
    pub fn to_csv(&self) -> String {
        let mut samples = self.samples.clone();
        samples.sort_by_key(|(request, _)| *request);
        let mut csv = String::from("request,seconds\n");
        for (request, latency) in samples {
            let _ = writeln!(csv, "{request},{:.3}", latency.as_secs_f64());
        }
        csv
    }
}
