use hashbrown::HashMap;
use tracing::debug;

const SAMPLE_INTERVAL: u64 = 10;

/// Colony cost snapshot of one sampled iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub mean: f64,
    pub best: f64,
    pub worst: f64,
    pub best_so_far: f64,
}

/// Per-run convergence record, sampled every ten iterations and queryable
/// while the search is still running.
#[derive(Clone, Debug, Default)]
pub struct Statistics {
    samples: HashMap<u64, Sample>,
}

impl Statistics {
    pub fn new() -> Self {
        Self { ..Default::default() }
    }
    pub fn record<I>(&mut self, iteration: u64, costs: I, best_so_far: f64)
        where I: Iterator<Item=f64> {
        if iteration % SAMPLE_INTERVAL != 0 { return }
        let costs: Vec<f64> = costs.collect();
        if costs.is_empty() { return }
        let sum: f64 = costs.iter().sum();
        let best = costs.iter().cloned().fold(f64::INFINITY, f64::min);
        let worst = costs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let sample = Sample {
            mean: sum / costs.len() as f64,
            best,
            worst,
            best_so_far,
        };
        debug!("iteration {:05}: mean {:.0} best {:.0} worst {:.0} best-so-far {:.0}",
               iteration, sample.mean, sample.best, sample.worst, sample.best_so_far);
        self.samples.insert(iteration, sample);
    }
    pub fn sample(&self, iteration: u64) -> Option<&Sample> {
        self.samples.get(&iteration)
    }
    pub fn samples(&self) -> &HashMap<u64, Sample> {
        &self.samples
    }
}


#[cfg(test)]
mod tests {
    use super::Statistics;

    #[test]
    fn it_samples_every_tenth_iteration() {
        let mut statistics = Statistics::new();
        for iteration in 0..25 {
            statistics.record(iteration, [3.0, 1.0, 5.0].iter().cloned(), 1.0);
        }
        assert_eq!(statistics.samples().len(), 3);
        assert!(statistics.sample(10).is_some());
        assert!(statistics.sample(15).is_none());
    }

    #[test]
    fn it_aggregates_the_colony_costs() {
        let mut statistics = Statistics::new();
        statistics.record(20, [3.0, 1.0, 5.0].iter().cloned(), 0.5);
        let sample = statistics.sample(20).unwrap();
        assert_eq!(sample.mean, 3.0);
        assert_eq!(sample.best, 1.0);
        assert_eq!(sample.worst, 5.0);
        assert_eq!(sample.best_so_far, 0.5);
    }
}
