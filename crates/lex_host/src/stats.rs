//! Sample statistics for simulator runs.
//!
//! Tracks minimum, maximum, average and a coarse histogram of integer
//! samples such as delay overshoot in counter ticks or read retries.

/// Number of histogram buckets; the last one collects everything above.
const BUCKETS: usize = 20;

/// Accumulates integer samples with minimal overhead.
pub struct SampleStats {
    pub min: u64,
    pub max: u64,
    pub sum: u64,
    pub count: u64,
    pub buckets: [u64; BUCKETS],
    bucket_width: u64,
}

impl SampleStats {
    /// Creates an empty tracker whose histogram buckets are `bucket_width`
    /// units wide.
    pub fn new(bucket_width: u64) -> Self {
        Self {
            min: u64::MAX,
            max: 0,
            sum: 0,
            count: 0,
            buckets: [0; BUCKETS],
            bucket_width: bucket_width.max(1),
        }
    }

    pub fn update(&mut self, sample: u64) {
        self.min = self.min.min(sample);
        self.max = self.max.max(sample);
        self.sum += sample;
        self.count += 1;

        let idx = (sample / self.bucket_width).min(BUCKETS as u64 - 1) as usize;
        self.buckets[idx] += 1;
    }

    /// Folds another tracker with the same bucket width into this one.
    pub fn merge(mut self, other: SampleStats) -> SampleStats {
        if other.count == 0 {
            return self;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
        for (mine, theirs) in self.buckets.iter_mut().zip(other.buckets) {
            *mine += theirs;
        }
        self
    }

    /// Average sample, or 0.0 when nothing was recorded.
    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }

    /// Prints count, min, average and max, then the non-empty buckets.
    pub fn print_report(&self, title: &str, unit: &str) {
        println!("\n{title}");
        println!("Count: {}", self.count);
        if self.count == 0 {
            return;
        }
        println!("Min:   {} {unit}", self.min);
        println!("Avg:   {:.2} {unit}", self.avg());
        println!("Max:   {} {unit}", self.max);

        println!("Distribution ({} {unit} buckets):", self.bucket_width);
        for (i, &count) in self.buckets.iter().enumerate() {
            if count > 0 {
                let range_end = if i == BUCKETS - 1 { ">" } else { "" };
                let lower = i as u64 * self.bucket_width;
                let upper = (i as u64 + 1) * self.bucket_width;
                println!("[{lower:5}-{upper:5}{range_end} {unit}]: {count}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_extremes_and_average() {
        let mut stats = SampleStats::new(10);
        for sample in [3, 17, 250] {
            stats.update(sample);
        }
        assert_eq!(stats.min, 3);
        assert_eq!(stats.max, 250);
        assert_eq!(stats.count, 3);
        assert!((stats.avg() - 90.0).abs() < f64::EPSILON);
        assert_eq!(stats.buckets[0], 1);
        assert_eq!(stats.buckets[1], 1);
        assert_eq!(stats.buckets[BUCKETS - 1], 1);
    }

    #[test]
    fn merge_combines_counts() {
        let mut a = SampleStats::new(1);
        a.update(4);
        let mut b = SampleStats::new(1);
        b.update(1);
        b.update(9);
        let merged = a.merge(b).merge(SampleStats::new(1));
        assert_eq!(merged.count, 3);
        assert_eq!(merged.min, 1);
        assert_eq!(merged.max, 9);
        assert_eq!(merged.sum, 14);
    }
}
