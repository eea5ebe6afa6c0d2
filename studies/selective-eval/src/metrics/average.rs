/// Computes and stores the average and current value.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AverageMeter {
    val: f64,
    avg: f64,
    sum: f64,
    count: f64,
}

impl AverageMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn update(&mut self, value: f64) {
        self.update_n(value, 1.0);
    }

    /// Adds `value` with the given weight, usually the batch size.
    ///
    /// The average is `sum / count`, so a zero total weight gives NaN.
    pub fn update_n(&mut self, value: f64, weight: f64) {
        self.val = value;
        self.sum += value * weight;
        self.count += weight;
        self.avg = self.sum / self.count;
    }

    pub fn val(&self) -> f64 {
        self.val
    }

    pub fn avg(&self) -> f64 {
        self.avg
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn count(&self) -> f64 {
        self.count
    }
}
