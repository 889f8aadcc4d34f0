use std::collections::VecDeque;

use log::{info, warn};

use crate::settings::PlateauSettings;

/// Watches the number of traces every pass changes. While the average over a sliding
/// window stays below the threshold the window grows; once it has grown past its ceiling
/// the router is considered stuck.
#[derive(Debug, Clone)]
pub struct PlateauDetector {
    settings: PlateauSettings,
    window: usize,
    differences: VecDeque<usize>,
    interrupted: bool,
}

impl PlateauDetector {
    pub fn new(settings: PlateauSettings) -> Self {
        Self {
            window: settings.window,
            settings,
            differences: VecDeque::new(),
            interrupted: false,
        }
    }

    /// Records the trace difference of pass `pass_no`. Returns whether the router should
    /// stop.
    pub fn record(&mut self, pass_no: usize, difference: usize) -> bool {
        self.differences.push_back(difference);

        if self.differences.len() <= self.window {
            return self.interrupted;
        }

        self.differences.pop_front();
        let average = self.average();

        if average < self.settings.threshold {
            warn!(
                "pass {}: average trace difference {:.2} over the last {} passes is below {}",
                pass_no, average, self.window, self.settings.threshold
            );
            self.window += self.settings.window_growth;

            if self.window > self.settings.window_ceiling {
                info!("pass {}: routing has plateaued, stopping", pass_no);
                self.interrupted = true;
            }
        } else {
            self.window = self.settings.window;
        }

        self.interrupted
    }

    pub fn average(&self) -> f64 {
        if self.differences.is_empty() {
            return 0.0;
        }

        self.differences.iter().sum::<usize>() as f64 / self.differences.len() as f64
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn reset(&mut self) {
        self.window = self.settings.window;
        self.differences.clear();
        self.interrupted = false;
    }
}
