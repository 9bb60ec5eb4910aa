use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const TEMPLATE: &str = "{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} blocks ({per_sec}, eta {eta})";
const STREAM_TEMPLATE: &str = "{spinner} [{elapsed_precise}] {pos} blocks ({per_sec})";

/// Block-count progress on stderr: a bar for sources of known size, a
/// spinner for streams
pub struct ScanProgress {
    bar: ProgressBar,
}

impl ScanProgress {
    /// Bar for `total` blocks (spinner when unknown), starting at `done`;
    /// hidden when `quiet`
    pub fn new(total: Option<u64>, done: u64, quiet: bool) -> Self {
        let bar = match total {
            _ if quiet => ProgressBar::hidden(),
            Some(0) => ProgressBar::hidden(),
            Some(total) => {
                let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
                if let Ok(style) = ProgressStyle::with_template(TEMPLATE) {
                    bar.set_style(style.progress_chars("=> "));
                }
                bar
            }
            None => {
                let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
                if let Ok(style) = ProgressStyle::with_template(STREAM_TEMPLATE) {
                    bar.set_style(style);
                }
                bar
            }
        };
        bar.set_position(done);
        Self { bar }
    }

    pub fn block_done(&self) {
        self.bar.inc(1);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
