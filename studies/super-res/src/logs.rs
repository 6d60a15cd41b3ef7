use std::fs::File;
use std::io::{ BufWriter, Write };
use std::path::{ Path, PathBuf };

use crate::error::Result;

pub const QUALITY_LOG_NAME: &str = "PSNR_value_list.log";
pub const SEPARATOR: &str = "-----------------------------------";

pub fn epoch_log_name(epoch: usize) -> String {
    format!("epoch_{}.log", epoch)
}

/// Per-iteration training log for one epoch. The file is closed when the
/// value is dropped, also on early returns.
pub struct EpochLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl EpochLog {
    pub fn create(dir: &Path, epoch: usize) -> Result<Self> {
        let path = dir.join(epoch_log_name(epoch));
        let writer = BufWriter::new(File::create(&path)?);
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn iteration(&mut self, iteration: usize, total: usize, loss: f64) -> Result<()> {
        writeln!(self.writer, "Iteration [{}/{}]: Loss: {:.4}", iteration, total, loss)?;
        Ok(())
    }

    pub fn finish(mut self, average_loss: f64) -> Result<()> {
        writeln!(self.writer, "{}", SEPARATOR)?;
        writeln!(self.writer, "Average Loss: {:.4}", average_loss)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// One line per epoch with the average validation PSNR, for the whole session.
pub struct QualityLog {
    writer: BufWriter<File>,
}

impl QualityLog {
    pub fn create(dir: &Path) -> Result<Self> {
        let writer = BufWriter::new(File::create(dir.join(QUALITY_LOG_NAME))?);
        Ok(Self { writer })
    }

    pub fn record(&mut self, epoch: usize, average_psnr: f64) -> Result<()> {
        writeln!(self.writer, "Average PSNR of Epoch [{}]: {:.4} dB", epoch, average_psnr)?;
        // visível mesmo se a sessão abortar depois
        self.writer.flush()?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_log_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = EpochLog::create(dir.path(), 3).unwrap();
        assert!(log.path().ends_with("epoch_3.log"));
        log.iteration(1, 2, 0.123456).unwrap();
        log.iteration(2, 2, 0.5).unwrap();
        log.finish(0.311728).unwrap();

        let content = std::fs::read_to_string(dir.path().join("epoch_3.log")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec![
            "Iteration [1/2]: Loss: 0.1235",
            "Iteration [2/2]: Loss: 0.5000",
            SEPARATOR,
            "Average Loss: 0.3117",
        ]);
    }

    #[test]
    fn test_quality_log_appends_per_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = QualityLog::create(dir.path()).unwrap();
        log.record(0, 21.5).unwrap();
        log.record(1, 23.25).unwrap();
        log.finish().unwrap();

        let content = std::fs::read_to_string(dir.path().join(QUALITY_LOG_NAME)).unwrap();
        assert_eq!(content, "Average PSNR of Epoch [0]: 21.5000 dB\nAverage PSNR of Epoch [1]: 23.2500 dB\n");
    }

    #[test]
    fn test_dropped_epoch_log_is_flushed() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut log = EpochLog::create(dir.path(), 0).unwrap();
            log.iteration(1, 5, 0.25).unwrap();
        }
        let content = std::fs::read_to_string(dir.path().join("epoch_0.log")).unwrap();
        assert_eq!(content, "Iteration [1/5]: Loss: 0.2500\n");
    }
}
