//! Result-file rendering: the `Reporter` collaborator.

mod error;

pub use error::{ReportError, ReportResult};

use std::io::Write;

use ivmetrics::MetricStat;

/// Renders a completed run's [`MetricStat`]s to a results sink.
pub trait Reporter {
    fn report(&mut self, stats: &[MetricStat]) -> ReportResult<()>;
}

/// Plain-text renderer: one line per frame, per-component then picture
/// value, followed by one sequence-average line per metric.
pub struct TextReporter<W: Write> {
    sink: W,
}

impl<W: Write> TextReporter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }
}

impl<W: Write> Reporter for TextReporter<W> {
    fn report(&mut self, stats: &[MetricStat]) -> ReportResult<()> {
        for stat in stats {
            let name = stat.kind().name();
            let num_components = stat.num_components();
            for (idx, (&picture, components)) in
                stat.picture_log().iter().zip(stat.per_component_log()).enumerate()
            {
                write!(self.sink, "{name} frame {idx}:")?;
                for value in &components[..num_components] {
                    write!(self.sink, " {value:.6}")?;
                }
                writeln!(self.sink, " | picture {picture:.6}")?;
            }

            match (stat.component_average(), stat.picture_average()) {
                (Some(components), Some(picture)) => {
                    write!(self.sink, "{name} average:")?;
                    for value in &components[..num_components] {
                        write!(self.sink, " {value:.6}")?;
                    }
                    writeln!(self.sink, " | picture {picture:.6}")?;
                }
                _ => writeln!(self.sink, "{name} average: no frames recorded")?,
            }

            if stat.any_fake() {
                writeln!(self.sink, "{name}: one or more frames used a fake-infinity sentinel")?;
            }
        }
        Ok(())
    }
}
