use serde::Serialize;
use tinytemplate::TinyTemplate;

use crate::supervisor::chain::ChainReport;

/// Rendering context for the chain summary
#[derive(Serialize)]
struct SummaryContext {
    started: bool,
    origin: String,
    attempt_count: u32,
    budget: u32,
    outcome: String,
    attempts: Vec<AttemptContext>,
}

#[derive(Serialize)]
struct AttemptContext {
    number: u32,
    job_id: String,
    submitted_at: String,
    state: String,
}

/// Render a human readable summary of a closed chain using TinyTemplate
pub fn render_summary(report: &ChainReport) -> Result<String, tinytemplate::error::Error> {
    /// included summary template
    static SUMMARY: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/summary.txt"));
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("summary", SUMMARY)?;

    let attempts = report.chain.iter()
        .flat_map(|chain| chain.attempts())
        .map(|attempt| AttemptContext {
            number: attempt.number,
            job_id: attempt.job_id.clone(),
            submitted_at: attempt.submitted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            state: attempt.state.map_or_else(|| "not observed".to_string(), |state| state.to_string()),
        })
        .collect();

    let context = SummaryContext {
        started: report.chain.is_some(),
        origin: report.chain.as_ref().map(|chain| chain.origin().to_string()).unwrap_or_default(),
        attempt_count: report.chain.as_ref().map_or(0, |chain| chain.attempt_count()),
        budget: report.chain.as_ref().map_or(0, |chain| chain.budget()),
        outcome: report.outcome.to_string(),
        attempts,
    };

    Ok(tt.render("summary", &context)?.trim_end().to_string())
}
