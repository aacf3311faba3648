use std::sync::OnceLock;

use minijinja::Environment;

use crate::entities::run_report::RunReport;
use crate::error::FaersError;

static ENV: OnceLock<Environment<'static>> = OnceLock::new();

/// Formats an integer with `,` thousands separators.
pub(crate) fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn env() -> Result<&'static Environment<'static>, FaersError> {
    if let Some(env) = ENV.get() {
        return Ok(env);
    }

    let mut env = Environment::new();
    env.add_filter("thousands", thousands);
    env.add_template(
        "run_report.md.j2",
        include_str!("../../templates/run_report.md.j2"),
    )?;

    let _ = ENV.set(env);
    ENV.get().ok_or_else(|| FaersError::Api {
        api: "markdown".into(),
        message: "Template environment initialization race".into(),
    })
}

pub fn run_report_markdown(report: &RunReport) -> Result<String, FaersError> {
    let tmpl = env()?.get_template("run_report.md.j2")?;
    Ok(tmpl.render(report)?)
}
