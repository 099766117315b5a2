use crate::output::{self, Field, OutputFormat};
use anyhow::Result;
use overprov_core::{OverprovConfig, Scenario, ScenarioOptions, ScenarioReport};

pub async fn handle_run_command(config: &OverprovConfig, format: OutputFormat) -> Result<()> {
    let options = ScenarioOptions::from_config(config)?;
    let cluster = super::connect(config).await?;

    output::print_info(&format!(
        "Requesting {} GB beyond the capacity of the {} backend in {}",
        options.margin_gb, options.interface, options.namespace
    ));

    let report = Scenario::new(&cluster, options).run().await?;

    output::print_single(&report, report_rows(&report), format)?;
    output::print_success(&format!(
        "Claim of {}G mounted as {}G",
        report.pvc_size, report.observed_gb
    ));

    Ok(())
}

fn report_rows(report: &ScenarioReport) -> Vec<Field> {
    let elapsed = report.finished_at - report.started_at;
    vec![
        Field::new("Namespace", &report.namespace),
        Field::new("Interface", report.interface),
        Field::new("Capacity", output::format_bytes(report.capacity_bytes)),
        Field::new("Requested", format!("{}G", report.pvc_size)),
        Field::new("Mounted", format!("{}G", report.observed_gb)),
        Field::new(
            "Accepted range",
            format!("{}G - {}G", report.lower_bound_gb, report.upper_bound_gb),
        ),
        Field::new("Claim", &report.pvc),
        Field::new("Pod", &report.pod),
        Field::new("Storage class", &report.storage_class),
        Field::new("State", report.final_state),
        Field::new("Duration", format!("{}s", elapsed.num_seconds())),
    ]
}
