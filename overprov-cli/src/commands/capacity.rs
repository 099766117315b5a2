use crate::output::{self, Field, OutputFormat};
use anyhow::Result;
use overprov_core::ceph;
use overprov_core::OverprovConfig;

pub async fn handle_capacity_command(config: &OverprovConfig, format: OutputFormat) -> Result<()> {
    let cluster = super::connect(config).await?;
    let report = ceph::probe_capacity(&cluster).await?;

    let rows = vec![
        Field::new("Namespace", &config.cluster.namespace),
        Field::new("Total bytes", report.bytes_total),
        Field::new("Total", output::format_bytes(report.bytes_total)),
        Field::new("Total GB", report.total_gb),
        Field::new(
            "Oversized request",
            format!(
                "{}G",
                overprov_core::provision::oversized_request_gb(
                    report.total_gb,
                    config.storage.margin_gb
                )
            ),
        ),
    ];

    output::print_single(&report, rows, format)
}
