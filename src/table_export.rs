//! Spreadsheet export of the merged table, for anyone who wants the data
//! outside the terminal. One sheet mirrors the final CSV, a second carries
//! the cluster assignments and embeddings.

use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::cluster::ClusterView;
use crate::merge::{MERGED_COLUMNS, TeamRecord, record_cells};
use crate::table::fmt_num;

pub struct ExportReport {
    pub teams: usize,
    pub cluster_rows: usize,
}

pub fn export_workbook(
    path: &Path,
    records: &[TeamRecord],
    clusters: &ClusterView,
) -> Result<ExportReport> {
    let mut teams_rows = vec![MERGED_COLUMNS.iter().map(|s| s.to_string()).collect::<Vec<_>>()];
    for record in records {
        teams_rows.push(record_cells(record));
    }

    let mut cluster_rows = vec![vec![
        "team".to_string(),
        "cluster".to_string(),
        "attack".to_string(),
        "control".to_string(),
        "similar".to_string(),
    ]];
    for point in &clusters.points {
        cluster_rows.push(vec![
            point.team.clone(),
            point.cluster.to_string(),
            fmt_num(point.x),
            fmt_num(point.y),
            point.similar.join(", "),
        ]);
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Teams")?;
        write_rows(sheet, &teams_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Clusters")?;
        write_rows(sheet, &cluster_rows)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        teams: teams_rows.len().saturating_sub(1),
        cluster_rows: cluster_rows.len().saturating_sub(1),
    })
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
