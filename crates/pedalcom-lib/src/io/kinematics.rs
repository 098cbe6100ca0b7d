use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::Path;

/// Column names to pull from a kinematics export.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicColumns {
    pub time: String,
    pub com_x: String,
    pub com_y: String,
    pub com_z: String,
    pub angle: Option<String>,
    pub force: Option<String>,
}

impl Default for KinematicColumns {
    fn default() -> Self {
        Self {
            time: "time".into(),
            com_x: "center_of_mass_X".into(),
            com_y: "center_of_mass_Y".into(),
            com_z: "center_of_mass_Z".into(),
            angle: None,
            force: None,
        }
    }
}

/// Columns extracted from a kinematics export, row-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KinematicTable {
    pub time: Vec<f64>,
    pub com_pos_x: Vec<f64>,
    pub com_pos_y: Vec<f64>,
    pub com_pos_z: Vec<f64>,
    pub angle: Option<Vec<f64>>,
    pub force: Option<Vec<f64>>,
}

/// Read a tab-delimited kinematics export. Any preamble ending in an
/// `endheader` line is skipped; the next line must name the columns.
pub fn read_kinematics_tsv(path: &Path, columns: &KinematicColumns) -> Result<KinematicTable> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_kinematics(&text, columns).with_context(|| format!("in {}", path.display()))
}

pub fn parse_kinematics(text: &str, columns: &KinematicColumns) -> Result<KinematicTable> {
    let body = strip_preamble(text);
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(body.as_bytes());
    let headers = reader.headers().context("reading header")?.clone();

    let time_idx = locate_column(&headers, &columns.time)?;
    let x_idx = locate_column(&headers, &columns.com_x)?;
    let y_idx = locate_column(&headers, &columns.com_y)?;
    let z_idx = locate_column(&headers, &columns.com_z)?;
    let angle_idx = columns
        .angle
        .as_deref()
        .map(|name| locate_column(&headers, name))
        .transpose()?;
    let force_idx = columns
        .force
        .as_deref()
        .map(|name| locate_column(&headers, name))
        .transpose()?;

    let mut table = KinematicTable {
        angle: angle_idx.map(|_| Vec::new()),
        force: force_idx.map(|_| Vec::new()),
        ..Default::default()
    };
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading row {}", row + 1))?;
        table.time.push(field(&record, time_idx, row)?);
        table.com_pos_x.push(field(&record, x_idx, row)?);
        table.com_pos_y.push(field(&record, y_idx, row)?);
        table.com_pos_z.push(field(&record, z_idx, row)?);
        if let (Some(idx), Some(angle)) = (angle_idx, table.angle.as_mut()) {
            angle.push(field(&record, idx, row)?);
        }
        if let (Some(idx), Some(force)) = (force_idx, table.force.as_mut()) {
            force.push(field(&record, idx, row)?);
        }
    }
    if table.time.is_empty() {
        anyhow::bail!("no kinematic rows found");
    }
    Ok(table)
}

fn strip_preamble(text: &str) -> &str {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        offset += line.len();
        if line.trim().eq_ignore_ascii_case("endheader") {
            return &text[offset..];
        }
    }
    text
}

fn locate_column(headers: &StringRecord, requested: &str) -> Result<usize> {
    headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(requested))
        .ok_or_else(|| anyhow!("missing column '{}'", requested))
}

fn field(record: &StringRecord, idx: usize, row: usize) -> Result<f64> {
    let raw = record
        .get(idx)
        .ok_or_else(|| anyhow!("row {} has no column {}", row + 1, idx + 1))?;
    raw.parse::<f64>()
        .with_context(|| format!("row {}: '{}' is not a number", row + 1, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "Positions\nversion=1\nnRows=3\nendheader\n\
time\tcenter_of_mass_X\tcenter_of_mass_Y\tcenter_of_mass_Z\tcrank\n\
0.00\t0.10\t1.05\t0.00\t10\n\
0.01\t0.11\t1.06\t0.01\t20\n\
0.02\t0.12\t1.04\t0.02\t30\n";

    #[test]
    fn reads_center_of_mass_columns_after_preamble() {
        let table = parse_kinematics(EXPORT, &KinematicColumns::default()).unwrap();
        assert_eq!(table.time, vec![0.0, 0.01, 0.02]);
        assert_eq!(table.com_pos_y, vec![1.05, 1.06, 1.04]);
        assert!(table.angle.is_none());
    }

    #[test]
    fn reads_optional_angle_column() {
        let columns = KinematicColumns {
            angle: Some("CRANK".into()),
            ..Default::default()
        };
        let table = parse_kinematics(EXPORT, &columns).unwrap();
        assert_eq!(table.angle, Some(vec![10.0, 20.0, 30.0]));
    }

    #[test]
    fn header_only_files_parse_without_preamble() {
        let text = "time\tcenter_of_mass_X\tcenter_of_mass_Y\tcenter_of_mass_Z\n0\t1\t2\t3\n";
        let table = parse_kinematics(text, &KinematicColumns::default()).unwrap();
        assert_eq!(table.com_pos_z, vec![3.0]);
    }

    #[test]
    fn missing_column_is_named() {
        let columns = KinematicColumns {
            force: Some("pedal_force".into()),
            ..Default::default()
        };
        let err = parse_kinematics(EXPORT, &columns).unwrap_err();
        assert!(err.to_string().contains("pedal_force"));
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kin.sto");
        std::fs::write(&path, EXPORT).unwrap();
        let table = read_kinematics_tsv(&path, &KinematicColumns::default()).unwrap();
        assert_eq!(table.com_pos_x.len(), 3);
    }
}
