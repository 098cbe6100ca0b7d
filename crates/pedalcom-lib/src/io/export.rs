use crate::cycles::{CycleField, CycleSet};
use anyhow::{anyhow, Result};
use csv::WriterBuilder;
use std::{fs, io::Write, path::Path};

/// Write one field as a table: one row per cycle, one column per phase percent.
pub fn write_stacked_csv<W: Write>(writer: W, set: &CycleSet, field: CycleField) -> Result<()> {
    let rows = set
        .stack(field)
        .ok_or_else(|| anyhow!("{} was not computed (no force data)", field))?;
    let mut writer = WriterBuilder::new().from_writer(writer);
    let mut header = vec!["cycle".to_string(), "cadence".to_string()];
    let width = rows.first().map(Vec::len).unwrap_or(0);
    header.extend((0..width).map(|pct| format!("{}{}", field.name(), pct)));
    writer.write_record(&header)?;
    for (cycle, row) in set.iter().zip(&rows) {
        let mut record = vec![cycle.index.to_string(), cycle.cadence.to_string()];
        record.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_stacked_csv_file(path: &Path, set: &CycleSet, field: CycleField) -> Result<()> {
    let file = fs::File::create(path)?;
    write_stacked_csv(file, set, field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycles::test_support::cycle_with;

    #[test]
    fn writes_one_row_per_cycle() {
        let set = CycleSet::from_cycles(
            vec![cycle_with(0, 90.0, Some(250.0)), cycle_with(1, 92.0, Some(255.0))],
            true,
        );
        let mut buf = Vec::new();
        write_stacked_csv(&mut buf, &set, CycleField::Power).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("cycle,cadence,power0,power1"));
        assert!(lines[0].ends_with("power100"));
        assert!(lines[2].starts_with("1,92,255,"));
    }

    #[test]
    fn absent_field_is_an_error() {
        let set = CycleSet::from_cycles(vec![cycle_with(0, 90.0, None)], false);
        assert!(write_stacked_csv(Vec::new(), &set, CycleField::Force).is_err());
    }
}
