use crate::cell::PreparedCell;
use crate::daily::DailyKcbRow;
use crate::error::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

fn opt(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.4}"),
        _ => String::new(),
    }
}

fn num(value: f64) -> String {
    opt(Some(value))
}

pub fn refet_path(output_dir: &Path, cell_id: &str) -> PathBuf {
    output_dir.join(format!("{cell_id}_refet.csv"))
}

pub fn crop_path(output_dir: &Path, cell_id: &str, class_number: u32) -> PathBuf {
    output_dir.join(format!("{cell_id}_crop_{class_number:02}.csv"))
}

/// Writes the filled weather and both reference ET columns of a cell.
pub fn write_refet<W: Write>(out: W, cell: &PreparedCell) -> Result<()> {
    let mut w = BufWriter::new(out);
    writeln!(w, "date,doy,tmax,tmin,tdew,rs,u2,ppt,eto,etr")?;
    for (i, m) in cell.met.iter().enumerate() {
        writeln!(
            w,
            "{},{},{},{},{},{},{},{},{},{}",
            m.date,
            m.doy,
            num(m.tmax),
            num(m.tmin),
            num(m.tdew),
            num(m.rs),
            num(m.u2),
            num(m.ppt),
            opt(cell.eto.get(i).copied().flatten()),
            opt(cell.etr.get(i).copied().flatten()),
        )?;
    }
    w.flush()?;
    Ok(())
}

/// Writes the daily Kcb rows of one cell–crop. Open water files carry an extra ET column.
pub fn write_crop_rows<W: Write>(out: W, rows: &[DailyKcbRow], open_water: bool) -> Result<()> {
    let mut w = BufWriter::new(out);
    write!(w, "date,doy,kcb,kcb_noadj,in_season,cutting,height,mad,etref")?;
    if open_water {
        write!(w, ",et")?;
    }
    writeln!(w)?;
    for row in rows {
        write!(
            w,
            "{},{},{},{},{},{},{},{},{}",
            row.date,
            row.doy,
            num(row.kcb),
            num(row.kcb_noadj),
            u8::from(row.in_season),
            u8::from(row.cutting),
            num(row.height),
            num(row.mad),
            opt(row.etref),
        )?;
        if open_water {
            write!(w, ",{}", opt(row.water_et))?;
        }
        writeln!(w)?;
    }
    w.flush()?;
    Ok(())
}

pub fn save_refet(output_dir: &Path, cell: &PreparedCell) -> Result<PathBuf> {
    let path = refet_path(output_dir, &cell.cell.id);
    write_refet(File::create(&path)?, cell)?;
    Ok(path)
}

pub fn save_crop_rows(
    output_dir: &Path,
    cell_id: &str,
    class_number: u32,
    rows: &[DailyKcbRow],
    open_water: bool,
) -> Result<PathBuf> {
    let path = crop_path(output_dir, cell_id, class_number);
    write_crop_rows(File::create(&path)?, rows, open_water)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(kcb: f64, water_et: Option<f64>) -> DailyKcbRow {
        DailyKcbRow {
            date: NaiveDate::from_ymd_opt(2001, 7, 1).unwrap(),
            doy: 182,
            kcb,
            kcb_noadj: 1.0,
            in_season: true,
            cutting: false,
            cycle: 1,
            height: 1.2,
            mad: 0.5,
            cgdd: 900.0,
            etref: Some(6.5),
            water_et,
        }
    }

    #[test]
    fn test_crop_rows_csv() {
        let mut buf = Vec::new();
        write_crop_rows(&mut buf, &[row(1.05, None)], false).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "date,doy,kcb,kcb_noadj,in_season,cutting,height,mad,etref");
        assert_eq!(lines[1], "2001-07-01,182,1.0500,1.0000,1,0,1.2000,0.5000,6.5000");
    }

    #[test]
    fn test_open_water_rows_carry_et() {
        let mut buf = Vec::new();
        write_crop_rows(&mut buf, &[row(1.05, Some(6.825)), row(1.05, None)], true).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with(",etref,et"));
        assert!(lines[1].ends_with(",6.5000,6.8250"));
        assert!(lines[2].ends_with(",6.5000,"));
    }

    #[test]
    fn test_output_paths() {
        let dir = Path::new("/out");
        assert_eq!(crop_path(dir, "c1", 7), PathBuf::from("/out/c1_crop_07.csv"));
        assert_eq!(refet_path(dir, "c1"), PathBuf::from("/out/c1_refet.csv"));
    }
}
