use ::csv;
use std::io::Read;

pub fn parse_header<R : Read>(
    csv_reader : &mut csv::Reader<R>
) -> anyhow::Result<Vec<String>> {
    let header = csv_reader.headers()?;
    Ok(header.iter().map(|e| e.trim().to_string() ).collect())
}

/// CSV files might have unnamed columns. In this case,
/// attribute arbitrary names "(Column {i})" for i in 0..k
/// to the columns, and return them as the first tuple element.
/// Consider the first line as actual data and return it
/// in the second tuple element. If the first line has at least
/// one non-numeric entry, it is a valid header and None is returned.
/// The label column of a headerless file is then expected to be numeric too.
pub fn try_convert_header_to_data(header : &[String]) -> Option<(Vec<String>, Vec<String>)> {
    if header.is_empty() || header.iter().any(|e| e.parse::<f64>().is_err() ) {
        return None;
    }
    let new_header = (0..header.len())
        .map(|i| String::from("(Column ") + &i.to_string() + ")" )
        .collect();
    Some((new_header, header.to_vec()))
}

/// Reads the content as CSV, returning the header and the data rows as text.
/// Fails if there is no data row.
pub fn parse_text_rows<R : Read>(rdr : R) -> anyhow::Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(rdr);
    let header = parse_header(&mut csv_reader)?;
    let mut rows = Vec::new();
    let header = match try_convert_header_to_data(&header[..]) {
        Some((names, first_row)) => {
            rows.push(first_row);
            names
        },
        None => header
    };
    for (ix_rec, row_record) in csv_reader.records().enumerate() {
        let row = row_record
            .map_err(|e| anyhow::anyhow!("Error parsing CSV record (Line {}): {}", ix_rec + 2, e) )?;
        rows.push(row.iter().map(|e| e.to_string() ).collect());
    }
    if rows.is_empty() {
        anyhow::bail!("No records available");
    }
    Ok((header, rows))
}

#[test]
fn named_header_is_kept() {
    let header = vec!["a".to_string(), "1.0".to_string()];
    assert!(try_convert_header_to_data(&header[..]).is_none());
}

#[test]
fn numeric_header_becomes_data() {
    let (header, rows) = parse_text_rows("1,2\n3,4\n".as_bytes()).unwrap();
    assert_eq!(header, vec!["(Column 0)".to_string(), "(Column 1)".to_string()]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec!["1".to_string(), "2".to_string()]);
}

#[test]
fn empty_table_is_rejected() {
    assert!(parse_text_rows("a,b\n".as_bytes()).is_err());
}
