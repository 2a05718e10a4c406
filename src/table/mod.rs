use nalgebra::*;
use std::fs::File;
use std::path::Path;
use std::io::Read;
use anyhow::Context;

pub mod csv;

/// Identifies which column of a table carries the class labels.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelColumn {
    Named(String),
    Pos(usize),
    Last
}

impl From<usize> for LabelColumn {

    fn from(ix : usize) -> Self {
        Self::Pos(ix)
    }
}

impl From<&str> for LabelColumn {

    fn from(name : &str) -> Self {
        Self::Named(name.to_owned())
    }
}

impl LabelColumn {

    fn resolve(&self, names : &[String]) -> anyhow::Result<usize> {
        match self {
            LabelColumn::Named(name) => names.iter()
                .position(|n| n == name )
                .ok_or_else(|| anyhow::anyhow!("No column named '{}'", name) ),
            LabelColumn::Pos(ix) if *ix < names.len() => Ok(*ix),
            LabelColumn::Pos(ix) => Err(anyhow::anyhow!("Column index {} out of range ({} columns)", ix, names.len())),
            LabelColumn::Last => names.len().checked_sub(1)
                .ok_or_else(|| anyhow::anyhow!("Table has no columns") )
        }
    }

}

/// Numeric feature matrix paired with a label for each row. Feature names
/// follow the source column order, without the label column.
#[derive(Debug, Clone)]
pub struct LabelledTable {

    pub names : Vec<String>,

    pub features : DMatrix<f64>,

    pub labels : Vec<String>

}

impl LabelledTable {

    pub fn open(path : impl AsRef<Path>, label : impl Into<LabelColumn>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let f = File::open(path)
            .with_context(|| format!("Unable to open table at {}", path.display()) )?;
        Self::from_reader(f, label)
            .with_context(|| format!("Unable to parse table at {}", path.display()) )
    }

    pub fn from_reader<R : Read>(rdr : R, label : impl Into<LabelColumn>) -> anyhow::Result<Self> {
        let (header, rows) = csv::parse_text_rows(rdr)?;
        let label_ix = label.into().resolve(&header[..])?;
        let names : Vec<String> = header.iter()
            .enumerate()
            .filter(|(i, _)| *i != label_ix )
            .map(|(_, n)| n.clone() )
            .collect();
        let n_feat = names.len();
        if n_feat == 0 {
            anyhow::bail!("Table has no feature columns");
        }
        let mut data = Vec::with_capacity(rows.len() * n_feat);
        let mut labels = Vec::with_capacity(rows.len());
        for (r, row) in rows.iter().enumerate() {
            if row.len() != header.len() {
                anyhow::bail!("Record {} has {} fields (expected {})", r + 1, row.len(), header.len());
            }
            for (c, field) in row.iter().enumerate() {
                if c == label_ix {
                    labels.push(field.clone());
                } else {
                    let v = field.trim().parse::<f64>()
                        .with_context(|| format!("Record {}, column '{}': invalid number '{}'", r + 1, header[c], field) )?;
                    data.push(v);
                }
            }
        }
        let features = DMatrix::from_row_slice(rows.len(), n_feat, &data[..]);
        Ok(Self { names, features, labels })
    }

    pub fn nrows(&self) -> usize {
        self.features.nrows()
    }

}

#[test]
fn named_label_column() {
    let content = "x,species,y\n1.0,a,2.0\n3.5,b,4.0\n";
    let tbl = LabelledTable::from_reader(content.as_bytes(), "species").unwrap();
    assert_eq!(tbl.names, vec!["x".to_string(), "y".to_string()]);
    assert_eq!(tbl.labels, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(tbl.features[(1, 0)], 3.5);
    assert_eq!(tbl.features[(1, 1)], 4.0);
}

#[test]
fn last_label_column_in_headerless_file() {
    let content = "1,2,0\n3,4,1\n5,6,1\n";
    let tbl = LabelledTable::from_reader(content.as_bytes(), LabelColumn::Last).unwrap();
    assert_eq!(tbl.nrows(), 3);
    assert_eq!(tbl.names, vec!["(Column 0)".to_string(), "(Column 1)".to_string()]);
    assert_eq!(tbl.labels, vec!["0".to_string(), "1".to_string(), "1".to_string()]);
    assert_eq!(tbl.features[(0, 1)], 2.0);
}

#[test]
fn invalid_feature_value() {
    let content = "x,label\n1.0,a\nfoo,b\n";
    let err = LabelledTable::from_reader(content.as_bytes(), 1usize).unwrap_err();
    assert!(format!("{:#}", err).contains("Record 2"));
}

#[test]
fn missing_label_column() {
    let content = "x,label\n1.0,a\n";
    assert!(LabelledTable::from_reader(content.as_bytes(), "class").is_err());
}
