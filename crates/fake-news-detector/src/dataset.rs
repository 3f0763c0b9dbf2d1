//! Loading labeled articles for training.
//!
//! Two layouts are supported: a single CSV with a `label` column, and a pair
//! of CSVs holding only fake or only real articles. In both, the article
//! content is the `title` and `text` columns joined by a space; either column
//! may be missing or empty.

use std::{fs::File, io, path::Path};

use csv::StringRecord;
use tracing::info;

use crate::{
    error::{FakeNewsError, Result},
    pipeline::Label,
};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LabeledDocument {
    pub text: String,
    pub label: Label,
}

impl LabeledDocument {
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

/// Parse `(text, label)` pairs, reporting the index of the first bad label.
pub fn parse_labeled<T, L>(rows: &[(T, L)]) -> Result<Vec<LabeledDocument>>
where
    T: AsRef<str>,
    L: AsRef<str>,
{
    rows.iter()
        .enumerate()
        .map(|(row, (text, label))| -> Result<LabeledDocument> {
            let label = label
                .as_ref()
                .parse::<Label>()
                .map_err(|err| FakeNewsError::DataRow {
                    row,
                    message: err.to_string(),
                })?;
            Ok(LabeledDocument::new(text.as_ref(), label))
        })
        .collect()
}

/// Load a CSV with a `label` column and `title` and/or `text` columns.
pub fn load_labeled_csv(path: impl AsRef<Path>) -> Result<Vec<LabeledDocument>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| FakeNewsError::io(path, e))?;
    let documents = read_labeled(file)?;
    info!(path = %path.display(), documents = documents.len(), "Loaded labeled dataset");
    Ok(documents)
}

/// Load a CSV whose rows all carry `label`.
pub fn load_class_csv(path: impl AsRef<Path>, label: Label) -> Result<Vec<LabeledDocument>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| FakeNewsError::io(path, e))?;
    let documents = read_class(file, label)?;
    info!(path = %path.display(), %label, documents = documents.len(), "Loaded dataset");
    Ok(documents)
}

/// Load separate fake and real CSVs into one corpus.
pub fn load_split_csv(
    fake: impl AsRef<Path>,
    real: impl AsRef<Path>,
) -> Result<Vec<LabeledDocument>> {
    let mut documents = load_class_csv(fake, Label::Fake)?;
    documents.extend(load_class_csv(real, Label::Real)?);
    Ok(documents)
}

pub fn read_labeled<R: io::Read>(reader: R) -> Result<Vec<LabeledDocument>> {
    let mut reader = csv::Reader::from_reader(reader);
    let columns = Columns::from_headers(reader.headers()?)?;
    let label_column = columns
        .label
        .ok_or_else(|| FakeNewsError::data("CSV has no `label` column"))?;

    let mut documents = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let raw_label = record.get(label_column).unwrap_or_default();
        let label = raw_label
            .parse::<Label>()
            .map_err(|err| FakeNewsError::DataRow {
                row,
                message: err.to_string(),
            })?;
        documents.push(LabeledDocument::new(columns.content(&record), label));
    }
    Ok(documents)
}

pub fn read_class<R: io::Read>(reader: R, label: Label) -> Result<Vec<LabeledDocument>> {
    let mut reader = csv::Reader::from_reader(reader);
    let columns = Columns::from_headers(reader.headers()?)?;

    reader
        .records()
        .map(|record| -> Result<LabeledDocument> {
            Ok(LabeledDocument::new(columns.content(&record?), label))
        })
        .collect()
}

struct Columns {
    title: Option<usize>,
    text: Option<usize>,
    label: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        let columns = Self {
            title: find("title"),
            text: find("text"),
            label: find("label"),
        };
        if columns.title.is_none() && columns.text.is_none() {
            return Err(FakeNewsError::data("CSV has neither a `title` nor a `text` column"));
        }
        Ok(columns)
    }

    fn content(&self, record: &StringRecord) -> String {
        let field = move |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or_default();
        match (self.title, self.text) {
            (Some(_), Some(_)) => format!("{} {}", field(self.title), field(self.text)),
            (Some(_), None) => field(self.title).to_string(),
            _ => field(self.text).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_label_column_and_joins_title() {
        let csv = "title,text,label\nShock claim,Aliens built it,fake\n,Study finds,REAL\nHeadline only,,0\n";
        let docs = read_labeled(csv.as_bytes()).unwrap();
        assert_eq!(docs, vec![
            LabeledDocument::new("Shock claim Aliens built it", Label::Fake),
            LabeledDocument::new(" Study finds", Label::Real),
            LabeledDocument::new("Headline only ", Label::Fake),
        ]);
    }

    #[test]
    fn test_unknown_label_reports_row() {
        let csv = "text,label\nfine,real\nodd,satire\n";
        let err = read_labeled(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, FakeNewsError::DataRow { row: 1, .. }));
    }

    #[test]
    fn test_missing_columns() {
        assert!(matches!(
            read_labeled("text\nhello\n".as_bytes()),
            Err(FakeNewsError::Data(_))
        ));
        assert!(matches!(
            read_class("subject,date\nnews,2017\n".as_bytes(), Label::Fake),
            Err(FakeNewsError::Data(_))
        ));
    }

    #[test]
    fn test_class_file_assigns_label() {
        let csv = "title,text,subject\nA,body one,politics\nB,body two,news\n";
        let docs = read_class(csv.as_bytes(), Label::Real).unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d.label == Label::Real));
        assert_eq!(docs[1].text, "B body two");
    }

    #[test]
    fn test_parse_labeled_pairs() {
        let docs = parse_labeled(&[("one", "fake"), ("two", "1")]).unwrap();
        assert_eq!(docs[1].label, Label::Real);
        let err = parse_labeled(&[("one", "fake"), ("two", "unknown")]).unwrap_err();
        assert!(matches!(err, FakeNewsError::DataRow { row: 1, .. }));
    }

    #[test]
    fn test_load_split_files() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("Fake.csv");
        let real = dir.path().join("True.csv");
        std::fs::write(&fake, "title,text\nX,made up\n").unwrap();
        std::fs::write(&real, "title,text\nY,reported\nZ,confirmed\n").unwrap();

        let docs = load_split_csv(&fake, &real).unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].label, Label::Fake);
        assert_eq!(docs[2].text, "Z confirmed");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_labeled_csv("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, FakeNewsError::Io { .. }));
    }
}
