//! Utility routines for loading and storing data into files.
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, Writer};
use itertools::Itertools;

use crate::dataset::{Dataset, Feature, Substance, SubstanceId, Value};
use crate::descriptor::DescriptorTable;
use crate::error::{Error, Result};
use crate::model::Prediction;

/// Loads a CSV file of fingerprinted substances.
///
/// The file has no header; each row is:
///     id, value, token1, token2, ...
/// where the tokens form the fingerprint of type `fingerprint`. An empty
/// value marks a substance without measurement, and repeated ids add
/// further measurements. The feature is numeric if every value parses
/// as a number, nominal otherwise (accepted values in order of first
/// appearance).
pub fn load_fingerprints<P: AsRef<Path>>(path: P, feature: &str, fingerprint: &str)
        -> Result<(Dataset, DescriptorTable)> {
    let name = path.as_ref().display().to_string();
    read_fingerprints(File::open(path)?, &name, feature, fingerprint)
}

/// Like `load_fingerprints()`, reading from `reader`.
pub fn read_fingerprints<R: Read>(reader: R, name: &str, feature: &str, fingerprint: &str)
        -> Result<(Dataset, DescriptorTable)> {
    let mut reader = ReaderBuilder::new().has_headers(false)
                                         .flexible(true)
                                         .from_reader(reader);

    let mut rows = vec![];
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        let id = record.get(0).map(str::trim).unwrap_or("");
        if id.is_empty() {
            return Err(Error::bad_request(format!("Missing substance id in line {} of '{}'",
                                                  line + 1, name)));
        }
        let value = record.get(1)
                          .map(str::trim)
                          .filter(|v| !v.is_empty())
                          .map(|v| v.to_string());
        let tokens = record.iter()
                           .skip(2)
                           .map(str::trim)
                           .filter(|t| !t.is_empty())
                           .map(|t| t.to_string())
                           .collect::<Vec<_>>();
        rows.push((id.to_string(), value, tokens));
    }

    let numeric = rows.iter()
                      .filter_map(|r| r.1.as_ref())
                      .all(|v| v.parse::<f64>().is_ok());
    let feature = if numeric {
        Feature::numeric(feature, feature, None)
    } else {
        let accept_values = rows.iter()
                                .filter_map(|r| r.1.as_ref().map(|v| v.as_str()))
                                .unique()
                                .collect::<Vec<_>>();
        Feature::nominal(feature, feature, &accept_values)
    };

    let mut dataset = Dataset::new(name);
    dataset.add_feature(feature.clone());
    let mut descriptors = DescriptorTable::new();

    for (id, value, tokens) in rows {
        let id = SubstanceId::from(id);
        dataset.add_substance(Substance::new(id.0.clone()));
        descriptors.add_fingerprint(&id, fingerprint, tokens);
        match value {
            Some(v) => {
                let v = match v.parse::<f64>() {
                    Ok(x) if numeric => Value::Numeric(x),
                    _ => Value::Nominal(v),
                };
                dataset.add_value(&id, &feature.id, v)?;
            }
            None => dataset.add_empty(&id, &feature.id)?,
        }
    }

    Ok((dataset, descriptors))
}

/// Stores predictions into a CSV file.
///
/// The file starts with a header; each following line describes the
/// prediction of one substance:
///     id, prediction, confidence, measured, warnings
/// where multiple measurements and warnings are separated by "; ".
pub fn store_predictions<'a, P, I>(predictions: I, path: P) -> Result<()>
        where P: AsRef<Path>, I: IntoIterator<Item = &'a Prediction> {
    write_predictions(predictions, File::create(path)?)
}

/// Like `store_predictions()`, writing to `writer`.
pub fn write_predictions<'a, W, I>(predictions: I, writer: W) -> Result<()>
        where W: Write, I: IntoIterator<Item = &'a Prediction> {
    let mut writer = Writer::from_writer(writer);
    writer.write_record(&["id", "prediction", "confidence", "measured", "warnings"])?;

    let join = |values: &[Value]| values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; ");
    for p in predictions {
        writer.write_record(&[p.substance.0.clone(),
                              p.value.as_ref().map(|v| v.to_string()).unwrap_or_default(),
                              p.confidence.to_string(),
                              join(&p.measurements),
                              p.warnings.join("; ")])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::FeatureId;
    use crate::descriptor::DescriptorService;
    use crate::model::Confidence;

    /// Verify that labels, missing values, repeated measurements and
    /// fingerprints are read.
    #[test]
    fn read_nominal() {
        let data = "c1,true,A,B\nc2,false,C\nc1,true\nq,,A\n";
        let (ds, table) = read_fingerprints(data.as_bytes(), "test", "tox", "MP2D").unwrap();
        let tox = FeatureId::from("tox");

        assert!(ds.len() == 3);
        assert!(ds.feature(&tox).unwrap().accept_values().unwrap() == &["true".to_string(),
                                                                         "false".to_string()][..]);
        assert!(ds.values(&SubstanceId::from("c1"), &tox).len() == 2);
        assert!(ds.values(&SubstanceId::from("q"), &tox).is_empty());
        assert!(ds.has_entry(&SubstanceId::from("q"), &tox));

        let fp = table.fingerprint(&Substance::new("c1"), "MP2D").unwrap();
        assert!(fp.len() == 2);
    }

    #[test]
    fn read_numeric() {
        let data = "c1, 1.5 ,A\nc2,-2,B\n";
        let (ds, _) = read_fingerprints(data.as_bytes(), "test", "logc", "MP2D").unwrap();
        let logc = FeatureId::from("logc");

        assert!(!ds.feature(&logc).unwrap().is_nominal());
        assert!(ds.values(&SubstanceId::from("c1"), &logc) == &[Value::Numeric(1.5)][..]);
    }

    #[test]
    fn missing_id() {
        assert!(read_fingerprints(",1,A\n".as_bytes(), "test", "logc", "MP2D").is_err());
    }

    #[test]
    fn write() {
        let mut p = Prediction::unavailable(SubstanceId::from("c1"), "No neighbors.");
        p.measurements = vec![Value::Numeric(1.), Value::Numeric(2.)];
        let mut q = Prediction::unavailable(SubstanceId::from("c2"), "");
        q.warnings.clear();
        q.value = Some(Value::Numeric(0.5));
        q.confidence = Confidence::Estimated(0.75);

        let mut out = vec![];
        write_predictions(&[p, q], &mut out).unwrap();

        let expected = "id,prediction,confidence,measured,warnings\n\
                        c1,,,1; 2,No neighbors.\n\
                        c2,0.5,0.75,,\n";
        assert!(String::from_utf8(out).unwrap() == expected);
    }
}
