//! Descriptor calculation boundary.
//!
//! Structure-to-feature computation is not done here. The crate consumes
//! it through `DescriptorService`, which must be idempotent per
//! `(substance, type)`, so results can be cached with `CachedDescriptors`.
use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;

use crate::config::DescriptorMethod;
use crate::dataset::{Substance, SubstanceId};
use crate::error::{Error, Result};

/// Feature representation of a substance.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptors {
    /// Set of structural fragments (fingerprint tokens).
    Fingerprint(BTreeSet<String>),
    /// Numeric properties; `None` marks a missing value.
    Properties(Vec<Option<f64>>),
}

impl Descriptors {
    pub fn len(&self) -> usize {
        match *self {
            Descriptors::Fingerprint(ref fp) => fp.len(),
            Descriptors::Properties(ref p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Computes descriptors of substances.
pub trait DescriptorService: Send + Sync {
    /// Fingerprint of type `kind` (e.g., "MP2D").
    fn fingerprint(&self, substance: &Substance, kind: &str) -> Result<BTreeSet<String>>;

    /// Values of the named properties, in the order of `names`.
    fn properties(&self, substance: &Substance, names: &[String]) -> Result<Vec<Option<f64>>>;
}

/// Computes the descriptors `method` asks for.
///
/// Empty fingerprints and property vectors without a single value are
/// reported as `Error::Descriptor`.
pub fn calculate(method: &DescriptorMethod, service: &dyn DescriptorService,
                 substance: &Substance) -> Result<Descriptors> {
    match *method {
        DescriptorMethod::Fingerprint { ref kind } => {
            let fp = service.fingerprint(substance, kind)?;
            if fp.is_empty() {
                return Err(Error::descriptor(substance.id.0.clone(),
                                             format!("empty {} fingerprint", kind)));
            }
            Ok(Descriptors::Fingerprint(fp))
        }
        DescriptorMethod::Properties { ref names } => {
            let props = service.properties(substance, names)?;
            if props.len() != names.len() {
                return Err(Error::descriptor(substance.id.0.clone(),
                                             format!("expected {} properties, got {}",
                                                     names.len(), props.len())));
            }
            if props.iter().all(|p| p.map_or(true, f64::is_nan)) {
                return Err(Error::descriptor(substance.id.0.clone(), "no property values"));
            }
            Ok(Descriptors::Properties(props))
        }
    }
}

/// In-memory descriptor lookup table.
///
/// Useful when descriptors were computed ahead of time (e.g., loaded
/// from a file together with the training data).
#[derive(Debug, Clone, Default)]
pub struct DescriptorTable {
    fingerprints: HashMap<(SubstanceId, String), BTreeSet<String>>,
    properties: HashMap<SubstanceId, HashMap<String, f64>>,
}

impl DescriptorTable {
    pub fn new() -> DescriptorTable {
        Default::default()
    }

    pub fn add_fingerprint<I, S>(&mut self, substance: &SubstanceId, kind: &str, tokens: I)
            where I: IntoIterator<Item = S>, S: Into<String> {
        self.fingerprints.entry((substance.clone(), kind.to_string()))
                         .or_insert_with(BTreeSet::new)
                         .extend(tokens.into_iter().map(|t| t.into()));
    }

    pub fn add_property(&mut self, substance: &SubstanceId, name: &str, value: f64) {
        self.properties.entry(substance.clone())
                       .or_insert_with(HashMap::new)
                       .insert(name.to_string(), value);
    }

    /// Adds all descriptors of `other`; fingerprints of the same
    /// substance and type are united.
    pub fn merge(&mut self, other: DescriptorTable) {
        for ((id, kind), tokens) in other.fingerprints {
            self.add_fingerprint(&id, &kind, tokens);
        }
        for (id, properties) in other.properties {
            self.properties.entry(id)
                           .or_insert_with(HashMap::new)
                           .extend(properties);
        }
    }
}

impl DescriptorService for DescriptorTable {
    fn fingerprint(&self, substance: &Substance, kind: &str) -> Result<BTreeSet<String>> {
        self.fingerprints.get(&(substance.id.clone(), kind.to_string()))
                         .cloned()
                         .ok_or_else(|| Error::descriptor(substance.id.0.clone(),
                                                          format!("no {} fingerprint", kind)))
    }

    fn properties(&self, substance: &Substance, names: &[String]) -> Result<Vec<Option<f64>>> {
        let props = self.properties.get(&substance.id)
                                   .ok_or_else(|| Error::descriptor(substance.id.0.clone(),
                                                                    "no properties"))?;
        Ok(names.iter().map(|n| props.get(n).cloned()).collect())
    }
}

/// Caches successful results of another `DescriptorService`.
///
/// Failures are not cached, so a transient fault is retried on the
/// next request.
pub struct CachedDescriptors<S: DescriptorService> {
    inner: S,
    fingerprints: Mutex<HashMap<(SubstanceId, String), BTreeSet<String>>>,
    properties: Mutex<HashMap<(SubstanceId, Vec<String>), Vec<Option<f64>>>>,
}

impl<S: DescriptorService> CachedDescriptors<S> {
    pub fn new(inner: S) -> CachedDescriptors<S> {
        CachedDescriptors {
            inner: inner,
            fingerprints: Mutex::new(HashMap::new()),
            properties: Mutex::new(HashMap::new()),
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: DescriptorService> DescriptorService for CachedDescriptors<S> {
    fn fingerprint(&self, substance: &Substance, kind: &str) -> Result<BTreeSet<String>> {
        let key = (substance.id.clone(), kind.to_string());
        if let Some(fp) = self.fingerprints.lock().get(&key) {
            return Ok(fp.clone());
        }
        // Not locked while computing: concurrent misses may compute the
        // same fingerprint twice.
        let fp = self.inner.fingerprint(substance, kind)?;
        self.fingerprints.lock().insert(key, fp.clone());
        Ok(fp)
    }

    fn properties(&self, substance: &Substance, names: &[String]) -> Result<Vec<Option<f64>>> {
        let key = (substance.id.clone(), names.to_vec());
        if let Some(p) = self.properties.lock().get(&key) {
            return Ok(p.clone());
        }
        let p = self.inner.properties(substance, names)?;
        self.properties.lock().insert(key, p.clone());
        Ok(p)
    }
}
