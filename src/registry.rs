//! # Global dataset registry
//!
//! Process-wide, lazily opened ephemeris stores and correction-table paths.
//!
//! Each [`Dataset`] is an [`EphemerisFile`] opened on first access and shared
//! by every later caller; each [`DataFile`] is the path of an auxiliary
//! correction table, resolved and fixed on first access.
//!
//! ## Path resolution
//!
//! 1. An explicit override ([`override_dataset`], [`override_data_file`]),
//! 2. otherwise the environment variable of the dataset (see
//!    [`crate::constants`], e.g. `XEPH_FUNDAMENTAL_EPHEMERIDES`),
//! 3. otherwise [`XephError::DatasetNotDefined`].
//!
//! A resolved path that does not exist fails with
//! [`XephError::DatasetFileNotFound`]; a file that cannot be opened fails
//! with [`XephError::DatasetLoad`]. Failures are not cached: the next access
//! tries again.
//!
//! ## First access wins
//!
//! Overrides only take effect before the first successful access to their
//! slot. Afterwards the slot is fixed for the life of the process: a late
//! override is ignored, logged, and reported by a `false` return value.
//!
//! ## Concurrency
//!
//! Every slot is guarded by its own mutex and a [`OnceCell`]: concurrent
//! first accesses open the backing store exactly once.
use std::sync::{Arc, Mutex, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::{
    constants::{
        ENV_ASTEROID_EPHEMERIDES, ENV_CIP_ITRS_DATA, ENV_DELTA_AT_DATA, ENV_DELTA_T_DATA,
        ENV_FUNDAMENTAL_EPHEMERIDES, ENV_NUTATION_MODEL, ENV_SHORT_TERM_ASTEROID_EPHEMERIDES,
        ENV_SHORT_TERM_FUNDAMENTAL_EPHEMERIDES, ENV_SHORT_TERM_NUTATION_MODEL,
    },
    ephemeris::EphemerisFile,
    xeph_errors::XephError,
};

/// Well-known ephemeris stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    FundamentalEphemerides,
    ShortTermFundamentalEphemerides,
    AsteroidEphemerides,
    ShortTermAsteroidEphemerides,
    NutationModel,
    ShortTermNutationModel,
}

/// Auxiliary correction tables, registered by path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFile {
    DeltaT,
    DeltaAT,
    CipItrs,
}

impl Dataset {
    pub const ALL: [Dataset; 6] = [
        Dataset::FundamentalEphemerides,
        Dataset::ShortTermFundamentalEphemerides,
        Dataset::AsteroidEphemerides,
        Dataset::ShortTermAsteroidEphemerides,
        Dataset::NutationModel,
        Dataset::ShortTermNutationModel,
    ];

    /// Human-readable name used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Dataset::FundamentalEphemerides => "fundamental ephemerides",
            Dataset::ShortTermFundamentalEphemerides => "short-term fundamental ephemerides",
            Dataset::AsteroidEphemerides => "asteroid ephemerides",
            Dataset::ShortTermAsteroidEphemerides => "short-term asteroid ephemerides",
            Dataset::NutationModel => "nutation model",
            Dataset::ShortTermNutationModel => "short-term nutation model",
        }
    }

    /// Environment variable consulted when no override is set.
    pub fn env_key(&self) -> &'static str {
        match self {
            Dataset::FundamentalEphemerides => ENV_FUNDAMENTAL_EPHEMERIDES,
            Dataset::ShortTermFundamentalEphemerides => ENV_SHORT_TERM_FUNDAMENTAL_EPHEMERIDES,
            Dataset::AsteroidEphemerides => ENV_ASTEROID_EPHEMERIDES,
            Dataset::ShortTermAsteroidEphemerides => ENV_SHORT_TERM_ASTEROID_EPHEMERIDES,
            Dataset::NutationModel => ENV_NUTATION_MODEL,
            Dataset::ShortTermNutationModel => ENV_SHORT_TERM_NUTATION_MODEL,
        }
    }

    fn slot(&self) -> &'static Slot<Arc<EphemerisFile>> {
        &STORES[*self as usize]
    }
}

impl DataFile {
    pub const ALL: [DataFile; 3] = [DataFile::DeltaT, DataFile::DeltaAT, DataFile::CipItrs];

    pub fn label(&self) -> &'static str {
        match self {
            DataFile::DeltaT => "DeltaT database",
            DataFile::DeltaAT => "DeltaAT database",
            DataFile::CipItrs => "CIP_ITRS database",
        }
    }

    pub fn env_key(&self) -> &'static str {
        match self {
            DataFile::DeltaT => ENV_DELTA_T_DATA,
            DataFile::DeltaAT => ENV_DELTA_AT_DATA,
            DataFile::CipItrs => ENV_CIP_ITRS_DATA,
        }
    }

    fn slot(&self) -> &'static Slot<Utf8PathBuf> {
        &DATA_FILES[*self as usize]
    }
}

/// One lazily initialized registry entry.
struct Slot<T> {
    /// Guards the override and serializes initialization.
    override_path: Mutex<Option<Utf8PathBuf>>,
    value: OnceCell<T>,
}

impl<T: Clone> Slot<T> {
    const fn new() -> Self {
        Slot {
            override_path: Mutex::new(None),
            value: OnceCell::new(),
        }
    }

    /// The cached value, initializing it from the resolved path on first use.
    fn get_or_try_init(
        &self,
        label: &str,
        env_key: &str,
        init: impl FnOnce(&Utf8Path) -> Result<T, XephError>,
    ) -> Result<T, XephError> {
        self.value
            .get_or_try_init(|| {
                // Held until the value is set: a concurrent override either
                // lands before initialization or sees the initialized slot.
                let guard = self.override_path.lock().unwrap_or_else(PoisonError::into_inner);
                let path = resolve_path(guard.as_deref(), label, env_key)?;
                init(&path)
            })
            .cloned()
    }

    fn set_override(&self, label: &str, path: &str) -> bool {
        let mut guard = self.override_path.lock().unwrap_or_else(PoisonError::into_inner);
        if self.value.get().is_some() {
            warn!(dataset = label, path, "ignoring override of an already loaded dataset");
            return false;
        }
        let path = path.trim();
        *guard = (!path.is_empty()).then(|| Utf8PathBuf::from(path));
        true
    }

    fn is_loaded(&self) -> bool {
        self.value.get().is_some()
    }
}

static STORES: [Slot<Arc<EphemerisFile>>; 6] = [
    Slot::new(),
    Slot::new(),
    Slot::new(),
    Slot::new(),
    Slot::new(),
    Slot::new(),
];

static DATA_FILES: [Slot<Utf8PathBuf>; 3] = [Slot::new(), Slot::new(), Slot::new()];

fn resolve_path(
    override_path: Option<&Utf8Path>,
    label: &str,
    env_key: &str,
) -> Result<Utf8PathBuf, XephError> {
    let path = match override_path {
        Some(path) => path.to_path_buf(),
        None => std::env::var(env_key)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(Utf8PathBuf::from)
            .ok_or_else(|| XephError::DatasetNotDefined(label.to_string()))?,
    };
    if !path.is_file() {
        return Err(XephError::DatasetFileNotFound {
            dataset: label.to_string(),
            path: path.to_string(),
        });
    }
    Ok(path)
}

/// The process-wide store of `dataset`, opened on first access.
pub fn dataset(dataset: Dataset) -> Result<Arc<EphemerisFile>, XephError> {
    let label = dataset.label();
    dataset
        .slot()
        .get_or_try_init(label, dataset.env_key(), |path| {
            let store = EphemerisFile::open_file(path).map_err(|e| XephError::DatasetLoad {
                dataset: label.to_string(),
                source: Box::new(e),
            })?;
            info!(dataset = label, %path, "loaded ephemeris dataset");
            Ok(store)
        })
}

/// Set the file of `dataset`. An empty path clears the override.
///
/// Return
/// ----------
/// * `false` if the dataset has already been loaded: the override is then
///   ignored.
pub fn override_dataset(dataset: Dataset, path: &str) -> bool {
    dataset.slot().set_override(dataset.label(), path)
}

/// Whether `dataset` has been loaded by a previous access.
pub fn is_dataset_loaded(dataset: Dataset) -> bool {
    dataset.slot().is_loaded()
}

/// Path of the correction table `file`, resolved and checked on first access.
pub fn data_file_path(file: DataFile) -> Result<Utf8PathBuf, XephError> {
    let label = file.label();
    file.slot().get_or_try_init(label, file.env_key(), |path| {
        info!(dataset = label, %path, "registered data file");
        Ok(path.to_path_buf())
    })
}

/// Set the path of the correction table `file`. An empty path clears the
/// override.
///
/// Return
/// ----------
/// * `false` if the path has already been resolved: the override is then
///   ignored.
pub fn override_data_file(file: DataFile, path: &str) -> bool {
    file.slot().set_override(file.label(), path)
}

pub fn fundamental_ephemerides() -> Result<Arc<EphemerisFile>, XephError> {
    dataset(Dataset::FundamentalEphemerides)
}

pub fn short_term_fundamental_ephemerides() -> Result<Arc<EphemerisFile>, XephError> {
    dataset(Dataset::ShortTermFundamentalEphemerides)
}

pub fn asteroid_ephemerides() -> Result<Arc<EphemerisFile>, XephError> {
    dataset(Dataset::AsteroidEphemerides)
}

pub fn short_term_asteroid_ephemerides() -> Result<Arc<EphemerisFile>, XephError> {
    dataset(Dataset::ShortTermAsteroidEphemerides)
}

pub fn nutation_model() -> Result<Arc<EphemerisFile>, XephError> {
    dataset(Dataset::NutationModel)
}

pub fn short_term_nutation_model() -> Result<Arc<EphemerisFile>, XephError> {
    dataset(Dataset::ShortTermNutationModel)
}

pub fn delta_t_data_path() -> Result<Utf8PathBuf, XephError> {
    data_file_path(DataFile::DeltaT)
}

pub fn delta_at_data_path() -> Result<Utf8PathBuf, XephError> {
    data_file_path(DataFile::DeltaAT)
}

pub fn cip_itrs_data_path() -> Result<Utf8PathBuf, XephError> {
    data_file_path(DataFile::CipItrs)
}

pub fn override_fundamental_ephemerides(path: &str) -> bool {
    override_dataset(Dataset::FundamentalEphemerides, path)
}

pub fn override_short_term_fundamental_ephemerides(path: &str) -> bool {
    override_dataset(Dataset::ShortTermFundamentalEphemerides, path)
}

pub fn override_asteroid_ephemerides(path: &str) -> bool {
    override_dataset(Dataset::AsteroidEphemerides, path)
}

pub fn override_short_term_asteroid_ephemerides(path: &str) -> bool {
    override_dataset(Dataset::ShortTermAsteroidEphemerides, path)
}

pub fn override_nutation_model(path: &str) -> bool {
    override_dataset(Dataset::NutationModel, path)
}

pub fn override_short_term_nutation_model(path: &str) -> bool {
    override_dataset(Dataset::ShortTermNutationModel, path)
}

pub fn override_delta_t_data_path(path: &str) -> bool {
    override_data_file(DataFile::DeltaT, path)
}

pub fn override_delta_at_data_path(path: &str) -> bool {
    override_data_file(DataFile::DeltaAT, path)
}

pub fn override_cip_itrs_data_path(path: &str) -> bool {
    override_data_file(DataFile::CipItrs, path)
}
