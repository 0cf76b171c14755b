use member_intake::pipeline::{
    ApplicantRecord, DirectoryError, GeoLookup, InsertOutcome, MemberDirectory,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Mutex-guarded member directory. `insert_if_absent` is atomic under the
/// lock, so racing uploads observe exactly one successful insert per ID.
#[derive(Default)]
pub(crate) struct InMemoryMemberDirectory {
    ids: Mutex<HashSet<String>>,
}

impl MemberDirectory for InMemoryMemberDirectory {
    fn exists_by_id_number(&self, id_number: &str) -> Result<bool, DirectoryError> {
        let ids = self.ids.lock().expect("directory mutex poisoned");
        Ok(ids.contains(id_number))
    }

    fn insert_if_absent(&self, record: &ApplicantRecord) -> Result<InsertOutcome, DirectoryError> {
        let mut ids = self.ids.lock().expect("directory mutex poisoned");
        if ids.insert(record.id_number.clone()) {
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::AlreadyExists)
        }
    }

    fn count_existing(&self) -> Result<u64, DirectoryError> {
        let ids = self.ids.lock().expect("directory mutex poisoned");
        Ok(ids.len() as u64)
    }
}

/// Geographic lookup backed by optional code sets. A `None` set accepts
/// any non-empty code, which keeps local runs usable without a full
/// demarcation load.
pub(crate) struct StaticGeoLookup {
    wards: Option<HashSet<String>>,
    voting_districts: Option<HashSet<String>>,
}

impl StaticGeoLookup {
    pub(crate) fn permissive() -> Self {
        Self {
            wards: None,
            voting_districts: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_codes(wards: &[&str], voting_districts: &[&str]) -> Self {
        Self {
            wards: Some(wards.iter().map(|code| code.to_string()).collect()),
            voting_districts: Some(
                voting_districts
                    .iter()
                    .map(|code| code.to_string())
                    .collect(),
            ),
        }
    }
}

impl GeoLookup for StaticGeoLookup {
    fn is_valid_ward_code(&self, code: &str) -> bool {
        match &self.wards {
            Some(wards) => wards.contains(code),
            None => !code.is_empty(),
        }
    }

    fn is_valid_voting_district_code(&self, code: &str) -> bool {
        match &self.voting_districts {
            Some(districts) => districts.contains(code),
            None => !code.is_empty(),
        }
    }
}
