use chrono::NaiveDate;
use member_intake::config::PipelineConfig;
use member_intake::pipeline::{
    CsvRowSource, DirectoryError, GeoLookup, InsertOutcome, MemberDirectory, OutcomeCategory,
    RecordValidator, UploadJobId, UploadQueue, UploadStatus,
};
use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct SharedDirectory {
    ids: Mutex<HashSet<String>>,
}

impl MemberDirectory for SharedDirectory {
    fn exists_by_id_number(&self, id_number: &str) -> Result<bool, DirectoryError> {
        Ok(self.ids.lock().expect("ids mutex").contains(id_number))
    }

    fn insert_if_absent(
        &self,
        record: &member_intake::pipeline::ApplicantRecord,
    ) -> Result<InsertOutcome, DirectoryError> {
        let mut ids = self.ids.lock().expect("ids mutex");
        if ids.insert(record.id_number.clone()) {
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::AlreadyExists)
        }
    }

    fn count_existing(&self) -> Result<u64, DirectoryError> {
        Ok(self.ids.lock().expect("ids mutex").len() as u64)
    }
}

struct AnyGeo;

impl GeoLookup for AnyGeo {
    fn is_valid_ward_code(&self, code: &str) -> bool {
        !code.is_empty()
    }

    fn is_valid_voting_district_code(&self, code: &str) -> bool {
        !code.is_empty()
    }
}

fn start_queue(directory: Arc<SharedDirectory>) -> UploadQueue {
    let config = PipelineConfig::default();
    let validator = RecordValidator::new(&config)
        .with_reference_date(NaiveDate::from_ymd_opt(2026, 8, 26).expect("reference date"));
    UploadQueue::start_with_validator(config, validator, directory, Arc::new(AnyGeo))
}

async fn wait_terminal(queue: &UploadQueue, job_id: UploadJobId) -> UploadStatus {
    for _ in 0..300 {
        let snapshot = queue.status(job_id).expect("job exists");
        if snapshot.status.is_terminal() {
            return snapshot.status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("upload did not finish in time");
}

const HEADER: &str = "First Name,Surname,ID Number,Cell Number,Ward,Voting District\n";

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn csv_upload_produces_a_categorized_report() {
    let directory = Arc::new(SharedDirectory::default());
    directory
        .ids
        .lock()
        .expect("ids mutex")
        .insert("7501010001089".to_string());

    let queue = start_queue(directory.clone());

    let csv = format!(
        "{HEADER}\
         Thandi,Mokoena,8001015009087,+27821234567,79800001,32840012\n\
         Sipho,Dlamini,8001015009087,27831234567,79800002,32840013\n\
         Lerato,Nkosi,8002305009087,0551234567,79800003,32840014\n\
         Ayanda,Zulu,7501010001089,0841234567,79800004,32840015\n"
    );

    let job_id = queue.submit(
        "branch-7",
        Box::new(CsvRowSource::new(Cursor::new(csv.into_bytes()))),
        Some(4),
    );

    assert_eq!(wait_terminal(&queue, job_id).await, UploadStatus::Completed);

    let snapshot = queue.status(job_id).expect("job exists");
    assert_eq!(snapshot.counters.total, 4);
    assert_eq!(snapshot.counters.valid, 1);
    assert_eq!(snapshot.counters.duplicate, 2);
    assert_eq!(snapshot.counters.invalid, 1);

    let report = queue.report(job_id).expect("report ready");
    assert_eq!(report.total_rows(), 4);

    let valid = report
        .section(OutcomeCategory::Valid)
        .expect("valid section");
    assert_eq!(valid.rows.len(), 1);
    assert_eq!(valid.rows[0].row, 1);

    let duplicates = report
        .section(OutcomeCategory::Duplicate)
        .expect("duplicate section");
    assert_eq!(duplicates.rows.len(), 2);
    // Row 2 repeats row 1 inside the file; row 4 collides with the
    // pre-registered member and loses despite being a first occurrence.
    assert_eq!(duplicates.rows[0].row, 2);
    assert_eq!(duplicates.rows[0].conflicting_row, Some(1));
    assert_eq!(duplicates.rows[1].row, 4);
    assert_eq!(duplicates.rows[1].conflicting_row, None);

    let invalid = report
        .section(OutcomeCategory::Invalid)
        .expect("invalid section");
    assert_eq!(invalid.rows.len(), 1);
    let reasons = &invalid.rows[0].reasons;
    assert_eq!(reasons.len(), 2);
    assert!(reasons[0].contains("does not exist in 1980-02"));
    assert!(reasons[1].contains("055"));

    assert!(directory.contains("8001015009087"));
}

impl SharedDirectory {
    fn contains(&self, id_number: &str) -> bool {
        self.ids.lock().expect("ids mutex").contains(id_number)
    }
}

/// Serves the wrapped bytes, then fails as if the disk disappeared.
struct TruncatedReader {
    bytes: Cursor<Vec<u8>>,
    remaining: usize,
}

impl TruncatedReader {
    fn new(bytes: Vec<u8>) -> Self {
        let remaining = bytes.len();
        Self {
            bytes: Cursor::new(bytes),
            remaining,
        }
    }
}

impl Read for TruncatedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.remaining == 0 {
            return Err(std::io::Error::other("device disconnected"));
        }
        let read = self.bytes.read(buf)?;
        self.remaining -= read;
        Ok(read)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn upload_failing_mid_stream_keeps_partial_report() {
    let directory = Arc::new(SharedDirectory::default());
    let queue = start_queue(directory);

    // 50 well-formed rows, then the reader dies before the remaining 150.
    let mut csv = String::from(HEADER);
    for row in 0..50 {
        csv.push_str(&format!(
            "Thandi,Mokoena,8001015009087,082123{row:04},79800001,32840012\n"
        ));
    }

    let job_id = queue.submit(
        "branch-9",
        Box::new(CsvRowSource::new(TruncatedReader::new(csv.into_bytes()))),
        Some(200),
    );

    assert_eq!(wait_terminal(&queue, job_id).await, UploadStatus::Failed);

    let snapshot = queue.status(job_id).expect("job exists");
    assert_eq!(snapshot.counters.total, 50);
    assert!(snapshot
        .failure_cause
        .expect("failure cause recorded")
        .contains("device disconnected"));

    let report = queue.report(job_id).expect("partial report retained");
    assert_eq!(report.total_rows(), 50);
}
