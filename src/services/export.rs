use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::staff::StaffRecord;

pub const EXPORT_HEADERS: [&str; 7] = [
    "Staff ID",
    "Name",
    "Department",
    "National TIN",
    "FCT-IRS Tax ID",
    "Status",
    "Submitted At",
];

pub fn export_filename(today: DateTime<Utc>) -> String {
    format!("tax-id-records-{}.csv", today.format("%Y-%m-%d"))
}

pub fn records_to_csv(records: &[StaffRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADERS)?;
    for record in records {
        let submitted_at = record
            .submitted_at
            .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default();
        writer.write_record([
            record.staff_id.as_str(),
            record.name.as_str(),
            record.department.as_deref().unwrap_or_default(),
            record.national_tin.as_deref().unwrap_or_default(),
            record.fct_irs_tax_id.as_deref().unwrap_or_default(),
            record.status.as_str(),
            submitted_at.as_str(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::staff::RecordStatus;
    use chrono::TimeZone;
    use uuid::Uuid;

    #[test]
    fn export_quotes_and_blanks() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap();
        let record = StaffRecord {
            id: Uuid::new_v4(),
            staff_id: "SH-001".to_string(),
            name: "Bello, Amina".to_string(),
            department: None,
            national_tin: Some("1234".to_string()),
            fct_irs_tax_id: None,
            status: RecordStatus::Approved,
            has_submitted: true,
            submitted_at: Some(at),
            reviewed_at: None,
            created_at: at,
            updated_at: at,
        };

        let csv = String::from_utf8(records_to_csv(&[record]).unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Staff ID,Name,Department,National TIN,FCT-IRS Tax ID,Status,Submitted At")
        );
        assert_eq!(
            lines.next(),
            Some("SH-001,\"Bello, Amina\",,1234,,approved,2025-03-14T09:30:00Z")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn filename_carries_the_date() {
        let day = Utc.with_ymd_and_hms(2025, 1, 2, 23, 59, 0).unwrap();
        assert_eq!(export_filename(day), "tax-id-records-2025-01-02.csv");
    }
}
