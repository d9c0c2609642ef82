// tests/export_reports.rs
//
// Report exporter: CSV round trip, PDF output, busy flag and per-target
// failure isolation.

use std::sync::Arc;

use chrono::NaiveDate;
use rand::{rngs::StdRng, Rng, SeedableRng};

use news_payout_dashboard::aggregate::AuthorAggregate;
use news_payout_dashboard::export::csv::parse_report;
use news_payout_dashboard::export::sheets::MemorySheet;
use news_payout_dashboard::export::{ExportError, ExportTarget, Exporter, Notification};

fn rows(rng: &mut StdRng, n: usize) -> Vec<AuthorAggregate> {
    const NAMES: [&str; 5] = ["Ann", "Doe, Jane", "\"Q\" Smith", "Zoë", "Line\nBreak"];
    (0..n)
        .map(|i| {
            let count = rng.random_range(1..20_u64);
            AuthorAggregate {
                author: format!("{} {i}", NAMES[i % NAMES.len()]),
                article_count: count,
                // whole cents survive the `$x.xx` format exactly
                total_payout: (count * 1250) as f64 / 100.0,
            }
        })
        .collect()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

#[test]
fn csv_round_trip_preserves_rows() {
    let mut rng = StdRng::seed_from_u64(3);
    let ex = Exporter::new(None);
    for n in [0, 1, 7, 60] {
        let input = rows(&mut rng, n);
        let file = ex.export_csv(&input).unwrap();
        assert_eq!(file.filename, "payout-report.csv");
        let parsed = parse_report(&file.bytes).unwrap();
        assert_eq!(parsed.rows, input);
        assert_eq!(
            parsed.totals.articles,
            input.iter().map(|r| r.article_count).sum::<u64>()
        );
    }
}

#[test]
fn pdf_export_produces_document() {
    let mut rng = StdRng::seed_from_u64(9);
    let ex = Exporter::new(None);
    let file = ex.export_pdf(&rows(&mut rng, 100)).unwrap();
    assert_eq!(file.filename, "payout-report.pdf");
    assert_eq!(file.content_type, "application/pdf");
    assert!(file.bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn sheets_export_stamps_capture_date() {
    let sheet = Arc::new(MemorySheet::new());
    let ex = Exporter::new(Some(sheet.clone()));
    let input = vec![AuthorAggregate {
        author: "Ann".into(),
        article_count: 3,
        total_payout: 30.0,
    }];
    assert_eq!(ex.export_sheets(&input, day()).await.unwrap(), 1);

    let got = sheet.appended.lock().unwrap().clone();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].articles, 3);
    assert_eq!(got[0].payout, "$30.00");
    assert_eq!(got[0].date, "5/1/2024");
}

#[tokio::test]
async fn failing_sheet_does_not_block_other_exports() {
    let ex = Exporter::new(Some(Arc::new(MemorySheet::failing())));
    let res = ex.export_sheets(&[], day()).await;
    assert!(matches!(res, Err(ExportError::Sheets(_))));
    let note = Notification::for_result(ExportTarget::Sheets, &res);
    assert_eq!(note.message, "Failed to export to Google Sheets");

    assert!(!ex.is_busy());
    assert!(ex.export_csv(&[]).is_ok());
}

#[test]
fn second_export_while_busy_is_rejected() {
    let ex = Exporter::new(None);
    let guard = ex.try_begin().unwrap();
    let res = ex.export_pdf(&[]);
    assert!(matches!(res, Err(ExportError::Busy)));
    assert_eq!(
        Notification::for_result(ExportTarget::Pdf, &res).message,
        "An export is already in progress"
    );
    drop(guard);
    assert!(ex.export_pdf(&[]).is_ok());
}
