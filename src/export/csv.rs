//! CSV payout report: `Author,Articles,Payout` header, one row per author,
//! trailing `Total` row. Quoting is left to the `csv` writer.

use ::csv::{ReaderBuilder, Terminator, WriterBuilder};

use super::{format_money, ExportError};
use crate::aggregate::{AuthorAggregate, Totals};

pub const HEADER: [&str; 3] = ["Author", "Articles", "Payout"];
pub const TOTAL_LABEL: &str = "Total";

pub fn render(rows: &[AuthorAggregate], totals: Totals) -> Result<Vec<u8>, ExportError> {
    let mut w = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    let err = |e: ::csv::Error| ExportError::Csv(e.to_string());

    w.write_record(HEADER).map_err(err)?;
    for r in rows {
        w.write_record([
            r.author.as_str(),
            r.article_count.to_string().as_str(),
            format_money(r.total_payout).as_str(),
        ])
        .map_err(err)?;
    }
    w.write_record([
        TOTAL_LABEL,
        totals.articles.to_string().as_str(),
        format_money(totals.payout).as_str(),
    ])
    .map_err(err)?;

    w.into_inner()
        .map_err(|e| ExportError::Csv(e.error().to_string()))
}

/// A report read back from CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReport {
    pub rows: Vec<AuthorAggregate>,
    pub totals: Totals,
}

/// Parse a report written by [`render`]. The final record is the totals row.
pub fn parse_report(data: &[u8]) -> Result<ParsedReport, ExportError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(data);
    let headers = rdr
        .headers()
        .map_err(|e| ExportError::Csv(e.to_string()))?
        .clone();
    if headers.iter().ne(HEADER.iter().copied()) {
        return Err(ExportError::Csv(format!("unexpected header: {headers:?}")));
    }

    let mut rows = Vec::new();
    for rec in rdr.records() {
        let rec = rec.map_err(|e| ExportError::Csv(e.to_string()))?;
        let author = rec.get(0).unwrap_or_default().to_string();
        let article_count = rec
            .get(1)
            .unwrap_or_default()
            .parse::<u64>()
            .map_err(|e| ExportError::Csv(format!("bad article count: {e}")))?;
        let total_payout = parse_money(rec.get(2).unwrap_or_default())?;
        rows.push(AuthorAggregate {
            author,
            article_count,
            total_payout,
        });
    }

    let last = rows
        .pop()
        .filter(|r| r.author == TOTAL_LABEL)
        .ok_or_else(|| ExportError::Csv("missing totals row".to_string()))?;
    Ok(ParsedReport {
        rows,
        totals: Totals {
            articles: last.article_count,
            payout: last.total_payout,
        },
    })
}

fn parse_money(s: &str) -> Result<f64, ExportError> {
    s.trim()
        .trim_start_matches('$')
        .parse::<f64>()
        .map_err(|e| ExportError::Csv(format!("bad amount {s:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::totals;

    fn row(a: &str, n: u64, p: f64) -> AuthorAggregate {
        AuthorAggregate {
            author: a.to_string(),
            article_count: n,
            total_payout: p,
        }
    }

    #[test]
    fn writes_header_rows_and_total() {
        let rows = vec![row("A", 2, 20.0), row("B", 1, 10.0)];
        let out = String::from_utf8(render(&rows, totals(&rows)).unwrap()).unwrap();
        assert_eq!(
            out,
            "Author,Articles,Payout\nA,2,$20.00\nB,1,$10.00\nTotal,3,$30.00\n"
        );
    }

    #[test]
    fn names_with_commas_and_quotes_survive() {
        let rows = vec![row("Doe, \"JD\" Jane", 1, 12.5)];
        let bytes = render(&rows, totals(&rows)).unwrap();
        let parsed = parse_report(&bytes).unwrap();
        assert_eq!(parsed.rows, rows);
        assert_eq!(parsed.totals.articles, 1);
        assert_eq!(parsed.totals.payout, 12.5);
    }

    #[test]
    fn empty_report_still_has_total() {
        let bytes = render(&[], totals(&[])).unwrap();
        let parsed = parse_report(&bytes).unwrap();
        assert!(parsed.rows.is_empty());
        assert_eq!(parsed.totals.articles, 0);
    }

    #[test]
    fn truncated_report_is_rejected() {
        assert!(parse_report(b"Author,Articles,Payout\nA,1,$10.00\n").is_err());
    }
}
