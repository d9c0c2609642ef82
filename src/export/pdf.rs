//! PDF payout report: title, three-column table (Author / Articles / Payout)
//! and a `Total` footer on the last page.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use super::{format_money, ExportError};
use crate::aggregate::{AuthorAggregate, Totals};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const TOP: i64 = 790;
const LINE_HEIGHT: i64 = 16;
const ROWS_PER_PAGE: usize = 42;
const COLUMNS: [i64; 3] = [50, 360, 460];
const AUTHOR_WIDTH: usize = 46;

const TITLE: &str = "Payout Report";

pub fn render(rows: &[AuthorAggregate], totals: Totals) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let chunks: Vec<&[AuthorAggregate]> = if rows.is_empty() {
        vec![rows]
    } else {
        rows.chunks(ROWS_PER_PAGE).collect()
    };
    let last = chunks.len() - 1;

    let mut kids: Vec<Object> = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        let footer = (i == last).then_some(totals);
        let content = page_content(chunk, footer, i == 0);
        let bytes = content
            .encode()
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, bytes));
        let page_id = add_page(&mut doc, pages_id, content_id);
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    Ok(out)
}

fn add_page(doc: &mut Document, parent: ObjectId, contents: ObjectId) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => parent,
        "Contents" => contents,
    })
}

fn page_content(rows: &[AuthorAggregate], footer: Option<Totals>, first: bool) -> Content {
    let mut ops = Vec::new();
    let mut y = TOP;

    if first {
        text(&mut ops, "F2", 16, COLUMNS[0], y, TITLE);
        y -= LINE_HEIGHT * 2;
    }

    row(&mut ops, "F2", y, ["Author", "Articles", "Payout"]);
    rule(&mut ops, y - 4);
    y -= LINE_HEIGHT;

    for r in rows {
        let count = r.article_count.to_string();
        let payout = format_money(r.total_payout);
        row(&mut ops, "F1", y, [&clip(&r.author), &count, &payout]);
        y -= LINE_HEIGHT;
    }

    if let Some(t) = footer {
        rule(&mut ops, y + LINE_HEIGHT - 4);
        let count = t.articles.to_string();
        let payout = format_money(t.payout);
        row(&mut ops, "F2", y, ["Total", &count, &payout]);
    }

    Content { operations: ops }
}

fn row(ops: &mut Vec<Operation>, font: &str, y: i64, cells: [&str; 3]) {
    for (x, cell) in COLUMNS.iter().zip(cells) {
        text(ops, font, 10, *x, y, cell);
    }
}

fn text(ops: &mut Vec<Operation>, font: &str, size: i64, x: i64, y: i64, s: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(font.as_bytes().to_vec()), Object::Integer(size)],
    ));
    ops.push(Operation::new(
        "Td",
        vec![Object::Integer(x), Object::Integer(y)],
    ));
    ops.push(Operation::new("Tj", vec![Object::string_literal(latin1(s))]));
    ops.push(Operation::new("ET", vec![]));
}

fn rule(ops: &mut Vec<Operation>, y: i64) {
    ops.push(Operation::new(
        "m",
        vec![Object::Integer(COLUMNS[0]), Object::Integer(y)],
    ));
    ops.push(Operation::new(
        "l",
        vec![Object::Integer(PAGE_WIDTH - COLUMNS[0]), Object::Integer(y)],
    ));
    ops.push(Operation::new("S", vec![]));
}

fn clip(s: &str) -> String {
    if s.chars().count() <= AUTHOR_WIDTH {
        return s.to_string();
    }
    let mut out: String = s.chars().take(AUTHOR_WIDTH - 3).collect();
    out.push_str("...");
    out
}

// Standard Type1 fonts only cover single-byte encodings.
fn latin1(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
