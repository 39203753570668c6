//! Integration tests for invoice line-item extraction.

use ship_ticket::batch::{DocumentQueue, DocumentStatus, JsonDocument};
use ship_ticket::config::ExtractionConfig;
use ship_ticket::extractors::{ExtractionOutcome, InvoiceExtractor};
use ship_ticket::geometry::TextFragment;
use ship_ticket::layout::is_table_row;

// Helpers

const HEADER_Y: f32 = 520.0;

/// A header line with the six standard titles.
fn header() -> Vec<TextFragment> {
    vec![
        TextFragment::at("#", 40.0, HEADER_Y),
        TextFragment::at("Product or service", 100.0, HEADER_Y),
        TextFragment::at("Description", 250.0, HEADER_Y),
        TextFragment::at("Qty", 400.0, HEADER_Y),
        TextFragment::at("Rate", 460.0, HEADER_Y),
        TextFragment::at("Amount", 530.0, HEADER_Y),
    ]
}

/// One table row at baseline `y`.
fn row(y: f32, number: &str, product: &str, description: &str, qty: &str) -> Vec<TextFragment> {
    let mut fragments = vec![TextFragment::at(number, 42.0, y)];
    if !product.is_empty() {
        fragments.push(TextFragment::at(product, 104.0, y));
    }
    if !description.is_empty() {
        fragments.push(TextFragment::at(description, 254.0, y));
    }
    if !qty.is_empty() {
        fragments.push(TextFragment::at(qty, 404.0, y));
    }
    fragments
}

fn invoice_page() -> Vec<TextFragment> {
    let mut page = vec![
        TextFragment::at("ACME Supply", 40.0, 760.0),
        TextFragment::at("Estimate no. 1042", 400.0, 740.0),
        TextFragment::at("Estimate date 03/14/2025", 400.0, 725.0),
    ];
    page.extend(header());
    page.extend(row(500.0, "1", "WIDGET-1", "Blue widget", "12 ea"));
    page.extend(row(480.0, "2", "GADGET-7", "Red gadget", "3"));
    page.push(TextFragment::at("Subtotal", 104.0, 440.0));
    page.push(TextFragment::at("$450.00", 534.0, 440.0));
    page
}

mod positional_tests {
    use super::*;

    #[test]
    fn test_full_invoice() {
        let extraction = ship_ticket::extract(&[invoice_page()]);

        let rows = match &extraction.outcome {
            ExtractionOutcome::Positional(rows) => rows,
            other => panic!("expected positional outcome, got {:?}", other),
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_number(), "1");
        assert_eq!(rows[0].product(), "WIDGET-1");
        assert_eq!(rows[0].description(), "Blue widget");
        assert_eq!(rows[0].quantity(), "12");
        assert_eq!(rows[1].product(), "GADGET-7");

        assert_eq!(extraction.metadata.estimate_no.as_deref(), Some("1042"));
        assert_eq!(extraction.metadata.estimate_date.as_deref(), Some("03/14/2025"));
    }

    #[test]
    fn test_scenario_header_with_three_titles() {
        let page = vec![
            TextFragment::at("Product or service", 100.0, 520.0),
            TextFragment::at("Description", 250.0, 520.0),
            TextFragment::at("Qty", 400.0, 520.0),
            TextFragment::at("WIDGET-1", 105.0, 300.0),
            TextFragment::at("12", 405.0, 300.0),
        ];
        let extraction = ship_ticket::extract(&[page]);
        let products = extraction.products();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].product(), "WIDGET-1");
        assert_eq!(products[0].quantity(), "12");
        assert_eq!(products[0].description(), "");
    }

    #[test]
    fn test_fragment_order_does_not_matter() {
        let mut shuffled = invoice_page();
        shuffled.reverse();
        shuffled.rotate_left(5);
        let expected = ship_ticket::extract(&[invoice_page()]);
        let actual = ship_ticket::extract(&[shuffled]);
        assert_eq!(actual.products(), expected.products());
    }

    #[test]
    fn test_duplicate_rows_collapse() {
        let mut page = invoice_page();
        // Same row drawn twice, as some generators do for bold text
        page.extend(row(470.0, "1", "WIDGET-1", "Blue widget", "12"));
        let extraction = ship_ticket::extract(&[page]);
        let widgets = extraction
            .products()
            .iter()
            .filter(|r| r.product() == "WIDGET-1")
            .count();
        assert_eq!(widgets, 1);
    }

    #[test]
    fn test_summary_line_is_tabular_but_stoplisted() {
        assert!(is_table_row("Subtotal    $450.00"));
        let extraction = ship_ticket::extract(&[invoice_page()]);
        assert!(extraction
            .products()
            .iter()
            .all(|r| !r.product().contains("Subtotal")));
    }

    #[test]
    fn test_extraction_is_repeatable() {
        let extractor = InvoiceExtractor::default();
        let pages = [invoice_page()];
        assert_eq!(extractor.extract(&pages), extractor.extract(&pages));
    }

    #[test]
    fn test_custom_tolerance() {
        // "Qty" sits 4 units above the rest of the header.
        let mut page = header();
        page[3].y = HEADER_Y + 4.0;
        page.extend(row(500.0, "1", "WIDGET-1", "Blue widget", "12"));

        let loose = ship_ticket::extract(&[page.clone()]);
        assert_eq!(loose.products()[0].quantity(), "12");

        // A tighter tolerance splits the header, leaving "Qty" alone as the
        // header line and no row with enough fields under it.
        let strict = ExtractionConfig::default().with_line_tolerance(2.0);
        let tight = ship_ticket::extract_with_config(&[page], &strict);
        assert!(tight.is_degraded());
        assert!(tight.products().is_empty());
    }
}

mod fallback_tests {
    use super::*;

    #[test]
    fn test_lexical_when_header_is_one_fragment() {
        let page = vec![
            TextFragment::at("#  Product or service  Description  Qty", 40.0, 520.0),
            TextFragment::at("1.  WIDGET-1  Blue widget  12", 40.0, 500.0),
            TextFragment::at("2.  GADGET-7  Red gadget  3", 40.0, 480.0),
            TextFragment::at("3.  Discount  Spring promo  1", 40.0, 460.0),
        ];
        let extraction = ship_ticket::extract(&[page]);
        match &extraction.outcome {
            ExtractionOutcome::Lexical(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0].row_number(), "1");
                assert_eq!(rows[1].product(), "GADGET-7");
            },
            other => panic!("expected lexical outcome, got {:?}", other),
        }
        assert!(extraction.is_degraded());
    }

    #[test]
    fn test_raw_text_when_no_table() {
        let page = vec![
            TextFragment::at("Thank you for your business", 40.0, 500.0),
            TextFragment::at("Estimate no. 55", 40.0, 480.0),
        ];
        let extraction = ship_ticket::extract(&[page]);
        match &extraction.outcome {
            ExtractionOutcome::RawText(text) => assert!(text.contains("Thank you")),
            other => panic!("expected raw text, got {:?}", other),
        }
        assert_eq!(extraction.metadata.estimate_no.as_deref(), Some("55"));
        assert!(extraction.products().is_empty());
    }

    #[test]
    fn test_outcome_serializes_with_path_tag() {
        let extraction = ship_ticket::extract(&[vec![TextFragment::at("hello", 0.0, 0.0)]]);
        let json = serde_json::to_value(&extraction.outcome).unwrap();
        assert_eq!(json["path"], "raw_text");
        assert_eq!(json["data"], "hello\n\n");
    }
}

mod queue_tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn write_dump(dir: &Path, name: &str, json: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_json_documents_through_queue() {
        let dir = TempDir::new().unwrap();
        let pages = vec![invoice_page()];
        let good = write_dump(dir.path(), "good.json", &serde_json::to_string(&pages).unwrap());
        let wrapped = write_dump(
            dir.path(),
            "wrapped.json",
            &serde_json::json!({ "pages": pages }).to_string(),
        );
        let bad = write_dump(dir.path(), "bad.json", "{ not json");

        let mut queue = DocumentQueue::default();
        assert!(queue.push(JsonDocument::new(&good)));
        assert!(queue.push(JsonDocument::new(&bad)));
        assert!(queue.push(JsonDocument::new(&wrapped)));
        assert!(!queue.push(JsonDocument::new(&good)));
        assert_eq!(queue.process_all(), 3);

        let bad_id = bad.display().to_string();
        assert_eq!(queue.status(&bad_id), Some(DocumentStatus::Failed));

        let items = queue.line_items();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].source, good.display().to_string());
        assert_eq!(items[2].source, wrapped.display().to_string());
    }
}
